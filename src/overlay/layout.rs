//! Synthetic document viewer geometry.
//!
//! [`PageLayout`] models a scrollable container holding vertically stacked
//! pages, rendered either fit-to-width or at a fixed zoom, and mounted lazily
//! the way virtualized viewers mount canvases. It implements
//! [`GeometryProvider`], reporting client-space rectangles that move with
//! the scroll offset.

use std::collections::BTreeSet;

use super::projector::GeometryProvider;
use super::Rect;

/// Intrinsic page size (PDF points or any consistent unit).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// US Letter in points.
    #[must_use]
    pub fn letter() -> Self {
        Self::new(612.0, 792.0)
    }
}

/// Zoom policy for rendered pages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Zoom {
    /// Pages stretch to the container width minus the gap on both sides.
    FitWidth,
    /// Fixed factor applied to the intrinsic size.
    Factor(f64),
}

#[derive(Debug, Clone)]
pub struct PageLayout {
    container: Rect,
    pages: Vec<PageSize>,
    gap: f64,
    zoom: Zoom,
    scroll_x: f64,
    scroll_y: f64,
    mounted: BTreeSet<u32>,
}

impl PageLayout {
    /// Create a layout with no pages mounted and the scroll at the origin.
    #[must_use]
    pub fn new(container: Rect, pages: Vec<PageSize>) -> Self {
        Self {
            container,
            pages,
            gap: 8.0,
            zoom: Zoom::FitWidth,
            scroll_x: 0.0,
            scroll_y: 0.0,
            mounted: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_gap(mut self, gap: f64) -> Self {
        self.gap = gap.max(0.0);
        self
    }

    #[must_use]
    pub fn with_zoom(mut self, zoom: Zoom) -> Self {
        self.zoom = zoom;
        self
    }

    #[must_use]
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_index(&self, page_number: u32) -> Option<usize> {
        let idx = usize::try_from(page_number.checked_sub(1)?).ok()?;
        (idx < self.pages.len()).then_some(idx)
    }

    fn rendered_size(&self, page: PageSize) -> (f64, f64) {
        let factor = match self.zoom {
            Zoom::FitWidth if page.width > 0.0 => {
                (self.container.width - 2.0 * self.gap).max(0.0) / page.width
            }
            Zoom::FitWidth => 0.0,
            Zoom::Factor(f) => f.max(0.0),
        };
        (page.width * factor, page.height * factor)
    }

    /// Page rectangle in document (unscrolled content) coordinates.
    fn document_rect(&self, idx: usize) -> Rect {
        let mut top = self.gap;
        for page in &self.pages[..idx] {
            top += self.rendered_size(*page).1 + self.gap;
        }
        let (width, height) = self.rendered_size(self.pages[idx]);
        let left = ((self.container.width - width) / 2.0).max(self.gap);
        Rect::new(left, top, width, height)
    }

    /// Total scrollable content size.
    #[must_use]
    pub fn content_size(&self) -> (f64, f64) {
        let mut width: f64 = 0.0;
        let mut height = self.gap;
        for page in &self.pages {
            let (w, h) = self.rendered_size(*page);
            width = width.max(w + 2.0 * self.gap);
            height += h + self.gap;
        }
        (width.max(self.container.width), height)
    }

    fn max_scroll(&self) -> (f64, f64) {
        let (w, h) = self.content_size();
        ((w - self.container.width).max(0.0), (h - self.container.height).max(0.0))
    }

    /// Scroll to an absolute offset, clamped to the content bounds.
    pub fn scroll_to(&mut self, x: f64, y: f64) {
        let (max_x, max_y) = self.max_scroll();
        self.scroll_x = x.clamp(0.0, max_x);
        self.scroll_y = y.clamp(0.0, max_y);
    }

    pub fn scroll_by(&mut self, dx: f64, dy: f64) {
        self.scroll_to(self.scroll_x + dx, self.scroll_y + dy);
    }

    #[must_use]
    pub fn scroll_offset(&self) -> (f64, f64) {
        (self.scroll_x, self.scroll_y)
    }

    /// Scroll so the top of `page_number` sits at the top of the viewport.
    pub fn scroll_to_page(&mut self, page_number: u32) -> bool {
        let Some(idx) = self.page_index(page_number) else {
            return false;
        };
        let rect = self.document_rect(idx);
        self.scroll_to(self.scroll_x, rect.top - self.gap);
        true
    }

    /// Change the container size; the scroll offset is re-clamped.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.container.width = width.max(0.0);
        self.container.height = height.max(0.0);
        self.scroll_to(self.scroll_x, self.scroll_y);
    }

    /// Move the container within the client viewport.
    pub fn move_to(&mut self, left: f64, top: f64) {
        self.container.left = left;
        self.container.top = top;
    }

    pub fn set_zoom(&mut self, zoom: Zoom) {
        self.zoom = zoom;
        self.scroll_to(self.scroll_x, self.scroll_y);
    }

    /// Mount a page surface. Returns `false` for unknown pages.
    pub fn mount(&mut self, page_number: u32) -> bool {
        if self.page_index(page_number).is_none() {
            return false;
        }
        self.mounted.insert(page_number);
        true
    }

    pub fn unmount(&mut self, page_number: u32) {
        self.mounted.remove(&page_number);
    }

    #[must_use]
    pub fn is_mounted(&self, page_number: u32) -> bool {
        self.mounted.contains(&page_number)
    }

    fn client_rect(&self, idx: usize) -> Rect {
        let doc = self.document_rect(idx);
        Rect::new(
            self.container.left + doc.left - self.scroll_x,
            self.container.top + doc.top - self.scroll_y,
            doc.width,
            doc.height,
        )
    }

    /// Pages whose rendered area intersects the container viewport.
    #[must_use]
    pub fn visible_pages(&self) -> Vec<u32> {
        (0..self.pages.len())
            .filter(|&idx| self.client_rect(idx).intersects(&self.container))
            .map(|idx| idx as u32 + 1)
            .collect()
    }

    /// Mount every visible page the way a virtualized viewer would after a
    /// scroll. Returns the pages that were newly mounted.
    pub fn mount_visible(&mut self) -> Vec<u32> {
        let visible = self.visible_pages();
        visible.into_iter().filter(|p| self.mounted.insert(*p)).collect()
    }

    /// The page occupying the largest share of the viewport.
    #[must_use]
    pub fn current_page(&self) -> Option<u32> {
        let view = self.container;
        (0..self.pages.len())
            .map(|idx| {
                let r = self.client_rect(idx);
                let w = (r.right().min(view.right()) - r.left.max(view.left)).max(0.0);
                let h = (r.bottom().min(view.bottom()) - r.top.max(view.top)).max(0.0);
                (idx as u32 + 1, w * h)
            })
            .filter(|&(_, area)| area > 0.0)
            .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)))
            .map(|(page, _)| page)
    }
}

impl GeometryProvider for PageLayout {
    fn container_rect(&self) -> Rect {
        self.container
    }

    fn page_surface_rect(&self, page_number: u32) -> Option<Rect> {
        if !self.is_mounted(page_number) {
            return None;
        }
        let idx = self.page_index(page_number)?;
        Some(self.client_rect(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::{project, BBox, OverlayTracker, Selection, Trigger};

    fn three_pages() -> PageLayout {
        PageLayout::new(
            Rect::new(0.0, 0.0, 816.0, 600.0),
            vec![PageSize::new(800.0, 1000.0); 3],
        )
        .with_gap(8.0)
    }

    #[test]
    fn fit_width_stacks_pages() {
        let mut layout = three_pages();
        layout.mount(1);
        layout.mount(2);
        let p1 = layout.page_surface_rect(1).unwrap();
        let p2 = layout.page_surface_rect(2).unwrap();
        assert_eq!(p1, Rect::new(8.0, 8.0, 800.0, 1000.0));
        assert_eq!(p2.top, 8.0 + 1000.0 + 8.0);
        assert_eq!(layout.content_size().1, 8.0 + 3.0 * 1008.0);
    }

    #[test]
    fn unmounted_and_unknown_pages_have_no_surface() {
        let mut layout = three_pages();
        assert!(layout.page_surface_rect(1).is_none());
        assert!(!layout.mount(0));
        assert!(!layout.mount(4));
        assert!(layout.page_surface_rect(4).is_none());
    }

    #[test]
    fn mount_visible_follows_scroll() {
        let mut layout = three_pages();
        assert_eq!(layout.mount_visible(), vec![1]);
        layout.scroll_to_page(3);
        assert_eq!(layout.mount_visible(), vec![3]);
        assert!(layout.is_mounted(1));
        assert_eq!(layout.current_page(), Some(3));
    }

    #[test]
    fn scroll_moves_projection_by_exact_offset() {
        let mut layout = three_pages();
        layout.mount(2);
        let bbox = BBox::new(0.1, 0.1, 0.3, 0.2);
        let before = project(&bbox, 2, 1.0, &layout).rect().unwrap();
        layout.scroll_by(0.0, 250.0);
        let after = project(&bbox, 2, 1.0, &layout).rect().unwrap();
        assert_eq!(after.top, before.top - 250.0);
        assert_eq!(after.left, before.left);
        assert_eq!(after.width, before.width);
        assert_eq!(after.height, before.height);
    }

    #[test]
    fn scroll_is_clamped_to_content() {
        let mut layout = three_pages();
        layout.scroll_to(-50.0, 1e9);
        let (_, max_y) = layout.max_scroll();
        assert_eq!(layout.scroll_offset(), (0.0, max_y));
    }

    #[test]
    fn resize_rescales_fit_width_pages() {
        let mut layout = three_pages();
        layout.mount(1);
        let mut tracker = OverlayTracker::new();
        let first = tracker
            .select(Selection::new(BBox::new(0.0, 0.0, 0.5, 0.5), 1, 1.0), &layout)
            .rect()
            .unwrap();
        assert_eq!(first.width, 400.0);

        layout.resize(416.0, 600.0);
        let resized = tracker.recompute(Trigger::Resize, &layout).unwrap().rect().unwrap();
        assert_eq!(resized.width, 200.0);
        assert_eq!(resized.height, 250.0);
    }

    #[test]
    fn fixed_zoom_centers_narrow_pages() {
        let mut layout = PageLayout::new(Rect::new(10.0, 20.0, 1000.0, 700.0), vec![PageSize::letter()])
            .with_zoom(Zoom::Factor(1.0));
        layout.mount(1);
        let r = layout.page_surface_rect(1).unwrap();
        assert_eq!(r.width, 612.0);
        assert_eq!(r.left, 10.0 + (1000.0 - 612.0) / 2.0);
        assert_eq!(r.top, 20.0 + 8.0);
    }

    #[test]
    fn moving_container_keeps_relative_overlay() {
        let mut layout = three_pages();
        layout.mount(1);
        let bbox = BBox::new(0.2, 0.2, 0.4, 0.4);
        let before = project(&bbox, 1, 1.0, &layout).rect().unwrap();
        layout.move_to(120.0, 75.0);
        let after = project(&bbox, 1, 1.0, &layout).rect().unwrap();
        assert_eq!(before, after);
    }
}
