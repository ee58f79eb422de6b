//! Bounding box projection onto rendered page surfaces.
//!
//! The renderer is reached only through [`GeometryProvider`], which reports
//! the live client rectangles of the scrollable container and of a page's
//! rendered surface. Nothing is cached between calls: every trigger re-reads
//! geometry, so scroll and resize are handled by the same code path.

use tracing::debug;

use super::{BBox, OverlayRect, Projection, Rect};

/// Source of live layout geometry for a document viewer.
pub trait GeometryProvider {
    /// Client rectangle of the scrollable container.
    fn container_rect(&self) -> Rect;

    /// Client rectangle of the rendered surface for a 1-based page number,
    /// or `None` if the page is not mounted.
    fn page_surface_rect(&self, page_number: u32) -> Option<Rect>;
}

/// Project a normalized box onto a page surface, relative to the container.
///
/// Width and height are clamped at zero.
#[must_use]
pub fn project_rect(bbox: &BBox, scale: f64, container: Rect, canvas: Rect) -> OverlayRect {
    let x0 = bbox.x0 * canvas.width * scale;
    let y0 = bbox.y0 * canvas.height * scale;
    let x1 = bbox.x1 * canvas.width * scale;
    let y1 = bbox.y1 * canvas.height * scale;

    OverlayRect {
        left: canvas.left - container.left + x0,
        top: canvas.top - container.top + y0,
        width: (x1 - x0).max(0.0),
        height: (y1 - y0).max(0.0),
    }
}

/// Place `bbox` on page `page_number` using the provider's current geometry.
pub fn project<G: GeometryProvider + ?Sized>(
    bbox: &BBox,
    page_number: u32,
    scale: f64,
    geometry: &G,
) -> Projection {
    let Some(canvas) = geometry.page_surface_rect(page_number) else {
        debug!(page = page_number, "page surface not mounted");
        return Projection::Unavailable;
    };
    Projection::Placed(project_rect(bbox, scale, geometry.container_rect(), canvas))
}

/// The chunk location the user asked to highlight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub bbox: BBox,
    pub page: u32,
    pub scale: f64,
}

impl Selection {
    #[must_use]
    pub fn new(bbox: BBox, page: u32, scale: f64) -> Self {
        Self { bbox, page, scale }
    }
}

/// Why an overlay is being recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Selection,
    ScaleChanged,
    Resize,
    Scroll,
    PageMounted,
}

/// Keeps the overlay for the current selection in step with the viewer.
///
/// Each trigger recomputes from live geometry. Once detached the tracker
/// ignores every trigger until a new selection is made.
#[derive(Debug, Default)]
pub struct OverlayTracker {
    selection: Option<Selection>,
    current: Option<Projection>,
    detached: bool,
}

impl OverlayTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a new chunk location and place it immediately.
    pub fn select<G: GeometryProvider + ?Sized>(&mut self, selection: Selection, geometry: &G) -> Projection {
        self.selection = Some(selection);
        self.detached = false;
        self.recompute(Trigger::Selection, geometry).unwrap_or(Projection::Unavailable)
    }

    /// Change the rendering scale of the current selection.
    pub fn set_scale<G: GeometryProvider + ?Sized>(&mut self, scale: f64, geometry: &G) -> Option<Projection> {
        self.selection.as_mut()?.scale = scale;
        self.recompute(Trigger::ScaleChanged, geometry)
    }

    /// Recompute after a geometry change. Returns `None` when there is no
    /// selection or the tracker has been detached.
    pub fn recompute<G: GeometryProvider + ?Sized>(&mut self, trigger: Trigger, geometry: &G) -> Option<Projection> {
        if self.detached {
            return None;
        }
        let sel = self.selection?;
        let projection = project(&sel.bbox, sel.page, sel.scale, geometry);
        debug!(?trigger, page = sel.page, placed = !projection.is_unavailable(), "overlay recomputed");
        self.current = Some(projection);
        Some(projection)
    }

    /// Last computed overlay, if it was placed and has a drawable size.
    #[must_use]
    pub fn visible_rect(&self) -> Option<OverlayRect> {
        self.current
            .and_then(|p| p.rect())
            .filter(OverlayRect::is_visible)
    }

    #[must_use]
    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn clear(&mut self) {
        self.selection = None;
        self.current = None;
    }

    /// Stop reacting to geometry triggers.
    pub fn detach(&mut self) {
        self.detached = true;
        self.current = None;
    }

    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.detached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FixedGeometry {
        container: Rect,
        pages: HashMap<u32, Rect>,
    }

    impl GeometryProvider for FixedGeometry {
        fn container_rect(&self) -> Rect {
            self.container
        }

        fn page_surface_rect(&self, page_number: u32) -> Option<Rect> {
            self.pages.get(&page_number).copied()
        }
    }

    fn viewer() -> FixedGeometry {
        FixedGeometry {
            container: Rect::new(0.0, 0.0, 1200.0, 900.0),
            pages: HashMap::from([(1, Rect::new(100.0, 50.0, 800.0, 600.0))]),
        }
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn half_page_box_at_unit_scale() {
        let p = project(&BBox::new(0.0, 0.0, 0.5, 0.5), 1, 1.0, &viewer());
        assert_eq!(
            p,
            Projection::Placed(OverlayRect { left: 100.0, top: 50.0, width: 400.0, height: 300.0 })
        );
    }

    #[test]
    fn missing_page_is_unavailable() {
        let p = project(&BBox::new(0.0, 0.0, 0.5, 0.5), 7, 1.0, &viewer());
        assert!(p.is_unavailable());
    }

    #[test]
    fn container_offset_is_subtracted() {
        let mut g = viewer();
        g.container = Rect::new(40.0, 20.0, 1200.0, 900.0);
        let r = project(&BBox::new(0.25, 0.5, 0.5, 1.0), 1, 1.0, &g).rect().unwrap();
        assert_close(r.left, 100.0 - 40.0 + 200.0);
        assert_close(r.top, 50.0 - 20.0 + 300.0);
        assert_close(r.width, 200.0);
        assert_close(r.height, 300.0);
    }

    #[test]
    fn size_scales_linearly() {
        let bbox = BBox::new(0.1, 0.2, 0.4, 0.6);
        let g = viewer();
        let a = project(&bbox, 1, 1.0, &g).rect().unwrap();
        let b = project(&bbox, 1, 2.5, &g).rect().unwrap();

        assert_close(b.width, a.width * 2.5);
        assert_close(b.height, a.height * 2.5);
        // only the x0/y0 offset term depends on scale
        let canvas = g.pages[&1];
        assert_close(b.left - a.left, bbox.x0 * canvas.width * 1.5);
        assert_close(b.top - a.top, bbox.y0 * canvas.height * 1.5);
    }

    #[test]
    fn scroll_shifts_origin_only() {
        let bbox = BBox::new(0.1, 0.2, 0.4, 0.6);
        let mut g = viewer();
        let before = project(&bbox, 1, 1.0, &g).rect().unwrap();

        // scrolling the container moves the page surface in client space
        let (dx, dy) = (15.0, 240.0);
        let page = g.pages.get_mut(&1).unwrap();
        page.left -= dx;
        page.top -= dy;
        let after = project(&bbox, 1, 1.0, &g).rect().unwrap();

        assert_close(after.left, before.left - dx);
        assert_close(after.top, before.top - dy);
        assert_close(after.width, before.width);
        assert_close(after.height, before.height);
    }

    #[test]
    fn negative_scale_never_yields_negative_size() {
        let r = project_rect(
            &BBox::new(0.1, 0.1, 0.2, 0.2),
            -1.0,
            Rect::default(),
            Rect::new(0.0, 0.0, 100.0, 100.0),
        );
        assert!(r.width >= 0.0 && r.height >= 0.0);
        assert!(!r.is_visible());
    }

    #[test]
    fn tracker_retries_until_page_mounts() {
        let mut g = viewer();
        let mut tracker = OverlayTracker::new();
        let sel = Selection::new(BBox::new(0.0, 0.0, 0.5, 0.5), 2, 1.0);

        assert!(tracker.select(sel, &g).is_unavailable());
        assert!(tracker.visible_rect().is_none());

        g.pages.insert(2, Rect::new(100.0, 700.0, 800.0, 600.0));
        let p = tracker.recompute(Trigger::PageMounted, &g).unwrap();
        assert_eq!(p.rect().unwrap().top, 700.0);
        assert!(tracker.visible_rect().is_some());
    }

    #[test]
    fn tracker_scale_change_recomputes() {
        let g = viewer();
        let mut tracker = OverlayTracker::new();
        tracker.select(Selection::new(BBox::new(0.0, 0.0, 0.5, 0.5), 1, 1.0), &g);
        let p = tracker.set_scale(2.0, &g).unwrap();
        assert_eq!(p.rect().unwrap().width, 800.0);
        assert_eq!(tracker.selection().unwrap().scale, 2.0);
    }

    #[test]
    fn detached_tracker_ignores_triggers() {
        let g = viewer();
        let mut tracker = OverlayTracker::new();
        tracker.select(Selection::new(BBox::new(0.0, 0.0, 0.5, 0.5), 1, 1.0), &g);
        tracker.detach();
        assert!(tracker.is_detached());
        assert!(tracker.recompute(Trigger::Scroll, &g).is_none());
        assert!(tracker.visible_rect().is_none());

        // a fresh selection reattaches
        assert!(!tracker.select(Selection::new(BBox::new(0.0, 0.0, 0.1, 0.1), 1, 1.0), &g).is_unavailable());
        assert!(!tracker.is_detached());
    }

    #[test]
    fn no_selection_means_nothing_to_recompute() {
        let mut tracker = OverlayTracker::new();
        assert!(tracker.recompute(Trigger::Resize, &viewer()).is_none());
        assert!(tracker.set_scale(2.0, &viewer()).is_none());
    }
}
