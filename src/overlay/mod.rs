//! Overlay placement for extracted text blocks
//!
//! Maps a normalized bounding box (fractions of page width/height) onto
//! pixel coordinates of a rendered page surface inside a scrollable
//! container:
//! - [`projector`] - pure projection math, geometry provider seam, and the
//!   selection tracker that recomputes on resize/scroll
//! - [`layout`] - a synthetic stacked-page viewer usable as a provider

pub mod layout;
pub mod projector;

use serde::{Deserialize, Serialize};

pub use layout::{PageLayout, PageSize, Zoom};
pub use projector::{project, project_rect, GeometryProvider, OverlayTracker, Selection, Trigger};

/// Normalized bounding box, each coordinate a fraction of the page size.
///
/// Serialized as the wire array `[x0, y0, x1, y1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    #[must_use]
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Build a box from wire coordinates, rejecting anything that is not
    /// four finite numbers in `[0, 1]` with `x0 <= x1` and `y0 <= y1`.
    #[must_use]
    pub fn from_normalized(coords: &[Option<f64>]) -> Option<Self> {
        let &[Some(x0), Some(y0), Some(x1), Some(y1)] = coords else {
            return None;
        };
        let bbox = Self::new(x0, y0, x1, y1);
        bbox.is_normalized().then_some(bbox)
    }

    /// Returns `true` if every coordinate is finite, inside `[0, 1]`, and
    /// the box is not inverted.
    #[must_use]
    pub fn is_normalized(&self) -> bool {
        let unit = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
        unit(self.x0) && unit(self.y0) && unit(self.x1) && unit(self.y1)
            && self.x0 <= self.x1
            && self.y0 <= self.y1
    }
}

impl From<[f64; 4]> for BBox {
    fn from([x0, y0, x1, y1]: [f64; 4]) -> Self {
        Self { x0, y0, x1, y1 }
    }
}

impl From<BBox> for [f64; 4] {
    fn from(b: BBox) -> Self {
        [b.x0, b.y0, b.x1, b.y1]
    }
}

/// Absolute bounding rectangle in viewport (client) pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Returns `true` if the two rectangles share any area.
    #[must_use]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left < other.right()
            && other.left < self.right()
            && self.top < other.bottom()
            && other.top < self.bottom()
    }
}

/// Overlay rectangle in pixels, relative to the container's client origin.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OverlayRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl OverlayRect {
    /// Whether there is anything to draw. Zero-sized overlays are skipped.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Result of placing an overlay against the current geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// The page surface was found and the overlay computed.
    Placed(OverlayRect),
    /// The page surface is not mounted yet; retry on the next geometry change.
    Unavailable,
}

impl Projection {
    #[must_use]
    pub fn rect(&self) -> Option<OverlayRect> {
        match self {
            Self::Placed(rect) => Some(*rect),
            Self::Unavailable => None,
        }
    }

    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }
}
