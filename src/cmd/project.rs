use anyhow::{bail, Context, Result};

use pdfspot::overlay::{GeometryProvider, PageSize, Trigger, Zoom};
use pdfspot::{BBox, OverlayTracker, PageLayout, Projection, Rect, Selection};

const MAX_PAGES: u32 = 10_000;

/// Where the page surface comes from.
pub enum Surface<'a> {
    /// An explicit page surface client rect.
    Canvas(&'a str),
    /// Page `page` of a stacked layout of `pages` equal pages.
    Layout {
        page: u32,
        pages: u32,
        page_size: &'a str,
        zoom: Option<f64>,
    },
}

/// Single mounted page inside a container, as given on the command line.
struct CliGeometry {
    container: Rect,
    canvas: Rect,
}

impl GeometryProvider for CliGeometry {
    fn container_rect(&self) -> Rect {
        self.container
    }

    fn page_surface_rect(&self, page_number: u32) -> Option<Rect> {
        (page_number == 1).then_some(self.canvas)
    }
}

pub fn cmd_project(
    bbox: &str,
    surface: &Surface<'_>,
    container: &str,
    scale: f64,
    scroll: Option<&str>,
) -> Result<()> {
    let [x0, y0, x1, y1] = parse_numbers::<4>(bbox).context("--bbox expects x0,y0,x1,y1")?;
    let Some(bbox) = BBox::from_normalized(&[Some(x0), Some(y0), Some(x1), Some(y1)]) else {
        bail!("--bbox values must lie in [0, 1]");
    };
    if !scale.is_finite() || scale <= 0.0 {
        bail!("--scale must be a positive number");
    }
    let container = parse_rect(container).context("--container expects left,top,width,height")?;
    let scroll = scroll
        .map(|s| parse_numbers::<2>(s).context("--scroll expects dx,dy"))
        .transpose()?;

    let mut tracker = OverlayTracker::new();
    let projection = match *surface {
        Surface::Canvas(canvas) => {
            let mut geometry = CliGeometry {
                container,
                canvas: parse_rect(canvas).context("--canvas expects left,top,width,height")?,
            };
            let mut projection = tracker.select(Selection::new(bbox, 1, scale), &geometry);
            if let Some([dx, dy]) = scroll {
                geometry.canvas.left -= dx;
                geometry.canvas.top -= dy;
                projection = tracker
                    .recompute(Trigger::Scroll, &geometry)
                    .unwrap_or(Projection::Unavailable);
            }
            projection
        }
        Surface::Layout { page, pages, page_size, zoom } => {
            let mut layout = build_layout(container, pages, page_size, zoom)?;
            if !layout.scroll_to_page(page) {
                bail!("--page {page} is outside 1..={pages}");
            }
            layout.mount_visible();
            let mut projection = tracker.select(Selection::new(bbox, page, scale), &layout);
            if let Some([dx, dy]) = scroll {
                layout.scroll_by(dx, dy);
                if !layout.mount_visible().is_empty() {
                    tracker.recompute(Trigger::PageMounted, &layout);
                }
                projection = tracker
                    .recompute(Trigger::Scroll, &layout)
                    .unwrap_or(Projection::Unavailable);
            }
            if let Some(current) = layout.current_page() {
                eprintln!("📄 Page {current} of {pages} in view");
            }
            projection
        }
    };

    let Some(rect) = projection.rect() else {
        bail!("Page surface is not mounted");
    };
    println!("{}", serde_json::to_string(&rect)?);
    if tracker.visible_rect().is_none() {
        eprintln!("⚠️  Overlay has zero area; nothing to draw");
    }
    Ok(())
}

fn build_layout(container: Rect, pages: u32, page_size: &str, zoom: Option<f64>) -> Result<PageLayout> {
    if pages > MAX_PAGES {
        bail!("--pages is limited to {MAX_PAGES}");
    }
    if container.width <= 0.0 || container.height <= 0.0 {
        bail!("--container needs a non-zero size when laying out pages");
    }
    let [width, height] = parse_numbers::<2>(page_size).context("--page-size expects width,height")?;
    if width <= 0.0 || height <= 0.0 {
        bail!("--page-size must be positive");
    }
    let zoom = match zoom {
        Some(factor) if factor.is_finite() && factor > 0.0 => Zoom::Factor(factor),
        Some(_) => bail!("--zoom must be a positive number"),
        None => Zoom::FitWidth,
    };
    let pages = vec![PageSize::new(width, height); pages as usize];
    Ok(PageLayout::new(container, pages).with_zoom(zoom))
}

fn parse_rect(s: &str) -> Result<Rect> {
    let [left, top, width, height] = parse_numbers::<4>(s)?;
    if width < 0.0 || height < 0.0 {
        bail!("width and height must not be negative");
    }
    Ok(Rect::new(left, top, width, height))
}

fn parse_numbers<const N: usize>(s: &str) -> Result<[f64; N]> {
    let values = s
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .with_context(|| format!("not a number: {part:?}"))
        })
        .collect::<Result<Vec<_>>>()?;
    let count = values.len();
    values
        .try_into()
        .map_err(|_| anyhow::anyhow!("expected {N} comma-separated numbers, got {count}"))
}
