//! Icon rendering.
//!
//! [`IconRenderer`] turns a concrete style (one produced by
//! [`inject_properties`](crate::inject_properties)) into a small square RGBA
//! image:
//!
//! 1. The style is validated and the canvas edge estimated
//!    ([`estimate_icon_size`]).
//! 2. A transparent pixmap of `edge * supersampling + 1` pixels is allocated.
//! 3. The [`Painter`] draws the style for the sample feature, a single point at
//!    the center of the sample area.
//! 4. The pixmap is converted to straight-alpha RGBA.

mod graphic;
mod painter;
mod size;

pub use painter::{DEFAULT_MARK, Painter, SkiaPainter};
pub use size::{estimate_icon_size, validate_icon_style};

use resvg::tiny_skia::{Pixmap, PixmapMut, Transform};
use tracing::debug;

use crate::error::{IconError, Result};
use crate::feature::{Envelope, SAMPLE_AREA, SAMPLE_FEATURE};
use crate::icon::{IconImage, RectPx};
use crate::options::{DEFAULT_ICON_SIZE, RenderOptions};
use crate::style::Style;
use graphic::pixmap_to_rgba_image;
use size::estimate_icon_size_with_default;

// ============================================================================
// Paint Canvas
// ============================================================================

/// Drawing surface handed to a [`Painter`].
///
/// Painters work in logical units; [`transform`](Self::transform) maps them
/// to pixels. The canvas borrows the pixmap for the duration of a paint call
/// and releases it when dropped.
pub struct PaintCanvas<'a> {
    pixmap: PixmapMut<'a>,
    transform: Transform,
    bounds: RectPx,
    scale: f32,
    antialias: bool,
    default_size: f64,
}

impl<'a> PaintCanvas<'a> {
    /// Wraps `pixmap`, with `bounds` in logical units and `scale` pixels per
    /// logical unit.
    pub fn new(pixmap: PixmapMut<'a>, bounds: RectPx, scale: f32, antialias: bool) -> Self {
        Self {
            pixmap,
            transform: Transform::from_scale(scale, scale),
            bounds,
            scale,
            antialias,
            default_size: DEFAULT_ICON_SIZE as f64,
        }
    }

    /// Sets the size, in logical units, of graphics that do not resolve one.
    pub fn with_default_size(mut self, size: f64) -> Self {
        self.default_size = size;
        self
    }

    pub fn pixmap(&mut self) -> &mut PixmapMut<'a> {
        &mut self.pixmap
    }

    /// Logical-to-pixel transform.
    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn bounds(&self) -> RectPx {
        self.bounds
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn antialias(&self) -> bool {
        self.antialias
    }

    pub fn default_size(&self) -> f64 {
        self.default_size
    }

    /// Maps a world coordinate inside `area` to logical canvas units.
    ///
    /// The y axis is flipped: world y grows upwards, canvas y downwards.
    pub fn world_to_canvas(&self, x: f64, y: f64, area: &Envelope) -> (f32, f32) {
        let bounds = self.bounds;
        let fx = if area.width() > 0.0 {
            (x - area.min_x) / area.width()
        } else {
            0.5
        };
        let fy = if area.height() > 0.0 {
            (area.max_y - y) / area.height()
        } else {
            0.5
        };
        (
            bounds.x as f32 + (fx * bounds.width as f64) as f32,
            bounds.y as f32 + (fy * bounds.height as f64) as f32,
        )
    }
}

// ============================================================================
// Icon Renderer
// ============================================================================

/// Renders concrete styles to icons.
///
/// # Example
///
/// ```
/// use pointicon_renderer::style::expression::lit;
/// use pointicon_renderer::{
///     FeatureTypeStyle, Graphic, IconRenderer, Mark, RenderOptions, Rule, Style,
/// };
///
/// let circle = Graphic::mark(Mark::well_known("circle")).with_size(lit(16.0));
/// let style = Style::new("poi")
///     .with_group(FeatureTypeStyle::new().with_rule(Rule::new().with_point(circle)));
///
/// let renderer = IconRenderer::from_options(RenderOptions::new().with_supersampling(2));
/// let icon = renderer.render(&style).unwrap();
/// assert_eq!(icon.dimensions().width, 17 * 2 + 1);
/// ```
#[derive(Debug, Clone)]
pub struct IconRenderer<P = SkiaPainter> {
    painter: P,
    options: RenderOptions,
}

impl Default for IconRenderer<SkiaPainter> {
    fn default() -> Self {
        Self::from_options(RenderOptions::default())
    }
}

impl IconRenderer<SkiaPainter> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A renderer using the built-in painter and `options`.
    pub fn from_options(options: RenderOptions) -> Self {
        Self::with_painter(SkiaPainter::new()).with_options(options)
    }
}

impl<P: Painter> IconRenderer<P> {
    /// A renderer drawing through a custom painter.
    pub fn with_painter(painter: P) -> Self {
        Self {
            painter,
            options: RenderOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Renders `style` for the sample feature.
    ///
    /// Fails without drawing anything if the style has an empty group or rule,
    /// or contains a symbolizer other than a point symbolizer.
    pub fn render(&self, style: &Style) -> Result<IconImage> {
        let edge = estimate_icon_size_with_default(style, self.options.default_size)?;
        let scale = self.options.supersampling.max(1);
        let side = edge
            .checked_mul(scale)
            .and_then(|px| px.checked_add(1))
            .ok_or(IconError::Canvas(u32::MAX))?;

        let mut pixmap = Pixmap::new(side, side).ok_or(IconError::Canvas(side))?;
        {
            let mut canvas = PaintCanvas::new(
                pixmap.as_mut(),
                RectPx::from_size(edge, edge),
                scale as f32,
                self.options.antialias,
            )
            .with_default_size(self.options.default_size as f64);
            self.painter
                .paint(style, &*SAMPLE_FEATURE, &mut canvas, &SAMPLE_AREA)?;
        }

        debug!(style = %style.name, edge, side, "rendered icon");
        Ok(IconImage::new(pixmap_to_rgba_image(&pixmap), scale as f32))
    }
}

/// Renders `style` with the built-in painter and default options.
pub fn render_icon(style: &Style) -> Result<IconImage> {
    IconRenderer::new().render(style)
}
