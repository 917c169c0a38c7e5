//! Reference painter backed by tiny-skia.
//!
//! [`SkiaPainter`] draws the point symbolizers of a style at the location of a
//! feature. Marks are built as vector paths in a unit square centered on the
//! origin and scaled to the graphic size; external graphics are rasterized at
//! their final pixel size and composited.

use palette::Srgb;
use resvg::tiny_skia::{
    Color, FillRule, FilterQuality, LineCap, LineJoin, Paint, Path, PathBuilder, PixmapPaint,
    Stroke as SkiaStroke, Transform,
};
use tracing::debug;

use super::PaintCanvas;
use super::graphic::load_external;
use crate::error::Result;
use crate::feature::{Envelope, Feature};
use crate::style::expression::Expr;
use crate::style::{
    ExternalGraphic, FeatureTypeStyle, Fill, Graphic, GraphicalSymbol, Mark, Stroke, Style,
    Symbolizer,
};

/// Shape drawn when a mark has no name or an unknown one.
pub const DEFAULT_MARK: &str = "square";

const DEFAULT_FILL: &str = "#808080";
const DEFAULT_STROKE: &str = "#000000";

/// Draws a style onto a [`PaintCanvas`].
pub trait Painter {
    /// Paints every point symbolizer of `style` that applies to `feature`.
    ///
    /// `area` is the world extent the canvas bounds represent.
    fn paint(
        &self,
        style: &Style,
        feature: &dyn Feature,
        canvas: &mut PaintCanvas<'_>,
        area: &Envelope,
    ) -> Result<()>;
}

/// The built-in painter.
///
/// Graphics without a resolvable size are drawn at
/// [`PaintCanvas::default_size`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkiaPainter;

impl SkiaPainter {
    pub fn new() -> Self {
        Self
    }
}

impl Painter for SkiaPainter {
    fn paint(
        &self,
        style: &Style,
        feature: &dyn Feature,
        canvas: &mut PaintCanvas<'_>,
        area: &Envelope,
    ) -> Result<()> {
        let Some(point) = feature.geometry() else {
            debug!(style = %style.name, "feature has no geometry, nothing to paint");
            return Ok(());
        };
        let (x, y) = canvas.world_to_canvas(point.x, point.y, area);
        let painter = GraphicPainter {
            feature,
            default_size: canvas.default_size(),
        };

        for group in &style.groups {
            for graphic in applicable_graphics(group, feature)? {
                painter.graphic(canvas, graphic, x, y)?;
            }
        }
        Ok(())
    }
}

/// Graphics of the point symbolizers of every rule in `group` that applies.
///
/// Else rules apply when no other rule of the same group matched.
fn applicable_graphics<'s>(
    group: &'s FeatureTypeStyle,
    feature: &dyn Feature,
) -> Result<Vec<&'s Graphic>> {
    let mut matched = Vec::new();
    let mut fallback = Vec::new();

    for rule in &group.rules {
        let target = match (&rule.filter, rule.is_else) {
            (Some(filter), _) if filter.evaluate(feature)? => &mut matched,
            (Some(_), _) => continue,
            (None, true) => &mut fallback,
            (None, false) => &mut matched,
        };
        target.push(rule);
    }

    let rules = if matched.is_empty() { fallback } else { matched };
    Ok(rules
        .into_iter()
        .flat_map(|rule| &rule.symbolizers)
        .filter_map(Symbolizer::as_point)
        .filter_map(|point| point.graphic.as_ref())
        .collect())
}

struct GraphicPainter<'f> {
    feature: &'f dyn Feature,
    default_size: f64,
}

impl GraphicPainter<'_> {
    fn graphic(
        &self,
        canvas: &mut PaintCanvas<'_>,
        graphic: &Graphic,
        x: f32,
        y: f32,
    ) -> Result<()> {
        let opacity = self.number(graphic.opacity.as_ref())?.unwrap_or(1.0);
        let rotation = self.number(graphic.rotation.as_ref())?.unwrap_or(0.0);
        let size = self.number(graphic.size.as_ref())?;

        let placement = canvas
            .transform()
            .pre_concat(Transform::from_translate(x, y))
            .pre_concat(Transform::from_rotate(rotation as f32));

        match graphic.first_symbol() {
            Some(GraphicalSymbol::Mark(mark)) => {
                let size = size.unwrap_or(self.default_size);
                self.mark(canvas, mark, size as f32, opacity, placement)
            }
            Some(GraphicalSymbol::External(external)) => {
                self.external(canvas, external, size, opacity, placement)
            }
            None => Ok(()),
        }
    }

    fn mark(
        &self,
        canvas: &mut PaintCanvas<'_>,
        mark: &Mark,
        size: f32,
        opacity: f64,
        placement: Transform,
    ) -> Result<()> {
        let name = self.text(mark.well_known_name.as_ref())?;
        let Some(path) = mark_path(name.as_deref().unwrap_or(DEFAULT_MARK), size) else {
            return Ok(());
        };
        let antialias = canvas.antialias();

        // A bare mark is drawn with the default fill and stroke.
        let (fill, stroke) = match (&mark.fill, &mark.stroke) {
            (None, None) => (
                Some(Fill::color(DEFAULT_FILL)),
                Some(Stroke::solid(DEFAULT_STROKE, 1.0)),
            ),
            (fill, stroke) => (fill.clone(), stroke.clone()),
        };

        if let Some(fill) = &fill {
            let color = self.color(fill.color.as_ref(), DEFAULT_FILL)?;
            let alpha = self.number(fill.opacity.as_ref())?.unwrap_or(1.0) * opacity;
            let paint = solid_paint(color, alpha, antialias);
            canvas
                .pixmap()
                .fill_path(&path, &paint, FillRule::Winding, placement, None);
        }

        if let Some(stroke) = &stroke {
            let color = self.color(stroke.color.as_ref(), DEFAULT_STROKE)?;
            let alpha = self.number(stroke.opacity.as_ref())?.unwrap_or(1.0) * opacity;
            let paint = solid_paint(color, alpha, antialias);
            let line = SkiaStroke {
                width: self.number(stroke.width.as_ref())?.unwrap_or(1.0) as f32,
                line_cap: line_cap(self.text(stroke.line_cap.as_ref())?.as_deref()),
                line_join: line_join(self.text(stroke.line_join.as_ref())?.as_deref()),
                ..SkiaStroke::default()
            };
            canvas
                .pixmap()
                .stroke_path(&path, &paint, &line, placement, None);
        }
        Ok(())
    }

    fn external(
        &self,
        canvas: &mut PaintCanvas<'_>,
        external: &ExternalGraphic,
        size: Option<f64>,
        opacity: f64,
        placement: Transform,
    ) -> Result<()> {
        let Some(graphic) = load_external(&external.location, &external.format)? else {
            return Ok(());
        };

        // The graphic keeps its aspect ratio; size sets the height.
        let (natural_w, natural_h) = graphic.natural_size();
        let height = size.map_or(natural_h, |s| s as f32);
        let width = if natural_h > 0.0 {
            natural_w * height / natural_h
        } else {
            height
        };

        let scale = canvas.scale();
        let px_w = (width * scale).round().max(1.0) as u32;
        let px_h = (height * scale).round().max(1.0) as u32;
        let Some(pixmap) = graphic.rasterize(px_w, px_h) else {
            debug!(location = %external.location, "external graphic rasterized to nothing");
            return Ok(());
        };

        let paint = PixmapPaint {
            opacity: opacity.clamp(0.0, 1.0) as f32,
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        let transform = placement.pre_concat(Transform::from_scale(1.0 / scale, 1.0 / scale));
        canvas.pixmap().draw_pixmap(
            -(px_w as i32) / 2,
            -(px_h as i32) / 2,
            pixmap.as_ref(),
            &paint,
            transform,
            None,
        );
        Ok(())
    }

    fn number(&self, expr: Option<&Expr>) -> Result<Option<f64>> {
        let Some(expr) = expr else {
            return Ok(None);
        };
        Ok(expr.evaluate(self.feature)?.as_f64().filter(|v| v.is_finite()))
    }

    fn text(&self, expr: Option<&Expr>) -> Result<Option<String>> {
        let Some(expr) = expr else {
            return Ok(None);
        };
        let value = expr.evaluate(self.feature)?;
        Ok((!value.is_null()).then(|| value.to_string()))
    }

    fn color(&self, expr: Option<&Expr>, default: &str) -> Result<Srgb<u8>> {
        let text = self.text(expr)?;
        let parsed = text.as_deref().and_then(parse_color);
        if parsed.is_none() {
            if let Some(text) = &text {
                debug!(color = %text, "unparseable color, using default");
            }
        }
        Ok(parsed
            .or_else(|| parse_color(default))
            .unwrap_or(Srgb::new(0, 0, 0)))
    }
}

/// Parses `#rrggbb`, `#rgb` or a CSS color name.
pub(crate) fn parse_color(text: &str) -> Option<Srgb<u8>> {
    let text = text.trim();
    text.parse::<Srgb<u8>>()
        .ok()
        .or_else(|| palette::named::from_str(&text.to_ascii_lowercase()))
}

fn solid_paint(color: Srgb<u8>, alpha: f64, antialias: bool) -> Paint<'static> {
    let alpha = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
    let mut paint = Paint::default();
    paint.set_color(Color::from_rgba8(color.red, color.green, color.blue, alpha));
    paint.anti_alias = antialias;
    paint
}

fn line_cap(name: Option<&str>) -> LineCap {
    match name {
        Some("round") => LineCap::Round,
        Some("square") => LineCap::Square,
        _ => LineCap::Butt,
    }
}

fn line_join(name: Option<&str>) -> LineJoin {
    match name {
        Some("round") => LineJoin::Round,
        Some("bevel") => LineJoin::Bevel,
        _ => LineJoin::Miter,
    }
}

// ============================================================================
// Mark Shapes
// ============================================================================

/// Builds the outline of a well-known mark, `size` units across, centered on
/// the origin. Unknown names fall back to [`DEFAULT_MARK`].
pub(crate) fn mark_path(name: &str, size: f32) -> Option<Path> {
    let name = name.trim().to_ascii_lowercase();
    let half = size / 2.0;
    if name == "circle" {
        return PathBuilder::from_circle(0.0, 0.0, half);
    }

    let points: Vec<(f32, f32)> = match name.as_str() {
        "triangle" => vec![(0.0, -0.5), (0.5, 0.5), (-0.5, 0.5)],
        "star" => star_points(),
        "cross" => cross_points(),
        "x" => {
            let (sin, cos) = std::f32::consts::FRAC_PI_4.sin_cos();
            cross_points()
                .into_iter()
                .map(|(x, y)| (x * cos - y * sin, x * sin + y * cos))
                .collect()
        }
        _ => vec![(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)],
    };

    polygon(points.into_iter().map(|(x, y)| (x * size, y * size)))
}

fn polygon(mut points: impl Iterator<Item = (f32, f32)>) -> Option<Path> {
    let (x, y) = points.next()?;
    let mut builder = PathBuilder::new();
    builder.move_to(x, y);
    for (x, y) in points {
        builder.line_to(x, y);
    }
    builder.close();
    builder.finish()
}

fn star_points() -> Vec<(f32, f32)> {
    const INNER: f32 = 0.5 * 0.381_966;
    (0..10)
        .map(|i| {
            let radius = if i % 2 == 0 { 0.5 } else { INNER };
            let angle = (i as f32 * 36.0 - 90.0).to_radians();
            (radius * angle.cos(), radius * angle.sin())
        })
        .collect()
}

fn cross_points() -> Vec<(f32, f32)> {
    const T: f32 = 0.125;
    vec![
        (-T, -0.5),
        (T, -0.5),
        (T, -T),
        (0.5, -T),
        (0.5, T),
        (T, T),
        (T, 0.5),
        (-T, 0.5),
        (-T, T),
        (-0.5, T),
        (-0.5, -T),
        (-T, -T),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{Point, SAMPLE_AREA, SimpleFeature};
    use crate::icon::RectPx;
    use crate::style::Rule;
    use crate::style::expression::{equal_to, lit, prop};
    use resvg::tiny_skia::Pixmap;

    fn paint_on(style: &Style, feature: &SimpleFeature) -> Pixmap {
        let mut pixmap = Pixmap::new(69, 69).unwrap();
        {
            let bounds = RectPx::from_size(17, 17);
            let mut canvas = PaintCanvas::new(pixmap.as_mut(), bounds, 4.0, true);
            SkiaPainter::new()
                .paint(style, feature, &mut canvas, &SAMPLE_AREA)
                .unwrap();
        }
        pixmap
    }

    fn at_origin() -> SimpleFeature {
        SimpleFeature::new().with_geometry(Point::new(0.0, 0.0))
    }

    fn rgba(pixmap: &Pixmap, x: u32, y: u32) -> [u8; 4] {
        let p = pixmap.pixel(x, y).unwrap().demultiply();
        [p.red(), p.green(), p.blue(), p.alpha()]
    }

    fn square(fill: &str) -> Graphic {
        Graphic::mark(Mark::well_known("square").with_fill(Fill::color(fill))).with_size(lit(16.0))
    }

    #[test]
    fn parses_hex_and_named_colors() {
        assert_eq!(parse_color("#ff0000"), Some(Srgb::new(255, 0, 0)));
        assert_eq!(parse_color("#0f0"), Some(Srgb::new(0, 255, 0)));
        assert_eq!(parse_color("Blue"), Some(Srgb::new(0, 0, 255)));
        assert_eq!(parse_color("not a color"), None);
    }

    #[test]
    fn every_known_mark_has_a_path() {
        for name in ["circle", "square", "triangle", "star", "cross", "x", "unknown"] {
            let path = mark_path(name, 16.0).unwrap();
            let bounds = path.bounds();
            assert!(bounds.width() <= 16.01, "{name} too wide");
            assert!(bounds.height() <= 16.01, "{name} too tall");
        }
    }

    #[test]
    fn unknown_mark_falls_back_to_square() {
        let unknown = mark_path("hexagon", 10.0).unwrap().bounds();
        let square = mark_path(DEFAULT_MARK, 10.0).unwrap().bounds();
        assert_eq!(unknown, square);
    }

    #[test]
    fn fills_mark_at_feature_location() {
        let style = Style::new("s").with_group(
            FeatureTypeStyle::new().with_rule(Rule::new().with_point(square("#ff0000"))),
        );
        let pixmap = paint_on(&style, &at_origin());

        assert_eq!(rgba(&pixmap, 34, 34), [255, 0, 0, 255]);
        assert_eq!(rgba(&pixmap, 0, 0)[3], 0);
    }

    #[test]
    fn graphic_opacity_scales_alpha() {
        let style = Style::new("s").with_group(
            FeatureTypeStyle::new()
                .with_rule(Rule::new().with_point(square("#0000ff").with_opacity(lit(0.5)))),
        );
        let pixmap = paint_on(&style, &at_origin());
        let alpha = rgba(&pixmap, 34, 34)[3];
        assert!(alpha.abs_diff(128) <= 1, "alpha was {alpha}");
    }

    #[test]
    fn else_rule_applies_only_without_match() {
        let group = FeatureTypeStyle::new()
            .with_rule(
                Rule::new()
                    .with_filter(equal_to(prop("field"), lit(1)))
                    .with_point(square("#ff0000")),
            )
            .with_rule(Rule::else_rule().with_point(square("#00ff00")));
        let style = Style::new("s").with_group(group);

        let matched = paint_on(&style, &at_origin().with_attribute("field", 1));
        assert_eq!(rgba(&matched, 34, 34), [255, 0, 0, 255]);

        let unmatched = paint_on(&style, &at_origin().with_attribute("field", 2));
        assert_eq!(rgba(&unmatched, 34, 34), [0, 255, 0, 255]);
    }

    #[test]
    fn feature_without_geometry_paints_nothing() {
        let style = Style::new("s").with_group(
            FeatureTypeStyle::new().with_rule(Rule::new().with_point(square("#ff0000"))),
        );
        let pixmap = paint_on(&style, &SimpleFeature::new());
        assert!(pixmap.pixels().iter().all(|p| p.alpha() == 0));
    }

    #[test]
    fn stroke_is_drawn_outside_fill() {
        let graphic = Graphic::mark(
            Mark::well_known("square")
                .with_fill(Fill::color("#ffffff"))
                .with_stroke(Stroke::solid("#000000", 2.0)),
        )
        .with_size(lit(12.0));
        let style = Style::new("s")
            .with_group(FeatureTypeStyle::new().with_rule(Rule::new().with_point(graphic)));
        let pixmap = paint_on(&style, &at_origin());

        assert_eq!(rgba(&pixmap, 34, 34), [255, 255, 255, 255]);
        // left edge of the square sits at 34 - 24 = 10 px
        assert_eq!(rgba(&pixmap, 10, 34), [0, 0, 0, 255]);
    }

    #[test]
    fn line_cap_and_join_names() {
        assert_eq!(line_cap(Some("round")), LineCap::Round);
        assert_eq!(line_cap(None), LineCap::Butt);
        assert_eq!(line_join(Some("bevel")), LineJoin::Bevel);
        assert_eq!(line_join(Some("mitre")), LineJoin::Miter);
    }
}
