//! Icon canvas sizing.

use tracing::debug;

use crate::error::{Result, ValidationError};
use crate::feature::SAMPLE_FEATURE;
use crate::options::DEFAULT_ICON_SIZE;
use crate::style::expression::Expr;
use crate::style::{Graphic, GraphicalSymbol, Style, Symbolizer};

/// Checks that a style can be rendered as an icon.
///
/// The style needs at least one feature type style, every feature type style
/// at least one rule, every rule at least one symbolizer, and every symbolizer
/// must be a point symbolizer.
pub fn validate_icon_style(style: &Style) -> Result<(), ValidationError> {
    if style.groups.is_empty() {
        return Err(ValidationError::EmptyStyle {
            style: style.name.clone(),
        });
    }
    for (i, group) in style.groups.iter().enumerate() {
        if group.rules.is_empty() {
            return Err(ValidationError::EmptyGroup { group: i });
        }
        for (j, rule) in group.rules.iter().enumerate() {
            if rule.symbolizers.is_empty() {
                return Err(ValidationError::EmptyRule { group: i, rule: j });
            }
            for (k, symbolizer) in rule.symbolizers.iter().enumerate() {
                if !matches!(symbolizer, Symbolizer::Point(_)) {
                    return Err(ValidationError::UnsupportedSymbolizer {
                        group: i,
                        rule: j,
                        symbolizer: k,
                        kind: symbolizer.kind(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Returns the side, in logical units, of the smallest square canvas that
/// holds every graphic of `style`.
///
/// The style must already be concrete (see
/// [`inject_properties`](crate::inject_properties)); values are evaluated
/// against the sample feature, and anything that does not resolve falls back
/// to defaults.
pub fn estimate_icon_size(style: &Style) -> Result<u32> {
    estimate_icon_size_with_default(style, DEFAULT_ICON_SIZE)
}

pub(crate) fn estimate_icon_size_with_default(style: &Style, default_size: i32) -> Result<u32> {
    validate_icon_style(style)?;

    let size = style
        .groups
        .iter()
        .flat_map(|group| &group.rules)
        .flat_map(|rule| &rule.symbolizers)
        .filter_map(Symbolizer::as_point)
        .filter_map(|point| point.graphic.as_ref())
        .map(|graphic| graphic_size(graphic, default_size))
        .fold(0.0, f64::max);

    // Float-to-int casts saturate, so oversized graphics yield u32::MAX.
    let edge = (size as u32).saturating_add(1);
    debug!(style = %style.name, edge, "estimated icon canvas");
    Ok(edge)
}

/// Footprint of one graphic: base size plus half the mark's stroke width,
/// widened to the bounding square of the rotated graphic.
///
/// Sizes and widths are truncated to whole units as they are read.
fn graphic_size(graphic: &Graphic, default_size: i32) -> f64 {
    let base_size = resolve(graphic.size.as_ref()).map_or(default_size as f64, f64::trunc);

    let stroke_padding = match graphic.first_symbol() {
        Some(GraphicalSymbol::Mark(mark)) => mark
            .stroke
            .as_ref()
            .and_then(|stroke| resolve(stroke.width.as_ref()))
            .map_or(0.0, f64::trunc),
        _ => 0.0,
    };

    let mut padded = base_size + (stroke_padding / 2.0).round();
    if let Some(rotation) = resolve(graphic.rotation.as_ref()) {
        let radians = rotation.to_radians();
        let factor = radians.sin().abs() + radians.cos().abs();
        padded = (padded * factor).trunc();
    }
    padded
}

fn resolve(value: Option<&Expr>) -> Option<f64> {
    let value = value?.evaluate(&*SAMPLE_FEATURE).ok()?;
    value.as_f64().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::expression::{lit, prop};
    use crate::style::{
        ExternalGraphic, FeatureTypeStyle, LineSymbolizer, Mark, PolygonSymbolizer, Rule, Stroke,
    };

    fn single(graphic: Graphic) -> Style {
        Style::new("icon")
            .with_group(FeatureTypeStyle::new().with_rule(Rule::new().with_point(graphic)))
    }

    fn plain_circle(size: f64) -> Graphic {
        Graphic::mark(Mark::well_known("circle")).with_size(lit(size))
    }

    #[test]
    fn explicit_size_without_stroke_or_rotation() {
        assert_eq!(estimate_icon_size(&single(plain_circle(16.0))).unwrap(), 17);
    }

    #[test]
    fn rotation_widens_canvas() {
        // 16 * (sin 45 + cos 45) = 22.6, truncated to 22
        let style = single(plain_circle(16.0).with_rotation(lit(45.0)));
        assert_eq!(estimate_icon_size(&style).unwrap(), 23);

        let quarter = single(plain_circle(16.0).with_rotation(lit(90.0)));
        assert_eq!(estimate_icon_size(&quarter).unwrap(), 17);
    }

    #[test]
    fn stroke_width_pads_half() {
        let graphic = Graphic::mark(
            Mark::well_known("circle").with_stroke(Stroke::solid("#000000", 4.0)),
        )
        .with_size(lit(16.0));
        assert_eq!(estimate_icon_size(&single(graphic)).unwrap(), 19);

        // round(3 / 2) = 2
        let odd = Graphic::mark(
            Mark::well_known("circle").with_stroke(Stroke::solid("#000000", 3.0)),
        )
        .with_size(lit(16.0));
        assert_eq!(estimate_icon_size(&single(odd)).unwrap(), 19);
    }

    #[test]
    fn unresolvable_size_falls_back_to_default() {
        let missing = Graphic::mark(Mark::well_known("circle"));
        assert_eq!(estimate_icon_size(&single(missing)).unwrap(), 17);

        let dynamic = Graphic::mark(Mark::well_known("circle")).with_size(prop("size"));
        assert_eq!(estimate_icon_size(&single(dynamic)).unwrap(), 17);

        let text = Graphic::mark(Mark::well_known("circle")).with_size(lit("24.0"));
        assert_eq!(estimate_icon_size(&single(text)).unwrap(), 25);
    }

    #[test]
    fn oversized_graphic_saturates_instead_of_overflowing() {
        let graphic = Graphic::mark(
            Mark::well_known("circle").with_stroke(Stroke::solid("#000000", 4.0)),
        )
        .with_size(lit(1e12));
        assert_eq!(estimate_icon_size(&single(graphic)).unwrap(), u32::MAX);

        let rotated = plain_circle(f64::MAX).with_rotation(lit(45.0));
        assert_eq!(estimate_icon_size(&single(rotated)).unwrap(), u32::MAX);
    }

    #[test]
    fn fractional_values_truncate() {
        // trunc(16.9) + round(trunc(2.9) / 2) = 16 + 1
        let graphic = Graphic::mark(
            Mark::well_known("circle").with_stroke(Stroke::solid("#000000", 2.9)),
        )
        .with_size(lit(16.9));
        assert_eq!(estimate_icon_size(&single(graphic)).unwrap(), 18);
    }

    #[test]
    fn largest_graphic_wins() {
        let style = Style::new("icon").with_group(
            FeatureTypeStyle::new()
                .with_rule(Rule::new().with_point(plain_circle(8.0)))
                .with_rule(Rule::new().with_point(plain_circle(32.0))),
        );
        assert_eq!(estimate_icon_size(&style).unwrap(), 33);
    }

    #[test]
    fn external_graphics_have_no_stroke_padding() {
        let graphic = Graphic::external(ExternalGraphic::new("file:///tmp/icon.png", "image/png"))
            .with_size(lit(20.0));
        assert_eq!(estimate_icon_size(&single(graphic)).unwrap(), 21);
    }

    #[test]
    fn empty_structures_are_rejected() {
        let empty = Style::new("empty");
        assert_eq!(
            validate_icon_style(&empty),
            Err(ValidationError::EmptyStyle {
                style: "empty".into()
            })
        );

        let no_rules = Style::new("s").with_group(FeatureTypeStyle::new());
        assert_eq!(
            validate_icon_style(&no_rules),
            Err(ValidationError::EmptyGroup { group: 0 })
        );

        let no_symbolizers =
            Style::new("s").with_group(FeatureTypeStyle::new().with_rule(Rule::new()));
        assert_eq!(
            validate_icon_style(&no_symbolizers),
            Err(ValidationError::EmptyRule { group: 0, rule: 0 })
        );
    }

    #[test]
    fn non_point_symbolizers_are_rejected() {
        let line = Style::new("s").with_group(
            FeatureTypeStyle::new().with_rule(
                Rule::new()
                    .with_point(plain_circle(16.0))
                    .with_symbolizer(LineSymbolizer::default()),
            ),
        );
        assert_eq!(
            validate_icon_style(&line),
            Err(ValidationError::UnsupportedSymbolizer {
                group: 0,
                rule: 0,
                symbolizer: 1,
                kind: "line",
            })
        );

        let polygon = Style::new("s").with_group(
            FeatureTypeStyle::new()
                .with_rule(Rule::new().with_symbolizer(PolygonSymbolizer::default())),
        );
        assert!(estimate_icon_size(&polygon).is_err());
    }
}
