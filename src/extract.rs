//! Feature-bound property extraction.

use tracing::trace;

use crate::error::Result;
use crate::feature::Feature;
use crate::minirule::{MiniRule, minify};
use crate::properties::{IconProperties, IconPropertyMap, suffix, symbolizer_key};
use crate::style::expression::{Expr, Expression, UrlTemplate};
use crate::style::{ExternalGraphic, Fill, Graphic, GraphicalSymbol, Mark, Stroke, Style};

/// Captures everything about `style` that depends on `feature`.
///
/// The result holds a presence key for every point symbolizer of every rule
/// the feature selects, plus the evaluated value of each dynamic sub-value of
/// those symbolizers. Rules that do not match are never evaluated beyond their
/// filter.
///
/// Expression and filter failures are returned as errors. An external graphic
/// whose location is not a usable URL template is skipped.
pub fn extract_properties(style: &Style, feature: &dyn Feature) -> Result<IconProperties> {
    let rules = minify(style);
    let properties = FeatureProperties::new(feature).collect(&rules)?;
    Ok(IconProperties::new(properties))
}

struct FeatureProperties<'a> {
    feature: &'a dyn Feature,
    props: IconPropertyMap,
}

impl<'a> FeatureProperties<'a> {
    fn new(feature: &'a dyn Feature) -> Self {
        Self {
            feature,
            props: IconPropertyMap::new(),
        }
    }

    fn collect(mut self, groups: &[Vec<MiniRule>]) -> Result<IconPropertyMap> {
        let mut matched_any = false;

        for (i, rules) in groups.iter().enumerate() {
            for (j, rule) in rules.iter().enumerate() {
                if !self.matches(rule, matched_any)? {
                    continue;
                }
                matched_any = true;

                for (k, symbolizer) in rule.symbolizers.iter().enumerate() {
                    let key = symbolizer_key(i, j, k);
                    self.props.insert(key.clone(), "");
                    if let Some(graphic) = &symbolizer.graphic {
                        self.graphic(&key, graphic)?;
                    }
                }
            }
        }

        Ok(self.props)
    }

    fn matches(&self, rule: &MiniRule, matched_any: bool) -> Result<bool> {
        match &rule.filter {
            Some(filter) => Ok(filter.evaluate(self.feature)?),
            None => Ok(!rule.is_else || !matched_any),
        }
    }

    /// Records `value` under `key` if it is present and feature-dependent.
    fn dynamic(&mut self, key: String, value: Option<&Expr>) -> Result<()> {
        if let Some(expr) = value.filter(|e| !e.is_static()) {
            let evaluated = expr.evaluate(self.feature)?;
            self.props.insert(key, evaluated.to_string());
        }
        Ok(())
    }

    fn graphic(&mut self, prefix: &str, graphic: &Graphic) -> Result<()> {
        self.dynamic(format!("{prefix}{}", suffix::OPACITY), graphic.opacity.as_ref())?;
        self.dynamic(format!("{prefix}{}", suffix::ROTATION), graphic.rotation.as_ref())?;
        self.dynamic(format!("{prefix}{}", suffix::SIZE), graphic.size.as_ref())?;

        match graphic.first_symbol() {
            Some(GraphicalSymbol::Mark(mark)) => self.mark(prefix, mark),
            Some(GraphicalSymbol::External(external)) => self.external(prefix, external),
            None => Ok(()),
        }
    }

    fn mark(&mut self, prefix: &str, mark: &Mark) -> Result<()> {
        self.dynamic(format!("{prefix}{}", suffix::NAME), mark.well_known_name.as_ref())?;
        if let Some(fill) = &mark.fill {
            self.fill(&format!("{prefix}{}", suffix::FILL), fill)?;
        }
        if let Some(stroke) = &mark.stroke {
            self.stroke(&format!("{prefix}{}", suffix::STROKE), stroke)?;
        }
        Ok(())
    }

    fn fill(&mut self, prefix: &str, fill: &Fill) -> Result<()> {
        self.dynamic(format!("{prefix}{}", suffix::COLOR), fill.color.as_ref())?;
        self.dynamic(format!("{prefix}{}", suffix::OPACITY), fill.opacity.as_ref())?;
        if let Some(graphic) = &fill.graphic_fill {
            self.graphic(&format!("{prefix}{}", suffix::GRAPHIC), graphic)?;
        }
        Ok(())
    }

    fn stroke(&mut self, prefix: &str, stroke: &Stroke) -> Result<()> {
        self.dynamic(format!("{prefix}{}", suffix::COLOR), stroke.color.as_ref())?;
        self.dynamic(format!("{prefix}{}", suffix::DASHOFFSET), stroke.dash_offset.as_ref())?;
        self.dynamic(format!("{prefix}{}", suffix::LINECAP), stroke.line_cap.as_ref())?;
        self.dynamic(format!("{prefix}{}", suffix::LINEJOIN), stroke.line_join.as_ref())?;
        self.dynamic(format!("{prefix}{}", suffix::OPACITY), stroke.opacity.as_ref())?;
        self.dynamic(format!("{prefix}{}", suffix::WIDTH), stroke.width.as_ref())?;
        // Both nested graphics share the `.graphic` prefix; a graphic fill
        // overwrites keys a graphic stroke wrote.
        let nested = format!("{prefix}{}", suffix::GRAPHIC);
        if let Some(graphic) = &stroke.graphic_stroke {
            self.graphic(&nested, graphic)?;
        }
        if let Some(graphic) = &stroke.graphic_fill {
            self.graphic(&nested, graphic)?;
        }
        Ok(())
    }

    fn external(&mut self, prefix: &str, external: &ExternalGraphic) -> Result<()> {
        let template = match UrlTemplate::parse(&external.location) {
            Ok(template) => template,
            Err(e) => {
                trace!(
                    location = %external.location,
                    error = %e,
                    "skipping unresolvable external graphic"
                );
                return Ok(());
            }
        };
        if !template.is_static() {
            let url = template.evaluate(self.feature)?;
            self.props.insert(format!("{prefix}{}", suffix::URL), url.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::SimpleFeature;
    use crate::properties::IconDescriptor;
    use crate::style::expression::{div, equal_to, if_then_else, lit, mul, prop};
    use crate::style::{FeatureTypeStyle, LineSymbolizer, PointSymbolizer, Rule};
    use std::sync::Arc;

    fn field(value: &str) -> SimpleFeature {
        SimpleFeature::new().with_attribute("field", value)
    }

    fn gray_circle() -> Graphic {
        Graphic::mark(
            Mark::well_known("circle")
                .with_fill(Fill::color("#808080").with_opacity(lit(1.0)))
                .with_stroke(Stroke::solid("#000000", 1.0)),
        )
        .with_size(lit(16.0))
    }

    fn style_from_rules(rules: Vec<Rule>) -> Style {
        let group = rules
            .into_iter()
            .fold(FeatureTypeStyle::new(), FeatureTypeStyle::with_rule);
        Style::new("test").with_group(group)
    }

    fn encode(style: &Style, feature: &SimpleFeature) -> String {
        extract_properties(style, feature)
            .unwrap()
            .properties()
            .to_query_string()
    }

    #[test]
    fn simple_style_encodes_no_properties() {
        let style = style_from_rules(vec![Rule::new().with_point(gray_circle())]);
        assert_eq!(encode(&style, &field("1")), "0.0.0=");
        assert_eq!(encode(&style, &field("2")), "0.0.0=");
    }

    #[test]
    fn filters_select_matching_rule_only() {
        let style = style_from_rules(vec![
            Rule::new()
                .with_filter(equal_to(prop("field"), lit(1)))
                .with_point(gray_circle()),
            Rule::new()
                .with_filter(equal_to(prop("field"), lit(2)))
                .with_point(gray_circle()),
        ]);
        assert_eq!(encode(&style, &field("1")), "0.0.0=");
        assert_eq!(encode(&style, &field("2")), "0.1.0=");
    }

    #[test]
    fn multiple_symbolizers() {
        let style = style_from_rules(vec![
            Rule::new().with_point(gray_circle()).with_point(gray_circle()),
        ]);
        assert_eq!(encode(&style, &field("1")), "0.0.0=&0.0.1=");
    }

    #[test]
    fn multiple_feature_type_styles() {
        let style = Style::new("test")
            .with_group(FeatureTypeStyle::new().with_rule(Rule::new().with_point(gray_circle())))
            .with_group(FeatureTypeStyle::new().with_rule(Rule::new().with_point(gray_circle())));
        assert_eq!(encode(&style, &field("1")), "0.0.0=&1.0.0=");
    }

    #[test]
    fn else_rule_matches_only_when_nothing_before_did() {
        let style = style_from_rules(vec![
            Rule::new()
                .with_filter(equal_to(prop("field"), lit(1)))
                .with_point(gray_circle()),
            Rule::else_rule().with_point(gray_circle()),
        ]);
        assert_eq!(encode(&style, &field("1")), "0.0.0=");
        assert_eq!(encode(&style, &field("2")), "0.1.0=");
    }

    #[test]
    fn else_rule_sees_matches_from_earlier_groups() {
        let style = Style::new("test")
            .with_group(FeatureTypeStyle::new().with_rule(Rule::new().with_point(gray_circle())))
            .with_group(
                FeatureTypeStyle::new().with_rule(Rule::else_rule().with_point(gray_circle())),
            );
        assert_eq!(encode(&style, &field("1")), "0.0.0=");
    }

    #[test]
    fn matched_rule_without_points_still_suppresses_else() {
        let style = style_from_rules(vec![
            Rule::new().with_symbolizer(LineSymbolizer::default()),
            Rule::else_rule().with_point(gray_circle()),
        ]);
        assert_eq!(encode(&style, &field("1")), "");
    }

    #[test]
    fn dynamic_mark_name() {
        let name = if_then_else(
            Arc::new(equal_to(prop("field"), lit(1))),
            lit("circle"),
            lit("square"),
        );
        let graphic = Graphic::mark(Mark::new().with_name(name).with_fill(Fill::color("#808080")));
        let style = style_from_rules(vec![Rule::new().with_point(graphic)]);
        assert_eq!(encode(&style, &field("1")), "0.0.0=&0.0.0.name=circle");
        assert_eq!(encode(&style, &field("2")), "0.0.0=&0.0.0.name=square");
    }

    #[test]
    fn dynamic_opacity() {
        let style = style_from_rules(vec![
            Rule::new().with_point(gray_circle().with_opacity(div(lit(1.0), prop("field")))),
        ]);
        assert_eq!(encode(&style, &field("1")), "0.0.0=&0.0.0.opacity=1.0");
        assert_eq!(encode(&style, &field("2")), "0.0.0=&0.0.0.opacity=0.5");
    }

    #[test]
    fn dynamic_rotation() {
        let style = style_from_rules(vec![
            Rule::new().with_point(gray_circle().with_rotation(mul(lit(45.0), prop("field")))),
        ]);
        assert_eq!(encode(&style, &field("1")), "0.0.0=&0.0.0.rotation=45.0");
        assert_eq!(encode(&style, &field("2")), "0.0.0=&0.0.0.rotation=90.0");
    }

    #[test]
    fn dynamic_size() {
        let style = style_from_rules(vec![
            Rule::new().with_point(gray_circle().with_size(mul(prop("field"), lit(16.0)))),
        ]);
        assert_eq!(encode(&style, &field("1")), "0.0.0=&0.0.0.size=16.0");
        assert_eq!(encode(&style, &field("2")), "0.0.0=&0.0.0.size=32.0");
    }

    #[test]
    fn dynamic_url() {
        let graphic = Graphic::external(ExternalGraphic::new(
            "http://example.com/foo${field}.png",
            "image/png",
        ));
        let style = style_from_rules(vec![Rule::new().with_point(graphic)]);
        let url = "http%3A%2F%2Fexample.com%2F";
        assert_eq!(
            encode(&style, &field("1")),
            format!("0.0.0=&0.0.0.url={url}foo1.png")
        );
        assert_eq!(
            encode(&style, &field("2")),
            format!("0.0.0=&0.0.0.url={url}foo2.png")
        );
    }

    #[test]
    fn malformed_url_is_skipped() {
        let graphic = Graphic::external(ExternalGraphic::new("foo${field", "image/png"));
        let style = style_from_rules(vec![Rule::new().with_point(graphic)]);
        assert_eq!(encode(&style, &field("1")), "0.0.0=");
    }

    #[test]
    fn nested_fill_and_stroke_values() {
        let mark = Mark::well_known("square")
            .with_fill(
                Fill::color("#808080")
                    .with_color(prop("color"))
                    .with_graphic_fill(
                        Graphic::mark(Mark::well_known("x")).with_size(prop("size")),
                    ),
            )
            .with_stroke(
                Stroke::solid("#000000", 1.0)
                    .with_width(prop("size"))
                    .with_line_cap(prop("cap"))
                    .with_line_join(prop("join"))
                    .with_dash_offset(prop("size"))
                    .with_opacity(lit(0.5)),
            );
        let style = style_from_rules(vec![Rule::new().with_point(Graphic::mark(mark))]);
        let feature = SimpleFeature::new()
            .with_attribute("color", "#ff0000")
            .with_attribute("size", 3.0)
            .with_attribute("cap", "round")
            .with_attribute("join", "bevel");

        let props = extract_properties(&style, &feature).unwrap().into_properties();
        let keys: Vec<_> = props.iter().map(|(k, v)| format!("{k}={v}")).collect();
        assert_eq!(
            keys,
            vec![
                "0.0.0=",
                "0.0.0.fill.color=#ff0000",
                "0.0.0.fill.graphic.size=3.0",
                "0.0.0.stroke.dashoffset=3.0",
                "0.0.0.stroke.linecap=round",
                "0.0.0.stroke.linejoin=bevel",
                "0.0.0.stroke.width=3.0",
            ]
        );
    }

    #[test]
    fn non_matching_rules_are_never_evaluated() {
        // Evaluating this opacity would fail on a non-numeric attribute.
        let failing = gray_circle().with_opacity(div(lit(1.0), prop("name")));
        let style = style_from_rules(vec![
            Rule::new()
                .with_filter(equal_to(prop("field"), lit(1)))
                .with_point(failing),
            Rule::else_rule().with_point(gray_circle()),
        ]);
        let feature = field("2").with_attribute("name", "abc");
        assert_eq!(encode(&style, &feature), "0.1.0=");
    }

    #[test]
    fn evaluation_failures_propagate() {
        let style = style_from_rules(vec![
            Rule::new().with_point(gray_circle().with_opacity(div(lit(1.0), prop("field")))),
        ]);
        assert!(extract_properties(&style, &field("abc")).is_err());
    }

    #[test]
    fn symbolizer_without_graphic_is_still_selected() {
        let style = style_from_rules(vec![
            Rule::new().with_symbolizer(PointSymbolizer::default()),
        ]);
        assert_eq!(encode(&style, &field("1")), "0.0.0=");
    }
}
