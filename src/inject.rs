//! Re-applying captured properties to a style.

use std::sync::Arc;

use tracing::trace;
use url::Url;

use crate::minirule::{MiniRule, make_style, minify};
use crate::properties::{IconPropertyMap, suffix, symbolizer_key};
use crate::style::expression::{Expr, Expression, Literal, UrlTemplate};
use crate::style::{ExternalGraphic, Fill, Graphic, GraphicalSymbol, Mark, Stroke, Style};

/// Builds the concrete style described by `properties`.
///
/// Only symbolizers whose presence key is in the map survive, and every rule
/// of the result is unconditional. Dynamic sub-values with a captured value
/// become literals; everything else is copied as is. Running the injection
/// again with the same map changes nothing, because the values it targets are
/// static afterwards.
///
/// Rules are kept one for one with the template, so `group.rule.symbolizer`
/// keys stay valid against the result. A rule the feature did not select is
/// kept with no symbolizers, and [`render_icon`](crate::render_icon) rejects
/// empty rules: a template with a filter or else rule that did not match
/// cannot be rendered as returned. Callers drop the empty rules (and empty
/// groups) before rendering.
///
/// The input style is not modified.
pub fn inject_properties(style: &Style, properties: &IconPropertyMap) -> Style {
    let injector = PropertyInjector { properties };
    make_style(style.name.clone(), injector.inject(minify(style)))
}

struct PropertyInjector<'a> {
    properties: &'a IconPropertyMap,
}

impl PropertyInjector<'_> {
    fn inject(&self, groups: Vec<Vec<MiniRule>>) -> Vec<Vec<MiniRule>> {
        groups
            .into_iter()
            .enumerate()
            .map(|(i, rules)| {
                rules
                    .into_iter()
                    .enumerate()
                    .map(|(j, rule)| {
                        let symbolizers = rule
                            .symbolizers
                            .into_iter()
                            .enumerate()
                            .filter_map(|(k, mut symbolizer)| {
                                let key = symbolizer_key(i, j, k);
                                if !self.properties.contains_key(&key) {
                                    return None;
                                }
                                if let Some(graphic) = &mut symbolizer.graphic {
                                    self.graphic(&key, graphic);
                                }
                                Some(symbolizer)
                            })
                            .collect();
                        MiniRule::unconditional(symbolizers)
                    })
                    .collect()
            })
            .collect()
    }

    /// Replaces `slot` with the captured literal if it is dynamic and captured.
    fn update(&self, key: String, slot: &mut Option<Expr>) {
        let Some(expr) = slot else {
            return;
        };
        if expr.is_static() {
            return;
        }
        if let Some(value) = self.properties.get(&key) {
            *slot = Some(Arc::new(Literal::text(value)));
        }
    }

    fn graphic(&self, prefix: &str, graphic: &mut Graphic) {
        self.update(format!("{prefix}{}", suffix::OPACITY), &mut graphic.opacity);
        self.update(format!("{prefix}{}", suffix::ROTATION), &mut graphic.rotation);
        self.update(format!("{prefix}{}", suffix::SIZE), &mut graphic.size);

        match graphic.first_symbol_mut() {
            Some(GraphicalSymbol::Mark(mark)) => self.mark(prefix, mark),
            Some(GraphicalSymbol::External(external)) => self.external(prefix, external),
            None => {}
        }
    }

    fn mark(&self, prefix: &str, mark: &mut Mark) {
        self.update(format!("{prefix}{}", suffix::NAME), &mut mark.well_known_name);
        if let Some(fill) = &mut mark.fill {
            self.fill(&format!("{prefix}{}", suffix::FILL), fill);
        }
        if let Some(stroke) = &mut mark.stroke {
            self.stroke(&format!("{prefix}{}", suffix::STROKE), stroke);
        }
    }

    fn fill(&self, prefix: &str, fill: &mut Fill) {
        self.update(format!("{prefix}{}", suffix::COLOR), &mut fill.color);
        self.update(format!("{prefix}{}", suffix::OPACITY), &mut fill.opacity);
        if let Some(graphic) = &mut fill.graphic_fill {
            self.graphic(&format!("{prefix}{}", suffix::GRAPHIC), graphic);
        }
    }

    fn stroke(&self, prefix: &str, stroke: &mut Stroke) {
        self.update(format!("{prefix}{}", suffix::COLOR), &mut stroke.color);
        self.update(format!("{prefix}{}", suffix::DASHOFFSET), &mut stroke.dash_offset);
        self.update(format!("{prefix}{}", suffix::LINECAP), &mut stroke.line_cap);
        self.update(format!("{prefix}{}", suffix::LINEJOIN), &mut stroke.line_join);
        self.update(format!("{prefix}{}", suffix::OPACITY), &mut stroke.opacity);
        self.update(format!("{prefix}{}", suffix::WIDTH), &mut stroke.width);
        let nested = format!("{prefix}{}", suffix::GRAPHIC);
        if let Some(graphic) = &mut stroke.graphic_stroke {
            self.graphic(&nested, graphic);
        }
        if let Some(graphic) = &mut stroke.graphic_fill {
            self.graphic(&nested, graphic);
        }
    }

    fn external(&self, prefix: &str, external: &mut ExternalGraphic) {
        let Some(url) = self.properties.get(&format!("{prefix}{}", suffix::URL)) else {
            return;
        };
        // A location that already has no placeholders is left alone.
        if UrlTemplate::parse(&external.location).is_ok_and(|t| t.is_static()) {
            return;
        }
        match Url::parse(url) {
            Ok(parsed) => external.location = parsed.to_string(),
            Err(e) => trace!(url, error = %e, "ignoring invalid captured url"),
        }
    }
}
