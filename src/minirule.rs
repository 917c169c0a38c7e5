//! Flattened, index-stable view of a style.
//!
//! Extraction and injection run independently (often in different requests)
//! and agree on property keys only because both address symbolizers through
//! [`minify`]. Every rule of the template yields exactly one [`MiniRule`], even
//! when none of its symbolizers are point symbolizers, so `group.rule` indices
//! always match the template. Within a rule, indices count point symbolizers
//! only.

use std::sync::Arc;

use crate::style::filter::Filter;
use crate::style::{FeatureTypeStyle, PointSymbolizer, Rule, Style, Symbolizer};

/// A rule reduced to what icon extraction needs.
#[derive(Debug, Clone, Default)]
pub struct MiniRule {
    pub filter: Option<Arc<dyn Filter>>,
    pub is_else: bool,
    pub symbolizers: Vec<PointSymbolizer>,
}

impl MiniRule {
    pub fn new(
        filter: Option<Arc<dyn Filter>>,
        is_else: bool,
        symbolizers: Vec<PointSymbolizer>,
    ) -> Self {
        Self {
            filter,
            is_else,
            symbolizers,
        }
    }

    /// An unconditional rule, as produced by injection.
    pub fn unconditional(symbolizers: Vec<PointSymbolizer>) -> Self {
        Self::new(None, false, symbolizers)
    }

    fn from_rule(rule: &Rule) -> Self {
        let symbolizers = rule
            .symbolizers
            .iter()
            .filter_map(Symbolizer::as_point)
            .cloned()
            .collect();
        Self::new(rule.filter.clone(), rule.is_else, symbolizers)
    }
}

/// Flattens a style into one list of mini rules per feature type style.
///
/// Line and polygon symbolizers are dropped here without complaint; the icon
/// renderer is where non-point styles are rejected.
pub fn minify(style: &Style) -> Vec<Vec<MiniRule>> {
    style
        .groups
        .iter()
        .map(|group| group.rules.iter().map(MiniRule::from_rule).collect())
        .collect()
}

/// Rebuilds a style from flattened rules.
pub fn make_style(name: impl Into<String>, groups: Vec<Vec<MiniRule>>) -> Style {
    let groups = groups
        .into_iter()
        .map(|rules| FeatureTypeStyle {
            rules: rules
                .into_iter()
                .map(|mini| Rule {
                    filter: mini.filter,
                    is_else: mini.is_else,
                    symbolizers: mini.symbolizers.into_iter().map(Symbolizer::Point).collect(),
                })
                .collect(),
        })
        .collect();

    Style {
        name: name.into(),
        groups,
    }
}
