//! Symbology object model.
//!
//! A [`Style`] is an ordered list of [`FeatureTypeStyle`] groups, each an
//! ordered list of [`Rule`]s, each gating an ordered list of [`Symbolizer`]s.
//! Every scalar style value is an optional [`Expr`], so any of them may be
//! feature-dependent.
//!
//! # Example
//!
//! ```
//! use pointicon_renderer::style::expression::{div, equal_to, lit, prop};
//! use pointicon_renderer::{FeatureTypeStyle, Graphic, Mark, Rule, Style};
//!
//! let circle = Graphic::mark(Mark::well_known("circle"))
//!     .with_size(lit(16.0))
//!     .with_opacity(div(lit(1.0), prop("field")));
//!
//! let style = Style::new("points").with_group(
//!     FeatureTypeStyle::new()
//!         .with_rule(
//!             Rule::new()
//!                 .with_filter(equal_to(prop("field"), lit(1)))
//!                 .with_point(circle.clone()),
//!         )
//!         .with_rule(Rule::else_rule().with_point(circle)),
//! );
//! assert_eq!(style.groups[0].rules.len(), 2);
//! ```

pub mod expression;
pub mod filter;

use std::sync::Arc;

use expression::{Expr, lit};
use filter::Filter;

// ============================================================================
// Style Tree
// ============================================================================

/// A named symbology template.
#[derive(Debug, Clone, Default)]
pub struct Style {
    pub name: String,
    pub groups: Vec<FeatureTypeStyle>,
}

impl Style {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: Vec::new(),
        }
    }

    pub fn with_group(mut self, group: FeatureTypeStyle) -> Self {
        self.groups.push(group);
        self
    }
}

/// An ordered group of rules.
#[derive(Debug, Clone, Default)]
pub struct FeatureTypeStyle {
    pub rules: Vec<Rule>,
}

impl FeatureTypeStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }
}

/// A filter-gated list of symbolizers.
///
/// A rule without a filter and without the else flag matches everything.
#[derive(Debug, Clone, Default)]
pub struct Rule {
    pub filter: Option<Arc<dyn Filter>>,
    pub is_else: bool,
    pub symbolizers: Vec<Symbolizer>,
}

impl Rule {
    /// A catch-all rule.
    pub fn new() -> Self {
        Self::default()
    }

    /// A rule that matches only when no earlier rule has matched.
    pub fn else_rule() -> Self {
        Self {
            is_else: true,
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn with_symbolizer(mut self, symbolizer: impl Into<Symbolizer>) -> Self {
        self.symbolizers.push(symbolizer.into());
        self
    }

    /// Adds a point symbolizer drawing the given graphic.
    pub fn with_point(self, graphic: Graphic) -> Self {
        self.with_symbolizer(PointSymbolizer::new(graphic))
    }
}

// ============================================================================
// Symbolizers
// ============================================================================

/// A single paint instruction.
#[derive(Debug, Clone)]
pub enum Symbolizer {
    Point(PointSymbolizer),
    Line(LineSymbolizer),
    Polygon(PolygonSymbolizer),
}

impl Symbolizer {
    /// Short geometry kind name, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Point(_) => "point",
            Self::Line(_) => "line",
            Self::Polygon(_) => "polygon",
        }
    }

    pub fn as_point(&self) -> Option<&PointSymbolizer> {
        match self {
            Self::Point(point) => Some(point),
            _ => None,
        }
    }
}

impl From<PointSymbolizer> for Symbolizer {
    fn from(point: PointSymbolizer) -> Self {
        Self::Point(point)
    }
}

impl From<LineSymbolizer> for Symbolizer {
    fn from(line: LineSymbolizer) -> Self {
        Self::Line(line)
    }
}

impl From<PolygonSymbolizer> for Symbolizer {
    fn from(polygon: PolygonSymbolizer) -> Self {
        Self::Polygon(polygon)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PointSymbolizer {
    pub graphic: Option<Graphic>,
}

impl PointSymbolizer {
    pub fn new(graphic: Graphic) -> Self {
        Self {
            graphic: Some(graphic),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LineSymbolizer {
    pub stroke: Option<Stroke>,
}

#[derive(Debug, Clone, Default)]
pub struct PolygonSymbolizer {
    pub fill: Option<Fill>,
    pub stroke: Option<Stroke>,
}

// ============================================================================
// Graphic
// ============================================================================

/// A point graphic: one or more candidate symbols plus shared placement values.
///
/// Only the first symbol is ever drawn or inspected.
#[derive(Debug, Clone, Default)]
pub struct Graphic {
    pub symbols: Vec<GraphicalSymbol>,
    pub opacity: Option<Expr>,
    pub size: Option<Expr>,
    pub rotation: Option<Expr>,
}

impl Graphic {
    pub fn mark(mark: Mark) -> Self {
        Self {
            symbols: vec![GraphicalSymbol::Mark(mark)],
            ..Self::default()
        }
    }

    pub fn external(graphic: ExternalGraphic) -> Self {
        Self {
            symbols: vec![GraphicalSymbol::External(graphic)],
            ..Self::default()
        }
    }

    pub fn with_opacity(mut self, opacity: Expr) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn with_size(mut self, size: Expr) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_rotation(mut self, rotation: Expr) -> Self {
        self.rotation = Some(rotation);
        self
    }

    pub fn first_symbol(&self) -> Option<&GraphicalSymbol> {
        self.symbols.first()
    }

    pub fn first_symbol_mut(&mut self) -> Option<&mut GraphicalSymbol> {
        self.symbols.first_mut()
    }
}

/// What a graphic draws.
#[derive(Debug, Clone)]
pub enum GraphicalSymbol {
    Mark(Mark),
    External(ExternalGraphic),
}

/// A well-known vector shape.
#[derive(Debug, Clone, Default)]
pub struct Mark {
    pub well_known_name: Option<Expr>,
    pub fill: Option<Fill>,
    pub stroke: Option<Stroke>,
}

impl Mark {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mark with a constant shape name.
    pub fn well_known(name: &str) -> Self {
        Self {
            well_known_name: Some(lit(name)),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: Expr) -> Self {
        self.well_known_name = Some(name);
        self
    }

    pub fn with_fill(mut self, fill: Fill) -> Self {
        self.fill = Some(fill);
        self
    }

    pub fn with_stroke(mut self, stroke: Stroke) -> Self {
        self.stroke = Some(stroke);
        self
    }
}

/// An icon loaded from a URL.
///
/// The location may contain `${attribute}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalGraphic {
    pub location: String,
    pub format: String,
}

impl ExternalGraphic {
    pub fn new(location: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            format: format.into(),
        }
    }
}

// ============================================================================
// Fill & Stroke
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct Fill {
    pub color: Option<Expr>,
    pub opacity: Option<Expr>,
    pub graphic_fill: Option<Box<Graphic>>,
}

impl Fill {
    /// A fill with a constant color such as `#808080`.
    pub fn color(color: &str) -> Self {
        Self {
            color: Some(lit(color)),
            ..Self::default()
        }
    }

    pub fn with_color(mut self, color: Expr) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_opacity(mut self, opacity: Expr) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn with_graphic_fill(mut self, graphic: Graphic) -> Self {
        self.graphic_fill = Some(Box::new(graphic));
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct Stroke {
    pub color: Option<Expr>,
    pub width: Option<Expr>,
    pub opacity: Option<Expr>,
    pub line_join: Option<Expr>,
    pub line_cap: Option<Expr>,
    pub dash_offset: Option<Expr>,
    pub graphic_fill: Option<Box<Graphic>>,
    pub graphic_stroke: Option<Box<Graphic>>,
}

impl Stroke {
    /// A stroke with a constant color and width.
    pub fn solid(color: &str, width: f64) -> Self {
        Self {
            color: Some(lit(color)),
            width: Some(lit(width)),
            ..Self::default()
        }
    }

    pub fn with_color(mut self, color: Expr) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_width(mut self, width: Expr) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_opacity(mut self, opacity: Expr) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn with_line_join(mut self, join: Expr) -> Self {
        self.line_join = Some(join);
        self
    }

    pub fn with_line_cap(mut self, cap: Expr) -> Self {
        self.line_cap = Some(cap);
        self
    }

    pub fn with_dash_offset(mut self, offset: Expr) -> Self {
        self.dash_offset = Some(offset);
        self
    }

    pub fn with_graphic_fill(mut self, graphic: Graphic) -> Self {
        self.graphic_fill = Some(Box::new(graphic));
        self
    }

    pub fn with_graphic_stroke(mut self, graphic: Graphic) -> Self {
        self.graphic_stroke = Some(Box::new(graphic));
        self
    }
}
