//! pointicon-renderer: feature-specific point icons from symbology templates
//!
//! A style template may compute its point graphics from feature attributes.
//! This crate captures, for one feature, every value of the template that
//! depends on the feature, derives a stable identifier from those values, and
//! can later rebuild the concrete style and render it to a small RGBA icon.
//!
//! # Example
//!
//! ```
//! use pointicon_renderer::style::expression::{lit, mul, prop};
//! use pointicon_renderer::{
//!     FeatureTypeStyle, Fill, Graphic, IconDescriptor, Mark, Rule, SimpleFeature, Style,
//!     extract_properties, render_icon,
//! };
//!
//! let template = Style::new("poi").with_group(
//!     FeatureTypeStyle::new().with_rule(
//!         Rule::new().with_point(
//!             Graphic::mark(Mark::well_known("circle").with_fill(Fill::color("#ff8800")))
//!                 .with_size(mul(prop("rank"), lit(8.0))),
//!         ),
//!     ),
//! );
//!
//! // Capture what the feature changes about the template.
//! let feature = SimpleFeature::new().with_attribute("rank", 2);
//! let props = extract_properties(&template, &feature).unwrap();
//! assert_eq!(props.properties().get("0.0.0.size"), Some("16.0"));
//!
//! // The identifier only depends on the style name and the captured values.
//! let name = props.icon_name(&template);
//! assert_eq!(name.len(), 32);
//!
//! // Rebuild the concrete style and draw it.
//! let icon = render_icon(&props.inject(&template)).unwrap();
//! assert_eq!(icon.dimensions().width, 69);
//! ```
//!
//! # Serving icons
//!
//! [`IconDescriptor::href`] produces the URL a client uses to fetch the icon;
//! the query string round-trips through [`IconPropertyMap::from_query_string`]:
//!
//! ```
//! use pointicon_renderer::IconPropertyMap;
//!
//! let props = IconPropertyMap::from_query_string("0.0.0=&0.0.0.opacity=0.5");
//! assert_eq!(props.get("0.0.0.opacity"), Some("0.5"));
//! ```

mod error;
mod extract;
mod feature;
mod icon;
mod identity;
mod inject;
mod minirule;
mod options;
mod properties;
mod render;
pub mod style;

pub use error::{EvalError, IconError, Result, UrlTemplateError, ValidationError};
pub use extract::extract_properties;
pub use feature::{Envelope, Feature, Point, SAMPLE_AREA, SAMPLE_FEATURE, SimpleFeature};
pub use icon::{IconImage, RectPx, SizePx};
pub use identity::icon_identity;
pub use inject::inject_properties;
pub use minirule::{MiniRule, make_style, minify};
pub use options::{DEFAULT_ICON_SIZE, DEFAULT_SUPERSAMPLING, RenderOptions};
pub use properties::{ICON_ENDPOINT, IconDescriptor, IconProperties, IconPropertyMap};
pub use render::{
    DEFAULT_MARK, IconRenderer, PaintCanvas, Painter, SkiaPainter, estimate_icon_size,
    render_icon, validate_icon_style,
};
pub use style::{
    ExternalGraphic, FeatureTypeStyle, Fill, Graphic, GraphicalSymbol, LineSymbolizer, Mark,
    PointSymbolizer, PolygonSymbolizer, Rule, Stroke, Style, Symbolizer,
};
