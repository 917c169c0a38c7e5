//! Extracted icon properties.
//!
//! An [`IconPropertyMap`] holds, for one (style, feature) pair, a presence
//! marker for every selected symbolizer and the evaluated value of every
//! feature-dependent sub-value. Keys are dot paths:
//!
//! ```text
//! 0.1.0                    symbolizer 0 of rule 1 of group 0 was selected
//! 0.1.0.opacity            graphic opacity
//! 0.1.0.fill.color         mark fill color
//! 0.1.0.stroke.graphic.size  size of the stroke's nested graphic
//! ```
//!
//! The map is sorted, so iteration, query strings and identity hashes are
//! independent of insertion order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;
use url::form_urlencoded;

use crate::error::Result;
use crate::identity::icon_identity;
use crate::inject::inject_properties;
use crate::style::Style;

/// Key suffixes shared by extraction and injection.
pub(crate) mod suffix {
    pub const OPACITY: &str = ".opacity";
    pub const ROTATION: &str = ".rotation";
    pub const SIZE: &str = ".size";
    pub const NAME: &str = ".name";
    pub const FILL: &str = ".fill";
    pub const STROKE: &str = ".stroke";
    pub const COLOR: &str = ".color";
    pub const DASHOFFSET: &str = ".dashoffset";
    pub const LINECAP: &str = ".linecap";
    pub const LINEJOIN: &str = ".linejoin";
    pub const WIDTH: &str = ".width";
    pub const GRAPHIC: &str = ".graphic";
    pub const URL: &str = ".url";
}

/// The bare `group.rule.symbolizer` key marking a selected symbolizer.
pub(crate) fn symbolizer_key(group: usize, rule: usize, symbolizer: usize) -> String {
    format!("{group}.{rule}.{symbolizer}")
}

// ============================================================================
// IconPropertyMap
// ============================================================================

/// Sorted property key to string value map.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IconPropertyMap(BTreeMap<String, String>);

impl IconPropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates entries in sorted key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Renders the map as `key=value` pairs joined by `&`.
    ///
    /// Values are form-urlencoded; keys are dot paths and are written as is.
    pub fn to_query_string(&self) -> String {
        self.iter()
            .map(|(key, value)| {
                let encoded: String = form_urlencoded::byte_serialize(value.as_bytes()).collect();
                format!("{key}={encoded}")
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Parses a query string produced by [`to_query_string`](Self::to_query_string).
    ///
    /// A leading `?` is ignored.
    pub fn from_query_string(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }
}

impl FromIterator<(String, String)> for IconPropertyMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a IconPropertyMap {
    type Item = (&'a String, &'a String);
    type IntoIter = std::collections::btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ============================================================================
// IconDescriptor
// ============================================================================

/// Capabilities of an extracted icon description.
pub trait IconDescriptor {
    /// Icon opacity for the consuming document format, if known.
    fn opacity(&self) -> Option<f64>;

    /// Icon scale for the consuming document format, if known.
    fn scale(&self) -> Option<f64>;

    /// Icon heading in degrees, if known.
    fn heading(&self) -> Option<f64>;

    /// The feature-dependent values captured for this icon.
    fn properties(&self) -> &IconPropertyMap;

    /// URL of the icon-rendering endpoint for this icon.
    fn href(&self, base_url: &str, style_name: &str) -> Result<String>;

    /// Produces the concrete style this icon was extracted for.
    fn inject(&self, style: &Style) -> Style;

    /// Stable cache key for the icon.
    fn icon_name(&self, style: &Style) -> String;
}

/// Path, relative to the service base URL, under which icons are served.
pub const ICON_ENDPOINT: &str = "rest/render/kml/icon/";

/// Immutable icon description produced by extraction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IconProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    heading: Option<f64>,
    properties: IconPropertyMap,
}

impl IconProperties {
    pub fn new(properties: IconPropertyMap) -> Self {
        Self {
            properties,
            ..Self::default()
        }
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = Some(heading);
        self
    }

    pub fn into_properties(self) -> IconPropertyMap {
        self.properties
    }
}

impl IconDescriptor for IconProperties {
    fn opacity(&self) -> Option<f64> {
        self.opacity
    }

    fn scale(&self) -> Option<f64> {
        self.scale
    }

    fn heading(&self) -> Option<f64> {
        self.heading
    }

    fn properties(&self) -> &IconPropertyMap {
        &self.properties
    }

    fn href(&self, base_url: &str, style_name: &str) -> Result<String> {
        let mut url = Url::parse(base_url)?;
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(ICON_ENDPOINT.split('/').filter(|s| !s.is_empty()))
            .push(style_name);
        url.set_fragment(None);
        if self.properties.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&self.properties.to_query_string()));
        }
        Ok(url.to_string())
    }

    fn inject(&self, style: &Style) -> Style {
        inject_properties(style, &self.properties)
    }

    fn icon_name(&self, style: &Style) -> String {
        icon_identity(&style.name, &self.properties)
    }
}
