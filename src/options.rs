//! Serializable render configuration.
//!
//! ```
//! use pointicon_renderer::RenderOptions;
//!
//! let options = RenderOptions::from_json(r#"{ "supersampling": 2 }"#).unwrap();
//! assert_eq!(options.supersampling, 2);
//! assert_eq!(options.default_size, 16);
//! assert!(options.antialias);
//! ```

use serde::{Deserialize, Serialize};

/// Canvas side used for graphics that do not resolve a size.
pub const DEFAULT_ICON_SIZE: i32 = 16;

/// Pixels drawn per logical icon unit.
pub const DEFAULT_SUPERSAMPLING: u32 = 4;

/// Settings for the icon render driver.
///
/// # JSON Format
///
/// ```json
/// {
///   "supersampling": 4,
///   "defaultSize": 16,
///   "antialias": true
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderOptions {
    /// Pixels per logical unit. The canvas side is `edge * supersampling + 1`.
    pub supersampling: u32,

    /// Base size of graphics whose size is absent or unresolvable.
    pub default_size: i32,

    /// Whether painting is anti-aliased.
    pub antialias: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            supersampling: DEFAULT_SUPERSAMPLING,
            default_size: DEFAULT_ICON_SIZE,
            antialias: true,
        }
    }
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_supersampling(mut self, factor: u32) -> Self {
        self.supersampling = factor.max(1);
        self
    }

    pub fn with_antialias(mut self, antialias: bool) -> Self {
        self.antialias = antialias;
        self
    }

    /// Serializes the options to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serializes the options to a pretty-printed JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserializes options from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
