//! Error types shared across the icon pipeline.

use thiserror::Error;

/// Structural problems that make a style unusable for icon rendering.
///
/// These are raised before any pixel is touched and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("style '{style}' has no feature type styles")]
    EmptyStyle { style: String },

    #[error("feature type style {group} has no rules")]
    EmptyGroup { group: usize },

    #[error("rule {group}.{rule} has no symbolizers")]
    EmptyRule { group: usize, rule: usize },

    #[error("symbolizer {group}.{rule}.{symbolizer} is a {kind} symbolizer, expected point")]
    UnsupportedSymbolizer {
        group: usize,
        rule: usize,
        symbolizer: usize,
        kind: &'static str,
    },
}

/// Failure while evaluating an expression or filter against a feature.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("value '{value}' cannot be used as a number")]
    NotNumeric { value: String },
}

/// A location template that cannot be turned into a URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlTemplateError {
    #[error("unterminated placeholder in '{0}'")]
    Unterminated(String),

    #[error("empty placeholder in '{0}'")]
    EmptyPlaceholder(String),

    #[error("'{location}' is not a valid url: {reason}")]
    Malformed { location: String, reason: String },
}

/// Top-level error for icon extraction and rendering.
#[derive(Debug, Error)]
pub enum IconError {
    #[error("invalid icon style: {0}")]
    Validation(#[from] ValidationError),

    #[error("expression evaluation failed: {0}")]
    Evaluation(#[from] EvalError),

    #[error("could not allocate a {0}x{0} canvas")]
    Canvas(u32),

    #[error("failed to load external graphic '{location}': {reason}")]
    ExternalGraphic { location: String, reason: String },

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

pub type Result<T, E = IconError> = std::result::Result<T, E>;
