//! Minimal feature context used for expression evaluation.
//!
//! Attribute storage is owned by the caller; this module only defines the
//! read interface the pipeline needs, a plain in-memory [`SimpleFeature`],
//! and the shared single-point sample used when sizing and painting icons.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::style::expression::Value;

/// A point in map coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned bounding box in map coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Envelope {
    pub const fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Read access to a single feature's attributes and geometry.
pub trait Feature: Send + Sync {
    /// Returns the named attribute, or `None` if the feature lacks it.
    fn attribute(&self, name: &str) -> Option<Value>;

    /// Returns the feature's point geometry, if it has one.
    fn geometry(&self) -> Option<Point>;
}

/// An in-memory feature with named attributes and an optional point.
#[derive(Debug, Clone, Default)]
pub struct SimpleFeature {
    attributes: BTreeMap<String, Value>,
    geometry: Option<Point>,
}

impl SimpleFeature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an attribute, replacing any previous value.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_geometry(mut self, point: Point) -> Self {
        self.geometry = Some(point);
        self
    }
}

impl Feature for SimpleFeature {
    fn attribute(&self, name: &str) -> Option<Value> {
        self.attributes.get(name).cloned()
    }

    fn geometry(&self) -> Option<Point> {
        self.geometry
    }
}

/// Map area the sample feature is drawn into.
pub const SAMPLE_AREA: Envelope = Envelope::new(-1.0, 1.0, -1.0, 1.0);

/// A single attribute-less point at the origin of [`SAMPLE_AREA`].
///
/// Icon sizing evaluates already-injected styles against this feature, and the
/// render driver paints it.
pub static SAMPLE_FEATURE: LazyLock<SimpleFeature> =
    LazyLock::new(|| SimpleFeature::new().with_geometry(Point::new(0.0, 0.0)));
