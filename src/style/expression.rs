//! Expression capability and a small reference set of expressions.
//!
//! The pipeline never interprets expressions itself. It only asks two
//! questions of every style value: "is this constant for all features?"
//! ([`Expression::is_static`]) and "what does it evaluate to for this
//! feature?" ([`Expression::evaluate`]). Any evaluator can plug in by
//! implementing [`Expression`]; the types here cover literals, attribute
//! lookups, arithmetic, comparisons, conditionals and `${attr}` URL templates.

use std::fmt;
use std::sync::Arc;

use url::Url;

use super::filter::Filter;
use crate::error::{EvalError, UrlTemplateError};
use crate::feature::Feature;

// ============================================================================
// Value
// ============================================================================

/// The result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    /// Numeric view of the value. Text is parsed; booleans and null are not numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Null | Self::Bool(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Truthiness used by conditionals.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0,
            Self::Text(s) => s.eq_ignore_ascii_case("true"),
        }
    }
}

/// Whole numbers keep one decimal place (`45.0`), everything else uses the
/// shortest representation (`0.5`).
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{n:.1}")
            }
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

// ============================================================================
// Expression Trait
// ============================================================================

/// A style value that may depend on the feature being drawn.
pub trait Expression: fmt::Debug + Send + Sync {
    /// Evaluates the expression against a feature.
    fn evaluate(&self, feature: &dyn Feature) -> Result<Value, EvalError>;

    /// Returns true if the expression yields the same value for every feature.
    fn is_static(&self) -> bool;
}

/// Shared handle to an expression. Style trees clone these freely.
pub type Expr = Arc<dyn Expression>;

// ============================================================================
// Literal
// ============================================================================

/// A constant value.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal(pub Value);

impl Literal {
    /// Builds a literal from a captured string, as the injector does.
    pub fn text(value: impl Into<String>) -> Self {
        Self(Value::Text(value.into()))
    }

    pub fn number(value: f64) -> Self {
        Self(Value::Number(value))
    }
}

impl Expression for Literal {
    fn evaluate(&self, _feature: &dyn Feature) -> Result<Value, EvalError> {
        Ok(self.0.clone())
    }

    fn is_static(&self) -> bool {
        true
    }
}

// ============================================================================
// Property
// ============================================================================

/// Looks up a feature attribute by name. Missing attributes evaluate to null.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property(pub String);

impl Expression for Property {
    fn evaluate(&self, feature: &dyn Feature) -> Result<Value, EvalError> {
        Ok(feature.attribute(&self.0).unwrap_or(Value::Null))
    }

    fn is_static(&self) -> bool {
        false
    }
}

// ============================================================================
// Arithmetic
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

/// Binary arithmetic over numeric operands. A null operand yields null.
#[derive(Debug, Clone)]
pub struct Arithmetic {
    pub op: ArithmeticOp,
    pub lhs: Expr,
    pub rhs: Expr,
}

impl Expression for Arithmetic {
    fn evaluate(&self, feature: &dyn Feature) -> Result<Value, EvalError> {
        let lhs = self.lhs.evaluate(feature)?;
        let rhs = self.rhs.evaluate(feature)?;
        if lhs.is_null() || rhs.is_null() {
            return Ok(Value::Null);
        }
        let a = numeric(&lhs)?;
        let b = numeric(&rhs)?;
        let result = match self.op {
            ArithmeticOp::Add => a + b,
            ArithmeticOp::Subtract => a - b,
            ArithmeticOp::Multiply => a * b,
            ArithmeticOp::Divide => a / b,
        };
        Ok(Value::Number(result))
    }

    fn is_static(&self) -> bool {
        self.lhs.is_static() && self.rhs.is_static()
    }
}

fn numeric(value: &Value) -> Result<f64, EvalError> {
    value.as_f64().ok_or_else(|| EvalError::NotNumeric {
        value: value.to_string(),
    })
}

// ============================================================================
// Compare
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

/// Comparison of two expressions.
///
/// Operands that both read as numbers compare numerically (so the text `"1"`
/// equals the number `1`); anything else compares as strings. Null only
/// equals null.
#[derive(Debug, Clone)]
pub struct Compare {
    pub op: CompareOp,
    pub lhs: Expr,
    pub rhs: Expr,
}

impl Compare {
    fn test(&self, feature: &dyn Feature) -> Result<bool, EvalError> {
        use std::cmp::Ordering;

        let lhs = self.lhs.evaluate(feature)?;
        let rhs = self.rhs.evaluate(feature)?;

        if lhs.is_null() || rhs.is_null() {
            let both = lhs.is_null() && rhs.is_null();
            return Ok(match self.op {
                CompareOp::Equal => both,
                CompareOp::NotEqual => !both,
                _ => false,
            });
        }

        let ordering = match (lhs.as_f64(), rhs.as_f64()) {
            (Some(a), Some(b)) => match a.partial_cmp(&b) {
                Some(ordering) => ordering,
                None => return Ok(self.op == CompareOp::NotEqual),
            },
            _ => lhs.to_string().cmp(&rhs.to_string()),
        };

        Ok(match self.op {
            CompareOp::Equal => ordering == Ordering::Equal,
            CompareOp::NotEqual => ordering != Ordering::Equal,
            CompareOp::Less => ordering == Ordering::Less,
            CompareOp::LessOrEqual => ordering != Ordering::Greater,
            CompareOp::Greater => ordering == Ordering::Greater,
            CompareOp::GreaterOrEqual => ordering != Ordering::Less,
        })
    }
}

impl Expression for Compare {
    fn evaluate(&self, feature: &dyn Feature) -> Result<Value, EvalError> {
        self.test(feature).map(Value::Bool)
    }

    fn is_static(&self) -> bool {
        self.lhs.is_static() && self.rhs.is_static()
    }
}

impl Filter for Compare {
    fn evaluate(&self, feature: &dyn Feature) -> Result<bool, EvalError> {
        self.test(feature)
    }
}

// ============================================================================
// IfThenElse
// ============================================================================

/// Picks `then` when the condition is truthy, `otherwise` when it is not.
#[derive(Debug, Clone)]
pub struct IfThenElse {
    pub condition: Expr,
    pub then: Expr,
    pub otherwise: Expr,
}

impl Expression for IfThenElse {
    fn evaluate(&self, feature: &dyn Feature) -> Result<Value, EvalError> {
        if self.condition.evaluate(feature)?.is_truthy() {
            self.then.evaluate(feature)
        } else {
            self.otherwise.evaluate(feature)
        }
    }

    fn is_static(&self) -> bool {
        self.condition.is_static() && self.then.is_static() && self.otherwise.is_static()
    }
}

// ============================================================================
// UrlTemplate
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Attribute(String),
}

/// An external graphic location with `${attribute}` placeholders.
///
/// `http://example.com/foo${field}.png` evaluates to `http://example.com/foo2.png`
/// for a feature whose `field` is `2`. A template without placeholders is static.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    segments: Vec<Segment>,
}

impl UrlTemplate {
    /// Parses a location, rejecting unbalanced placeholders and anything that
    /// cannot form an absolute URL.
    pub fn parse(location: &str) -> Result<Self, UrlTemplateError> {
        let mut segments = Vec::new();
        let mut rest = location;

        while let Some(start) = rest.find("${") {
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }
            let after = &rest[start + 2..];
            let end = after
                .find('}')
                .ok_or_else(|| UrlTemplateError::Unterminated(location.to_string()))?;
            let name = after[..end].trim();
            if name.is_empty() {
                return Err(UrlTemplateError::EmptyPlaceholder(location.to_string()));
            }
            segments.push(Segment::Attribute(name.to_string()));
            rest = &after[end + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        let template = Self { segments };
        let sample = template.expand(|_| "x".to_string());
        Url::parse(&sample).map_err(|e| UrlTemplateError::Malformed {
            location: location.to_string(),
            reason: e.to_string(),
        })?;
        Ok(template)
    }

    fn expand(&self, mut attribute: impl FnMut(&str) -> String) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Text(text) => text.clone(),
                Segment::Attribute(name) => attribute(name),
            })
            .collect()
    }
}

impl Expression for UrlTemplate {
    fn evaluate(&self, feature: &dyn Feature) -> Result<Value, EvalError> {
        let expanded = self.expand(|name| {
            feature
                .attribute(name)
                .map(|value| value.to_string())
                .unwrap_or_default()
        });
        Ok(Value::Text(expanded))
    }

    fn is_static(&self) -> bool {
        self.segments
            .iter()
            .all(|segment| matches!(segment, Segment::Text(_)))
    }
}

// ============================================================================
// Constructors
// ============================================================================

/// A literal of any value type.
pub fn lit(value: impl Into<Value>) -> Expr {
    Arc::new(Literal(value.into()))
}

/// An attribute lookup.
pub fn prop(name: impl Into<String>) -> Expr {
    Arc::new(Property(name.into()))
}

fn arithmetic(op: ArithmeticOp, lhs: Expr, rhs: Expr) -> Expr {
    Arc::new(Arithmetic { op, lhs, rhs })
}

pub fn add(lhs: Expr, rhs: Expr) -> Expr {
    arithmetic(ArithmeticOp::Add, lhs, rhs)
}

pub fn sub(lhs: Expr, rhs: Expr) -> Expr {
    arithmetic(ArithmeticOp::Subtract, lhs, rhs)
}

pub fn mul(lhs: Expr, rhs: Expr) -> Expr {
    arithmetic(ArithmeticOp::Multiply, lhs, rhs)
}

pub fn div(lhs: Expr, rhs: Expr) -> Expr {
    arithmetic(ArithmeticOp::Divide, lhs, rhs)
}

pub fn compare(op: CompareOp, lhs: Expr, rhs: Expr) -> Compare {
    Compare { op, lhs, rhs }
}

pub fn equal_to(lhs: Expr, rhs: Expr) -> Compare {
    compare(CompareOp::Equal, lhs, rhs)
}

pub fn if_then_else(condition: Expr, then: Expr, otherwise: Expr) -> Expr {
    Arc::new(IfThenElse {
        condition,
        then,
        otherwise,
    })
}

// ============================================================================
// Tests
// ============================================================================
