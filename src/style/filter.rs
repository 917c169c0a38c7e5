//! Rule filters.

use std::fmt;
use std::sync::Arc;

use crate::error::EvalError;
use crate::feature::Feature;

/// A predicate gating a rule.
pub trait Filter: fmt::Debug + Send + Sync {
    fn evaluate(&self, feature: &dyn Feature) -> Result<bool, EvalError>;
}

/// Matches every feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Include;

impl Filter for Include {
    fn evaluate(&self, _feature: &dyn Feature) -> Result<bool, EvalError> {
        Ok(true)
    }
}

/// Matches no feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exclude;

impl Filter for Exclude {
    fn evaluate(&self, _feature: &dyn Feature) -> Result<bool, EvalError> {
        Ok(false)
    }
}

#[derive(Debug, Clone)]
pub struct Not(pub Arc<dyn Filter>);

impl Filter for Not {
    fn evaluate(&self, feature: &dyn Feature) -> Result<bool, EvalError> {
        Ok(!self.0.evaluate(feature)?)
    }
}

/// Short-circuiting conjunction. An empty list matches.
#[derive(Debug, Clone)]
pub struct And(pub Vec<Arc<dyn Filter>>);

impl Filter for And {
    fn evaluate(&self, feature: &dyn Feature) -> Result<bool, EvalError> {
        for filter in &self.0 {
            if !filter.evaluate(feature)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Short-circuiting disjunction. An empty list never matches.
#[derive(Debug, Clone)]
pub struct Or(pub Vec<Arc<dyn Filter>>);

impl Filter for Or {
    fn evaluate(&self, feature: &dyn Feature) -> Result<bool, EvalError> {
        for filter in &self.0 {
            if filter.evaluate(feature)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
