//! Sweep ranges and the values they generate.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Values are snapped to this grid so `0.1 + 0.2` reads as `0.3`.
const ROUNDING_SCALE: f64 = 1e9;

pub const DEFAULT_TOLERANCE: f64 = 1e-9;
pub const DEFAULT_MAX_ITERATIONS: usize = 10_000;

/// Errors in a sweep definition. All of them are raised before anything
/// is executed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoopSpecError {
    #[error("Loop variable '{0}' is not a valid name")]
    InvalidVariable(String),

    #[error("Loop {field} must be a finite number")]
    NonFinite { field: &'static str },

    #[error("Loop step must not be zero")]
    ZeroStep,

    #[error("Step {step} never reaches {end} from {start}")]
    WrongDirection { start: f64, end: f64, step: f64 },

    #[error("Sweep of '{variable}' has {count} values, more than the limit of {limit}")]
    TooManyIterations {
        variable: String,
        count: f64,
        limit: usize,
    },

    #[error("Invalid sweep '{spec}': {reason}")]
    InvalidAxis { spec: String, reason: String },

    #[error("Variable '{0}' is swept more than once")]
    DuplicateVariable(String),

    #[error("No sweep variables given")]
    NoAxes,
}

/// Limits applied when expanding a range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepLimits {
    /// Slack when deciding whether `end` is reached
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for SweepLimits {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// One variable swept from `start` to `end` (inclusive) by `step`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopSpec {
    pub variable: String,
    pub start: f64,
    pub end: f64,
    pub step: f64,
    pub limits: SweepLimits,
}

impl LoopSpec {
    pub fn new(variable: impl Into<String>, start: f64, end: f64, step: f64) -> Self {
        Self {
            variable: variable.into(),
            start,
            end,
            step,
            limits: SweepLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: SweepLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Number of values the range produces.
    pub fn count(&self) -> Result<usize, LoopSpecError> {
        if !is_identifier(&self.variable) {
            return Err(LoopSpecError::InvalidVariable(self.variable.clone()));
        }
        for (field, value) in [("start", self.start), ("end", self.end), ("step", self.step)] {
            if !value.is_finite() {
                return Err(LoopSpecError::NonFinite { field });
            }
        }
        if self.step == 0.0 {
            return Err(LoopSpecError::ZeroStep);
        }

        let ratio = (self.end - self.start) / self.step;
        if ratio < -self.limits.tolerance {
            return Err(LoopSpecError::WrongDirection {
                start: self.start,
                end: self.end,
                step: self.step,
            });
        }

        let count = (ratio + self.limits.tolerance).floor().max(0.0) + 1.0;
        if !count.is_finite() || count > self.limits.max_iterations as f64 {
            return Err(LoopSpecError::TooManyIterations {
                variable: self.variable.clone(),
                count,
                limit: self.limits.max_iterations,
            });
        }
        Ok(count as usize)
    }

    /// A fresh iterator over the sweep values.
    pub fn values(&self) -> Result<SweepValues, LoopSpecError> {
        Ok(SweepValues {
            start: self.start,
            step: self.step,
            next: 0,
            count: self.count()?,
        })
    }
}

impl fmt::Display for LoopSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}:{}:{}", self.variable, self.start, self.end, self.step)
    }
}

/// Lazily computed sweep values. Each value is `start + i * step`, so
/// error does not accumulate across iterations.
#[derive(Debug, Clone)]
pub struct SweepValues {
    start: f64,
    step: f64,
    next: usize,
    count: usize,
}

impl SweepValues {
    /// Value at `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<f64> {
        (index < self.count).then(|| snap(self.start + index as f64 * self.step))
    }
}

impl Iterator for SweepValues {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        let value = self.get(self.next)?;
        self.next += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SweepValues {}

fn snap(value: f64) -> f64 {
    let snapped = (value * ROUNDING_SCALE).round() / ROUNDING_SCALE;
    if snapped.is_finite() {
        snapped
    } else {
        value
    }
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
