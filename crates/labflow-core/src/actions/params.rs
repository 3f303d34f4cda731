//! Typed parameter schemas and raw-string coercion.
//!
//! Every action declares its parameters up front. Raw values coming from the
//! command line or from a resolved recipe step are plain strings; they are
//! coerced here, all at once, before a handler ever sees them.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::error::ActionError;

/// Declared type of an action parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Integer,
    Float,
    String,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Integer => write!(f, "integer"),
            ParamType::Float => write!(f, "float"),
            ParamType::String => write!(f, "string"),
        }
    }
}

/// A concrete, already-coerced parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Integer(i64),
    Float(f64),
    String(String),
}

impl ParamValue {
    pub fn param_type(&self) -> ParamType {
        match self {
            ParamValue::Integer(_) => ParamType::Integer,
            ParamValue::Float(_) => ParamType::Float,
            ParamValue::String(_) => ParamType::String,
        }
    }

    /// Numeric view of the value. Integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Integer(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            ParamValue::String(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(v) => Some(v),
            _ => None,
        }
    }

    /// JSON form, used when a value is written into the execution context.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ParamValue::Integer(v) => serde_json::Value::from(*v),
            ParamValue::Float(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            ParamValue::String(v) => serde_json::Value::String(v.clone()),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Integer(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::String(v) => write!(f, "{v}"),
        }
    }
}

/// Why a raw string could not be turned into a [`ParamValue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoercionFailure {
    pub expected: ParamType,
    pub reason: String,
}

impl ParamType {
    /// Coerce a raw string to this type.
    ///
    /// Integers and floats are trimmed before parsing. Floats must be
    /// finite: `nan` and `inf` parse in Rust but are never a sane setpoint.
    pub fn coerce(self, raw: &str) -> Result<ParamValue, CoercionFailure> {
        match self {
            ParamType::Integer => raw
                .trim()
                .parse::<i64>()
                .map(ParamValue::Integer)
                .map_err(|e| CoercionFailure {
                    expected: self,
                    reason: e.to_string(),
                }),
            ParamType::Float => {
                let value = raw.trim().parse::<f64>().map_err(|e| CoercionFailure {
                    expected: self,
                    reason: e.to_string(),
                })?;
                if !value.is_finite() {
                    return Err(CoercionFailure {
                        expected: self,
                        reason: "value must be finite".to_string(),
                    });
                }
                Ok(ParamValue::Float(value))
            }
            ParamType::String => Ok(ParamValue::String(raw.to_string())),
        }
    }
}

/// Declaration of a single action parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ParamType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<ParamValue>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            description: String::new(),
        }
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Integer)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Float)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::String)
    }

    /// Attach a default. The default must match the declared type; a
    /// mismatch is a programming error in the action module and is caught
    /// when the descriptor is registered.
    pub fn with_default(mut self, value: ParamValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Arguments after binding and coercion, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoundArgs {
    values: IndexMap<String, ParamValue>,
}

impl BoundArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn f64(&self, name: &str) -> Result<f64, ActionError> {
        self.get(name)
            .and_then(ParamValue::as_f64)
            .ok_or_else(|| ActionError::argument(name, "float"))
    }

    pub fn i64(&self, name: &str) -> Result<i64, ActionError> {
        self.get(name)
            .and_then(ParamValue::as_i64)
            .ok_or_else(|| ActionError::argument(name, "integer"))
    }

    pub fn str(&self, name: &str) -> Result<&str, ActionError> {
        self.get(name)
            .and_then(ParamValue::as_str)
            .ok_or_else(|| ActionError::argument(name, "string"))
    }

    /// String form of every value, used for reporting.
    pub fn display_map(&self) -> IndexMap<String, String> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }
}
