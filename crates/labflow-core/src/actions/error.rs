//! Registry, invocation and handler errors.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use super::params::ParamType;
use crate::devices::DeviceError;

/// Errors raised while populating or querying the action registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Action '{0}' is already registered")]
    DuplicateAction(String),

    #[error("Action '{action}' declares parameter '{param}' more than once")]
    DuplicateParameter { action: String, param: String },

    #[error("Action '{action}' declares a default for '{param}' that is not a {expected}")]
    InvalidDefault {
        action: String,
        param: String,
        expected: ParamType,
    },

    #[error("Action '{name}' not found. Available actions: {}", available.join(", "))]
    UnknownAction { name: String, available: Vec<String> },
}

/// How an action failed once its handler was running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionErrorKind {
    /// The handler did not finish within its time bound.
    Timeout {
        #[serde(rename = "after_ms", serialize_with = "serialize_millis")]
        after: Duration,
    },
    /// The handler reported a failure.
    HandlerFailure,
}

/// Errors produced by a single invocation.
///
/// Everything except [`InvocationError::ActionExecution`] is raised before
/// the handler runs, so no hardware command has been issued.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum InvocationError {
    #[error("Action '{name}' not found")]
    UnknownAction { name: String },

    #[error("Action '{action}' has no parameter '{param}'")]
    UnknownParameter { action: String, param: String },

    #[error("Missing parameter '{param}' for action '{action}'")]
    MissingParameter { action: String, param: String },

    #[error("Parameter '{param}' of '{action}' expects {expected}, got '{value}': {reason}")]
    TypeCoercion {
        action: String,
        param: String,
        expected: ParamType,
        value: String,
        reason: String,
    },

    #[error("Action '{action}' failed: {}", describe_execution(kind, cause))]
    ActionExecution {
        action: String,
        #[serde(flatten)]
        kind: ExecutionErrorKind,
        cause: String,
    },
}

fn describe_execution(kind: &ExecutionErrorKind, cause: &str) -> String {
    match kind {
        ExecutionErrorKind::Timeout { after } => {
            format!("timed out after {:.3}s", after.as_secs_f64())
        }
        ExecutionErrorKind::HandlerFailure => cause.to_string(),
    }
}

impl InvocationError {
    /// True when the failure happened before the handler was called.
    pub fn is_binding_error(&self) -> bool {
        !matches!(self, InvocationError::ActionExecution { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            InvocationError::ActionExecution {
                kind: ExecutionErrorKind::Timeout { .. },
                ..
            }
        )
    }
}

/// Error type returned by action handlers.
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("argument '{name}' is missing or not a {expected}")]
    Argument { name: String, expected: &'static str },

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("{0}")]
    Failed(String),
}

impl ActionError {
    pub(crate) fn argument(name: &str, expected: &'static str) -> Self {
        ActionError::Argument {
            name: name.to_string(),
            expected,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        ActionError::Failed(message.into())
    }
}

pub type HandlerResult = std::result::Result<(), ActionError>;

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}
