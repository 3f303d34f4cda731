//! Outcome of a single action invocation.

use std::time::Duration;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use super::error::InvocationError;

/// Result of invoking one action.
#[derive(Debug, Clone, Serialize)]
pub struct InvocationResult {
    /// Name of the action that was invoked
    pub action: String,
    /// Arguments as handed to the handler (or as received, when binding failed)
    pub resolved_args: IndexMap<String, String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<InvocationError>,
    pub started_at: DateTime<Utc>,
    #[serde(rename = "duration_ms", serialize_with = "millis")]
    pub duration: Duration,
}

fn millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1000.0)
}

impl InvocationResult {
    pub(crate) fn succeeded(
        action: &str,
        resolved_args: IndexMap<String, String>,
        started_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            action: action.to_string(),
            resolved_args,
            success: true,
            error: None,
            started_at,
            duration,
        }
    }

    pub(crate) fn failed(
        action: &str,
        resolved_args: IndexMap<String, String>,
        error: InvocationError,
        started_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            action: action.to_string(),
            resolved_args,
            success: false,
            error: Some(error),
            started_at,
            duration,
        }
    }

    /// A step that never reached its handler because binding failed.
    pub fn rejected(
        action: &str,
        raw_args: &IndexMap<String, String>,
        error: InvocationError,
    ) -> Self {
        Self::failed(action, raw_args.clone(), error, Utc::now(), Duration::ZERO)
    }

    /// Convert into a `Result`, for callers that treat failure as an error.
    pub fn into_result(self) -> Result<Self, InvocationError> {
        match self.error.clone() {
            Some(err) if !self.success => Err(err),
            _ => Ok(self),
        }
    }

    /// Bound argument by name, as its display string.
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.resolved_args.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_carries_raw_args() {
        let mut raw = IndexMap::new();
        raw.insert("target".to_string(), "abc".to_string());
        let result = InvocationResult::rejected(
            "set-field",
            &raw,
            InvocationError::UnknownAction {
                name: "set-field".into(),
            },
        );

        assert!(!result.success);
        assert_eq!(result.arg("target"), Some("abc"));
        assert_eq!(result.duration, Duration::ZERO);
        assert!(result.into_result().is_err());
    }

    #[test]
    fn test_serializes_duration_in_millis() {
        let result = InvocationResult::succeeded(
            "wait",
            IndexMap::new(),
            Utc::now(),
            Duration::from_millis(250),
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["duration_ms"], 250.0);
        assert!(json.get("error").is_none());
    }
}
