//! Binding, coercion and execution of a single action.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::Utc;
use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::error::{ExecutionErrorKind, InvocationError};
use super::handler::ActionDescriptor;
use super::params::BoundArgs;
use super::registry::ActionRegistry;
use super::result::InvocationResult;
use crate::context::ExecutionContext;

/// Raw `name -> value` arguments, before coercion.
pub type RawArgs = IndexMap<String, String>;

/// A command-line argument that is not of the form `key=value`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid argument '{0}': expected key=value")]
pub struct InvalidAssignment(pub String);

/// Parse `key=value` words into raw arguments.
///
/// Leading dashes on the key are ignored, so `--power=70` and `power=70`
/// mean the same thing. The value may itself contain `=`.
pub fn parse_assignments<S: AsRef<str>>(words: &[S]) -> Result<RawArgs, InvalidAssignment> {
    let mut args = RawArgs::new();
    for word in words {
        let word = word.as_ref();
        let (key, value) = word
            .split_once('=')
            .ok_or_else(|| InvalidAssignment(word.to_string()))?;
        let key = key.trim_start_matches('-');
        if key.is_empty() {
            return Err(InvalidAssignment(word.to_string()));
        }
        args.insert(key.to_string(), value.to_string());
    }
    Ok(args)
}

/// Time bounds applied to handlers.
///
/// Resolution order: per-action override, the descriptor's own bound, the
/// default. `None` everywhere means the handler is awaited without limit.
#[derive(Debug, Clone, Default)]
pub struct TimeoutPolicy {
    pub default: Option<Duration>,
    pub overrides: HashMap<String, Duration>,
}

impl TimeoutPolicy {
    pub fn effective(&self, descriptor: &ActionDescriptor) -> Option<Duration> {
        self.overrides
            .get(&descriptor.name)
            .copied()
            .or(descriptor.timeout)
            .or(self.default)
    }
}

/// Executes registered actions against the session context.
pub struct Invoker<'r> {
    registry: &'r ActionRegistry,
    timeouts: TimeoutPolicy,
}

impl<'r> Invoker<'r> {
    pub fn new(registry: &'r ActionRegistry) -> Self {
        Self {
            registry,
            timeouts: TimeoutPolicy::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutPolicy) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn registry(&self) -> &'r ActionRegistry {
        self.registry
    }

    /// Bind and coerce every declared parameter.
    ///
    /// Either all parameters bind or none do; the handler is only ever
    /// called with a complete argument set.
    pub fn bind(
        &self,
        descriptor: &ActionDescriptor,
        raw: &RawArgs,
    ) -> Result<BoundArgs, InvocationError> {
        if let Some(unknown) = raw.keys().find(|k| descriptor.param(k).is_none()) {
            return Err(InvocationError::UnknownParameter {
                action: descriptor.name.clone(),
                param: unknown.clone(),
            });
        }

        let mut bound = BoundArgs::new();
        for spec in &descriptor.parameters {
            let value = match raw.get(&spec.name) {
                Some(text) => spec.ty.coerce(text).map_err(|failure| {
                    InvocationError::TypeCoercion {
                        action: descriptor.name.clone(),
                        param: spec.name.clone(),
                        expected: failure.expected,
                        value: text.clone(),
                        reason: failure.reason,
                    }
                })?,
                None => spec
                    .default
                    .clone()
                    .ok_or_else(|| InvocationError::MissingParameter {
                        action: descriptor.name.clone(),
                        param: spec.name.clone(),
                    })?,
            };
            bound.insert(spec.name.clone(), value);
        }
        Ok(bound)
    }

    /// Invoke an action by name.
    ///
    /// # Errors
    ///
    /// Returns `Err` only for failures detected before the handler runs
    /// (unknown action, unknown or missing parameter, coercion). Handler
    /// failures and timeouts come back as an unsuccessful
    /// [`InvocationResult`].
    pub async fn invoke(
        &self,
        action: &str,
        raw: &RawArgs,
        ctx: &mut ExecutionContext,
    ) -> Result<InvocationResult, InvocationError> {
        let descriptor =
            self.registry
                .lookup(action)
                .map_err(|_| InvocationError::UnknownAction {
                    name: action.to_string(),
                })?;
        let args = self.bind(&descriptor, raw)?;
        let resolved = args.display_map();
        debug!(action, args = ?resolved, "bound arguments");

        let timeout = self.timeouts.effective(&descriptor);
        let started_at = Utc::now();
        let clock = Instant::now();
        ctx.record_invocation();

        let call = descriptor.handler().call(&args, ctx);
        let outcome = match timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result.map_err(|e| (ExecutionErrorKind::HandlerFailure, e.to_string())),
                Err(_) => Err((ExecutionErrorKind::Timeout { after: limit }, String::new())),
            },
            None => call
                .await
                .map_err(|e| (ExecutionErrorKind::HandlerFailure, e.to_string())),
        };
        let duration = clock.elapsed();

        match outcome {
            Ok(()) => {
                info!(action, duration_ms = duration.as_millis() as u64, "action completed");
                Ok(InvocationResult::succeeded(action, resolved, started_at, duration))
            }
            Err((kind, cause)) => {
                let error = InvocationError::ActionExecution {
                    action: action.to_string(),
                    kind,
                    cause,
                };
                warn!(action, duration_ms = duration.as_millis() as u64, %error, "action failed");
                Ok(InvocationResult::failed(
                    action, resolved, error, started_at, duration,
                ))
            }
        }
    }
}
