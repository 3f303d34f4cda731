//! Action handlers and descriptors.
//!
//! A descriptor is the introspectable part of an action (name, parameter
//! schema, time bound). The handler is the part that talks to hardware.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::error::HandlerResult;
use super::params::{BoundArgs, ParamSpec};
use crate::context::ExecutionContext;

/// The executable half of an action.
///
/// Handlers are awaited one at a time against the single session context.
/// Long instrument operations should await (sleep, poll, I/O) rather than
/// block the thread, so the invoker's time bound can interrupt them.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn call(&self, args: &BoundArgs, ctx: &mut ExecutionContext) -> HandlerResult;
}

/// Adapter turning a plain closure into a handler.
///
/// The closure runs to completion inside the invocation future, so a time
/// bound cannot interrupt it. Use it for quick, non-blocking effects.
pub struct SyncHandler<F> {
    f: F,
}

impl<F> SyncHandler<F>
where
    F: Fn(&BoundArgs, &mut ExecutionContext) -> HandlerResult + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> ActionHandler for SyncHandler<F>
where
    F: Fn(&BoundArgs, &mut ExecutionContext) -> HandlerResult + Send + Sync,
{
    async fn call(&self, args: &BoundArgs, ctx: &mut ExecutionContext) -> HandlerResult {
        (self.f)(args, ctx)
    }
}

/// Everything the registry knows about one action.
#[derive(Clone, Serialize)]
pub struct ActionDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub parameters: Vec<ParamSpec>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "timeout_secs", serialize_with = "secs")]
    pub timeout: Option<Duration>,
    #[serde(skip)]
    handler: Arc<dyn ActionHandler>,
}

fn secs<S: serde::Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
    match d {
        Some(d) => s.serialize_f64(d.as_secs_f64()),
        None => s.serialize_none(),
    }
}

impl ActionDescriptor {
    pub fn new(name: impl Into<String>, handler: impl ActionHandler + 'static) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            parameters: Vec::new(),
            timeout: None,
            handler: Arc::new(handler),
        }
    }

    /// Descriptor backed by a closure, see [`SyncHandler`].
    pub fn from_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&BoundArgs, &mut ExecutionContext) -> HandlerResult + Send + Sync + 'static,
    {
        Self::new(name, SyncHandler::new(f))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn handler(&self) -> &Arc<dyn ActionHandler> {
        &self.handler
    }

    /// One-line usage string, e.g. `set-field target=<float> [device=cryo-01]`.
    pub fn usage(&self) -> String {
        let mut out = self.name.clone();
        for p in &self.parameters {
            out.push(' ');
            match &p.default {
                Some(default) => out.push_str(&format!("[{}={}]", p.name, default)),
                None => out.push_str(&format!("{}=<{}>", p.name, p.ty)),
            }
        }
        out
    }
}

impl fmt::Debug for ActionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDescriptor")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::params::ParamValue;

    #[test]
    fn test_usage_marks_defaults_optional() {
        let descriptor = ActionDescriptor::from_fn("set-field", |_, _| Ok(()))
            .with_param(ParamSpec::float("target"))
            .with_param(
                ParamSpec::string("device").with_default(ParamValue::String("cryo-01".into())),
            );

        assert_eq!(descriptor.usage(), "set-field target=<float> [device=cryo-01]");
    }

    #[tokio::test]
    async fn test_sync_handler_mutates_context() {
        let descriptor = ActionDescriptor::from_fn("bump", |_, ctx| {
            ctx.increment("bumps");
            Ok(())
        });
        let mut ctx = ExecutionContext::new();

        descriptor
            .handler()
            .call(&BoundArgs::new(), &mut ctx)
            .await
            .unwrap();

        assert_eq!(ctx.var("bumps"), Some(&serde_json::json!(1)));
    }
}
