//! Utility actions that do not touch hardware.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::actions::{
    ActionDescriptor, ActionError, ActionHandler, ActionRegistry, BoundArgs, HandlerResult,
    ParamSpec, RegistryError,
};
use crate::context::ExecutionContext;

pub(super) fn register(registry: &mut ActionRegistry) -> Result<(), RegistryError> {
    registry.register(
        ActionDescriptor::new("wait", Wait)
            .with_description("Pause for a number of seconds")
            .with_param(ParamSpec::float("seconds").with_description("Delay in seconds")),
    )?;

    registry.register(
        ActionDescriptor::from_fn("note", |args, ctx| {
            let message = args.str("message")?;
            info!(target: "labflow::note", "{message}");
            ctx.push_var("notes", Value::String(message.to_string()));
            Ok(())
        })
        .with_description("Record a note in the session log")
        .with_param(ParamSpec::string("message")),
    )?;

    registry.register(
        ActionDescriptor::from_fn("set-var", |args, ctx| {
            let name = args.str("name")?;
            if name.trim().is_empty() {
                return Err(ActionError::InvalidValue("variable name is empty".into()));
            }
            let raw = args.str("value")?;
            let value = raw
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(raw.to_string()));
            ctx.set_var(name, value);
            Ok(())
        })
        .with_description("Store a value in the execution context")
        .with_param(ParamSpec::string("name"))
        .with_param(ParamSpec::string("value")),
    )?;

    Ok(())
}

struct Wait;

#[async_trait]
impl ActionHandler for Wait {
    async fn call(&self, args: &BoundArgs, _ctx: &mut ExecutionContext) -> HandlerResult {
        let seconds = args.f64("seconds")?;
        let delay = Duration::try_from_secs_f64(seconds).map_err(|_| {
            ActionError::InvalidValue(format!("cannot wait {seconds}s"))
        })?;
        tokio::time::sleep(delay).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{Invoker, RawArgs};
    use serde_json::json;

    fn setup() -> ActionRegistry {
        let mut registry = ActionRegistry::new();
        register(&mut registry).unwrap();
        registry
    }

    fn args(pairs: &[(&str, &str)]) -> RawArgs {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_note_appends() {
        let registry = setup();
        let invoker = Invoker::new(&registry);
        let mut ctx = ExecutionContext::new();

        for message in ["cooldown started", "field ramp done"] {
            invoker
                .invoke("note", &args(&[("message", message)]), &mut ctx)
                .await
                .unwrap();
        }

        assert_eq!(
            ctx.var("notes"),
            Some(&json!(["cooldown started", "field ramp done"]))
        );
    }

    #[tokio::test]
    async fn test_set_var_parses_numbers() {
        let registry = setup();
        let invoker = Invoker::new(&registry);
        let mut ctx = ExecutionContext::new();

        invoker
            .invoke("set-var", &args(&[("name", "gain"), ("value", "2.5")]), &mut ctx)
            .await
            .unwrap();
        invoker
            .invoke("set-var", &args(&[("name", "sample"), ("value", "MoS2")]), &mut ctx)
            .await
            .unwrap();

        assert_eq!(ctx.var_f64("gain"), Some(2.5));
        assert_eq!(ctx.var("sample"), Some(&json!("MoS2")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_rejects_negative() {
        let registry = setup();
        let invoker = Invoker::new(&registry);
        let mut ctx = ExecutionContext::new();

        let ok = invoker
            .invoke("wait", &args(&[("seconds", "1.5")]), &mut ctx)
            .await
            .unwrap();
        assert!(ok.success);

        let bad = invoker
            .invoke("wait", &args(&[("seconds", "-1")]), &mut ctx)
            .await
            .unwrap();
        assert!(!bad.success);
    }

    #[tokio::test]
    async fn test_wait_rejects_out_of_range_seconds() {
        let registry = setup();
        let invoker = Invoker::new(&registry);
        let mut ctx = ExecutionContext::new();

        let result = invoker
            .invoke("wait", &args(&[("seconds", "1e30")]), &mut ctx)
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().to_string().contains("cannot wait"));
    }
}
