//! Shared execution context.
//!
//! One context exists per session. It is created at startup, handed to every
//! invocation by `&mut`, and never cloned, so whatever one step writes is
//! what the next step reads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::devices::DeviceRegistry;

/// Cooperative abort flag.
///
/// Cloned handles share one flag. The loop executor checks it between steps
/// and between iterations; a handler that is already running is never
/// interrupted by it.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    flag: Arc<AtomicBool>,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clear the flag so the next command in a session can run.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Mutable state shared by all invocations of a session.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    vars: IndexMap<String, Value>,
    devices: DeviceRegistry,
    abort: AbortSignal,
    invocations: u64,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_devices(devices: DeviceRegistry) -> Self {
        Self {
            devices,
            ..Self::default()
        }
    }

    pub fn var(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    pub fn var_f64(&self, key: &str) -> Option<f64> {
        self.vars.get(key).and_then(Value::as_f64)
    }

    pub fn set_var(&mut self, key: impl Into<String>, value: Value) {
        self.vars.insert(key.into(), value);
    }

    pub fn remove_var(&mut self, key: &str) -> Option<Value> {
        self.vars.shift_remove(key)
    }

    pub fn vars(&self) -> &IndexMap<String, Value> {
        &self.vars
    }

    /// Add one to an integer counter, starting from zero.
    pub fn increment(&mut self, key: &str) -> i64 {
        let next = self.vars.get(key).and_then(Value::as_i64).unwrap_or(0) + 1;
        self.vars.insert(key.to_string(), Value::from(next));
        next
    }

    /// Append a value to an array variable, creating it if needed.
    pub fn push_var(&mut self, key: &str, value: Value) {
        match self.vars.get_mut(key) {
            Some(Value::Array(items)) => items.push(value),
            _ => {
                self.vars.insert(key.to_string(), Value::Array(vec![value]));
            }
        }
    }

    pub fn devices(&self) -> &DeviceRegistry {
        &self.devices
    }

    pub fn devices_mut(&mut self) -> &mut DeviceRegistry {
        &mut self.devices
    }

    /// Handle to the abort flag, suitable for a signal handler.
    pub fn abort_signal(&self) -> AbortSignal {
        self.abort.clone()
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }

    pub(crate) fn record_invocation(&mut self) {
        self.invocations += 1;
    }

    /// Number of handlers called so far in this session.
    pub fn invocation_count(&self) -> u64 {
        self.invocations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_increment_starts_at_one() {
        let mut ctx = ExecutionContext::new();
        assert_eq!(ctx.increment("count"), 1);
        assert_eq!(ctx.increment("count"), 2);
        assert_eq!(ctx.var("count"), Some(&json!(2)));
    }

    #[test]
    fn test_push_var_replaces_scalar() {
        let mut ctx = ExecutionContext::new();
        ctx.set_var("notes", json!("scalar"));
        ctx.push_var("notes", json!("a"));
        ctx.push_var("notes", json!("b"));
        assert_eq!(ctx.var("notes"), Some(&json!(["a", "b"])));
    }

    #[test]
    fn test_abort_signal_shared_between_clones() {
        let ctx = ExecutionContext::new();
        let handle = ctx.abort_signal();
        assert!(!ctx.is_aborted());

        handle.abort();
        assert!(ctx.is_aborted());

        handle.reset();
        assert!(!ctx.is_aborted());
    }
}
