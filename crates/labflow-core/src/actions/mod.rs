//! Actions: the atomic operations recipes are made of.
//!
//! Each action has a name, a typed parameter schema and a handler. Action
//! modules register themselves explicitly at startup through
//! [`register_builtin_actions`]; nothing is discovered at runtime.

pub mod builtin;
pub mod error;
pub mod handler;
pub mod invoker;
pub mod params;
pub mod registry;
pub mod result;

pub use builtin::register_builtin_actions;
pub use error::{
    ActionError, ExecutionErrorKind, HandlerResult, InvocationError, RegistryError,
};
pub use handler::{ActionDescriptor, ActionHandler, SyncHandler};
pub use invoker::{parse_assignments, InvalidAssignment, Invoker, RawArgs, TimeoutPolicy};
pub use params::{BoundArgs, ParamSpec, ParamType, ParamValue};
pub use registry::ActionRegistry;
pub use result::InvocationResult;
