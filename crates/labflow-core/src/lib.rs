//! # labflow core library
//!
//! The building blocks of the labflow CLI: a registry of named actions with
//! typed parameters, recipes that chain those actions, and a loop executor
//! that replays a recipe while sweeping one or more variables.
//!
//! ## Architecture
//!
//! - **Actions**: [`ActionRegistry`] maps names to descriptors; the
//!   [`Invoker`] binds raw `key=value` arguments to the declared schema and
//!   awaits the handler, optionally under a timeout
//! - **Recipes**: named step lists whose bindings may carry `{variable}`
//!   markers, built through a [`RecipeBuilder`] and persisted in TOML
//! - **Sweeps**: [`LoopExecutor`] resolves markers per value and runs every
//!   step through the invoker against a single [`ExecutionContext`]
//! - **Devices**: instruments behind the [`Instrument`] trait, built from the
//!   `[[equipment]]` config
//! - **Storage**: TOML [`Config`] and recipe files under the data directory
//!
//! Everything runs on one logical thread: invocations are awaited one at a
//! time and share the context by `&mut`.

pub mod actions;
pub mod context;
pub mod devices;
pub mod error;
pub mod recipes;
pub mod storage;
pub mod sweep;

pub use actions::{
    register_builtin_actions, ActionDescriptor, ActionHandler, ActionRegistry, InvocationError,
    InvocationResult, Invoker, ParamSpec, ParamType, ParamValue, RegistryError,
};
pub use context::{AbortSignal, ExecutionContext};
pub use devices::{DeviceError, DeviceRegistry, DeviceStatus, Instrument};
pub use error::{ConfigError, CoreError};
pub use recipes::{Binding, Recipe, RecipeBuilder, RecipeStore, Step, TomlRecipeStore};
pub use storage::Config;
pub use sweep::{FailurePolicy, LoopExecutor, LoopReport, LoopSpec, MultiSweep};
