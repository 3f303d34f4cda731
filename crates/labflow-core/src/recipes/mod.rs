//! Recipes: named, reusable sequences of action steps.
//!
//! Step bindings may carry `{name}` markers that a loop run fills in on
//! every iteration.

pub mod builder;
pub mod error;
pub mod recipe;
pub mod store;
pub mod template;

pub use builder::{BuilderState, RecipeBuilder, Turn, FINISH};
pub use error::{DefinitionError, StoreError, TemplateError};
pub use recipe::{Recipe, ResolvedStep, Step};
pub use store::{MemoryRecipeStore, RecipeStore, TomlRecipeStore};
pub use template::{Binding, Template};
