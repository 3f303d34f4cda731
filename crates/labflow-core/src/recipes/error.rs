//! Recipe-specific errors.

use thiserror::Error;

/// Errors in template markers, at parse or at resolution time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Malformed template '{template}' at byte {position}: {reason}")]
    Malformed {
        template: String,
        position: usize,
        reason: String,
    },

    #[error("Unresolved loop variable '{{{variable}}}' in step {step} ({action})")]
    Unresolved {
        variable: String,
        step: usize,
        action: String,
    },
}

/// Errors raised while defining or validating a recipe.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("Recipe name must not be empty")]
    EmptyName,

    #[error("Unknown action '{0}'")]
    UnknownAction(String),

    #[error("Action '{action}' has no parameter '{param}'")]
    UnknownParameter { action: String, param: String },

    #[error("A value for '{param}' of '{action}' is required")]
    MissingValue { action: String, param: String },

    #[error(transparent)]
    MalformedTemplate(#[from] TemplateError),

    #[error("Step for '{0}' is not complete yet")]
    IncompleteStep(String),

    #[error("Recipe '{0}' has no steps")]
    EmptyRecipe(String),

    #[error("Invalid step definition '{0}'")]
    InvalidStep(String),

    #[error("The definition session is closed")]
    Closed,
}

impl DefinitionError {
    /// Fatal errors abort the definition session; nothing is committed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DefinitionError::UnknownAction(_) | DefinitionError::Closed)
    }
}

/// Errors that can occur in recipe storage.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read/write recipes file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse recipes TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize recipes TOML: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Recipe '{0}' not found")]
    NotFound(String),

    #[error("Recipe '{0}' already exists")]
    AlreadyExists(String),

    #[error("Failed to access data directory: {0}")]
    DataDirError(String),
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
