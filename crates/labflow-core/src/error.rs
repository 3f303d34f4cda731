//! Core error types for labflow-core.
//!
//! Each layer has its own error enum next to the code that raises it;
//! [`CoreError`] unifies them for callers that only need to report.

use std::path::PathBuf;
use thiserror::Error;

use crate::actions::{InvocationError, RegistryError};
use crate::devices::DeviceError;
use crate::recipes::{DefinitionError, StoreError, TemplateError};
use crate::sweep::{LoopError, LoopSpecError};

/// Core error type for labflow-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Action registration or lookup
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Binding or execution of one action
    #[error(transparent)]
    Invocation(#[from] InvocationError),

    /// Recipe definition
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    /// Template markers
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Recipe persistence
    #[error("Recipe store error: {0}")]
    Store(#[from] StoreError),

    /// Sweep ranges
    #[error(transparent)]
    LoopSpec(#[from] LoopSpecError),

    /// Loop structure
    #[error(transparent)]
    Loop(#[from] LoopError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Instruments
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error("Unknown config key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Failed to access data directory: {0}")]
    DataDir(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
