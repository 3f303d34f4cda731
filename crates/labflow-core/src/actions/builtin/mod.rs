//! Built-in action modules.
//!
//! Adding an action means writing a handler in one of these modules (or a
//! new one) and adding it to that module's `register` function.

mod cryo;
mod general;
mod laser;

use super::{ActionRegistry, RegistryError};

/// Register every built-in action.
///
/// # Errors
///
/// A name collision between modules is reported as
/// [`RegistryError::DuplicateAction`] and must stop startup.
pub fn register_builtin_actions(registry: &mut ActionRegistry) -> Result<(), RegistryError> {
    general::register(registry)?;
    laser::register(registry)?;
    cryo::register(registry)?;
    Ok(())
}
