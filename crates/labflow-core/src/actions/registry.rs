//! The action registry: the addressable vocabulary of the system.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use super::error::RegistryError;
use super::handler::ActionDescriptor;

/// Name-keyed store of action descriptors, kept in registration order.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    actions: IndexMap<String, Arc<ActionDescriptor>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action.
    ///
    /// # Errors
    ///
    /// Fails if the name is taken, if the descriptor repeats a parameter
    /// name, or if a default does not match its declared type. The
    /// registry is unchanged on failure, so the first registration stays
    /// the reachable one.
    pub fn register(&mut self, descriptor: ActionDescriptor) -> Result<(), RegistryError> {
        if self.actions.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateAction(descriptor.name));
        }

        for (i, param) in descriptor.parameters.iter().enumerate() {
            if descriptor.parameters[..i].iter().any(|p| p.name == param.name) {
                return Err(RegistryError::DuplicateParameter {
                    action: descriptor.name.clone(),
                    param: param.name.clone(),
                });
            }
            if let Some(default) = &param.default {
                if default.param_type() != param.ty {
                    return Err(RegistryError::InvalidDefault {
                        action: descriptor.name.clone(),
                        param: param.name.clone(),
                        expected: param.ty,
                    });
                }
            }
        }

        debug!(action = %descriptor.name, params = descriptor.parameters.len(), "registered action");
        self.actions
            .insert(descriptor.name.clone(), Arc::new(descriptor));
        Ok(())
    }

    /// Look an action up by name.
    pub fn lookup(&self, name: &str) -> Result<Arc<ActionDescriptor>, RegistryError> {
        self.actions
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownAction {
                name: name.to_string(),
                available: self.names().map(str::to_string).collect(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Registered names in registration order. Each call starts over.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.actions.keys().map(String::as_str)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ActionDescriptor> + '_ {
        self.actions.values().map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
