//! Recipe definition.
//!
//! A recipe is a named, ordered list of steps. Each step names a registered
//! action and binds its parameters to literal values or loop markers.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::error::{DefinitionError, TemplateError};
use super::template::Binding;
use crate::actions::{ActionRegistry, RawArgs};

/// One action invocation inside a recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Registered action name
    pub action: String,

    /// Parameter bindings, in the order they were entered
    #[serde(default)]
    pub bindings: IndexMap<String, Binding>,
}

impl Step {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            bindings: IndexMap::new(),
        }
    }

    pub fn with_binding(mut self, param: impl Into<String>, binding: Binding) -> Self {
        self.bindings.insert(param.into(), binding);
        self
    }

    /// Marker names referenced by this step.
    pub fn variables(&self) -> BTreeSet<&str> {
        self.bindings.values().flat_map(Binding::variables).collect()
    }

    /// Substitute markers; `index` is only used for error reporting.
    pub fn resolve(
        &self,
        index: usize,
        env: &IndexMap<String, String>,
    ) -> Result<RawArgs, TemplateError> {
        self.bindings
            .iter()
            .map(|(param, binding)| {
                binding
                    .resolve(env)
                    .map(|value| (param.clone(), value))
                    .map_err(|variable| TemplateError::Unresolved {
                        variable,
                        step: index + 1,
                        action: self.action.clone(),
                    })
            })
            .collect()
    }
}

/// A saved, reusable sequence of steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Unique name within the store
    pub name: String,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Steps in execution order
    #[serde(default)]
    pub steps: Vec<Step>,

    /// Last time the recipe was saved
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// A step with every marker substituted
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStep {
    pub action: String,
    pub args: RawArgs,
}

impl Recipe {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            steps: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// All marker names used anywhere in the recipe.
    pub fn variables(&self) -> BTreeSet<String> {
        self.steps
            .iter()
            .flat_map(|s| s.variables())
            .map(str::to_string)
            .collect()
    }

    /// Check every step against the registry: known action, known
    /// parameters, and a binding for every parameter without a default.
    pub fn validate(&self, registry: &ActionRegistry) -> Result<(), DefinitionError> {
        if self.name.trim().is_empty() {
            return Err(DefinitionError::EmptyName);
        }
        for step in &self.steps {
            let descriptor = registry
                .lookup(&step.action)
                .map_err(|_| DefinitionError::UnknownAction(step.action.clone()))?;

            if let Some(param) = step
                .bindings
                .keys()
                .find(|name| descriptor.param(name).is_none())
            {
                return Err(DefinitionError::UnknownParameter {
                    action: step.action.clone(),
                    param: param.clone(),
                });
            }
            if let Some(spec) = descriptor
                .parameters
                .iter()
                .find(|p| p.is_required() && !step.bindings.contains_key(&p.name))
            {
                return Err(DefinitionError::MissingValue {
                    action: step.action.clone(),
                    param: spec.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Resolve every step against `env`. Fails on the first marker with no
    /// value, before any step could be run.
    pub fn resolve(&self, env: &IndexMap<String, String>) -> Result<Vec<ResolvedStep>, TemplateError> {
        self.steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                Ok(ResolvedStep {
                    action: step.action.clone(),
                    args: step.resolve(i, env)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::register_builtin_actions;

    fn registry() -> ActionRegistry {
        let mut registry = ActionRegistry::new();
        register_builtin_actions(&mut registry).unwrap();
        registry
    }

    fn field_recipe() -> Recipe {
        Recipe::new("field-step")
            .with_step(
                Step::new("set-field").with_binding("target", Binding::parse("{field}").unwrap()),
            )
            .with_step(
                Step::new("note")
                    .with_binding("message", Binding::parse("field at {field} T").unwrap()),
            )
    }

    #[test]
    fn test_variables_collected_across_steps() {
        let recipe = field_recipe();
        assert_eq!(recipe.variables().into_iter().collect::<Vec<_>>(), vec!["field"]);
    }

    #[test]
    fn test_validate_accepts_builtin_steps() {
        assert!(field_recipe().validate(&registry()).is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_action() {
        let recipe = Recipe::new("bad").with_step(Step::new("warp-drive"));
        assert_eq!(
            recipe.validate(&registry()),
            Err(DefinitionError::UnknownAction("warp-drive".into()))
        );
    }

    #[test]
    fn test_validate_rejects_missing_required_binding() {
        let recipe = Recipe::new("bad").with_step(Step::new("set-field"));
        assert!(matches!(
            recipe.validate(&registry()),
            Err(DefinitionError::MissingValue { param, .. }) if param == "target"
        ));
    }

    #[test]
    fn test_resolve_substitutes_values() {
        let env: IndexMap<String, String> = [("field".to_string(), "0.1".to_string())].into();
        let steps = field_recipe().resolve(&env).unwrap();

        assert_eq!(steps[0].args["target"], "0.1");
        assert_eq!(steps[1].args["message"], "field at 0.1 T");
    }

    #[test]
    fn test_resolve_reports_step_and_variable() {
        let err = field_recipe().resolve(&IndexMap::new()).unwrap_err();
        assert_eq!(
            err,
            TemplateError::Unresolved {
                variable: "field".into(),
                step: 1,
                action: "set-field".into(),
            }
        );
    }
}
