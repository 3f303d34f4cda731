//! Incremental recipe definition.
//!
//! [`RecipeBuilder`] drives the define dialogue: pick an action, supply each
//! of its parameters in turn, repeat, then `finish`. Nothing is persisted
//! until the caller saves the committed [`Recipe`].

use std::sync::Arc;

use indexmap::IndexMap;

use super::error::DefinitionError;
use super::recipe::{Recipe, Step};
use super::template::Binding;
use crate::actions::{ActionDescriptor, ActionRegistry, ParamSpec, RawArgs};

/// Reserved input that ends the definition.
pub const FINISH: &str = "finish";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderState {
    /// Waiting for an action name or `finish`.
    Idle,
    /// Collecting parameter values for the current step.
    CollectingStep,
    Committed,
    Aborted,
}

/// What the builder needs next.
#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    /// An action name or [`FINISH`].
    NeedAction,
    /// A value for this parameter. An empty answer keeps the default.
    NeedValue(ParamSpec),
    Committed(Recipe),
}

struct PendingStep {
    descriptor: Arc<ActionDescriptor>,
    bindings: IndexMap<String, Binding>,
    next: usize,
}

pub struct RecipeBuilder<'r> {
    registry: &'r ActionRegistry,
    recipe: Recipe,
    pending: Option<PendingStep>,
    state: BuilderState,
}

impl<'r> RecipeBuilder<'r> {
    pub fn new(registry: &'r ActionRegistry, name: &str) -> Result<Self, DefinitionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DefinitionError::EmptyName);
        }
        Ok(Self {
            registry,
            recipe: Recipe::new(name),
            pending: None,
            state: BuilderState::Idle,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.recipe.description = description.into();
        self
    }

    pub fn state(&self) -> BuilderState {
        self.state
    }

    pub fn steps(&self) -> &[Step] {
        &self.recipe.steps
    }

    /// The action whose parameters are being collected.
    pub fn current_action(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.descriptor.name.as_str())
    }

    /// Pick the next action, or [`FINISH`] to commit.
    ///
    /// An unknown action name aborts the whole definition.
    pub fn begin_step(&mut self, action: &str) -> Result<Turn, DefinitionError> {
        self.ensure_open()?;
        if self.state == BuilderState::CollectingStep {
            return Err(DefinitionError::IncompleteStep(
                self.current_action().unwrap_or_default().to_string(),
            ));
        }

        let action = action.trim();
        if action == FINISH {
            return self.commit().map(Turn::Committed);
        }

        let descriptor = match self.registry.lookup(action) {
            Ok(descriptor) => descriptor,
            Err(_) => {
                self.abort();
                return Err(DefinitionError::UnknownAction(action.to_string()));
            }
        };

        self.pending = Some(PendingStep {
            descriptor,
            bindings: IndexMap::new(),
            next: 0,
        });
        self.state = BuilderState::CollectingStep;
        Ok(self.advance())
    }

    /// Answer the current parameter prompt.
    ///
    /// A missing value for a required parameter or a malformed marker is
    /// recoverable: the same parameter is asked again.
    pub fn supply(&mut self, raw: &str) -> Result<Turn, DefinitionError> {
        self.ensure_open()?;
        let pending = self
            .pending
            .as_mut()
            .ok_or_else(|| DefinitionError::InvalidStep(raw.to_string()))?;
        let spec = pending.descriptor.parameters[pending.next].clone();

        let raw = raw.trim();
        if raw.is_empty() {
            if spec.is_required() {
                return Err(DefinitionError::MissingValue {
                    action: pending.descriptor.name.clone(),
                    param: spec.name,
                });
            }
        } else {
            pending.bindings.insert(spec.name, Binding::parse(raw)?);
        }
        pending.next += 1;
        Ok(self.advance())
    }

    /// Add a whole step at once, as given by `define --step`.
    pub fn add_step(&mut self, action: &str, args: &RawArgs) -> Result<(), DefinitionError> {
        self.ensure_open()?;
        let descriptor = match self.registry.lookup(action) {
            Ok(descriptor) => descriptor,
            Err(_) => {
                self.abort();
                return Err(DefinitionError::UnknownAction(action.to_string()));
            }
        };

        let mut step = Step::new(action);
        for (param, raw) in args {
            if descriptor.param(param).is_none() {
                return Err(DefinitionError::UnknownParameter {
                    action: action.to_string(),
                    param: param.clone(),
                });
            }
            step.bindings.insert(param.clone(), Binding::parse(raw)?);
        }
        if let Some(spec) = descriptor
            .parameters
            .iter()
            .find(|p| p.is_required() && !step.bindings.contains_key(&p.name))
        {
            return Err(DefinitionError::MissingValue {
                action: action.to_string(),
                param: spec.name.clone(),
            });
        }
        self.recipe.steps.push(step);
        Ok(())
    }

    /// Commit the recipe. Consumes the builder.
    pub fn finish(mut self) -> Result<Recipe, DefinitionError> {
        self.commit()
    }

    /// Discard everything collected so far.
    pub fn abort(&mut self) {
        self.pending = None;
        self.recipe.steps.clear();
        self.state = BuilderState::Aborted;
    }

    fn ensure_open(&self) -> Result<(), DefinitionError> {
        match self.state {
            BuilderState::Committed | BuilderState::Aborted => Err(DefinitionError::Closed),
            _ => Ok(()),
        }
    }

    fn commit(&mut self) -> Result<Recipe, DefinitionError> {
        self.ensure_open()?;
        if let Some(action) = self.current_action() {
            return Err(DefinitionError::IncompleteStep(action.to_string()));
        }
        if self.recipe.steps.is_empty() {
            return Err(DefinitionError::EmptyRecipe(self.recipe.name.clone()));
        }
        self.recipe.validate(self.registry)?;
        self.state = BuilderState::Committed;
        Ok(self.recipe.clone())
    }

    /// Move to the next parameter prompt, or close the step.
    fn advance(&mut self) -> Turn {
        let Some(pending) = self.pending.as_ref() else {
            return Turn::NeedAction;
        };
        if let Some(spec) = pending.descriptor.parameters.get(pending.next) {
            return Turn::NeedValue(spec.clone());
        }

        if let Some(done) = self.pending.take() {
            self.recipe.steps.push(Step {
                action: done.descriptor.name.clone(),
                bindings: done.bindings,
            });
        }
        self.state = BuilderState::Idle;
        Turn::NeedAction
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

    fn need_value(turn: Turn) -> ParamSpec {
        match turn {
            Turn::NeedValue(spec) => spec,
            other => panic!("expected a value prompt, got {other:?}"),
        }
    }

    #[test]
    fn test_interactive_definition() {
        let registry = registry();
        let mut builder = RecipeBuilder::new(&registry, "field-step").unwrap();

        let spec = need_value(builder.begin_step("set-field").unwrap());
        assert_eq!(spec.name, "target");
        let spec = need_value(builder.supply("{field}").unwrap());
        assert_eq!(spec.name, "device");
        assert_eq!(builder.supply("").unwrap(), Turn::NeedAction);

        let Turn::Committed(recipe) = builder.begin_step(FINISH).unwrap() else {
            panic!("expected commit");
        };
        assert_eq!(recipe.steps.len(), 1);
        assert_eq!(recipe.steps[0].bindings["target"].as_str(), "{field}");
        assert!(!recipe.steps[0].bindings.contains_key("device"));
        assert_eq!(builder.state(), BuilderState::Committed);
    }

    #[test]
    fn test_unknown_action_aborts() {
        let registry = registry();
        let mut builder = RecipeBuilder::new(&registry, "r").unwrap();
        builder.begin_step("note").unwrap();
        builder.supply("hello").unwrap();

        let err = builder.begin_step("warp-drive").unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(builder.state(), BuilderState::Aborted);
        assert!(builder.steps().is_empty());
        assert_eq!(builder.begin_step(FINISH).unwrap_err(), DefinitionError::Closed);
    }

    #[test]
    fn test_missing_required_value_is_recoverable() {
        let registry = registry();
        let mut builder = RecipeBuilder::new(&registry, "r").unwrap();
        builder.begin_step("wait").unwrap();

        let err = builder.supply("  ").unwrap_err();
        assert!(!err.is_fatal());
        assert_eq!(builder.state(), BuilderState::CollectingStep);

        assert_eq!(builder.supply("2").unwrap(), Turn::NeedAction);
        assert_eq!(builder.steps().len(), 1);
    }

    #[test]
    fn test_malformed_marker_is_recoverable() {
        let registry = registry();
        let mut builder = RecipeBuilder::new(&registry, "r").unwrap();
        builder.begin_step("wait").unwrap();

        assert!(matches!(
            builder.supply("{seconds"),
            Err(DefinitionError::MalformedTemplate(_))
        ));
        assert_eq!(builder.current_action(), Some("wait"));
    }

    #[test]
    fn test_finish_requires_steps() {
        let registry = registry();
        let mut builder = RecipeBuilder::new(&registry, "r").unwrap();
        assert_eq!(
            builder.begin_step(FINISH).unwrap_err(),
            DefinitionError::EmptyRecipe("r".into())
        );
        assert_eq!(builder.state(), BuilderState::Idle);
    }

    #[test]
    fn test_add_step_checks_parameters() {
        let registry = registry();
        let mut builder = RecipeBuilder::new(&registry, "r").unwrap();

        let bogus: RawArgs = [("tesla".to_string(), "1".to_string())].into();
        assert!(matches!(
            builder.add_step("set-field", &bogus),
            Err(DefinitionError::UnknownParameter { .. })
        ));

        let args: RawArgs = [("target".to_string(), "{field}".to_string())].into();
        builder.add_step("set-field", &args).unwrap();
        let recipe = builder.finish().unwrap();
        assert_eq!(recipe.variables().len(), 1);
    }

    #[test]
    fn test_add_step_unknown_action_aborts() {
        let registry = registry();
        let mut builder = RecipeBuilder::new(&registry, "r").unwrap();
        let args: RawArgs = [("seconds".to_string(), "1".to_string())].into();
        builder.add_step("wait", &args).unwrap();

        let err = builder.add_step("warp-drive", &RawArgs::new()).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(builder.state(), BuilderState::Aborted);
        assert!(builder.steps().is_empty());
        assert_eq!(
            builder.add_step("wait", &args).unwrap_err(),
            DefinitionError::Closed
        );
        assert_eq!(builder.finish().unwrap_err(), DefinitionError::Closed);
    }

    #[test]
    fn test_empty_name_rejected() {
        let registry = registry();
        assert!(matches!(
            RecipeBuilder::new(&registry, "  "),
            Err(DefinitionError::EmptyName)
        ));
    }
}
