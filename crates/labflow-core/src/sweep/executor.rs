//! Loop execution.
//!
//! A run goes through `Generating` (expand the sweep), `Resolving` (check
//! every recipe against the registry and the loop variables) and
//! `Executing`. Nothing touches the context or a device until the first two
//! phases pass.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument as _};

use super::multi::MultiSweep;
use super::report::{AbortReason, IterationReport, IterationStatus, LoopOutcome, LoopReport};
use super::spec::{LoopSpec, LoopSpecError};
use super::LOOP_CONTEXT_KEY;
use crate::actions::{InvocationError, InvocationResult, Invoker};
use crate::context::ExecutionContext;
use crate::recipes::{DefinitionError, Recipe, TemplateError};

/// What to do with the rest of the loop when a step fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop the whole loop
    #[default]
    AbortLoop,
    /// Skip the rest of this iteration and go on with the next value
    SkipIteration,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::AbortLoop => write!(f, "abort-loop"),
            FailurePolicy::SkipIteration => write!(f, "skip-iteration"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown failure policy '{0}' (expected abort-loop or skip-iteration)")]
pub struct UnknownPolicy(pub String);

impl FromStr for FailurePolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "abort-loop" | "abort" => Ok(FailurePolicy::AbortLoop),
            "skip-iteration" | "skip" => Ok(FailurePolicy::SkipIteration),
            other => Err(UnknownPolicy(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Generating,
    Resolving,
    Executing,
    Completed,
    Aborted,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoopState::Idle => "idle",
            LoopState::Generating => "generating",
            LoopState::Resolving => "resolving",
            LoopState::Executing => "executing",
            LoopState::Completed => "completed",
            LoopState::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Progress callbacks. All methods default to doing nothing.
pub trait LoopObserver: Send {
    fn on_state(&mut self, _state: LoopState) {}

    fn on_iteration_start(
        &mut self,
        _index: usize,
        _total: usize,
        _assignments: &IndexMap<String, f64>,
    ) {
    }

    fn on_step(&mut self, _iteration: usize, _result: &InvocationResult) {}

    fn on_iteration_end(&mut self, _report: &IterationReport) {}
}

/// Observer that ignores everything.
pub struct Silent;

impl LoopObserver for Silent {}

/// Structural problems found before the first step runs.
#[derive(Error, Debug)]
pub enum LoopError {
    #[error(transparent)]
    Spec(#[from] LoopSpecError),

    #[error("Recipe '{recipe}': {source}")]
    Definition {
        recipe: String,
        #[source]
        source: DefinitionError,
    },

    #[error("Recipe '{recipe}': {source}")]
    Template {
        recipe: String,
        #[source]
        source: TemplateError,
    },

    #[error("Recipe '{recipe}': {source}")]
    Binding {
        recipe: String,
        #[source]
        source: InvocationError,
    },

    #[error("No recipes to run")]
    NoRecipes,
}

/// Runs recipes once per sweep value.
pub struct LoopExecutor<'r> {
    invoker: Invoker<'r>,
    policy: FailurePolicy,
    recipe_delay: Duration,
}

impl<'r> LoopExecutor<'r> {
    pub fn new(invoker: Invoker<'r>) -> Self {
        Self {
            invoker,
            policy: FailurePolicy::default(),
            recipe_delay: Duration::ZERO,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Pause between consecutive recipes of one iteration.
    pub fn with_recipe_delay(mut self, delay: Duration) -> Self {
        self.recipe_delay = delay;
        self
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Sweep one variable over a single recipe.
    pub async fn run(
        &self,
        recipe: &Recipe,
        spec: &LoopSpec,
        ctx: &mut ExecutionContext,
        observer: &mut dyn LoopObserver,
    ) -> Result<LoopReport, LoopError> {
        observer.on_state(LoopState::Idle);
        observer.on_state(LoopState::Generating);
        let result = match spec.values() {
            Ok(values) => {
                let total = values.len();
                let variable = spec.variable.clone();
                let plan = values.map(move |v| IndexMap::from([(variable.clone(), v)]));
                self.execute(std::slice::from_ref(recipe), plan, total, ctx, observer)
                    .await
            }
            Err(err) => Err(err.into()),
        };
        aborted_on_err(result, observer)
    }

    /// Sweep several variables in lockstep over a list of recipes.
    pub async fn run_multi(
        &self,
        recipes: &[Recipe],
        sweep: &MultiSweep,
        ctx: &mut ExecutionContext,
        observer: &mut dyn LoopObserver,
    ) -> Result<LoopReport, LoopError> {
        observer.on_state(LoopState::Idle);
        observer.on_state(LoopState::Generating);
        let result = self
            .execute(recipes, sweep.iter(), sweep.len(), ctx, observer)
            .await;
        aborted_on_err(result, observer)
    }

    async fn execute<I>(
        &self,
        recipes: &[Recipe],
        plan: I,
        total: usize,
        ctx: &mut ExecutionContext,
        observer: &mut dyn LoopObserver,
    ) -> Result<LoopReport, LoopError>
    where
        I: Iterator<Item = IndexMap<String, f64>>,
    {
        if recipes.is_empty() {
            return Err(LoopError::NoRecipes);
        }
        let mut plan = plan.peekable();

        observer.on_state(LoopState::Resolving);
        if let Some(first) = plan.peek() {
            self.check(recipes, first)?;
        }

        let mut report = LoopReport::new(recipes.iter().map(|r| r.name.clone()).collect(), total);
        let span = info_span!("loop", run_id = %report.run_id);
        async {
            info!(
                recipes = ?report.recipes,
                iterations = total,
                policy = %self.policy,
                "loop started"
            );
            observer.on_state(LoopState::Executing);

            for (index, assignments) in plan.enumerate() {
                if ctx.is_aborted() {
                    report.outcome = LoopOutcome::Aborted(AbortReason::Cancelled);
                    break;
                }
                observer.on_iteration_start(index, total, &assignments);
                let iteration = match self
                    .run_iteration(index, recipes, assignments, ctx, observer)
                    .await
                {
                    Ok(iteration) => iteration,
                    Err(err) => {
                        ctx.remove_var(LOOP_CONTEXT_KEY);
                        return Err(err);
                    }
                };
                observer.on_iteration_end(&iteration);

                let stop = match &iteration.status {
                    IterationStatus::Succeeded => None,
                    IterationStatus::Cancelled => Some(AbortReason::Cancelled),
                    IterationStatus::Failed { recipe, step, action } => {
                        warn!(index, %recipe, step = *step, %action, "iteration failed");
                        match self.policy {
                            FailurePolicy::AbortLoop => Some(AbortReason::StepFailed {
                                iteration: index,
                                recipe: recipe.clone(),
                                step: *step,
                                action: action.clone(),
                            }),
                            FailurePolicy::SkipIteration => None,
                        }
                    }
                };
                report.iterations.push(iteration);
                if let Some(reason) = stop {
                    report.outcome = LoopOutcome::Aborted(reason);
                    break;
                }
            }

            ctx.remove_var(LOOP_CONTEXT_KEY);
            report.finished_at = chrono::Utc::now();
            match &report.outcome {
                LoopOutcome::Completed => {
                    observer.on_state(LoopState::Completed);
                    info!(
                        iterations = report.iterations.len(),
                        failed = report.failure_count(),
                        "loop completed"
                    );
                }
                LoopOutcome::Aborted(reason) => {
                    observer.on_state(LoopState::Aborted);
                    warn!(?reason, iterations = report.iterations.len(), "loop aborted");
                }
            }
            Ok::<(), LoopError>(())
        }
        .instrument(span)
        .await?;

        Ok(report)
    }

    /// Validate, resolve and bind every step for the first iteration.
    ///
    /// Every iteration assigns the same variable names, so a recipe that
    /// passes here can only fail later on a value-dependent coercion.
    fn check(&self, recipes: &[Recipe], first: &IndexMap<String, f64>) -> Result<(), LoopError> {
        let env = render_env(first);
        let registry = self.invoker.registry();
        for recipe in recipes {
            recipe
                .validate(registry)
                .map_err(|source| LoopError::Definition {
                    recipe: recipe.name.clone(),
                    source,
                })?;
            let steps = recipe.resolve(&env).map_err(|source| LoopError::Template {
                recipe: recipe.name.clone(),
                source,
            })?;
            for step in steps {
                let descriptor =
                    registry
                        .lookup(&step.action)
                        .map_err(|_| LoopError::Definition {
                            recipe: recipe.name.clone(),
                            source: DefinitionError::UnknownAction(step.action.clone()),
                        })?;
                self.invoker
                    .bind(&descriptor, &step.args)
                    .map_err(|source| LoopError::Binding {
                        recipe: recipe.name.clone(),
                        source,
                    })?;
            }
        }
        debug!(recipes = recipes.len(), "recipes resolved");
        Ok(())
    }

    async fn run_iteration(
        &self,
        index: usize,
        recipes: &[Recipe],
        assignments: IndexMap<String, f64>,
        ctx: &mut ExecutionContext,
        observer: &mut dyn LoopObserver,
    ) -> Result<IterationReport, LoopError> {
        let env = render_env(&assignments);
        let mut loop_vars = Map::new();
        for (name, value) in &assignments {
            let value = number(*value);
            ctx.set_var(name.clone(), value.clone());
            loop_vars.insert(name.clone(), value);
        }
        ctx.set_var(LOOP_CONTEXT_KEY, Value::Object(loop_vars));

        let mut iteration = IterationReport {
            index,
            assignments,
            steps: Vec::new(),
            status: IterationStatus::Succeeded,
        };

        for (position, recipe) in recipes.iter().enumerate() {
            if position > 0 && !self.recipe_delay.is_zero() {
                tokio::time::sleep(self.recipe_delay).await;
            }
            for (step_index, step) in recipe.steps.iter().enumerate() {
                if ctx.is_aborted() {
                    iteration.status = IterationStatus::Cancelled;
                    return Ok(iteration);
                }

                let args = step
                    .resolve(step_index, &env)
                    .map_err(|source| LoopError::Template {
                        recipe: recipe.name.clone(),
                        source,
                    })?;
                let result = match self.invoker.invoke(&step.action, &args, ctx).await {
                    Ok(result) => result,
                    Err(err) => InvocationResult::rejected(&step.action, &args, err),
                };
                observer.on_step(index, &result);
                let failed = !result.success;
                iteration.steps.push(result);

                if failed {
                    iteration.status = IterationStatus::Failed {
                        recipe: recipe.name.clone(),
                        step: step_index + 1,
                        action: step.action.clone(),
                    };
                    return Ok(iteration);
                }
            }
        }
        Ok(iteration)
    }
}

/// Reports `Aborted` for runs that end in a structural error.
fn aborted_on_err(
    result: Result<LoopReport, LoopError>,
    observer: &mut dyn LoopObserver,
) -> Result<LoopReport, LoopError> {
    if let Err(err) = &result {
        observer.on_state(LoopState::Aborted);
        warn!(error = %err, "loop aborted before completion");
    }
    result
}

/// String form of each loop value, as substituted into markers.
fn render_env(assignments: &IndexMap<String, f64>) -> IndexMap<String, String> {
    assignments
        .iter()
        .map(|(name, value)| (name.clone(), value.to_string()))
        .collect()
}

fn number(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
