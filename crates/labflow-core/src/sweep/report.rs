//! Loop execution reports.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use uuid::Uuid;

use crate::actions::InvocationResult;

/// How one iteration ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IterationStatus {
    /// Every step succeeded
    Succeeded,
    /// A step failed; later steps of the iteration were not run
    Failed {
        /// Recipe containing the failing step
        recipe: String,
        /// 1-based position of the step in its recipe
        step: usize,
        action: String,
    },
    /// The run was cancelled during this iteration
    Cancelled,
}

/// Steps executed for one set of loop values
#[derive(Debug, Clone, Serialize)]
pub struct IterationReport {
    /// 0-based iteration number
    pub index: usize,
    /// Loop variable values used for this iteration
    pub assignments: IndexMap<String, f64>,
    /// Invocation results, in execution order across all recipes
    pub steps: Vec<InvocationResult>,
    #[serde(flatten)]
    pub status: IterationStatus,
}

impl IterationReport {
    pub fn succeeded(&self) -> bool {
        self.status == IterationStatus::Succeeded
    }
}

/// Why a run stopped early
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum AbortReason {
    /// The abort signal was raised (Ctrl-C)
    Cancelled,
    /// A step failed under the abort-loop policy
    StepFailed {
        iteration: usize,
        recipe: String,
        step: usize,
        action: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoopOutcome {
    Completed,
    Aborted(AbortReason),
}

/// Full record of one loop run
#[derive(Debug, Clone, Serialize)]
pub struct LoopReport {
    pub run_id: Uuid,
    /// Recipes run on every iteration, in order
    pub recipes: Vec<String>,
    /// Number of iterations the sweep defines
    pub planned: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub iterations: Vec<IterationReport>,
    #[serde(flatten)]
    pub outcome: LoopOutcome,
}

impl LoopReport {
    pub(crate) fn new(recipes: Vec<String>, planned: usize) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            recipes,
            planned,
            started_at: now,
            finished_at: now,
            iterations: Vec::new(),
            outcome: LoopOutcome::Completed,
        }
    }

    /// Number of iterations that completed without a failing step
    pub fn success_count(&self) -> usize {
        self.iterations.iter().filter(|i| i.succeeded()).count()
    }

    /// Number of iterations with a failing step
    pub fn failure_count(&self) -> usize {
        self.iterations
            .iter()
            .filter(|i| matches!(i.status, IterationStatus::Failed { .. }))
            .count()
    }

    /// Total invocations across all iterations
    pub fn invocation_count(&self) -> usize {
        self.iterations.iter().map(|i| i.steps.len()).sum()
    }

    /// Completed with no failed iteration
    pub fn is_success(&self) -> bool {
        self.outcome == LoopOutcome::Completed && self.failure_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iteration(index: usize, status: IterationStatus) -> IterationReport {
        IterationReport {
            index,
            assignments: IndexMap::from([("field".to_string(), index as f64)]),
            steps: Vec::new(),
            status,
        }
    }

    #[test]
    fn test_report_counts() {
        let mut report = LoopReport::new(vec!["ramp".into()], 3);
        report.iterations.push(iteration(0, IterationStatus::Succeeded));
        report.iterations.push(iteration(
            1,
            IterationStatus::Failed {
                recipe: "ramp".into(),
                step: 1,
                action: "set-field".into(),
            },
        ));
        report.iterations.push(iteration(2, IterationStatus::Succeeded));

        assert_eq!(report.success_count(), 2);
        assert_eq!(report.failure_count(), 1);
        assert!(!report.is_success());
    }

    #[test]
    fn test_report_serializes_outcome() {
        let mut report = LoopReport::new(vec!["ramp".into()], 1);
        report.outcome = LoopOutcome::Aborted(AbortReason::Cancelled);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"], "aborted");
        assert_eq!(json["reason"], "cancelled");
        assert_eq!(json["recipes"][0], "ramp");
    }
}
