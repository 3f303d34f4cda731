//! Console output for loop runs.

use indexmap::IndexMap;
use labflow_core::actions::InvocationResult;
use labflow_core::sweep::{
    AbortReason, IterationReport, IterationStatus, LoopObserver, LoopOutcome, LoopState,
};
use labflow_core::LoopReport;

use super::run::format_result;

/// Prints one line per iteration and per step. Quiet in JSON mode.
pub struct ProgressPrinter {
    quiet: bool,
}

impl ProgressPrinter {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl LoopObserver for ProgressPrinter {
    fn on_state(&mut self, state: LoopState) {
        tracing::debug!(%state, "loop state");
    }

    fn on_iteration_start(&mut self, index: usize, total: usize, assignments: &IndexMap<String, f64>) {
        if !self.quiet {
            println!("[{}/{total}] {}", index + 1, format_assignments(assignments));
        }
    }

    fn on_step(&mut self, _iteration: usize, result: &InvocationResult) {
        if !self.quiet {
            println!("  {}", format_result(result));
        }
    }

    fn on_iteration_end(&mut self, report: &IterationReport) {
        if !self.quiet && report.status == IterationStatus::Cancelled {
            println!("  cancelled");
        }
    }
}

pub fn format_assignments(assignments: &IndexMap<String, f64>) -> String {
    assignments
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn print_summary(report: &LoopReport) {
    println!();
    match &report.outcome {
        LoopOutcome::Completed => println!(
            "Completed {} of {} iteration(s): {} ok, {} failed, {} invocation(s).",
            report.iterations.len(),
            report.planned,
            report.success_count(),
            report.failure_count(),
            report.invocation_count()
        ),
        LoopOutcome::Aborted(AbortReason::Cancelled) => println!(
            "Cancelled after {} of {} iteration(s).",
            report.iterations.len(),
            report.planned
        ),
        LoopOutcome::Aborted(AbortReason::StepFailed {
            iteration,
            recipe,
            step,
            action,
        }) => println!(
            "Aborted at iteration {} of {}: step {step} ({action}) of '{recipe}' failed.",
            iteration + 1,
            report.planned
        ),
    }
}

/// Error for a run that did not fully succeed, so the process exits non-zero.
pub fn outcome_error(report: &LoopReport) -> Result<(), Box<dyn std::error::Error>> {
    if report.is_success() {
        return Ok(());
    }
    match &report.outcome {
        LoopOutcome::Aborted(AbortReason::Cancelled) => Err("loop cancelled".into()),
        _ => Err(format!(
            "loop finished with {} failed iteration(s)",
            report.failure_count()
        )
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments_are_joined_in_order() {
        let assignments = IndexMap::from([("field".to_string(), 0.5), ("p".to_string(), 2.0)]);
        assert_eq!(format_assignments(&assignments), "field=0.5 p=2");
    }
}
