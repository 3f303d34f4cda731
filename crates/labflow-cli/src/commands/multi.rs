use std::time::Duration;

use clap::Args;
use labflow_core::recipes::RecipeStore;
use labflow_core::sweep::{LoopExecutor, MultiSweep, SweepAxis};
use labflow_core::FailurePolicy;

use super::progress::{outcome_error, print_summary, ProgressPrinter};
use super::CliResult;
use crate::prompt::Prompter;
use crate::session::Session;

#[derive(Args)]
pub struct RunMultiArgs {
    /// Recipes run in order on every iteration
    #[arg(required = true)]
    pub recipes: Vec<String>,
    /// Swept variable, NAME=START:END:STEP or NAME=V1,V2,...
    #[arg(long = "var", value_name = "AXIS", required = true, allow_hyphen_values = true)]
    pub vars: Vec<String>,
    /// Seconds to wait between recipes (overrides loop.recipe_delay_secs)
    #[arg(long)]
    pub delay: Option<f64>,
    /// What to do when a step fails (abort-loop, skip-iteration)
    #[arg(long)]
    pub policy: Option<FailurePolicy>,
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
    /// Output the report as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: RunMultiArgs, session: &mut Session) -> CliResult {
    let recipes = args
        .recipes
        .iter()
        .map(|name| session.store.get(name))
        .collect::<Result<Vec<_>, _>>()?;

    let limits = session.config.sweep_limits();
    let axes = args
        .vars
        .iter()
        .map(|assignment| SweepAxis::parse(assignment, limits))
        .collect::<Result<Vec<_>, _>>()?;
    let sweep = MultiSweep::new(axes)?;

    let delay = match args.delay {
        Some(secs) => delay_from_secs(secs)?,
        None => session.config.recipe_delay(),
    };
    let policy = args.policy.unwrap_or_else(|| session.config.failure_policy());

    if !args.json {
        println!(
            "Recipes {}: {} iteration(s), policy {policy}.",
            args.recipes.join(", "),
            sweep.len()
        );
        for axis in sweep.axes() {
            println!("  {} ({} value(s))", axis.variable, axis.len());
        }
    }

    let mismatched = sweep.has_mismatched_lengths();
    if mismatched {
        eprintln!("warning: axes differ in length; shorter axes repeat their last value");
    }
    let confirm = !args.yes && (mismatched || session.config.loop_.confirm_before_start);
    if confirm && !Prompter::stdio().confirm("Start?", false)? {
        println!("Not started.");
        return Ok(());
    }

    let json = args.json;
    let (invoker, ctx) = session.split();
    let executor = LoopExecutor::new(invoker)
        .with_policy(policy)
        .with_recipe_delay(delay);
    let mut printer = ProgressPrinter::new(json);
    let report = executor.run_multi(&recipes, &sweep, ctx, &mut printer).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    outcome_error(&report)
}

fn delay_from_secs(secs: f64) -> Result<Duration, String> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| format!("invalid delay {secs}: must be a non-negative number of seconds"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_accepts_fractional_seconds() {
        assert_eq!(delay_from_secs(0.25), Ok(Duration::from_millis(250)));
        assert_eq!(delay_from_secs(0.0), Ok(Duration::ZERO));
    }

    #[test]
    fn delay_rejects_values_without_a_duration() {
        for secs in [-1.0, 1e30, f64::INFINITY, f64::NAN] {
            assert!(delay_from_secs(secs).is_err(), "{secs} accepted");
        }
    }
}
