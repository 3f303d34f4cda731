use clap::Args;
use labflow_core::recipes::RecipeStore;
use labflow_core::sweep::LoopExecutor;
use labflow_core::{FailurePolicy, LoopSpec};

use super::progress::{outcome_error, print_summary, ProgressPrinter};
use super::CliResult;
use crate::prompt::Prompter;
use crate::session::Session;

#[derive(Args)]
pub struct RunLoopArgs {
    /// Recipe to run on every iteration
    pub recipe: String,
    /// Loop variable, referenced as {NAME} in the recipe
    #[arg(long)]
    pub variable: String,
    /// First value
    #[arg(long, allow_hyphen_values = true)]
    pub start: f64,
    /// Last value (inclusive)
    #[arg(long, allow_hyphen_values = true)]
    pub end: f64,
    /// Increment; its sign must point from start to end
    #[arg(long, allow_hyphen_values = true)]
    pub step: f64,
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

pub async fn run(args: RunLoopArgs, session: &mut Session) -> CliResult {
    let recipe = session.store.get(&args.recipe)?;
    let spec = LoopSpec::new(&args.variable, args.start, args.end, args.step)
        .with_limits(session.config.sweep_limits());
    let count = spec.count()?;
    let policy = args.policy.unwrap_or_else(|| session.config.failure_policy());

    if !args.json {
        println!(
            "Recipe '{}' ({} step(s)), {spec}: {count} iteration(s), policy {policy}.",
            recipe.name,
            recipe.steps.len()
        );
    }
    if session.config.loop_.confirm_before_start
        && !args.yes
        && !Prompter::stdio().confirm("Start?", false)?
    {
        println!("Not started.");
        return Ok(());
    }

    let json = args.json;
    let (invoker, ctx) = session.split();
    let executor = LoopExecutor::new(invoker).with_policy(policy);
    let mut printer = ProgressPrinter::new(json);
    let report = executor.run(&recipe, &spec, ctx, &mut printer).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    outcome_error(&report)
}
