//! `labflow define`: build a recipe from `--step` flags or interactively.

use clap::Args;
use labflow_core::actions::parse_assignments;
use labflow_core::recipes::{DefinitionError, Recipe, RecipeBuilder, RecipeStore, Turn, FINISH};
use tracing::info;

use super::CliResult;
use crate::prompt::Prompter;
use crate::session::Session;

#[derive(Args)]
pub struct DefineArgs {
    /// Recipe name
    pub name: String,
    /// Recipe description
    #[arg(short, long)]
    pub description: Option<String>,
    /// A whole step, e.g. "set-field target={field} device=cryo-01".
    /// Repeat for more steps. Without any, steps are asked for interactively.
    #[arg(long = "step", value_name = "STEP")]
    pub steps: Vec<String>,
}

pub fn run(args: DefineArgs, session: &mut Session) -> CliResult {
    let mut builder = RecipeBuilder::new(&session.registry, &args.name)?;
    if let Some(description) = &args.description {
        builder = builder.with_description(description.as_str());
    }

    let recipe = if args.steps.is_empty() {
        let mut prompter = Prompter::stdio();
        if session.store.load(&args.name)?.is_some()
            && !prompter.confirm(&format!("Recipe '{}' exists. Replace it?", args.name), false)?
        {
            println!("Nothing saved.");
            return Ok(());
        }
        interactive(builder, &mut prompter)?
    } else {
        for line in &args.steps {
            let words = shell_words::split(line)?;
            let (action, params) = words
                .split_first()
                .ok_or_else(|| DefinitionError::InvalidStep(line.clone()))?;
            builder.add_step(action, &parse_assignments(params)?)?;
        }
        builder.finish()?
    };

    let steps = recipe.steps.len();
    let variables = recipe.variables();
    let replaced = session.store.save(recipe)?;
    info!(recipe = %args.name, steps, replaced, "recipe saved");

    let verb = if replaced { "Replaced" } else { "Saved" };
    println!("{verb} recipe '{}' ({steps} step(s)).", args.name);
    if !variables.is_empty() {
        let names: Vec<_> = variables.into_iter().collect();
        println!("Loop variables: {}", names.join(", "));
    }
    Ok(())
}

/// Drive the builder from prompts until the user types `finish`.
///
/// Recoverable errors are shown and the same question is asked again. End of
/// input abandons the definition.
fn interactive<R, W>(
    mut builder: RecipeBuilder<'_>,
    prompter: &mut Prompter<R, W>,
) -> Result<Recipe, Box<dyn std::error::Error>>
where
    R: std::io::BufRead,
    W: std::io::Write,
{
    prompter.say(&format!(
        "Enter actions one at a time. Type '{FINISH}' when done."
    ))?;

    let mut turn = Turn::NeedAction;
    loop {
        let (question, is_action) = match &turn {
            Turn::Committed(recipe) => return Ok(recipe.clone()),
            Turn::NeedAction => (format!("step {} action: ", builder.steps().len() + 1), true),
            Turn::NeedValue(spec) => {
                let mut q = format!("  {} ({})", spec.name, spec.ty);
                if !spec.description.is_empty() {
                    q.push_str(&format!(" - {}", spec.description));
                }
                match &spec.default {
                    Some(default) => q.push_str(&format!(" [{default}]: ")),
                    None => q.push_str(": "),
                }
                (q, false)
            }
        };

        let Some(answer) = prompter.ask(&question)? else {
            builder.abort();
            return Err("definition abandoned; nothing saved".into());
        };
        if is_action && answer.trim().is_empty() {
            continue;
        }

        let result = if is_action {
            builder.begin_step(&answer)
        } else {
            builder.supply(&answer)
        };
        match result {
            Ok(next) => turn = next,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => prompter.say(&format!("  {e}"))?,
        }
    }
}
