use clap::Args;
use labflow_core::actions::{parse_assignments, InvocationResult};

use super::CliResult;
use crate::prompt::Prompter;
use crate::session::Session;

#[derive(Args)]
pub struct RunArgs {
    /// Action name (see `labflow actions`)
    pub action: String,
    /// Parameters as key=value
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub params: Vec<String>,
    /// Ask for parameters missing from the command line
    #[arg(long)]
    pub prompt: bool,
    /// Output the result as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: RunArgs, session: &mut Session) -> CliResult {
    let mut raw = parse_assignments(&args.params)?;

    if args.prompt {
        let descriptor = session.registry.lookup(&args.action)?;
        let missing: Vec<_> = descriptor
            .parameters
            .iter()
            .filter(|p| !raw.contains_key(&p.name))
            .collect();
        let mut prompter = Prompter::stdio();
        for spec in missing {
            let question = match &spec.default {
                Some(default) => format!("{} ({}) [{}]: ", spec.name, spec.ty, default),
                None => format!("{} ({}): ", spec.name, spec.ty),
            };
            let Some(answer) = prompter.ask(&question)? else {
                return Err("input closed".into());
            };
            let answer = answer.trim();
            if !answer.is_empty() {
                raw.insert(spec.name.clone(), answer.to_string());
            }
        }
    }

    let (invoker, ctx) = session.split();
    let result = invoker.invoke(&args.action, &raw, ctx).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", format_result(&result));
    }
    result.into_result()?;
    Ok(())
}

/// `ok set-field target=0.1 device=cryo-01 (0.2 ms)` or the failure cause.
pub fn format_result(result: &InvocationResult) -> String {
    let args = result
        .resolved_args
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(" ");
    let ms = result.duration.as_secs_f64() * 1000.0;
    match &result.error {
        None => format!("ok {} {args} ({ms:.1} ms)", result.action),
        Some(err) => format!("FAILED {} {args}: {err}", result.action),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labflow_core::actions::{InvocationError, RawArgs};

    #[test]
    fn rejected_result_shows_cause() {
        let raw = RawArgs::from([("target".to_string(), "abc".to_string())]);
        let result = InvocationResult::rejected(
            "set-field",
            &raw,
            InvocationError::UnknownAction {
                name: "set-field".into(),
            },
        );
        assert_eq!(
            format_result(&result),
            "FAILED set-field target=abc: Action 'set-field' not found"
        );
    }
}
