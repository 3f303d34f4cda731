use clap::Args;
use labflow_core::actions::ActionDescriptor;
use serde_json::{json, Value};

use super::CliResult;
use crate::session::Session;

#[derive(Args)]
pub struct ActionsArgs {
    /// Show only this action, with parameter details
    pub name: Option<String>,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ActionsArgs, session: &mut Session) -> CliResult {
    let descriptors: Vec<&ActionDescriptor> = match &args.name {
        Some(name) => {
            session.registry.lookup(name)?;
            session
                .registry
                .descriptors()
                .filter(|d| &d.name == name)
                .collect()
        }
        None => session.registry.descriptors().collect(),
    };

    if args.json {
        let list: Vec<Value> = descriptors.iter().map(|d| describe(d)).collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    for descriptor in &descriptors {
        println!("{}", descriptor.usage());
        if !descriptor.description.is_empty() {
            println!("    {}", descriptor.description);
        }
        if args.name.is_some() {
            for param in &descriptor.parameters {
                let required = if param.is_required() { "required" } else { "optional" };
                print!("    {} <{}> {required}", param.name, param.ty);
                if !param.description.is_empty() {
                    print!(": {}", param.description);
                }
                println!();
            }
            if let Some(timeout) = descriptor.timeout {
                println!("    timeout {:.1}s", timeout.as_secs_f64());
            }
        }
    }
    Ok(())
}

fn describe(descriptor: &ActionDescriptor) -> Value {
    json!({
        "name": descriptor.name,
        "description": descriptor.description,
        "parameters": descriptor.parameters,
        "timeout_secs": descriptor.timeout.map(|t| t.as_secs_f64()),
        "usage": descriptor.usage(),
    })
}
