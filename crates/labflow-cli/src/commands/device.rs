//! Read-only instrument commands.

use std::time::Duration;

use clap::Args;
use labflow_core::{DeviceError, DeviceStatus};

use super::CliResult;
use crate::session::Session;

#[derive(Args)]
pub struct StatusArgs {
    /// Refresh every SECS seconds until Ctrl-C
    #[arg(long, value_name = "SECS")]
    pub watch: Option<u64>,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct InspectArgs {
    /// Device id, e.g. cryo-01
    pub id: String,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn status(args: StatusArgs, session: &mut Session) -> CliResult {
    loop {
        let statuses = session.ctx.devices().status_all();
        if args.json {
            println!("{}", serde_json::to_string_pretty(&statuses)?);
        } else {
            print_table(&statuses);
        }

        let Some(secs) = args.watch else {
            return Ok(());
        };
        tokio::time::sleep(Duration::from_secs(secs.max(1))).await;
        if session.ctx.is_aborted() {
            return Ok(());
        }
        println!();
    }
}

pub fn inspect(args: InspectArgs, session: &mut Session) -> CliResult {
    let status = session
        .ctx
        .devices()
        .inspect(&args.id)
        .ok_or_else(|| DeviceError::NotFound(args.id.clone()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{} ({})", status.id, status.kind);
    println!("  state: {}", status.state);
    for (name, value) in &status.readings {
        println!("  {name}: {value}");
    }
    for (name, value) in &status.details {
        println!("  {name}: {value}");
    }
    println!("  checked: {}", status.last_check.format("%H:%M:%S"));
    Ok(())
}

fn print_table(statuses: &[DeviceStatus]) {
    if statuses.is_empty() {
        println!("No equipment configured.");
        return;
    }
    let id_width = statuses.iter().map(|s| s.id.len()).max().unwrap_or(2).max(2);
    let kind_width = statuses.iter().map(|s| s.kind.len()).max().unwrap_or(4).max(4);
    println!("{:<id_width$}  {:<kind_width$}  {:<7}  READINGS", "ID", "KIND", "STATE");
    for s in statuses {
        println!(
            "{:<id_width$}  {:<kind_width$}  {:<7}  {}",
            s.id,
            s.kind,
            s.state.to_string(),
            s.readings_summary()
        );
    }
}
