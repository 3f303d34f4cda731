use clap::CommandFactory;
use clap_complete::Shell;

use super::CliResult;
use crate::Cli;

pub fn run(shell: Shell) -> CliResult {
    clap_complete::generate(shell, &mut Cli::command(), "labflow", &mut std::io::stdout());
    Ok(())
}
