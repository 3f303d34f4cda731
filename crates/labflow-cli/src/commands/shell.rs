//! Interactive shell: one session, many commands.
//!
//! Context variables and instrument state persist between commands, so a
//! `run set-var ...` is visible to a later `run-loop`.

use clap::{CommandFactory, Parser};

use super::CliResult;
use crate::prompt::Prompter;
use crate::session::Session;
use crate::Cli;

const PROMPT: &str = "labflow> ";

pub async fn run(session: &mut Session) -> CliResult {
    println!("labflow shell. Type 'help' for commands, 'exit' to leave.");

    loop {
        let Some(line) = Prompter::stdio().ask(PROMPT)? else {
            return Ok(());
        };
        let line = line.trim();
        match line {
            "" => continue,
            "exit" | "quit" => return Ok(()),
            "help" => {
                Cli::command().print_help()?;
                println!();
                continue;
            }
            _ => {}
        }

        let words = match shell_words::split(line) {
            Ok(words) => words,
            Err(e) => {
                eprintln!("error: {e}");
                continue;
            }
        };
        let cli = match Cli::try_parse_from(std::iter::once("labflow".to_string()).chain(words)) {
            Ok(cli) => cli,
            Err(e) => {
                let _ = e.print();
                continue;
            }
        };

        session.ctx.abort_signal().reset();
        if let Err(e) = super::dispatch(cli.command, session).await {
            eprintln!("error: {e}");
        }
    }
}
