pub mod actions;
pub mod completions;
pub mod config;
pub mod define;
pub mod device;
pub mod multi;
pub mod progress;
pub mod recipe;
pub mod run;
pub mod run_loop;
pub mod shell;

use crate::session::Session;
use crate::Commands;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Run one command against an open session.
///
/// `shell` is handled by the caller; nesting it is refused here.
pub async fn dispatch(command: Commands, session: &mut Session) -> CliResult {
    match command {
        Commands::Run(args) => run::run(args, session).await,
        Commands::Define(args) => define::run(args, session),
        Commands::RunLoop(args) => run_loop::run(args, session).await,
        Commands::RunMulti(args) => multi::run(args, session).await,
        Commands::Recipe { action } => recipe::run(action, session),
        Commands::Actions(args) => actions::run(args, session),
        Commands::Status(args) => device::status(args, session).await,
        Commands::Inspect(args) => device::inspect(args, session),
        Commands::Config { action } => {
            config::run(action)?;
            session.reload_config()?;
            Ok(())
        }
        Commands::Completions { shell } => completions::run(shell),
        Commands::Shell => Err("already in a shell".into()),
    }
}
