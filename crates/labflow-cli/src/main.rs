use clap::{Parser, Subcommand};
use tracing::debug;

mod commands;
mod prompt;
mod session;

use session::Session;

/// Laboratory automation from the command line
#[derive(Parser)]
#[command(name = "labflow", version, about = "Run instrument actions, recipes and parameter sweeps")]
pub(crate) struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Invoke a single action
    Run(commands::run::RunArgs),
    /// Define (or redefine) a recipe
    Define(commands::define::DefineArgs),
    /// Run a recipe once per value of a swept variable
    RunLoop(commands::run_loop::RunLoopArgs),
    /// Run several recipes while sweeping several variables in lockstep
    RunMulti(commands::multi::RunMultiArgs),
    /// Recipe management
    Recipe {
        #[command(subcommand)]
        action: commands::recipe::RecipeAction,
    },
    /// List available actions and their parameters
    Actions(commands::actions::ActionsArgs),
    /// Show the status of every configured instrument
    Status(commands::device::StatusArgs),
    /// Show everything known about one instrument
    Inspect(commands::device::InspectArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Interactive session sharing one context across commands
    Shell,
    /// Generate shell completions
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn,labflow::note=info",
        1 => "info,labflow_core=debug",
        _ => "trace",
    };
    // -v flags win over RUST_LOG
    let filter = if verbose == 0 {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback))
    } else {
        tracing_subscriber::EnvFilter::new(fallback)
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose >= 2)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn execute(command: Commands) -> commands::CliResult {
    match command {
        Commands::Completions { shell } => commands::completions::run(shell),
        Commands::Config { action } => commands::config::run(action),
        Commands::Shell => {
            let mut session = Session::open()?;
            session.watch_interrupts();
            commands::shell::run(&mut session).await
        }
        command => {
            let mut session = Session::open()?;
            session.watch_interrupts();
            commands::dispatch(command, &mut session).await
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    debug!(verbosity = cli.verbose, "labflow started");

    if let Err(e) = execute(cli.command).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
