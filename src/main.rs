use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::time::Duration;
use xrates::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fetch and display current exchange rates
    Rates {
        /// Print the JSON response envelope instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Query the cache repeatedly, refreshing only when due
    Watch {
        /// Seconds between queries
        #[arg(short, long, default_value_t = 60)]
        every: u64,
        /// Print the JSON response envelope instead of a table
        #[arg(long)]
        json: bool,
    },
}

impl From<Commands> for xrates::AppCommand {
    fn from(cmd: Commands) -> xrates::AppCommand {
        match cmd {
            Commands::Rates { json } => xrates::AppCommand::Rates { json },
            Commands::Watch { every, json } => xrates::AppCommand::Watch {
                every: Duration::from_secs(every.max(1)),
                json,
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => xrates::cli::setup::setup().map(|path| {
            println!("Created default configuration at {}", path.display());
        }),
        Some(cmd) => xrates::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
