//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use consent_core::config;

mod commands;

#[derive(Parser)]
#[command(name = "consent")]
#[command(version)]
#[command(about = "Walks participants through websites and records their cookie-consent choices")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run_args: RunArgs,
}

/// Options for running a study session.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Do not store records anywhere
    #[arg(long)]
    pub dry_run: bool,

    /// Comma-separated list of site URLs (overrides the configured sites)
    #[arg(long, value_name = "URLS", value_delimiter = ',')]
    pub sites: Option<Vec<String>>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Run a study session in the terminal (default)
    Run(RunArgs),
    /// Show the configured sites and response options
    Sites,
    /// Show records stored in a JSONL file
    Records {
        /// Record file (default: the configured JSONL sink path)
        #[arg(long, value_name = "FILE")]
        path: Option<PathBuf>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let Cli { command, run_args } = cli;

    match command.unwrap_or(Commands::Run(run_args)) {
        Commands::Run(args) => {
            let config = config::Config::load().context("load config")?;
            commands::run::run(config, args).await
        }
        Commands::Sites => {
            let config = config::Config::load().context("load config")?;
            commands::sites::show(&config);
            Ok(())
        }
        Commands::Records { path } => {
            let config = config::Config::load().context("load config")?;
            commands::records::show(&config, path)
        }
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        },
    }
}
