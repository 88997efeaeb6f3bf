//! # valstate CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use valstate_cli::check::{run_check, CheckArgs};
use valstate_cli::config::CliConfig;
use valstate_cli::defaults::{run_defaults, DefaultsArgs};

/// Validate documents through a schema-derived handler tree.
#[derive(Parser, Debug)]
#[command(name = "valstate", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a document and report errors by path.
    Check(CheckArgs),

    /// Print the initial value a schema produces.
    Defaults(DefaultsArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    tracing::debug!("valstate CLI starting");

    let result = CliConfig::load(cli.config.as_deref()).and_then(|config| match &cli.command {
        Commands::Check(args) => run_check(args, &config),
        Commands::Defaults(args) => run_defaults(args),
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
