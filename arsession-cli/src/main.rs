//! ARSession CLI - headless driver for AR session lifecycles
//!
//! Runs a render loop and an AR session against the simulated collaborators,
//! printing lifecycle events as they happen.

mod commands;
mod error;

use std::path::PathBuf;

use arsession::scene::Dimensions;
use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::run::RunArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "arsession")]
#[command(version, about = "Drive a marker-tracking AR session headlessly", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start a session and run the render loop
    Run {
        /// Configuration file (defaults to the platform config directory)
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Initial viewport size
        #[arg(long, value_name = "WxH", default_value = "640x480")]
        viewport: Dimensions,

        /// Stop after this many seconds (runs until Ctrl+C otherwise)
        #[arg(long, value_name = "SECS")]
        duration: Option<u64>,

        /// Rotate the viewport after this many seconds
        #[arg(long, value_name = "SECS")]
        rotate_after: Option<u64>,

        /// Log filter, overriding the config file
        #[arg(long, value_name = "LEVEL")]
        log_level: Option<String>,
    },

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();

    let result: Result<(), CliError> = match cli.command {
        Commands::Run {
            config,
            viewport,
            duration,
            rotate_after,
            log_level,
        } => commands::run::run(RunArgs {
            config,
            viewport,
            duration,
            rotate_after,
            log_level,
        }),
        Commands::Config(command) => commands::config::run(command),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
