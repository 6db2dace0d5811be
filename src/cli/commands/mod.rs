//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod analyze;
mod config_cmd;
mod validate;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use contract_analyzer::config::Config;

#[derive(Parser)]
#[command(name = "contract-analyzer")]
#[command(about = "Analyze contract PDFs with a hosted assistant and print structured summaries")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Upload PDF documents and print the assistant's analysis
    Analyze(analyze::AnalyzeArgs),

    /// Check saved answers against the result validator
    Validate {
        /// Text file with answers separated by blank lines (reads stdin if omitted)
        file: Option<PathBuf>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration (API key redacted)
    Show,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze(args) => {
            let config = Config::load_with(cli.config.as_deref()).await?;
            analyze::cmd_analyze(&config, args).await
        }
        Commands::Validate { file } => validate::cmd_validate(file.as_deref()).await,
        Commands::Config { command } => {
            let config = Config::load_with(cli.config.as_deref()).await?;
            match command {
                ConfigCommands::Show => config_cmd::cmd_config_show(&config),
            }
        }
    }
}
