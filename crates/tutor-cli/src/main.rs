//! Tutor CLI
//!
//! # Usage
//!
//! ```bash
//! tutor ask "What is the formula of density?" [--history chat.json] [--json]
//! tutor config
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/tutor-pipeline/config.toml)
//! 3. CLI-specified config file (--config)
//! 4. Environment variables (TUTOR_*)
//! 5. CLI flags

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use tutor_cli::{ask, show_config, Cli, Commands};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ask {
            query,
            history,
            json,
        } => {
            ask(
                cli.config.as_deref(),
                cli.log_level.as_deref(),
                &query,
                history.as_deref(),
                json,
            )
            .await
        }
        Commands::Config => {
            show_config(cli.config.as_deref(), cli.log_level.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
