//! Tutor CLI library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (ask, config)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::{ask, format_answer, init_logging, load_history, load_settings, show_config};
