//! CLI argument parsing for the tutor.

use clap::{Parser, Subcommand};

/// Educational tutoring assistant
///
/// Answers study questions from a knowledge base, or conversationally when
/// no retrieval is needed.
#[derive(Parser, Debug)]
#[command(name = "tutor")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/tutor-pipeline/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer one question
    Ask {
        /// The user's question
        query: String,

        /// JSON file with prior messages: [{"role": "user", "content": "..."}]
        #[arg(long)]
        history: Option<String>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_ask() {
        let cli = Cli::parse_from(["tutor", "ask", "What is density?"]);
        match cli.command {
            Commands::Ask {
                query,
                history,
                json,
            } => {
                assert_eq!(query, "What is density?");
                assert_eq!(history, None);
                assert!(!json);
            }
            _ => panic!("Expected Ask command"),
        }
    }

    #[test]
    fn test_cli_ask_with_history_and_json() {
        let cli = Cli::parse_from([
            "tutor",
            "ask",
            "What is density?",
            "--history",
            "chat.json",
            "--json",
        ]);
        match cli.command {
            Commands::Ask { history, json, .. } => {
                assert_eq!(history.as_deref(), Some("chat.json"));
                assert!(json);
            }
            _ => panic!("Expected Ask command"),
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from([
            "tutor",
            "config",
            "--config",
            "/path/to/config.toml",
            "--log-level",
            "debug",
        ]);
        assert!(matches!(cli.command, Commands::Config));
        assert_eq!(cli.config.as_deref(), Some("/path/to/config.toml"));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_cli_ask_requires_query() {
        assert!(Cli::try_parse_from(["tutor", "ask"]).is_err());
    }
}
