//! Command implementations for the tutor CLI.

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::{error, info};

use tutor_orchestrator::{Pipeline, PipelineOutput};
use tutor_types::{ChatMessage, Settings};

/// Shown to the user when a turn fails.
pub const APOLOGY: &str = "I am sorry, I am not able to answer that question.";

/// Load settings and apply CLI overrides.
pub fn load_settings(config_path: Option<&str>, log_level: Option<&str>) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(level) = log_level {
        settings.log_level = level.to_string();
    }
    Ok(settings)
}

/// Install the global tracing subscriber. Logs go to stderr.
pub fn init_logging(settings: &Settings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Read a JSON array of `{role, content}` messages.
pub fn load_history(path: &Path) -> Result<Vec<ChatMessage>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read history file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Invalid history file {}", path.display()))
}

/// Human-readable rendering of a turn's result.
pub fn format_answer(output: &PipelineOutput) -> String {
    let mut text = output.response.clone();
    if let Some(sources) = &output.metadata {
        text.push_str("\n\nSources:");
        for (i, source) in sources.iter().enumerate() {
            let rendered = serde_json::Value::Object(source.clone()).to_string();
            text.push_str(&format!("\n  [{}] {}", i + 1, rendered));
        }
    }
    text
}

/// Answer one question.
pub async fn ask(
    config_path: Option<&str>,
    log_level: Option<&str>,
    query: &str,
    history_path: Option<&str>,
    json: bool,
) -> Result<ExitCode> {
    let settings = load_settings(config_path, log_level)?;
    init_logging(&settings)?;

    let history = match history_path {
        Some(path) => load_history(Path::new(path))?,
        None => Vec::new(),
    };
    info!(history = history.len(), model = %settings.llm.model, "Answering question");

    let pipeline = Pipeline::from_settings(&settings).context("Failed to build pipeline")?;

    match pipeline.run(query, &history).await {
        Ok(output) => {
            if json {
                let rendered =
                    serde_json::to_string_pretty(&output).context("Failed to encode result")?;
                println!("{}", rendered);
            } else {
                println!("{}", format_answer(&output));
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!(error = %e, "Turn failed");
            eprintln!("{}", APOLOGY);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Print the effective settings as TOML. The API key is never included.
pub fn show_config(config_path: Option<&str>, log_level: Option<&str>) -> Result<()> {
    let settings = load_settings(config_path, log_level)?;
    let rendered = toml::to_string_pretty(&settings).context("Failed to encode settings")?;
    print!("{}", rendered);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use tutor_types::{IntentMode, Metadata, Role};

    #[test]
    fn test_load_history() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"role": "user", "content": "Help me study"}}, {{"role": "assistant", "content": "Sure!"}}]"#
        )
        .unwrap();

        let history = load_history(file.path()).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, Role::Assistant);
    }

    #[test]
    fn test_load_history_rejects_bad_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(load_history(file.path()).is_err());
    }

    #[test]
    fn test_load_settings_layers_config_file_under_cli_flags() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
log_level = "warn"

[llm]
model = "gpt-4o"
"#
        )
        .unwrap();
        file.flush().unwrap();
        let path = file.path().to_str().unwrap();

        let from_file = load_settings(Some(path), None).unwrap();
        assert_eq!(from_file.llm.model, "gpt-4o");

        let overridden = load_settings(Some(path), Some("debug")).unwrap();
        assert_eq!(overridden.log_level, "debug");
        assert_eq!(overridden.llm.model, "gpt-4o");
    }

    #[test]
    fn test_format_answer_lists_sources() {
        let mut source = Metadata::new();
        source.insert("source".to_string(), json!("chem.pdf"));
        let output = PipelineOutput {
            response: "Density = m/V".to_string(),
            metadata: Some(vec![source]),
            intent: IntentMode::Learning,
            topic: Some("Density".to_string()),
        };

        assert_eq!(
            format_answer(&output),
            "Density = m/V\n\nSources:\n  [1] {\"source\":\"chem.pdf\"}"
        );
    }

    #[test]
    fn test_format_answer_without_sources() {
        let output = PipelineOutput {
            response: "You're welcome!".to_string(),
            metadata: None,
            intent: IntentMode::Misc,
            topic: None,
        };
        assert_eq!(format_answer(&output), "You're welcome!");
    }
}
