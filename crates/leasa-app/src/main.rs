//! Leasa application binary - composition root.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Open the SQLite database under the data directory
//! 3. Build the completion client (Gemini, or a canned mock with --offline)
//! 4. Load the listing catalog and wire the session engine
//! 5. Start the axum REST API server

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use leasa_api::routes;
use leasa_api::state::AppState;
use leasa_chat::{CompletionService, GeminiClient, MockCompletion};
use leasa_core::config::{LeasaConfig, LlmConfig};
use leasa_core::error::LeasaError;
use leasa_storage::Database;

use cli::CliArgs;

const OFFLINE_REPLY: &str = "Leasa is running in offline mode, so I can't search listings right now. \
Tell me about the area, budget and move-in date you have in mind and try again once the \
assistant is back online.";

/// Expand ~ to home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if data_dir.starts_with("~/") || data_dir.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&data_dir[2..])
    } else {
        PathBuf::from(data_dir)
    }
}

/// Pick the completion backend. A missing API key is fatal unless offline.
fn build_completion(
    llm: &LlmConfig,
    offline: bool,
) -> Result<Arc<dyn CompletionService>, Box<dyn std::error::Error>> {
    if offline {
        tracing::warn!("Offline mode: chat replies are canned and never cite listings");
        return Ok(Arc::new(MockCompletion::with_fallback(OFFLINE_REPLY)));
    }

    if llm.provider != "gemini" {
        return Err(LeasaError::Config(format!(
            "unsupported llm provider '{}' (expected 'gemini')",
            llm.provider
        ))
        .into());
    }

    let api_key = llm.resolve_api_key()?;
    let client = GeminiClient::new(llm, api_key)?;
    tracing::info!(model = %client.model(), "Gemini completion client ready");
    Ok(Arc::new(client))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    // Load errors are reported once tracing is up.
    let (mut config, load_error) = LeasaConfig::load_with_fallback(&config_file);
    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }
    if let Some(host) = args.resolve_host() {
        config.general.host = host;
    }
    if let Some(level) = args.resolve_log_level() {
        config.general.log_level = level;
    }
    config.general.port = args.resolve_port(config.general.port);

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(config.general.log_level.as_str())
            }),
        )
        .init();

    tracing::info!("Starting Leasa v{}", env!("CARGO_PKG_VERSION"));
    match load_error {
        Some(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config; using defaults"
        ),
        None => tracing::info!(path = %config_file.display(), "Configuration loaded"),
    }

    // Storage.
    let data_dir = resolve_data_dir(&config.general.data_dir);
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }

    let db_path = data_dir.join("leasa.db");
    let db = Arc::new(Database::new(&db_path)?);
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    // Completion service.
    let completion = match build_completion(&config.llm, args.offline) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "Cannot start without a completion service");
            return Err(e);
        }
    };

    // Engine + API.
    let state = AppState::new(config.clone(), db, completion)?;
    routes::start_server(&config, state).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_data_dir_plain_path() {
        assert_eq!(resolve_data_dir("/var/lib/leasa"), PathBuf::from("/var/lib/leasa"));
    }

    #[test]
    fn test_resolve_data_dir_expands_home() {
        let resolved = resolve_data_dir("~/.leasa/data");
        assert!(resolved.ends_with(".leasa/data"));
        assert!(!resolved.to_string_lossy().starts_with('~'));
    }

    #[test]
    fn test_offline_completion_needs_no_key() {
        let llm = LlmConfig {
            api_key_env: "LEASA_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..LlmConfig::default()
        };
        let completion = build_completion(&llm, true).unwrap();
        assert_eq!(completion.name(), "mock");
    }

    #[test]
    fn test_missing_key_is_fatal() {
        let llm = LlmConfig {
            api_key_env: "LEASA_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..LlmConfig::default()
        };
        let err = build_completion(&llm, false).err().unwrap();
        assert!(err
            .to_string()
            .contains("LEASA_TEST_KEY_THAT_IS_NEVER_SET environment variable is not set"));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let llm = LlmConfig {
            provider: "other".to_string(),
            ..LlmConfig::default()
        };
        let err = build_completion(&llm, false).err().unwrap();
        assert!(err.to_string().contains("unsupported llm provider"));
    }
}
