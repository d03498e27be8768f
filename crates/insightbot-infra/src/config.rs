//! Service configuration loader for InsightBot.
//!
//! Reads `insightbot.toml` (or the path given on the command line) and
//! deserializes it into [`ServiceConfig`]. Falls back to defaults when the
//! file is missing or malformed. A handful of environment variables
//! override file values so the service can run with no file at all.

use std::path::Path;

use insightbot_types::config::ServiceConfig;

/// Environment variable that overrides `secrets.key_vault_url`.
pub const KEY_VAULT_URL_ENV: &str = "KEY_VAULT_URL";

/// Load service configuration from `path`.
///
/// - If the file does not exist, returns [`ServiceConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - `KEY_VAULT_URL` in the environment overrides the file's vault URL.
pub async fn load_service_config(path: &Path) -> ServiceConfig {
    let mut config = read_config_file(path).await;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    config
}

async fn read_config_file(path: &Path) -> ServiceConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file found at {}, using defaults", path.display());
            return ServiceConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return ServiceConfig::default();
        }
    };

    match toml::from_str::<ServiceConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            ServiceConfig::default()
        }
    }
}

fn apply_env_overrides(config: &mut ServiceConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup(KEY_VAULT_URL_ENV).filter(|v| !v.trim().is_empty()) {
        config.secrets.key_vault_url = Some(url.trim().to_string());
    }
}
