//! Service configuration types for InsightBot.
//!
//! `ServiceConfig` is the non-secret, file-backed configuration
//! (`insightbot.toml`). `BotSettings` holds the secret-backed settings the
//! configuration resolver produces at startup. Secrets never appear in the
//! config file.

use serde::{Deserialize, Serialize};

use crate::secret::Redacted;

/// Setting names resolved through the secret chain.
pub mod names {
    pub const MICROSOFT_APP_ID: &str = "MicrosoftAppId";
    pub const MICROSOFT_APP_PASSWORD: &str = "MicrosoftAppPassword";
    pub const MICROSOFT_APP_TENANT_ID: &str = "MicrosoftAppTenantId";
    pub const SQL_CONNECTION_STRING: &str = "SQL_CONNECTION_STRING";
    pub const AI_SEARCH_ENDPOINT: &str = "AI_SEARCH_ENDPOINT";
    pub const AI_SEARCH_KEY: &str = "AI_SEARCH_KEY";
    pub const AZURE_OPENAI_ENDPOINT: &str = "AZURE_OPENAI_ENDPOINT";
    pub const AZURE_OPENAI_API_KEY: &str = "AZURE_OPENAI_API_KEY";
    pub const AZURE_OPENAI_DEPLOYMENT: &str = "AZURE_OPENAI_DEPLOYMENT";
    pub const DATA_API_BASE_URL: &str = "DATA_API_BASE_URL";
}

/// Top-level configuration. All fields have sensible defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub secrets: SecretsConfig,
    pub data_api: DataApiConfig,
    pub llm: LlmConfig,
    pub bot: BotBehaviorConfig,
    pub connector: ConnectorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3978,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretsConfig {
    /// Key Vault URL, e.g. `https://my-vault.vault.azure.net`. When unset
    /// (and `KEY_VAULT_URL` is unset) only the environment is consulted.
    pub key_vault_url: Option<String>,
    /// Cache resolved values for this many seconds; 0 re-resolves every call.
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataApiConfig {
    /// Overrides the `DATA_API_BASE_URL` setting when present.
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    /// Additional attempts after a failed request; 0 disables retries.
    pub max_retries: u32,
    /// Linear backoff step between attempts.
    pub retry_backoff_ms: u64,
}

impl Default for DataApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 30,
            max_retries: 0,
            retry_backoff_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_version: String,
    /// Deployment used when `AZURE_OPENAI_DEPLOYMENT` resolves empty.
    pub deployment: String,
    pub timeout_secs: u64,
    pub max_tool_rounds: u32,
    pub max_tokens: u32,
    pub temperature: Option<f64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_version: "2024-06-01".to_string(),
            deployment: "gpt-4o".to_string(),
            timeout_secs: 60,
            max_tool_rounds: 5,
            max_tokens: 1000,
            temperature: Some(0.3),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotBehaviorConfig {
    /// Upper bound on one delegated turn, including every tool round.
    pub turn_timeout_secs: u64,
    /// How many characters of an inbound message are logged.
    pub log_preview_chars: usize,
}

impl Default for BotBehaviorConfig {
    fn default() -> Self {
        Self {
            turn_timeout_secs: 90,
            log_preview_chars: 50,
        }
    }
}

/// Outbound reply delivery.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Hosts, besides the Bot Framework channel domains, that may receive
    /// the connector token (e.g. a self-hosted emulator). A leading `*.` or
    /// bare domain also matches its subdomains.
    pub trusted_hosts: Vec<String>,
}

/// Secret-backed settings resolved once at startup.
///
/// Every field is an empty string when unconfigured; consumers treat empty
/// as "not available" and degrade instead of failing.
#[derive(Debug, Clone, Default)]
pub struct BotSettings {
    pub app_id: String,
    pub app_password: Redacted,
    pub app_tenant_id: String,
    pub sql_connection_string: Redacted,
    pub search_endpoint: String,
    pub search_key: Redacted,
    pub llm_endpoint: String,
    pub llm_api_key: Redacted,
    pub llm_deployment: String,
    pub data_api_base_url: String,
}

impl BotSettings {
    /// Names of settings that resolved to an empty value.
    pub fn missing(&self) -> Vec<&'static str> {
        self.entries()
            .into_iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(name, _)| name)
            .collect()
    }

    /// Every setting with a display value; secrets are masked.
    pub fn display_entries(&self) -> Vec<(&'static str, String)> {
        let secret_names = [
            names::MICROSOFT_APP_PASSWORD,
            names::SQL_CONNECTION_STRING,
            names::AI_SEARCH_KEY,
            names::AZURE_OPENAI_API_KEY,
        ];
        self.entries()
            .into_iter()
            .map(|(name, value)| {
                let shown = if value.is_empty() {
                    String::new()
                } else if secret_names.contains(&name) {
                    crate::secret::mask_secret(value)
                } else {
                    value.to_string()
                };
                (name, shown)
            })
            .collect()
    }

    fn entries(&self) -> Vec<(&'static str, &str)> {
        vec![
            (names::MICROSOFT_APP_ID, self.app_id.as_str()),
            (names::MICROSOFT_APP_PASSWORD, self.app_password.expose()),
            (names::MICROSOFT_APP_TENANT_ID, self.app_tenant_id.as_str()),
            (names::SQL_CONNECTION_STRING, self.sql_connection_string.expose()),
            (names::AI_SEARCH_ENDPOINT, self.search_endpoint.as_str()),
            (names::AI_SEARCH_KEY, self.search_key.expose()),
            (names::AZURE_OPENAI_ENDPOINT, self.llm_endpoint.as_str()),
            (names::AZURE_OPENAI_API_KEY, self.llm_api_key.expose()),
            (names::AZURE_OPENAI_DEPLOYMENT, self.llm_deployment.as_str()),
            (names::DATA_API_BASE_URL, self.data_api_base_url.as_str()),
        ]
    }
}
