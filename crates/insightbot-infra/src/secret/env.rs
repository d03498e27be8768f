//! Environment variable secret provider.
//!
//! Reads the setting name directly as a variable name (e.g.
//! `AZURE_OPENAI_API_KEY`, `MicrosoftAppId`). This is the lowest-priority
//! provider: the managed secret store is consulted first.

use insightbot_core::repository::secret::SecretProvider;
use insightbot_types::error::SecretError;
use insightbot_types::secret::SecretSource;

/// Environment variable secret provider.
#[derive(Debug, Clone, Default)]
pub struct EnvSecretProvider {
    prefix: Option<String>,
}

impl EnvSecretProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `{prefix}{name}` instead of `name`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn variable(&self, name: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}{name}"),
            None => name.to_string(),
        }
    }
}

impl SecretProvider for EnvSecretProvider {
    fn source(&self) -> SecretSource {
        SecretSource::Environment
    }

    async fn get(&self, name: &str) -> Result<Option<String>, SecretError> {
        match std::env::var(self.variable(name)) {
            Ok(val) => Ok(Some(val)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(std::env::VarError::NotUnicode(_)) => {
                // Present but not valid Unicode: unusable as a setting.
                Ok(None)
            }
        }
    }
}
