use serde::{Deserialize, Serialize};

use std::fmt;

/// Backend a secret provider reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretSource {
    /// Azure Key Vault (managed secret store).
    KeyVault,
    /// Process environment variable.
    Environment,
}

impl fmt::Display for SecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretSource::KeyVault => write!(f, "key_vault"),
            SecretSource::Environment => write!(f, "environment"),
        }
    }
}

/// A wrapper that redacts secret values in Debug and Display output.
///
/// Use this to wrap any `String` that might contain sensitive data.
/// The actual value is accessible via `.expose()`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redacted(String);

impl Redacted {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the underlying secret value.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// True when no value was resolved.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Show masked representation: last 4 chars visible.
    pub fn masked(&self) -> String {
        mask_secret(&self.0)
    }
}

impl fmt::Debug for Redacted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Redacted(\"***\")")
    }
}

impl fmt::Display for Redacted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

/// Mask a secret value, showing only the last 4 characters.
///
/// - "sk-abcdefghijklmnop" -> "****mnop"
/// - "abc" -> "****" (too short to show any chars)
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        "****".to_string()
    } else {
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("****{tail}")
    }
}

/// Normalise a setting name into a Key Vault secret name.
///
/// Key Vault names only allow alphanumerics and dashes, so underscores
/// become dashes and camel-case boundaries are split:
/// `SQL_CONNECTION_STRING` -> `sql-connection-string`,
/// `MicrosoftAppId` -> `microsoft-app-id`.
pub fn vault_secret_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;

    for c in name.chars() {
        if c == '_' || c == '-' || c == '.' || c.is_whitespace() {
            if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
        } else if c.is_ascii_alphanumeric() {
            let boundary = c.is_ascii_uppercase()
                && prev.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit());
            if boundary && !out.ends_with('-') {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
        }
        prev = Some(c);
    }

    out.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacted_debug_hides_value() {
        let secret = Redacted::new("sk-abc123xyz");
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("abc123xyz"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn test_redacted_display_hides_value() {
        let secret = Redacted::new("sk-abc123xyz");
        let display = format!("{}", secret);
        assert!(!display.contains("abc123xyz"));
    }

    #[test]
    fn test_redacted_expose() {
        let secret = Redacted::new("sk-abc123xyz");
        assert_eq!(secret.expose(), "sk-abc123xyz");
    }

    #[test]
    fn test_redacted_masked() {
        let secret = Redacted::new("sk-abc123xyz");
        assert_eq!(secret.masked(), "****3xyz");
    }

    #[test]
    fn test_mask_secret_short_and_empty() {
        assert_eq!(mask_secret("ab"), "****");
        assert_eq!(mask_secret("abcd"), "****");
        assert_eq!(mask_secret(""), "****");
        assert_eq!(mask_secret("abcde"), "****bcde");
    }

    #[test]
    fn test_vault_name_screaming_snake() {
        assert_eq!(vault_secret_name("SQL_CONNECTION_STRING"), "sql-connection-string");
        assert_eq!(vault_secret_name("AZURE_OPENAI_API_KEY"), "azure-openai-api-key");
    }

    #[test]
    fn test_vault_name_camel_case() {
        assert_eq!(vault_secret_name("MicrosoftAppId"), "microsoft-app-id");
        assert_eq!(vault_secret_name("MicrosoftAppPassword"), "microsoft-app-password");
    }

    #[test]
    fn test_vault_name_already_kebab() {
        assert_eq!(vault_secret_name("ai-search-key"), "ai-search-key");
    }

    #[test]
    fn test_secret_source_display() {
        assert_eq!(SecretSource::KeyVault.to_string(), "key_vault");
        assert_eq!(SecretSource::Environment.to_string(), "environment");
    }
}
