//! OAuth access tokens and their expiry-aware cache.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use secrecy::SecretString;
use serde::Deserialize;

/// Tokens are treated as expired this long before their real expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(300);

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_LIFETIME: Duration = Duration::from_secs(3600);

/// Token endpoint response body.
///
/// Entra ID returns `expires_in` as a number; the managed identity endpoints
/// return it as a string. Both are accepted.
#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    expires_in: Option<serde_json::Value>,
}

impl TokenResponse {
    pub fn lifetime(&self) -> Duration {
        let secs = match &self.expires_in {
            Some(serde_json::Value::Number(n)) => n.as_u64(),
            Some(serde_json::Value::String(s)) => s.parse().ok(),
            _ => None,
        };
        secs.map(Duration::from_secs).unwrap_or(DEFAULT_LIFETIME)
    }
}

struct CachedToken {
    value: SecretString,
    refresh_at: Instant,
}

/// Per-resource token cache. No lock is held while a token is fetched.
#[derive(Default)]
pub struct TokenCache {
    tokens: DashMap<String, CachedToken>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cached token for `resource` that is not about to expire.
    pub fn get(&self, resource: &str) -> Option<SecretString> {
        let entry = self.tokens.get(resource)?;
        (Instant::now() < entry.refresh_at).then(|| entry.value.clone())
    }

    pub fn insert(&self, resource: &str, value: SecretString, lifetime: Duration) {
        let refresh_at = Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN);
        self.tokens
            .insert(resource.to_string(), CachedToken { value, refresh_at });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_lifetime_accepts_number_and_string() {
        let numeric: TokenResponse =
            serde_json::from_str(r#"{"access_token":"a","expires_in":3599}"#).unwrap();
        assert_eq!(numeric.lifetime(), Duration::from_secs(3599));

        let text: TokenResponse =
            serde_json::from_str(r#"{"access_token":"a","expires_in":"86399"}"#).unwrap();
        assert_eq!(text.lifetime(), Duration::from_secs(86399));

        let missing: TokenResponse = serde_json::from_str(r#"{"access_token":"a"}"#).unwrap();
        assert_eq!(missing.lifetime(), DEFAULT_LIFETIME);
    }

    #[test]
    fn test_cache_returns_fresh_token() {
        let cache = TokenCache::new();
        cache.insert("vault", SecretString::from("tok"), Duration::from_secs(3600));
        assert_eq!(cache.get("vault").unwrap().expose_secret(), "tok");
        assert!(cache.get("other").is_none());
    }

    #[test]
    fn test_cache_skips_tokens_inside_margin() {
        let cache = TokenCache::new();
        cache.insert("vault", SecretString::from("tok"), Duration::from_secs(60));
        assert!(cache.get("vault").is_none());
    }
}
