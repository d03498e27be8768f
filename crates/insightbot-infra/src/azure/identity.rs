//! Managed identity access tokens.
//!
//! On App Service and Functions the platform exposes `IDENTITY_ENDPOINT` and
//! `IDENTITY_HEADER`; everywhere else (VMs, container hosts) the instance
//! metadata service (IMDS) is used. `AZURE_CLIENT_ID` selects a
//! user-assigned identity on either path.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use insightbot_types::error::SecretError;

use super::token::{TokenCache, TokenResponse};

const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
const IMDS_API_VERSION: &str = "2018-02-01";
const APP_SERVICE_API_VERSION: &str = "2019-08-01";

/// Where tokens come from.
enum IdentityEndpoint {
    AppService { endpoint: String, header: SecretString },
    Imds { endpoint: String },
}

/// Fetches and caches managed identity tokens per resource.
///
/// Does NOT derive Debug: the App Service identity header is a credential.
pub struct ManagedIdentityCredential {
    client: reqwest::Client,
    endpoint: IdentityEndpoint,
    client_id: Option<String>,
    cache: TokenCache,
}

impl ManagedIdentityCredential {
    /// Pick the endpoint from the process environment.
    pub fn from_env() -> Result<Self, SecretError> {
        let client_id = std::env::var("AZURE_CLIENT_ID")
            .ok()
            .filter(|v| !v.is_empty());
        let endpoint = match (
            std::env::var("IDENTITY_ENDPOINT"),
            std::env::var("IDENTITY_HEADER"),
        ) {
            (Ok(endpoint), Ok(header)) if !endpoint.is_empty() => IdentityEndpoint::AppService {
                endpoint,
                header: SecretString::from(header),
            },
            _ => IdentityEndpoint::Imds {
                endpoint: IMDS_ENDPOINT.to_string(),
            },
        };
        Self::build(endpoint, client_id)
    }

    /// Use the App Service identity endpoint at `endpoint`.
    pub fn app_service(endpoint: &str, header: SecretString) -> Result<Self, SecretError> {
        Self::build(
            IdentityEndpoint::AppService {
                endpoint: endpoint.to_string(),
                header,
            },
            None,
        )
    }

    /// Use an IMDS-compatible endpoint at `endpoint`.
    pub fn imds(endpoint: &str) -> Result<Self, SecretError> {
        Self::build(
            IdentityEndpoint::Imds {
                endpoint: endpoint.to_string(),
            },
            None,
        )
    }

    fn build(endpoint: IdentityEndpoint, client_id: Option<String>) -> Result<Self, SecretError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| SecretError::Credential(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint,
            client_id,
            cache: TokenCache::new(),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self.endpoint {
            IdentityEndpoint::AppService { .. } => "app_service",
            IdentityEndpoint::Imds { .. } => "imds",
        }
    }

    /// Access token for `resource` (e.g. `https://vault.azure.net`).
    pub async fn token(&self, resource: &str) -> Result<SecretString, SecretError> {
        if let Some(token) = self.cache.get(resource) {
            return Ok(token);
        }

        let mut query: Vec<(&str, &str)> = vec![("resource", resource)];
        if let Some(client_id) = self.client_id.as_deref() {
            query.push(("client_id", client_id));
        }

        let request = match &self.endpoint {
            IdentityEndpoint::AppService { endpoint, header } => {
                query.push(("api-version", APP_SERVICE_API_VERSION));
                self.client
                    .get(endpoint)
                    .header("X-IDENTITY-HEADER", header.expose_secret())
            }
            IdentityEndpoint::Imds { endpoint } => {
                query.push(("api-version", IMDS_API_VERSION));
                self.client.get(endpoint).header("Metadata", "true")
            }
        };

        let response = request
            .query(&query)
            .send()
            .await
            .map_err(|e| SecretError::Credential(format!("identity endpoint unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SecretError::Credential(format!(
                "identity endpoint returned HTTP {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SecretError::Malformed(format!("invalid token response: {e}")))?;

        let lifetime = token.lifetime();
        let value = SecretString::from(token.access_token);
        self.cache.insert(resource, value.clone(), lifetime);
        tracing::debug!(resource, kind = self.kind(), "acquired managed identity token");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::spawn_server;
    use axum::extract::Query;
    use axum::http::HeaderMap;
    use axum::routing::get;
    use axum::{Json, Router};
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn identity_router(hits: Arc<AtomicUsize>) -> Router {
        Router::new().route(
            "/token",
            get(
                move |headers: HeaderMap, Query(params): Query<HashMap<String, String>>| {
                    let hits = hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        let authorized = headers.get("Metadata").is_some()
                            || headers.get("X-IDENTITY-HEADER").map(|v| v.as_bytes())
                                == Some(b"hdr-secret".as_slice());
                        if !authorized {
                            return Err(axum::http::StatusCode::BAD_REQUEST);
                        }
                        Ok(Json(serde_json::json!({
                            "access_token": format!("token-for-{}", params["resource"]),
                            "expires_in": "3599",
                        })))
                    }
                },
            ),
        )
    }

    #[tokio::test]
    async fn test_imds_token_is_cached() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = spawn_server(identity_router(hits.clone())).await;
        let credential = ManagedIdentityCredential::imds(&format!("{base}/token")).unwrap();

        let first = credential.token("https://vault.azure.net").await.unwrap();
        let second = credential.token("https://vault.azure.net").await.unwrap();

        assert_eq!(first.expose_secret(), "token-for-https://vault.azure.net");
        assert_eq!(second.expose_secret(), first.expose_secret());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(credential.kind(), "imds");
    }

    #[tokio::test]
    async fn test_app_service_sends_identity_header() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = spawn_server(identity_router(hits)).await;
        let credential = ManagedIdentityCredential::app_service(
            &format!("{base}/token"),
            SecretString::from("hdr-secret"),
        )
        .unwrap();

        let token = credential.token("https://vault.azure.net").await.unwrap();
        assert!(token.expose_secret().starts_with("token-for-"));
    }

    #[tokio::test]
    async fn test_wrong_header_is_credential_error() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = spawn_server(identity_router(hits)).await;
        let credential =
            ManagedIdentityCredential::app_service(&format!("{base}/token"), SecretString::from("bad"))
                .unwrap();

        let err = credential.token("https://vault.azure.net").await.unwrap_err();
        assert!(matches!(err, SecretError::Credential(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let credential = ManagedIdentityCredential::imds("http://127.0.0.1:9/token").unwrap();
        let err = credential.token("https://vault.azure.net").await.unwrap_err();
        assert!(err.to_string().contains("unreachable"));
    }
}
