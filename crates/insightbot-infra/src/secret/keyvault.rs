//! Azure Key Vault secret provider.
//!
//! Reads `GET {vault}/secrets/{name}?api-version=7.4` with a bearer token
//! from managed identity. Setting names are normalised to vault-safe names
//! first (`SQL_CONNECTION_STRING` -> `sql-connection-string`).

use std::sync::Arc;
use std::time::Duration;

use reqwest::{StatusCode, Url};
use secrecy::ExposeSecret;
use serde::Deserialize;

use insightbot_core::repository::secret::SecretProvider;
use insightbot_types::error::SecretError;
use insightbot_types::secret::{SecretSource, vault_secret_name};

use crate::azure::ManagedIdentityCredential;

/// Token audience for Key Vault data-plane requests.
pub const VAULT_RESOURCE: &str = "https://vault.azure.net";

const API_VERSION: &str = "7.4";

#[derive(Deserialize)]
struct SecretBundle {
    value: Option<String>,
}

pub struct KeyVaultSecretProvider {
    client: reqwest::Client,
    vault_url: Url,
    credential: Arc<ManagedIdentityCredential>,
}

impl KeyVaultSecretProvider {
    pub fn new(
        vault_url: &str,
        credential: Arc<ManagedIdentityCredential>,
        timeout: Duration,
    ) -> Result<Self, SecretError> {
        let vault_url = Url::parse(vault_url)
            .map_err(|e| SecretError::ProviderUnavailable(format!("invalid vault URL: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SecretError::ProviderUnavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            vault_url,
            credential,
        })
    }

    pub fn vault_url(&self) -> &Url {
        &self.vault_url
    }

    fn secret_url(&self, vault_name: &str) -> Result<Url, SecretError> {
        let mut url = self.vault_url.clone();
        url.path_segments_mut()
            .map_err(|_| SecretError::ProviderUnavailable("vault URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["secrets", vault_name]);
        url.query_pairs_mut().append_pair("api-version", API_VERSION);
        Ok(url)
    }
}

impl SecretProvider for KeyVaultSecretProvider {
    fn source(&self) -> SecretSource {
        SecretSource::KeyVault
    }

    async fn get(&self, name: &str) -> Result<Option<String>, SecretError> {
        let vault_name = vault_secret_name(name);
        let url = self.secret_url(&vault_name)?;
        let token = self.credential.token(VAULT_RESOURCE).await?;

        let response = self
            .client
            .get(url)
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(|e| SecretError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {
                let bundle: SecretBundle = response
                    .json()
                    .await
                    .map_err(|e| SecretError::Malformed(e.to_string()))?;
                Ok(bundle.value)
            }
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(SecretError::PermissionDenied(vault_name))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(SecretError::ProviderUnavailable(format!(
                    "HTTP {status}: {body}"
                )))
            }
        }
    }
}
