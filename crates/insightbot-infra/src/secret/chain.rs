//! Secret chain builder -- wires concrete providers in priority order.
//!
//! This module lives in `insightbot-infra` because it assembles concrete
//! provider implementations. The resulting chain is passed to
//! `ConfigResolver` in `insightbot-core` via `DynSecretProvider`.
//!
//! Default chain order: `[KeyVaultSecretProvider, EnvSecretProvider]`

use std::sync::Arc;
use std::time::Duration;

use insightbot_core::repository::secret::DynSecretProvider;
use insightbot_types::config::SecretsConfig;

use crate::azure::ManagedIdentityCredential;
use crate::secret::env::EnvSecretProvider;
use crate::secret::keyvault::KeyVaultSecretProvider;

const VAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the secret resolution chain.
///
/// 1. Azure Key Vault, when `secrets.key_vault_url` is set and the
///    credential and client can be built
/// 2. Environment variables (always present)
pub fn build_secret_chain(secrets: &SecretsConfig) -> Vec<DynSecretProvider> {
    let mut chain: Vec<DynSecretProvider> = Vec::new();

    if let Some(vault_url) = secrets.key_vault_url.as_deref().filter(|u| !u.is_empty()) {
        match ManagedIdentityCredential::from_env().and_then(|credential| {
            KeyVaultSecretProvider::new(vault_url, Arc::new(credential), VAULT_TIMEOUT)
        }) {
            Ok(vault) => {
                tracing::info!(vault_url, "Key Vault enabled for secret resolution");
                chain.push(Arc::new(vault));
            }
            Err(e) => {
                tracing::warn!(vault_url, error = %e, "Key Vault unavailable, using environment only");
            }
        }
    } else {
        tracing::debug!("no Key Vault URL configured, using environment only");
    }

    chain.push(Arc::new(EnvSecretProvider::new()));
    chain
}
