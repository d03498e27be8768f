//! Configuration resolution.
//!
//! `ConfigResolver` resolves settings through a chain of secret providers in
//! priority order: the managed secret store first, then the environment, then
//! the caller's default, then the empty string. It never fails. Provider
//! errors are recorded as warnings and resolution moves on to the next link.
//!
//! This service lives in `insightbot-core` and depends only on the
//! `SecretProvider` port, never on concrete infra implementations.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use insightbot_types::config::{BotSettings, ServiceConfig, names};
use insightbot_types::secret::Redacted;

use crate::observe::{DynRecorder, LogLevel};
use crate::repository::secret::DynSecretProvider;

/// Resolves named settings through an ordered provider chain.
///
/// Default chain: `[KeyVaultSecretProvider, EnvSecretProvider]`, with the
/// vault omitted when no vault URL is configured.
pub struct ConfigResolver {
    providers: Vec<DynSecretProvider>,
    recorder: DynRecorder,
    cache: Option<ResolvedCache>,
}

struct ResolvedCache {
    ttl: Duration,
    entries: DashMap<String, (Instant, String)>,
}

impl ConfigResolver {
    /// Create a resolver with the given provider chain, highest priority first.
    pub fn new(providers: Vec<DynSecretProvider>, recorder: DynRecorder) -> Self {
        Self {
            providers,
            recorder,
            cache: None,
        }
    }

    /// Cache resolved values for `ttl`. A zero TTL disables caching.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = (!ttl.is_zero()).then(|| ResolvedCache {
            ttl,
            entries: DashMap::new(),
        });
        self
    }

    /// Number of providers in the chain.
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Resolve `name`, falling back to `default` and finally to `""`.
    pub async fn get(&self, name: &str, default: Option<&str>) -> String {
        if let Some(value) = self.lookup(name).await {
            return value;
        }

        match default {
            Some(default) if !default.is_empty() => {
                self.recorder.record(
                    LogLevel::Debug,
                    "setting not found in any provider, using default",
                    &[("name", name.to_string())],
                );
                default.to_string()
            }
            _ => {
                self.recorder.record(
                    LogLevel::Warn,
                    "setting is not configured",
                    &[("name", name.to_string())],
                );
                String::new()
            }
        }
    }

    /// Walk the provider chain. First non-empty value wins.
    async fn lookup(&self, name: &str) -> Option<String> {
        if let Some(cached) = self.cached(name) {
            return Some(cached);
        }

        for provider in &self.providers {
            match provider.get_boxed(name).await {
                Ok(Some(value)) if !value.is_empty() => {
                    tracing::debug!(name, source = %provider.source(), "setting resolved");
                    if let Some(cache) = &self.cache {
                        cache
                            .entries
                            .insert(name.to_string(), (Instant::now(), value.clone()));
                    }
                    return Some(value);
                }
                Ok(_) => continue,
                Err(e) => {
                    self.recorder.record(
                        LogLevel::Warn,
                        "secret lookup failed, falling back",
                        &[
                            ("name", name.to_string()),
                            ("source", provider.source().to_string()),
                            ("error", e.to_string()),
                        ],
                    );
                }
            }
        }

        None
    }

    fn cached(&self, name: &str) -> Option<String> {
        let cache = self.cache.as_ref()?;
        let entry = cache.entries.get(name)?;
        let (stored_at, value) = entry.value();
        if stored_at.elapsed() < cache.ttl {
            return Some(value.clone());
        }
        drop(entry);
        cache.entries.remove(name);
        None
    }

    /// Resolve every setting the bot consumes.
    ///
    /// `config` supplies non-secret defaults: the LLM deployment name and an
    /// optional data API base URL that takes precedence over the chain.
    pub async fn resolve_settings(&self, config: &ServiceConfig) -> BotSettings {
        let data_api_base_url = match config.data_api.base_url.as_deref() {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => self.get(names::DATA_API_BASE_URL, None).await,
        };

        BotSettings {
            app_id: self.get(names::MICROSOFT_APP_ID, None).await,
            app_password: Redacted::new(self.get(names::MICROSOFT_APP_PASSWORD, None).await),
            app_tenant_id: self.get(names::MICROSOFT_APP_TENANT_ID, None).await,
            sql_connection_string: Redacted::new(
                self.get(names::SQL_CONNECTION_STRING, None).await,
            ),
            search_endpoint: self.get(names::AI_SEARCH_ENDPOINT, None).await,
            search_key: Redacted::new(self.get(names::AI_SEARCH_KEY, None).await),
            llm_endpoint: self.get(names::AZURE_OPENAI_ENDPOINT, None).await,
            llm_api_key: Redacted::new(self.get(names::AZURE_OPENAI_API_KEY, None).await),
            llm_deployment: self
                .get(names::AZURE_OPENAI_DEPLOYMENT, Some(&config.llm.deployment))
                .await,
            data_api_base_url,
        }
    }
}
