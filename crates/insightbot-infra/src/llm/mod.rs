//! LLM provider implementations.
//!
//! Contains the concrete [`LlmProvider`](insightbot_core::llm::provider::LlmProvider)
//! used by the orchestrator (Azure OpenAI), a factory ([`create_provider`])
//! that builds it from resolved settings, and a connection test
//! ([`test_provider_connection`]) for the `config` command.

pub mod azure_openai;

use std::time::Duration;

use secrecy::SecretString;

use insightbot_core::llm::box_provider::BoxLlmProvider;
use insightbot_core::llm::provider::LlmProvider;
use insightbot_types::config::{BotSettings, LlmConfig, names};
use insightbot_types::llm::{CompletionRequest, CompletionResponse, LlmError, Message};

use self::azure_openai::AzureOpenAiProvider;

/// Create a [`BoxLlmProvider`] from resolved settings.
///
/// The deployment comes from the settings when set, otherwise from
/// `llm.deployment` in the config file.
///
/// # Errors
///
/// Returns [`LlmError::NotConfigured`] naming the first missing setting when
/// the endpoint or API key did not resolve.
pub fn create_provider(settings: &BotSettings, config: &LlmConfig) -> Result<BoxLlmProvider, LlmError> {
    if settings.llm_endpoint.trim().is_empty() {
        return Err(LlmError::NotConfigured(names::AZURE_OPENAI_ENDPOINT.to_string()));
    }
    if settings.llm_api_key.is_empty() {
        return Err(LlmError::NotConfigured(names::AZURE_OPENAI_API_KEY.to_string()));
    }
    let deployment = if settings.llm_deployment.trim().is_empty() {
        config.deployment.as_str()
    } else {
        settings.llm_deployment.as_str()
    };

    let provider = AzureOpenAiProvider::new(
        &settings.llm_endpoint,
        SecretString::from(settings.llm_api_key.expose().to_string()),
        deployment,
        &config.api_version,
        Duration::from_secs(config.timeout_secs.max(1)),
    )?;
    Ok(BoxLlmProvider::new(provider))
}

/// Stand-in used when no provider could be built, so the service still
/// answers every turn (with the fallback apology) instead of refusing to start.
pub struct UnavailableProvider {
    reason: String,
}

impl UnavailableProvider {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl LlmProvider for UnavailableProvider {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn model(&self) -> &str {
        ""
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        Err(LlmError::NotConfigured(self.reason.clone()))
    }
}

/// [`create_provider`], falling back to [`UnavailableProvider`] with a warning.
pub fn create_provider_or_unavailable(settings: &BotSettings, config: &LlmConfig) -> BoxLlmProvider {
    match create_provider(settings, config) {
        Ok(provider) => provider,
        Err(e) => {
            tracing::warn!(error = %e, "LLM provider unavailable, turns will get the fallback reply");
            BoxLlmProvider::new(UnavailableProvider::new(e.to_string()))
        }
    }
}

/// Test provider connectivity by sending a minimal completion request.
///
/// # Errors
///
/// Returns the LLM error if the provider fails to respond.
pub async fn test_provider_connection(provider: &BoxLlmProvider) -> Result<(), LlmError> {
    let request = CompletionRequest {
        model: provider.model().to_string(),
        messages: vec![Message::user("Hello")],
        tools: Vec::new(),
        max_tokens: 10,
        temperature: Some(0.0),
    };
    provider.complete(&request).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::spawn_server;
    use axum::routing::post;
    use axum::{Json, Router};
    use insightbot_types::secret::Redacted;

    fn settings(endpoint: &str) -> BotSettings {
        BotSettings {
            llm_endpoint: endpoint.to_string(),
            llm_api_key: Redacted::new("test-key"),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_endpoint() {
        let err = create_provider(&BotSettings::default(), &LlmConfig::default()).unwrap_err();
        assert!(matches!(err, LlmError::NotConfigured(name) if name == "AZURE_OPENAI_ENDPOINT"));
    }

    #[test]
    fn test_missing_key() {
        let settings = BotSettings {
            llm_endpoint: "https://oai.example.com".into(),
            ..Default::default()
        };
        let err = create_provider(&settings, &LlmConfig::default()).unwrap_err();
        assert!(matches!(err, LlmError::NotConfigured(name) if name == "AZURE_OPENAI_API_KEY"));
    }

    #[test]
    fn test_deployment_falls_back_to_config() {
        let provider = create_provider(&settings("https://oai.example.com"), &LlmConfig::default()).unwrap();
        assert_eq!(provider.name(), "azure_openai");
        assert_eq!(provider.model(), "gpt-4o");

        let mut with_deployment = settings("https://oai.example.com");
        with_deployment.llm_deployment = "sales-gpt".into();
        let provider = create_provider(&with_deployment, &LlmConfig::default()).unwrap();
        assert_eq!(provider.model(), "sales-gpt");
    }

    #[tokio::test]
    async fn test_unavailable_fallback() {
        let provider = create_provider_or_unavailable(&BotSettings::default(), &LlmConfig::default());
        assert_eq!(provider.name(), "unavailable");
        let err = test_provider_connection(&provider).await.unwrap_err();
        assert!(err.to_string().contains("AZURE_OPENAI_ENDPOINT"));
    }

    #[tokio::test]
    async fn test_connection_check() {
        let router = Router::new().route(
            "/openai/deployments/gpt-4o/chat/completions",
            post(|| async {
                Json(serde_json::json!({
                    "id": "c",
                    "choices": [{"finish_reason": "stop", "message": {"content": "Hi"}}]
                }))
            }),
        );
        let base = spawn_server(router).await;
        let provider = create_provider(&settings(&base), &LlmConfig::default()).unwrap();
        test_provider_connection(&provider).await.unwrap();
    }
}
