//! Application state wiring all services together.
//!
//! Settings are resolved once at startup through the secret chain; every
//! component below is built from them and shared read-only behind `Arc`.
//! Nothing here fails on missing configuration: an unconfigured data API or
//! LLM degrades to empty results and fallback replies.

use std::sync::Arc;
use std::time::Duration;

use insightbot_core::agent::{Orchestrator, OrchestratorConfig};
use insightbot_core::capability::business::business_capabilities;
use insightbot_core::observe::TracingRecorder;
use insightbot_core::service::config::ConfigResolver;
use insightbot_core::service::conversation::InMemoryConversationStore;
use insightbot_core::turn::{TurnConfig, TurnHandler};
use insightbot_infra::connector::BotConnectorClient;
use insightbot_infra::data_api::DataApiClient;
use insightbot_infra::llm::create_provider_or_unavailable;
use insightbot_infra::secret::build_secret_chain;
use insightbot_types::config::{BotSettings, ServiceConfig};

/// Timeout for outbound Bot Connector calls.
const CONNECTOR_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared application state.
///
/// Used by both CLI commands and HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub settings: Arc<BotSettings>,
    pub data: Arc<DataApiClient>,
    pub conversations: Arc<InMemoryConversationStore>,
    pub turns: Arc<TurnHandler>,
    pub connector: Arc<BotConnectorClient>,
}

impl AppState {
    /// Resolve settings through the secret chain, then wire every service.
    pub async fn init(config: ServiceConfig) -> anyhow::Result<Self> {
        let settings = resolve_settings(&config).await;
        Self::from_parts(config, settings)
    }

    /// Wire every service from already-resolved settings.
    pub fn from_parts(config: ServiceConfig, settings: BotSettings) -> anyhow::Result<Self> {
        let data = match DataApiClient::new(
            &settings.data_api_base_url,
            &config.data_api,
            TracingRecorder::shared("data_api"),
        ) {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(error = %e, "data API base URL rejected, running without data");
                DataApiClient::new("", &config.data_api, TracingRecorder::shared("data_api"))?
            }
        };
        let data = Arc::new(data);

        let provider = create_provider_or_unavailable(&settings, &config.llm);
        let orchestrator = Orchestrator::new(
            provider,
            business_capabilities(Arc::clone(&data)),
            OrchestratorConfig {
                max_tool_rounds: config.llm.max_tool_rounds,
                max_tokens: config.llm.max_tokens,
                temperature: config.llm.temperature,
            },
            TracingRecorder::shared("orchestrator"),
        );

        let conversations = Arc::new(InMemoryConversationStore::new());
        let turns = TurnHandler::new(
            Arc::new(orchestrator),
            conversations.clone(),
            TracingRecorder::shared("turn"),
            TurnConfig::from(&config.bot),
        );

        let connector = BotConnectorClient::from_settings(&settings, CONNECTOR_TIMEOUT)?
            .with_trusted_hosts(&config.connector.trusted_hosts);

        tracing::info!(
            data_api = data.is_configured(),
            connector_auth = connector.is_authenticated(),
            missing_settings = settings.missing().len(),
            "application state initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            settings: Arc::new(settings),
            data,
            conversations,
            turns: Arc::new(turns),
            connector: Arc::new(connector),
        })
    }
}

/// Resolve secret-backed settings with the configured provider chain.
pub async fn resolve_settings(config: &ServiceConfig) -> BotSettings {
    let chain = build_secret_chain(&config.secrets);
    let resolver = ConfigResolver::new(chain, TracingRecorder::shared("config"))
        .with_cache_ttl(Duration::from_secs(config.secrets.cache_ttl_secs));
    resolver.resolve_settings(config).await
}
