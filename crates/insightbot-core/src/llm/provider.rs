//! LlmProvider trait definition.

use insightbot_types::llm::{CompletionRequest, CompletionResponse, LlmError};

/// Trait for chat-completion backends.
///
/// Implementations live in insightbot-infra (e.g., `AzureOpenAiProvider`).
/// A request may carry tool definitions; the response then either holds the
/// final text or the tool calls the model wants executed.
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "azure_openai").
    fn name(&self) -> &str;

    /// Model or deployment this provider sends requests to.
    fn model(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}
