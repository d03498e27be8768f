//! OpenTelemetry GenAI Semantic Convention attribute names and span helpers.
//!
//! Field names in `tracing` macros must be literals, so [`chat_span`] spells
//! them out and the constants are used with [`tracing::Span::record`] once a
//! response arrives.
//!
//! Span naming convention: `gen_ai.chat` for one completion call.

use tracing::Span;
use tracing::field::Empty;

// --- Required attributes ---

/// The name of the operation being performed (e.g., "chat").
pub const GEN_AI_OPERATION_NAME: &str = "gen_ai.operation.name";

/// The name of the GenAI provider (e.g., "azure_openai").
pub const GEN_AI_PROVIDER_NAME: &str = "gen_ai.provider.name";

// --- Recommended attributes ---

/// The model or deployment requested.
pub const GEN_AI_REQUEST_MODEL: &str = "gen_ai.request.model";

/// The sampling temperature for the request.
pub const GEN_AI_REQUEST_TEMPERATURE: &str = "gen_ai.request.temperature";

/// The maximum number of output tokens requested.
pub const GEN_AI_REQUEST_MAX_TOKENS: &str = "gen_ai.request.max_tokens";

/// The number of input tokens consumed.
pub const GEN_AI_USAGE_INPUT_TOKENS: &str = "gen_ai.usage.input_tokens";

/// The number of output tokens generated.
pub const GEN_AI_USAGE_OUTPUT_TOKENS: &str = "gen_ai.usage.output_tokens";

/// The finish reason for the response (e.g., "end_turn", "tool_use").
pub const GEN_AI_RESPONSE_FINISH_REASONS: &str = "gen_ai.response.finish_reasons";

/// The unique response ID from the provider.
pub const GEN_AI_RESPONSE_ID: &str = "gen_ai.response.id";

/// Number of functions the model asked for in this response.
pub const GEN_AI_RESPONSE_TOOL_CALLS: &str = "gen_ai.response.tool_calls";

// --- Operation name values ---

/// Standard chat completion operation.
pub const OP_CHAT: &str = "chat";

/// Span for one chat completion. Response fields start empty and are filled
/// by [`record_response`].
pub fn chat_span(
    provider: &str,
    model: &str,
    max_tokens: u32,
    temperature: Option<f64>,
    tool_round: u32,
) -> Span {
    tracing::info_span!(
        "gen_ai.chat",
        gen_ai.operation.name = OP_CHAT,
        gen_ai.provider.name = provider,
        gen_ai.request.model = model,
        gen_ai.request.max_tokens = max_tokens,
        gen_ai.request.temperature = temperature.unwrap_or_default(),
        gen_ai.response.id = Empty,
        gen_ai.response.finish_reasons = Empty,
        gen_ai.response.tool_calls = Empty,
        gen_ai.usage.input_tokens = Empty,
        gen_ai.usage.output_tokens = Empty,
        tool_round,
    )
}

/// Response-side attributes of a finished completion.
#[derive(Debug, Clone, Copy)]
pub struct ResponseAttrs<'a> {
    pub response_id: &'a str,
    pub finish_reason: &'a str,
    pub tool_calls: usize,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Record response attributes on a span created by [`chat_span`].
pub fn record_response(span: &Span, attrs: ResponseAttrs<'_>) {
    span.record(GEN_AI_RESPONSE_ID, attrs.response_id);
    span.record(GEN_AI_RESPONSE_FINISH_REASONS, attrs.finish_reason);
    span.record(GEN_AI_RESPONSE_TOOL_CALLS, attrs.tool_calls as u64);
    span.record(GEN_AI_USAGE_INPUT_TOKENS, attrs.input_tokens);
    span.record(GEN_AI_USAGE_OUTPUT_TOKENS, attrs.output_tokens);
}
