//! AzureOpenAiProvider -- concrete [`LlmProvider`] for Azure OpenAI.
//!
//! Sends non-streaming chat-completion requests to
//! `{endpoint}/openai/deployments/{deployment}/chat/completions` with the
//! registered functions attached as tools.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use insightbot_core::llm::provider::LlmProvider;
use insightbot_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, Message, MessageRole, StopReason, ToolCall,
    Usage,
};

use super::types::{
    ChatErrorBody, ChatFunction, ChatFunctionCall, ChatMessage, ChatRequest, ChatResponse,
    ChatTool, ChatToolCall,
};

/// Azure OpenAI chat provider.
///
/// Does NOT derive Debug: the struct holds the API key.
pub struct AzureOpenAiProvider {
    client: reqwest::Client,
    api_key: SecretString,
    endpoint: String,
    deployment: String,
    api_version: String,
    timeout: Duration,
}

impl AzureOpenAiProvider {
    /// Create a provider for one deployment.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Resource endpoint, e.g. `https://my-oai.openai.azure.com`
    /// * `api_key` - Resource key wrapped in SecretString
    /// * `deployment` - Deployment name (selects the model)
    /// * `api_version` - `api-version` query value
    /// * `timeout` - Per-request timeout
    pub fn new(
        endpoint: &str,
        api_key: SecretString,
        deployment: &str,
        api_version: &str,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let endpoint = endpoint.trim().trim_end_matches('/');
        if endpoint.is_empty() {
            return Err(LlmError::NotConfigured("endpoint is empty".to_string()));
        }
        if deployment.trim().is_empty() {
            return Err(LlmError::NotConfigured("deployment is empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Provider {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            api_key,
            endpoint: endpoint.to_string(),
            deployment: deployment.trim().to_string(),
            api_version: api_version.to_string(),
            timeout,
        })
    }

    pub fn deployment(&self) -> &str {
        &self.deployment
    }

    fn url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        )
    }

    /// Convert a generic [`CompletionRequest`] into a [`ChatRequest`].
    fn to_chat_request(&self, request: &CompletionRequest) -> ChatRequest {
        let tools: Vec<ChatTool> = request
            .tools
            .iter()
            .map(|tool| ChatTool {
                kind: "function",
                function: ChatFunction {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.parameters.clone(),
                },
            })
            .collect();

        ChatRequest {
            messages: request.messages.iter().map(to_chat_message).collect(),
            tool_choice: (!tools.is_empty()).then_some("auto"),
            tools,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }

    fn status_error(status: reqwest::StatusCode, retry_after: Option<u64>, body: String) -> LlmError {
        let message = serde_json::from_str::<ChatErrorBody>(&body)
            .map(|b| match b.error.code {
                Some(code) => format!("{code}: {}", b.error.message),
                None => b.error.message,
            })
            .unwrap_or(body);
        match status.as_u16() {
            401 | 403 => LlmError::AuthenticationFailed,
            429 => LlmError::RateLimited {
                retry_after_ms: retry_after.map(|secs| secs * 1000),
            },
            400 => LlmError::InvalidRequest(message),
            _ => LlmError::Provider {
                message: format!("HTTP {status}: {message}"),
            },
        }
    }
}

fn to_chat_message(message: &Message) -> ChatMessage {
    match message.role {
        MessageRole::Assistant if !message.tool_calls.is_empty() => ChatMessage {
            role: message.role.to_string(),
            content: (!message.content.is_empty()).then(|| message.content.clone()),
            tool_calls: Some(
                message
                    .tool_calls
                    .iter()
                    .map(|call| ChatToolCall {
                        id: call.id.clone(),
                        kind: "function".to_string(),
                        function: ChatFunctionCall {
                            name: call.name.clone(),
                            arguments: call.arguments.to_string(),
                        },
                    })
                    .collect(),
            ),
            tool_call_id: None,
        },
        _ => ChatMessage {
            role: message.role.to_string(),
            content: Some(message.content.clone()),
            tool_calls: None,
            tool_call_id: message.tool_call_id.clone(),
        },
    }
}

/// Arguments arrive as a JSON string. Anything unparseable is passed through
/// as a string so the capability can reject it with a readable error.
fn parse_arguments(raw: &str) -> serde_json::Value {
    if raw.trim().is_empty() {
        return serde_json::Value::Object(serde_json::Map::new());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

impl LlmProvider for AzureOpenAiProvider {
    fn name(&self) -> &str {
        "azure_openai"
    }

    fn model(&self) -> &str {
        &self.deployment
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = self.to_chat_request(request);

        let response = self
            .client
            .post(self.url())
            .header("api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.timeout.as_secs())
                } else {
                    LlmError::Provider {
                        message: format!("HTTP request failed: {e}"),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let error_body = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status, retry_after, error_body));
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(self.timeout.as_secs())
            } else {
                LlmError::Deserialization(format!("failed to parse response: {e}"))
            }
        })?;

        let choice = chat
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Deserialization("response contained no choices".to_string()))?;

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                arguments: parse_arguments(&call.function.arguments),
                name: call.function.name,
            })
            .collect();

        let stop_reason = choice
            .finish_reason
            .as_deref()
            .and_then(|r| r.parse::<StopReason>().ok())
            .unwrap_or(if tool_calls.is_empty() {
                StopReason::EndTurn
            } else {
                StopReason::ToolUse
            });

        let usage = chat
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            id: chat.id,
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            model: if chat.model.is_empty() {
                self.deployment.clone()
            } else {
                chat.model
            },
            stop_reason,
            usage,
        })
    }
}
