//! Tool-calling orchestration loop.
//!
//! `Orchestrator::run` sends the system instruction and user message to the
//! LLM, executes any functions the model asks for, feeds the results back,
//! and repeats until the model produces a final text answer or the round
//! limit is hit. Function failures never fail the run; they are returned to
//! the model as error text so it can recover or explain.

use std::time::Duration;

use futures_util::future::join_all;
use tracing::{Instrument, debug};

use insightbot_observe::genai_attrs::{self, ResponseAttrs};
use insightbot_types::llm::{CompletionRequest, CompletionResponse, LlmError, Message, ToolCall};

use crate::capability::CapabilityRegistry;
use crate::llm::box_provider::BoxLlmProvider;
use crate::observe::{DynRecorder, LogLevel};

/// Errors that end an orchestration run without an answer.
#[derive(Debug, thiserror::Error)]
pub enum OrchestrationError {
    #[error("LLM request failed: {0}")]
    Llm(#[from] LlmError),

    #[error("orchestration timed out after {0:?}")]
    Timeout(Duration),

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("model requested functions for more than {0} rounds")]
    RoundLimit(u32),
}

/// Request parameters shared by every call in a run.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub max_tool_rounds: u32,
    pub max_tokens: u32,
    pub temperature: Option<f64>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: 5,
            max_tokens: 1000,
            temperature: Some(0.3),
        }
    }
}

pub struct Orchestrator {
    provider: BoxLlmProvider,
    registry: CapabilityRegistry,
    config: OrchestratorConfig,
    recorder: DynRecorder,
}

impl Orchestrator {
    pub fn new(
        provider: BoxLlmProvider,
        registry: CapabilityRegistry,
        config: OrchestratorConfig,
        recorder: DynRecorder,
    ) -> Self {
        Self {
            provider,
            registry,
            config,
            recorder,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Run one delegated turn to completion.
    pub async fn run(
        &self,
        system_instruction: &str,
        user_message: &str,
    ) -> Result<String, OrchestrationError> {
        let mut messages = vec![
            Message::system(system_instruction),
            Message::user(user_message),
        ];
        let tools = self.registry.definitions();

        // Round 0 is the initial request; each later round answers tool calls.
        for round in 0..=self.config.max_tool_rounds {
            let request = CompletionRequest {
                model: self.provider.model().to_string(),
                messages: messages.clone(),
                tools: tools.clone(),
                max_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
            };
            let response = self.complete(&request, round).await?;

            if response.tool_calls.is_empty() {
                let answer = response.content.trim();
                if answer.is_empty() {
                    return Err(OrchestrationError::EmptyResponse);
                }
                return Ok(answer.to_string());
            }

            if round == self.config.max_tool_rounds {
                break;
            }

            let results = self.invoke_all(&response.tool_calls).await;
            messages.push(Message::assistant_tool_calls(
                response.content,
                response.tool_calls.clone(),
            ));
            for (call, result) in response.tool_calls.iter().zip(results) {
                messages.push(Message::tool_result(&call.id, result));
            }
        }

        Err(OrchestrationError::RoundLimit(self.config.max_tool_rounds))
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
        round: u32,
    ) -> Result<CompletionResponse, LlmError> {
        let span = genai_attrs::chat_span(
            self.provider.name(),
            &request.model,
            request.max_tokens,
            request.temperature,
            round,
        );
        let response = self
            .provider
            .complete(request)
            .instrument(span.clone())
            .await?;
        genai_attrs::record_response(
            &span,
            ResponseAttrs {
                response_id: &response.id,
                finish_reason: &response.stop_reason.to_string(),
                tool_calls: response.tool_calls.len(),
                input_tokens: response.usage.input_tokens,
                output_tokens: response.usage.output_tokens,
            },
        );
        debug!(
            round,
            tool_calls = response.tool_calls.len(),
            "completion received"
        );
        Ok(response)
    }

    /// Invoke every requested function concurrently. Results keep call order.
    async fn invoke_all(&self, calls: &[ToolCall]) -> Vec<String> {
        join_all(calls.iter().map(|call| self.invoke(call))).await
    }

    async fn invoke(&self, call: &ToolCall) -> String {
        debug!(function = %call.name, call_id = %call.id, "invoking function");
        match self
            .registry
            .invoke(&call.name, call.arguments.clone())
            .await
        {
            Ok(output) => output,
            Err(e) => {
                self.recorder.record(
                    LogLevel::Warn,
                    "function call failed",
                    &[("function", call.name.clone()), ("error", e.to_string())],
                );
                format!("Error: {e}")
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::llm::provider::LlmProvider;
    use crate::observe::{MemoryRecorder, NoopRecorder};
    use insightbot_types::error::CapabilityError;
    use insightbot_types::llm::{MessageRole, StopReason, Usage};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replays scripted responses and records every request it receives.
    pub(crate) struct ScriptedProvider {
        responses: Mutex<VecDeque<Result<CompletionResponse, LlmError>>>,
        pub requests: Arc<Mutex<Vec<CompletionRequest>>>,
        pub delay: Option<Duration>,
    }

    impl ScriptedProvider {
        pub(crate) fn new(responses: Vec<Result<CompletionResponse, LlmError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Arc::new(Mutex::new(Vec::new())),
                delay: None,
            }
        }
    }

    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "test-model"
        }

        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let next = self.responses.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(text_response("done")))
        }
    }

    pub(crate) fn text_response(text: &str) -> CompletionResponse {
        CompletionResponse {
            id: "resp".to_string(),
            content: text.to_string(),
            tool_calls: vec![],
            model: "test-model".to_string(),
            stop_reason: StopReason::EndTurn,
            usage: Usage::default(),
        }
    }

    fn tool_response(calls: Vec<(&str, &str, serde_json::Value)>) -> CompletionResponse {
        CompletionResponse {
            id: "resp".to_string(),
            content: String::new(),
            tool_calls: calls
                .into_iter()
                .map(|(id, name, arguments)| ToolCall {
                    id: id.to_string(),
                    name: name.to_string(),
                    arguments,
                })
                .collect(),
            model: "test-model".to_string(),
            stop_reason: StopReason::ToolUse,
            usage: Usage::default(),
        }
    }

    fn registry() -> CapabilityRegistry {
        let mut registry = CapabilityRegistry::new();
        registry.register("echo", "Echo arguments", json!({"type": "object"}), |args| async move {
            Ok::<_, CapabilityError>(args.to_string())
        });
        registry.register("broken", "Always fails", json!({"type": "object"}), |_| async {
            Err::<String, _>(CapabilityError::Failed("db offline".to_string()))
        });
        registry
    }

    fn orchestrator(provider: ScriptedProvider, recorder: DynRecorder) -> Orchestrator {
        Orchestrator::new(
            BoxLlmProvider::new(provider),
            registry(),
            OrchestratorConfig {
                max_tool_rounds: 2,
                ..Default::default()
            },
            recorder,
        )
    }

    #[tokio::test]
    async fn test_direct_answer() {
        let provider = ScriptedProvider::new(vec![Ok(text_response("  Hello there  "))]);
        let requests = Arc::clone(&provider.requests);
        let orchestrator = orchestrator(provider, NoopRecorder::shared());

        let answer = orchestrator.run("system", "hi").await.unwrap();
        assert_eq!(answer, "Hello there");

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages[0].role, MessageRole::System);
        assert_eq!(requests[0].messages[1].content, "hi");
        assert_eq!(requests[0].tools.len(), 2);
    }

    #[tokio::test]
    async fn test_tool_results_fed_back_in_call_order() {
        let provider = ScriptedProvider::new(vec![
            Ok(tool_response(vec![
                ("call-1", "echo", json!({"n": 1})),
                ("call-2", "echo", json!({"n": 2})),
            ])),
            Ok(text_response("Two results")),
        ]);
        let requests = Arc::clone(&provider.requests);
        let orchestrator = orchestrator(provider, NoopRecorder::shared());

        assert_eq!(orchestrator.run("s", "u").await.unwrap(), "Two results");

        let requests = requests.lock().unwrap();
        let second = &requests[1].messages;
        // system, user, assistant(tool_calls), tool, tool
        assert_eq!(second.len(), 5);
        assert_eq!(second[2].tool_calls.len(), 2);
        assert_eq!(second[3].tool_call_id.as_deref(), Some("call-1"));
        assert_eq!(second[3].content, r#"{"n":1}"#);
        assert_eq!(second[4].tool_call_id.as_deref(), Some("call-2"));
    }

    #[tokio::test]
    async fn test_function_errors_become_text_for_model() {
        let provider = ScriptedProvider::new(vec![
            Ok(tool_response(vec![
                ("call-1", "broken", json!({})),
                ("call-2", "missing_fn", json!({})),
            ])),
            Ok(text_response("Sorry, data is unavailable")),
        ]);
        let requests = Arc::clone(&provider.requests);
        let recorder = Arc::new(MemoryRecorder::new());
        let orchestrator = orchestrator(provider, recorder.clone());

        let answer = orchestrator.run("s", "u").await.unwrap();
        assert_eq!(answer, "Sorry, data is unavailable");

        let requests = requests.lock().unwrap();
        let messages = &requests[1].messages;
        assert!(messages[3].content.starts_with("Error: "));
        assert!(messages[3].content.contains("db offline"));
        assert!(messages[4].content.contains("unknown capability 'missing_fn'"));
        assert_eq!(recorder.count(LogLevel::Warn), 2);
    }

    #[tokio::test]
    async fn test_round_limit() {
        let looping = || Ok(tool_response(vec![("c", "echo", json!({}))]));
        let provider = ScriptedProvider::new(vec![looping(), looping(), looping(), looping()]);
        let requests = Arc::clone(&provider.requests);
        let orchestrator = orchestrator(provider, NoopRecorder::shared());

        let err = orchestrator.run("s", "u").await.unwrap_err();
        assert!(matches!(err, OrchestrationError::RoundLimit(2)));
        // initial request plus one per allowed round
        assert_eq!(requests.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_answer_is_error() {
        let provider = ScriptedProvider::new(vec![Ok(text_response("   "))]);
        let orchestrator = orchestrator(provider, NoopRecorder::shared());
        let err = orchestrator.run("s", "u").await.unwrap_err();
        assert!(matches!(err, OrchestrationError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_llm_error_propagates() {
        let provider = ScriptedProvider::new(vec![Err(LlmError::AuthenticationFailed)]);
        let orchestrator = orchestrator(provider, NoopRecorder::shared());
        let err = orchestrator.run("s", "u").await.unwrap_err();
        assert!(matches!(err, OrchestrationError::Llm(LlmError::AuthenticationFailed)));
    }
}
