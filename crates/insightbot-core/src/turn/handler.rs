//! Turn handler.
//!
//! Each inbound activity runs through `Received -> Delegated -> Responded` or
//! `Received -> Delegated -> Failed`. Every path ends with the replies to send;
//! nothing escapes `handle`, panics included.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::FutureExt;
use tracing::debug;

use insightbot_types::activity::{Activity, ActivityType};
use insightbot_types::config::BotBehaviorConfig;
use insightbot_types::conversation::ConversationKey;

use crate::agent::orchestrator::{OrchestrationError, Orchestrator};
use crate::agent::prompt::system_instruction_for;
use crate::capability::render::truncate_for_log;
use crate::observe::{DynRecorder, LogLevel};
use crate::service::conversation::ConversationStore;

/// Sent once to every member who joins a conversation.
pub const WELCOME_MESSAGE: &str = "Hello and welcome! I'm InsightBot. Ask me about customers, \
orders, products, regional sales, or sales rep performance.";

/// Sent when the orchestrator fails or times out.
pub const FALLBACK_APOLOGY: &str =
    "Sorry, I couldn't process your request right now. Please try again in a moment.";

/// Sent when the turn itself fails unexpectedly.
pub const GENERIC_APOLOGY: &str = "Sorry, something went wrong on my side. Please try again.";

/// Sent for a message with no text.
pub const EMPTY_MESSAGE_HINT: &str =
    "Please type a question, for example: \"Who were our top customers last month?\"";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Received,
    Delegated,
    Responded,
    Failed,
}

/// Terminal state of a turn plus the replies to deliver.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub state: TurnState,
    pub replies: Vec<Activity>,
}

impl TurnOutcome {
    fn responded(replies: Vec<Activity>) -> Self {
        Self {
            state: TurnState::Responded,
            replies,
        }
    }

    fn failed(reply: Activity) -> Self {
        Self {
            state: TurnState::Failed,
            replies: vec![reply],
        }
    }
}

#[derive(Debug, Clone)]
pub struct TurnConfig {
    /// Upper bound on the whole delegation, every tool round included.
    pub turn_timeout: Duration,
    /// Characters of inbound text kept in logs.
    pub log_preview_chars: usize,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self::from(&BotBehaviorConfig::default())
    }
}

impl From<&BotBehaviorConfig> for TurnConfig {
    fn from(config: &BotBehaviorConfig) -> Self {
        Self {
            turn_timeout: Duration::from_secs(config.turn_timeout_secs),
            log_preview_chars: config.log_preview_chars,
        }
    }
}

pub struct TurnHandler {
    orchestrator: Arc<Orchestrator>,
    conversations: Arc<dyn ConversationStore>,
    recorder: DynRecorder,
    config: TurnConfig,
}

impl TurnHandler {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        conversations: Arc<dyn ConversationStore>,
        recorder: DynRecorder,
        config: TurnConfig,
    ) -> Self {
        Self {
            orchestrator,
            conversations,
            recorder,
            config,
        }
    }

    /// Process one activity. Never panics and never returns an error.
    pub async fn handle(&self, activity: &Activity) -> TurnOutcome {
        match AssertUnwindSafe(self.dispatch(activity)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => {
                self.recorder.record(
                    LogLevel::Error,
                    "unhandled failure in turn",
                    &[
                        ("panic", panic_message(panic.as_ref())),
                        ("activity_type", activity.activity_type.to_string()),
                        ("activity_id", activity.id.clone().unwrap_or_default()),
                        ("conversation_id", activity.conversation.id.clone()),
                        ("user_id", activity.from.id.clone()),
                    ],
                );
                TurnOutcome::failed(activity.reply_text(GENERIC_APOLOGY))
            }
        }
    }

    async fn dispatch(&self, activity: &Activity) -> TurnOutcome {
        debug!(
            state = ?TurnState::Received,
            activity_type = %activity.activity_type,
            conversation_id = %activity.conversation.id,
            "turn received"
        );
        match activity.activity_type {
            ActivityType::Message => self.on_message(activity).await,
            ActivityType::ConversationUpdate => self.on_members_added(activity),
            _ => TurnOutcome::responded(Vec::new()),
        }
    }

    async fn on_message(&self, activity: &Activity) -> TurnOutcome {
        let Some(preview) = activity.trimmed_text() else {
            return TurnOutcome::responded(vec![activity.reply_text(EMPTY_MESSAGE_HINT)]);
        };
        let text = activity.text.as_deref().unwrap_or(preview);

        self.recorder.record(
            LogLevel::Info,
            "message received",
            &[
                ("conversation_id", activity.conversation.id.clone()),
                ("user_id", activity.from.id.clone()),
                ("preview", truncate_for_log(preview, self.config.log_preview_chars)),
            ],
        );

        let now = Utc::now();
        let key = ConversationKey::new(&activity.from.id, &activity.conversation.id);
        let context = self.conversations.touch(&key, now);

        debug!(
            state = ?TurnState::Delegated,
            turn = context.turn_count,
            provider = self.orchestrator.provider_name(),
            "delegating to orchestrator"
        );
        let system = system_instruction_for(now.date_naive());
        let result = tokio::time::timeout(
            self.config.turn_timeout,
            self.orchestrator.run(&system, text),
        )
        .await
        .unwrap_or(Err(OrchestrationError::Timeout(self.config.turn_timeout)));

        match result {
            Ok(answer) => {
                debug!(state = ?TurnState::Responded, chars = answer.len(), "turn answered");
                TurnOutcome::responded(vec![activity.reply_text(answer)])
            }
            Err(e) => {
                self.recorder.record(
                    LogLevel::Error,
                    "orchestration failed",
                    &[
                        ("conversation_id", activity.conversation.id.clone()),
                        ("user_id", activity.from.id.clone()),
                        ("error", e.to_string()),
                    ],
                );
                TurnOutcome::failed(activity.reply_text(FALLBACK_APOLOGY))
            }
        }
    }

    fn on_members_added(&self, activity: &Activity) -> TurnOutcome {
        let bot_id = activity.recipient.id.as_str();
        let replies: Vec<Activity> = activity
            .members_added
            .iter()
            .filter(|member| member.id != bot_id)
            .map(|member| activity.reply_to(member.clone(), WELCOME_MESSAGE))
            .collect();
        if !replies.is_empty() {
            debug!(count = replies.len(), "welcoming new members");
        }
        TurnOutcome::responded(replies)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::orchestrator::OrchestratorConfig;
    use crate::agent::orchestrator::tests::{ScriptedProvider, text_response};
    use crate::capability::CapabilityRegistry;
    use crate::llm::box_provider::BoxLlmProvider;
    use crate::observe::MemoryRecorder;
    use crate::service::conversation::InMemoryConversationStore;
    use insightbot_types::llm::{CompletionResponse, MessageRole, StopReason, ToolCall, Usage};
    use serde_json::json;

    struct Harness {
        handler: TurnHandler,
        recorder: Arc<MemoryRecorder>,
        store: Arc<InMemoryConversationStore>,
    }

    fn harness_with(
        provider: ScriptedProvider,
        registry: CapabilityRegistry,
        timeout: Duration,
    ) -> Harness {
        let recorder = Arc::new(MemoryRecorder::new());
        let store = Arc::new(InMemoryConversationStore::new());
        let orchestrator = Orchestrator::new(
            BoxLlmProvider::new(provider),
            registry,
            OrchestratorConfig::default(),
            recorder.clone(),
        );
        let handler = TurnHandler::new(
            Arc::new(orchestrator),
            store.clone(),
            recorder.clone(),
            TurnConfig {
                turn_timeout: timeout,
                log_preview_chars: 10,
            },
        );
        Harness {
            handler,
            recorder,
            store,
        }
    }

    fn harness(provider: ScriptedProvider) -> Harness {
        harness_with(provider, CapabilityRegistry::new(), Duration::from_secs(5))
    }

    fn message(text: &str) -> Activity {
        serde_json::from_value(json!({
            "type": "message",
            "id": "act-1",
            "serviceUrl": "https://smba.example.net/",
            "from": {"id": "user-1"},
            "conversation": {"id": "conv-1"},
            "recipient": {"id": "bot-1"},
            "text": text,
        }))
        .unwrap()
    }

    fn members_added(ids: &[&str]) -> Activity {
        let members: Vec<_> = ids.iter().map(|id| json!({"id": id})).collect();
        serde_json::from_value(json!({
            "type": "conversationUpdate",
            "from": {"id": "user-1"},
            "conversation": {"id": "conv-1"},
            "recipient": {"id": "bot-1"},
            "membersAdded": members,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_message_answered() {
        let h = harness(ScriptedProvider::new(vec![Ok(text_response("C123 bought 4 orders."))]));
        let outcome = h.handler.handle(&message("How is customer C123 doing?")).await;

        assert_eq!(outcome.state, TurnState::Responded);
        assert_eq!(outcome.replies.len(), 1);
        assert_eq!(outcome.replies[0].text.as_deref(), Some("C123 bought 4 orders."));
        assert_eq!(outcome.replies[0].recipient.id, "user-1");
        assert_eq!(h.recorder.count(LogLevel::Error), 0);
    }

    #[tokio::test]
    async fn test_full_message_text_reaches_the_model() {
        let provider = ScriptedProvider::new(vec![Ok(text_response("ok"))]);
        let requests = Arc::clone(&provider.requests);
        let h = harness(provider);

        h.handler.handle(&message("  Show C123\n")).await;

        let requests = requests.lock().unwrap();
        let user: Vec<&str> = requests[0]
            .messages
            .iter()
            .filter(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(user, vec!["  Show C123\n"]);
    }

    #[tokio::test]
    async fn test_inbound_text_is_truncated_in_logs() {
        let h = harness(ScriptedProvider::new(vec![Ok(text_response("ok"))]));
        h.handler
            .handle(&message("a very long and private question"))
            .await;

        let info = h.recorder.at_level(LogLevel::Info);
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].field("preview"), Some("a very lon..."));
    }

    #[tokio::test]
    async fn test_context_touched_per_turn() {
        let h = harness(ScriptedProvider::new(vec![]));
        h.handler.handle(&message("one")).await;
        h.handler.handle(&message("two")).await;

        let ctx = h
            .store
            .get(&ConversationKey::new("user-1", "conv-1"))
            .unwrap();
        assert_eq!(ctx.turn_count, 2);
    }

    #[tokio::test]
    async fn test_orchestration_timeout_sends_fallback_and_logs_once() {
        let mut provider = ScriptedProvider::new(vec![Ok(text_response("too late"))]);
        provider.delay = Some(Duration::from_secs(2));
        let h = harness_with(provider, CapabilityRegistry::new(), Duration::from_millis(50));

        let outcome = h.handler.handle(&message("top customers?")).await;

        assert_eq!(outcome.state, TurnState::Failed);
        assert_eq!(outcome.replies.len(), 1);
        assert_eq!(outcome.replies[0].text.as_deref(), Some(FALLBACK_APOLOGY));
        let errors = h.recorder.at_level(LogLevel::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].field("error").unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_model_error_sends_fallback() {
        let h = harness(ScriptedProvider::new(vec![Err(
            insightbot_types::llm::LlmError::Provider {
                message: "500 from upstream".to_string(),
            },
        )]));
        let outcome = h.handler.handle(&message("hi")).await;

        assert_eq!(outcome.state, TurnState::Failed);
        assert_eq!(outcome.replies[0].text.as_deref(), Some(FALLBACK_APOLOGY));
        assert_eq!(h.recorder.count(LogLevel::Error), 1);
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let mut registry = CapabilityRegistry::new();
        registry.register("explode", "Panics", json!({}), |_| async {
            if true {
                panic!("capability exploded");
            }
            Ok::<String, insightbot_types::error::CapabilityError>(String::new())
        });
        let provider = ScriptedProvider::new(vec![Ok(CompletionResponse {
            id: "r".to_string(),
            content: String::new(),
            tool_calls: vec![ToolCall {
                id: "c1".to_string(),
                name: "explode".to_string(),
                arguments: json!({}),
            }],
            model: "test-model".to_string(),
            stop_reason: StopReason::ToolUse,
            usage: Usage::default(),
        })]);
        let h = harness_with(provider, registry, Duration::from_secs(5));

        let outcome = h.handler.handle(&message("boom")).await;

        assert_eq!(outcome.state, TurnState::Failed);
        assert_eq!(outcome.replies[0].text.as_deref(), Some(GENERIC_APOLOGY));
        let errors = h.recorder.at_level(LogLevel::Error);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field("panic"), Some("capability exploded"));
        assert_eq!(errors[0].field("activity_id"), Some("act-1"));

        // The handler keeps serving after a panic.
        let next = h.handler.handle(&message("still there?")).await;
        assert_eq!(next.state, TurnState::Responded);
    }

    #[tokio::test]
    async fn test_empty_message_gets_hint_without_delegation() {
        let provider = ScriptedProvider::new(vec![]);
        let requests = Arc::clone(&provider.requests);
        let h = harness(provider);

        let outcome = h.handler.handle(&message("   ")).await;
        assert_eq!(outcome.state, TurnState::Responded);
        assert_eq!(outcome.replies[0].text.as_deref(), Some(EMPTY_MESSAGE_HINT));
        assert!(requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_welcome_sent_to_new_member() {
        let h = harness(ScriptedProvider::new(vec![]));
        let outcome = h.handler.handle(&members_added(&["user-2"])).await;

        assert_eq!(outcome.state, TurnState::Responded);
        assert_eq!(outcome.replies.len(), 1);
        assert_eq!(outcome.replies[0].recipient.id, "user-2");
        assert_eq!(outcome.replies[0].text.as_deref(), Some(WELCOME_MESSAGE));
    }

    #[tokio::test]
    async fn test_no_welcome_for_bot_itself() {
        let h = harness(ScriptedProvider::new(vec![]));
        let outcome = h.handler.handle(&members_added(&["bot-1"])).await;
        assert!(outcome.replies.is_empty());

        let outcome = h
            .handler
            .handle(&members_added(&["bot-1", "user-2", "user-3"]))
            .await;
        let recipients: Vec<&str> = outcome
            .replies
            .iter()
            .map(|r| r.recipient.id.as_str())
            .collect();
        assert_eq!(recipients, vec!["user-2", "user-3"]);
    }

    #[tokio::test]
    async fn test_other_activity_types_are_silent() {
        let h = harness(ScriptedProvider::new(vec![]));
        let mut typing = message("x");
        typing.activity_type = ActivityType::Typing;
        let outcome = h.handler.handle(&typing).await;
        assert_eq!(outcome.state, TurnState::Responded);
        assert!(outcome.replies.is_empty());
    }

    #[test]
    fn test_panic_message_payloads() {
        let boxed: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(boxed.as_ref()), "static str");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic payload");
    }

    #[test]
    fn test_turn_config_from_behavior() {
        let config = TurnConfig::default();
        assert_eq!(config.turn_timeout, Duration::from_secs(90));
        assert_eq!(config.log_preview_chars, 50);
    }
}
