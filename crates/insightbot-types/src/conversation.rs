use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Composite key for a conversation context: one per user per conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationKey {
    pub user_id: String,
    pub conversation_id: String,
}

impl ConversationKey {
    pub fn new(user_id: impl Into<String>, conversation_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            conversation_id: conversation_id.into(),
        }
    }
}

/// Per-user, per-conversation context.
///
/// Created on the first turn and updated on every turn. Expiry is driven
/// externally (see `ConversationStore::expire_before`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub key: ConversationKey,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub turn_count: u64,
    /// Opaque state blob; the bot never interprets it.
    #[serde(default)]
    pub state: serde_json::Value,
}

impl ConversationContext {
    pub fn new(key: ConversationKey, now: DateTime<Utc>) -> Self {
        Self {
            key,
            created_at: now,
            updated_at: now,
            turn_count: 0,
            state: serde_json::Value::Null,
        }
    }
}
