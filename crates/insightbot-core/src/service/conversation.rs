//! Per-user, per-conversation context store.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use insightbot_types::conversation::{ConversationContext, ConversationKey};

/// Storage for conversation contexts.
///
/// Expiry belongs to the hosting layer, which calls `expire_before` on its
/// own schedule. The store never evicts on its own.
pub trait ConversationStore: Send + Sync {
    /// Create the context on first use, then bump `turn_count` and
    /// `updated_at`. Returns the updated context.
    fn touch(&self, key: &ConversationKey, now: DateTime<Utc>) -> ConversationContext;

    fn get(&self, key: &ConversationKey) -> Option<ConversationContext>;

    /// Drop every context last updated before `cutoff`. Returns how many
    /// were removed.
    fn expire_before(&self, cutoff: DateTime<Utc>) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local store backed by a concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    contexts: DashMap<ConversationKey, ConversationContext>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConversationStore for InMemoryConversationStore {
    fn touch(&self, key: &ConversationKey, now: DateTime<Utc>) -> ConversationContext {
        let mut entry = self
            .contexts
            .entry(key.clone())
            .or_insert_with(|| ConversationContext::new(key.clone(), now));
        entry.turn_count += 1;
        entry.updated_at = now;
        entry.clone()
    }

    fn get(&self, key: &ConversationKey) -> Option<ConversationContext> {
        self.contexts.get(key).map(|c| c.clone())
    }

    fn expire_before(&self, cutoff: DateTime<Utc>) -> usize {
        let before = self.contexts.len();
        self.contexts.retain(|_, ctx| ctx.updated_at >= cutoff);
        let removed = before.saturating_sub(self.contexts.len());
        if removed > 0 {
            tracing::debug!(removed, "expired conversation contexts");
        }
        removed
    }

    fn len(&self) -> usize {
        self.contexts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_touch_creates_then_increments() {
        let store = InMemoryConversationStore::new();
        let key = ConversationKey::new("user-1", "conv-1");
        let t0 = Utc::now();

        let first = store.touch(&key, t0);
        assert_eq!(first.turn_count, 1);
        assert_eq!(first.created_at, t0);

        let t1 = t0 + Duration::seconds(5);
        let second = store.touch(&key, t1);
        assert_eq!(second.turn_count, 2);
        assert_eq!(second.created_at, t0);
        assert_eq!(second.updated_at, t1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_contexts_are_per_user_and_conversation() {
        let store = InMemoryConversationStore::new();
        let now = Utc::now();
        store.touch(&ConversationKey::new("user-1", "conv-1"), now);
        store.touch(&ConversationKey::new("user-2", "conv-1"), now);
        store.touch(&ConversationKey::new("user-1", "conv-2"), now);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_expire_before_removes_stale_only() {
        let store = InMemoryConversationStore::new();
        let now = Utc::now();
        let stale = ConversationKey::new("user-1", "old");
        let fresh = ConversationKey::new("user-1", "new");
        store.touch(&stale, now - Duration::hours(2));
        store.touch(&fresh, now);

        let removed = store.expire_before(now - Duration::hours(1));
        assert_eq!(removed, 1);
        assert!(store.get(&stale).is_none());
        assert!(store.get(&fresh).is_some());
    }

    #[test]
    fn test_empty_store() {
        let store = InMemoryConversationStore::new();
        assert!(store.is_empty());
        assert_eq!(store.expire_before(Utc::now()), 0);
    }
}
