//! Per-conversation session state
//!
//! Inbound event handlers receive explicit conversation state keyed by
//! (platform, external id) from this store; there is no process-wide
//! mutable session singleton. The store is owned by whoever drives the
//! bot event loop and shared by reference.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use types::platform::PlatformKind;

/// Where a conversation currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStage {
    #[default]
    Idle,
    Registering,
    SettingPreferences,
    Browsing,
}

/// State carried across messages within one conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub stage: ConversationStage,
    /// Stage-specific scratch data (partial registration form, etc.)
    pub data: Value,
    pub updated_at: i64, // Unix nanos
}

impl ConversationState {
    pub fn new(timestamp: i64) -> Self {
        Self {
            stage: ConversationStage::Idle,
            data: Value::Null,
            updated_at: timestamp,
        }
    }
}

/// Conversation state store keyed by (platform, external id)
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<(PlatformKind, String), ConversationState>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state for a conversation, if one is in progress
    pub fn get(&self, platform: PlatformKind, external_id: &str) -> Option<ConversationState> {
        self.sessions
            .get(&(platform, external_id.to_string()))
            .map(|s| s.clone())
    }

    /// Replace the state for a conversation, creating it if needed
    pub fn put(&self, platform: PlatformKind, external_id: &str, state: ConversationState) {
        self.sessions
            .insert((platform, external_id.to_string()), state);
    }

    /// Atomically update a conversation's state in place
    pub fn update<F>(&self, platform: PlatformKind, external_id: &str, timestamp: i64, f: F)
    where
        F: FnOnce(&mut ConversationState),
    {
        let mut entry = self
            .sessions
            .entry((platform, external_id.to_string()))
            .or_insert_with(|| ConversationState::new(timestamp));
        f(&mut entry);
        entry.updated_at = timestamp;
    }

    /// End a conversation; returns the final state if one existed
    pub fn end(&self, platform: PlatformKind, external_id: &str) -> Option<ConversationState> {
        self.sessions
            .remove(&(platform, external_id.to_string()))
            .map(|(_, state)| state)
    }

    /// Number of conversations currently in progress
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_missing_is_none() {
        let store = SessionStore::new();
        assert!(store.get(PlatformKind::Telegram, "t-1").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_creates_and_mutates() {
        let store = SessionStore::new();

        store.update(PlatformKind::Telegram, "t-1", 10, |state| {
            state.stage = ConversationStage::Registering;
            state.data = json!({"name": "Amina"});
        });

        let state = store.get(PlatformKind::Telegram, "t-1").unwrap();
        assert_eq!(state.stage, ConversationStage::Registering);
        assert_eq!(state.data["name"], "Amina");
        assert_eq!(state.updated_at, 10);
    }

    #[test]
    fn test_conversations_are_isolated_by_key() {
        let store = SessionStore::new();

        store.update(PlatformKind::Telegram, "shared-id", 1, |state| {
            state.stage = ConversationStage::Browsing;
        });
        store.update(PlatformKind::Discord, "shared-id", 1, |state| {
            state.stage = ConversationStage::SettingPreferences;
        });

        assert_eq!(
            store.get(PlatformKind::Telegram, "shared-id").unwrap().stage,
            ConversationStage::Browsing
        );
        assert_eq!(
            store.get(PlatformKind::Discord, "shared-id").unwrap().stage,
            ConversationStage::SettingPreferences
        );
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_end_removes_and_returns_state() {
        let store = SessionStore::new();
        store.put(PlatformKind::Whatsapp, "w-1", ConversationState::new(5));

        let ended = store.end(PlatformKind::Whatsapp, "w-1").unwrap();
        assert_eq!(ended.stage, ConversationStage::Idle);
        assert!(store.end(PlatformKind::Whatsapp, "w-1").is_none());
        assert!(store.is_empty());
    }
}
