use dashmap::DashMap;
use serde::Serialize;
use std::time::{Duration, Instant};

use crate::models::{ChatMessage, Role};

struct Conversation {
    messages: Vec<ChatMessage>,
    last_seen: Instant,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct MemoryStats {
    pub active_users: usize,
    pub total_messages: usize,
    pub max_messages_per_user: usize,
    pub ttl_seconds: u64,
}

/// Short-term per-user chat history kept in process.
pub struct ConversationMemory {
    conversations: DashMap<String, Conversation>,
    max_messages: usize,
    ttl: Duration,
}

impl ConversationMemory {
    /// `max_exchanges` user/assistant pairs are kept per user.
    pub fn new(max_exchanges: usize, ttl: Duration) -> Self {
        Self { conversations: DashMap::new(), max_messages: max_exchanges * 2, ttl }
    }

    fn cleanup(&self) {
        let before = self.conversations.len();
        self.conversations.retain(|_, c| c.last_seen.elapsed() < self.ttl);
        let removed = before.saturating_sub(self.conversations.len());
        if removed > 0 {
            tracing::debug!("Expired {} conversations", removed);
        }
    }

    pub fn add_message(&self, user_id: &str, role: Role, content: &str) {
        self.cleanup();
        let mut conversation = self
            .conversations
            .entry(user_id.to_string())
            .or_insert_with(|| Conversation { messages: Vec::new(), last_seen: Instant::now() });
        conversation.messages.push(ChatMessage::new(role, content));
        let overflow = conversation.messages.len().saturating_sub(self.max_messages);
        if overflow > 0 {
            conversation.messages.drain(..overflow);
        }
        conversation.last_seen = Instant::now();
    }

    /// Most recent `limit` messages, oldest first.
    pub fn get_history(&self, user_id: &str, limit: Option<usize>) -> Vec<ChatMessage> {
        self.cleanup();
        let Some(conversation) = self.conversations.get(user_id) else {
            return Vec::new();
        };
        let messages = &conversation.messages;
        let skip = limit.map(|l| messages.len().saturating_sub(l)).unwrap_or(0);
        messages[skip..].to_vec()
    }

    pub fn clear_history(&self, user_id: &str) -> bool {
        self.cleanup();
        self.conversations.remove(user_id).is_some()
    }

    pub fn get_stats(&self) -> MemoryStats {
        self.cleanup();
        MemoryStats {
            active_users: self.conversations.len(),
            total_messages: self.conversations.iter().map(|c| c.messages.len()).sum(),
            max_messages_per_user: self.max_messages,
            ttl_seconds: self.ttl.as_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_recent_exchanges() {
        let memory = ConversationMemory::new(2, Duration::from_secs(60));
        for i in 0..6 {
            memory.add_message("u", Role::User, &format!("m{}", i));
        }
        let history = memory.get_history("u", None);
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].content, "m2");
        assert_eq!(memory.get_history("u", Some(1))[0].content, "m5");
    }

    #[test]
    fn clear_and_stats() {
        let memory = ConversationMemory::new(10, Duration::from_secs(60));
        memory.add_message("a", Role::User, "hi");
        memory.add_message("a", Role::Assistant, "hello");
        memory.add_message("b", Role::User, "yo");
        let stats = memory.get_stats();
        assert_eq!(stats.active_users, 2);
        assert_eq!(stats.total_messages, 3);
        assert_eq!(stats.max_messages_per_user, 20);
        assert!(memory.clear_history("a"));
        assert!(!memory.clear_history("a"));
        assert!(memory.get_history("a", None).is_empty());
    }

    #[test]
    fn idle_conversations_expire() {
        let memory = ConversationMemory::new(10, Duration::from_millis(1));
        memory.add_message("a", Role::User, "hi");
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(memory.get_stats().active_users, 0);
    }
}
