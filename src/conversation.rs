//! Conversation history - the live, per-session message list
//!
//! Holds the untruncated messages for the active exchange. Archival
//! (and any shortening) happens later, against a copy of this list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a conversation message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Thinking,
    System,
}

/// A single conversation message
///
/// The live representation is never truncated; only the archived copy
/// produced by the archive filter may be shortened.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_data: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_data: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_tool_data(mut self, tool_data: impl Into<String>) -> Self {
        self.tool_data = Some(tool_data.into());
        self
    }
}

/// Ordered message list for one live conversation
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ConversationHistory {
    messages: Vec<ChatMessage>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user message
    pub fn add_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::new(Role::User, content));
    }

    /// Add an assistant response
    pub fn add_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::new(Role::Assistant, content));
    }

    /// Add a thinking aside extracted from the stream
    pub fn add_thinking(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::new(Role::Thinking, content));
    }

    /// Add a system instruction
    pub fn add_system(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::new(Role::System, content));
    }

    /// Add tool output, carried both as content and as structured tool data
    pub fn add_tool_output(&mut self, content: impl Into<String>) {
        let content = content.into();
        self.messages
            .push(ChatMessage::new(Role::Assistant, content.clone()).with_tool_data(content));
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// All messages, in order
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Owned copy of the message list (archival operates on a private copy)
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }

    /// Format history for prompt injection
    pub fn format_for_prompt(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role != Role::Thinking)
            .map(|m| {
                let role = match m.role {
                    Role::User => "User",
                    Role::Assistant => "Assistant",
                    Role::System => "System",
                    Role::Thinking => unreachable!(),
                };
                format!("{}: {}", role, m.content)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Get the last user message
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_accumulation() {
        let mut history = ConversationHistory::new();

        history.add_user("Hello");
        history.add_thinking("the user greeted me");
        history.add_assistant("Hi there!");

        assert_eq!(history.len(), 3);
        assert_eq!(history.last_user_message(), Some("Hello"));
        assert_eq!(history.messages()[1].role, Role::Thinking);
    }

    #[test]
    fn test_thinking_excluded_from_prompt() {
        let mut history = ConversationHistory::new();
        history.add_user("question");
        history.add_thinking("internal reasoning");
        history.add_assistant("answer");

        let prompt = history.format_for_prompt();
        assert!(prompt.contains("User: question"));
        assert!(prompt.contains("Assistant: answer"));
        assert!(!prompt.contains("internal reasoning"));
    }

    #[test]
    fn test_tool_output_carries_tool_data() {
        let mut history = ConversationHistory::new();
        history.add_tool_output("Tool web_search returned: results");

        let msg = &history.messages()[0];
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.tool_data.as_deref(), Some("Tool web_search returned: results"));
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let msg = ChatMessage::new(Role::Thinking, "hmm");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "thinking");
        assert!(json.get("tool_data").is_none());
    }
}
