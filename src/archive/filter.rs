//! Archival filter - bounds tool noise before persistence
//!
//! The live conversation is never shortened. At archival time, messages
//! classified as tool output are capped at a configured length so one
//! noisy tool call cannot dominate the stored record. Everything else,
//! system instructions included, is written verbatim.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use crate::conversation::{ChatMessage, Role};

lazy_static! {
    /// The textual convention marking tool output: "Tool <name> returned:".
    static ref TOOL_RESPONSE_RE: Regex =
        Regex::new(r"Tool \w+ returned:").expect("valid tool response pattern");
}

/// Archival configuration
///
/// `tagged_tool_names` is the legacy prefix list kept for backward
/// compatibility: content starting with `Tool <name> returned:` for one of
/// these names is tool output even if the generic pattern were to change.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    pub max_tool_response_length: usize,
    pub tagged_tool_names: HashSet<String>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            max_tool_response_length: 500,
            tagged_tool_names: ["web_search", "code_exec", "memory_query"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Pure transform from the live message list to the persisted one
#[derive(Debug, Clone, Default)]
pub struct ArchiveFilter {
    config: ArchiveConfig,
}

impl ArchiveFilter {
    pub fn new(config: ArchiveConfig) -> Self {
        Self { config }
    }

    /// Filter a finished message list. Total over its input: messages that
    /// are not tool output, or already fit the bound, pass through
    /// unchanged, which also makes a second application a no-op.
    pub fn apply(&self, messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
        messages
            .into_iter()
            .map(|m| self.filter_message(m))
            .collect()
    }

    fn filter_message(&self, mut message: ChatMessage) -> ChatMessage {
        // System instructions are needed verbatim for context continuity.
        if message.role == Role::System {
            return message;
        }
        if !self.is_tool_output(&message.content) {
            return message;
        }

        let total = message.content.chars().count();
        if total <= self.config.max_tool_response_length {
            return message;
        }

        message.content =
            truncate_with_marker(&message.content, self.config.max_tool_response_length, total);
        message
    }

    fn is_tool_output(&self, content: &str) -> bool {
        if TOOL_RESPONSE_RE.is_match(content) {
            return true;
        }
        self.config
            .tagged_tool_names
            .iter()
            .any(|name| content.starts_with(&format!("Tool {} returned:", name)))
    }
}

/// Keep a prefix and append a marker stating the original length, with the
/// replacement as a whole staying within `max` characters. Staying within
/// the bound is what lets the length test reject a second truncation.
fn truncate_with_marker(content: &str, max: usize, original_chars: usize) -> String {
    let marker = format!("... [truncated, original length: {} chars]", original_chars);
    let keep = max.saturating_sub(marker.chars().count());
    let prefix: String = content.chars().take(keep).collect();
    format!("{}{}", prefix, marker)
}
