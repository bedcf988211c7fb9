//! Relay configuration
//!
//! All knobs live in explicit structs built once at startup and passed
//! down; nothing reads the environment after this point.

use std::env;

use crate::archive::ArchiveConfig;

/// Configuration for the relay
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address the HTTP server binds to
    pub listen_addr: String,
    /// Model name passed to the provider
    pub model: String,
    /// System prompt prepended to every turn
    pub system_prompt: String,
    /// Tag names extracted from the token stream
    pub stream_tags: Vec<String>,
    /// Directory for archived conversations
    pub archive_dir: String,
    /// Archival filter settings
    pub archive: ArchiveConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8002".to_string(),
            model: "llama3".to_string(),
            system_prompt: "You are a helpful assistant. Put internal reasoning inside \
                            <thinking>...</thinking> and tool invocations inside \
                            <tool>...</tool>."
                .to_string(),
            stream_tags: vec!["thinking".to_string(), "tool".to_string()],
            archive_dir: "archive".to_string(),
            archive: ArchiveConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Build from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mut config = Self {
            listen_addr: env::var("RELAY_ADDR").unwrap_or(defaults.listen_addr),
            model: env::var("RELAY_MODEL").unwrap_or(defaults.model),
            system_prompt: env::var("RELAY_SYSTEM_PROMPT").unwrap_or(defaults.system_prompt),
            archive_dir: env::var("RELAY_ARCHIVE_DIR").unwrap_or(defaults.archive_dir),
            stream_tags: defaults.stream_tags,
            archive: defaults.archive,
        };

        if let Ok(tags) = env::var("RELAY_STREAM_TAGS") {
            let tags: Vec<String> = tags
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            if !tags.is_empty() {
                config.stream_tags = tags;
            }
        }

        if let Ok(max) = env::var("RELAY_MAX_TOOL_RESPONSE") {
            if let Ok(max) = max.parse() {
                config.archive.max_tool_response_length = max;
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.listen_addr, "0.0.0.0:8002");
        assert_eq!(config.stream_tags, vec!["thinking", "tool"]);
        assert_eq!(config.archive.max_tool_response_length, 500);
    }
}
