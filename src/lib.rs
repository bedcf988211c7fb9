//! chat_relay
//!
//! A web backend that proxies a chat/assistant experience:
//! - Streams model output to the browser over SSE
//! - Extracts tagged segments (thinking, tool calls) from the token stream
//! - Archives a size-bounded copy of each conversation

pub mod archive;
pub mod config;
pub mod conversation;
pub mod provider;
pub mod server;
pub mod stream;

// Re-exports for convenience
pub use archive::{ArchiveConfig, ArchiveFilter, ConversationStore, JsonFileStore};
pub use config::RelayConfig;
pub use conversation::{ChatMessage, ConversationHistory, Role};
pub use provider::LLMProvider;
pub use stream::{extract_tag, SseForwarder, StreamEvent, StreamSession, TagMatch};
