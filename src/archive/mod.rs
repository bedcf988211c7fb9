//! Archive Module
//!
//! Converts a session's finished message list into its persisted form:
//! the filter caps tool noise, the store writes the result.

pub mod filter;
pub mod store;

pub use filter::{ArchiveConfig, ArchiveFilter};
pub use store::{ConversationRecord, ConversationStore, JsonFileStore};
