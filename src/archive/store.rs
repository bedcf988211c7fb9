//! Conversation store - the persistence collaborator
//!
//! Archival hands a filtered message list to a store; everything behind
//! this trait (documents, collections, auth) is somebody else's problem.
//! The JSON file store keeps one pretty-printed document per conversation,
//! which is plenty for local deployments and for tests.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

use crate::conversation::ChatMessage;

/// The persisted shape of one conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationRecord {
    pub id: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationRecord {
    pub fn new(id: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            messages,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Storage seam for archived conversations
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Persist a record, replacing any previous version
    async fn save(&self, record: &ConversationRecord) -> Result<()>;

    /// Load a record by id
    async fn load(&self, id: &str) -> Result<Option<ConversationRecord>>;

    /// List the ids of all archived conversations
    async fn list(&self) -> Result<Vec<String>>;
}

/// One JSON document per conversation under a directory
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}

#[async_trait]
impl ConversationStore for JsonFileStore {
    async fn save(&self, record: &ConversationRecord) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .context("Failed to create archive directory")?;

        let json = serde_json::to_string_pretty(record)
            .context("Failed to serialize conversation record")?;

        fs::write(self.path_for(&record.id), json)
            .await
            .context("Failed to write conversation file")?;

        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Option<ConversationRecord>> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path)
            .await
            .context("Failed to read conversation file")?;

        let record = serde_json::from_str(&json)
            .context("Failed to deserialize conversation record")?;

        Ok(Some(record))
    }

    async fn list(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        let mut entries = fs::read_dir(&self.dir)
            .await
            .context("Failed to read archive directory")?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }

        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let temp_dir = tempdir().unwrap();
        let store = JsonFileStore::new(temp_dir.path());

        let record = ConversationRecord::new(
            "conv-1",
            vec![
                ChatMessage::new(Role::User, "hello"),
                ChatMessage::new(Role::Assistant, "hi"),
            ],
        );

        store.save(&record).await.unwrap();
        let loaded = store.load("conv-1").await.unwrap().unwrap();

        assert_eq!(loaded.id, "conv-1");
        assert_eq!(loaded.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_load_missing_returns_none() {
        let temp_dir = tempdir().unwrap();
        let store = JsonFileStore::new(temp_dir.path());
        assert!(store.load("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_archived_ids() {
        let temp_dir = tempdir().unwrap();
        let store = JsonFileStore::new(temp_dir.path());

        for id in ["b", "a"] {
            store
                .save(&ConversationRecord::new(id, Vec::new()))
                .await
                .unwrap();
        }

        assert_eq!(store.list().await.unwrap(), vec!["a", "b"]);
    }
}
