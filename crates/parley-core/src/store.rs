//! Durable conversation storage.
//!
//! The session core needs exactly two operations from a store: create a
//! conversation and append a message to it. [`FileStore`] is the shipped
//! implementation: one append-only JSONL file per conversation, a header
//! record on the first line and message records after it. The read path
//! (list, replay) serves the CLI only.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::providers::Role;

/// Opaque conversation identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Conversation header record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMeta {
    pub id: ConversationId,
    pub provider: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

/// One stored transcript message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A line in a conversation file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Record {
    Conversation(ConversationMeta),
    Message(StoredMessage),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse record at {path}:{line}: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode record: {source}")]
    Encode {
        #[source]
        source: serde_json::Error,
    },

    #[error("missing conversation header in {path}")]
    MissingHeader { path: PathBuf },

    #[error("no conversation with id {id}")]
    NotFound { id: ConversationId },
}

impl StorageError {
    fn io(operation: &'static str, path: &Path, source: std::io::Error) -> Self {
        StorageError::Io {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Store boundary consumed by the session.
pub trait ConversationStore: Send + Sync {
    /// Creates a conversation and returns its header.
    fn create_conversation(
        &self,
        provider: &str,
        model: &str,
    ) -> Result<ConversationMeta, StorageError>;

    /// Appends one message to a conversation. The write is flushed before
    /// this returns.
    fn append_message(
        &self,
        id: &ConversationId,
        role: Role,
        content: &str,
    ) -> Result<(), StorageError>;
}

/// JSONL-file conversation store rooted at one directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens a store at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|source| StorageError::io("creating store directory", &dir, source))?;
        Ok(Self { dir })
    }

    fn conversation_path(&self, id: &ConversationId) -> PathBuf {
        self.dir.join(format!("{id}.jsonl"))
    }

    fn append_record(&self, path: &Path, record: &Record) -> Result<(), StorageError> {
        let mut line = serde_json::to_string(record)
            .map_err(|source| StorageError::Encode { source })?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .append(true)
            .open(path)
            .map_err(|source| StorageError::io("opening conversation file", path, source))?;
        file.write_all(line.as_bytes())
            .map_err(|source| StorageError::io("appending record", path, source))?;
        file.flush()
            .map_err(|source| StorageError::io("flushing record", path, source))?;
        Ok(())
    }

    /// Lists stored conversations, newest first.
    pub fn list_conversations(&self) -> Result<Vec<ConversationMeta>, StorageError> {
        let entries = fs::read_dir(&self.dir)
            .map_err(|source| StorageError::io("reading store directory", &self.dir, source))?;

        let mut conversations = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|source| StorageError::io("reading store directory", &self.dir, source))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
                continue;
            }
            conversations.push(read_header(&path)?);
        }

        conversations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(conversations)
    }

    /// Reads the full message history of a conversation, oldest first.
    pub fn read_messages(&self, id: &ConversationId) -> Result<Vec<StoredMessage>, StorageError> {
        let path = self.conversation_path(id);
        if !path.exists() {
            return Err(StorageError::NotFound { id: id.clone() });
        }

        let contents = fs::read_to_string(&path)
            .map_err(|source| StorageError::io("reading conversation file", &path, source))?;

        let mut messages = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: Record =
                serde_json::from_str(line).map_err(|source| StorageError::Parse {
                    path: path.clone(),
                    line: index + 1,
                    source,
                })?;
            match record {
                Record::Conversation(_) => {}
                Record::Message(message) => messages.push(message),
            }
        }

        Ok(messages)
    }
}

fn read_header(path: &Path) -> Result<ConversationMeta, StorageError> {
    let contents = fs::read_to_string(path)
        .map_err(|source| StorageError::io("reading conversation file", path, source))?;
    let first = contents
        .lines()
        .next()
        .ok_or_else(|| StorageError::MissingHeader {
            path: path.to_path_buf(),
        })?;
    let record: Record = serde_json::from_str(first).map_err(|source| StorageError::Parse {
        path: path.to_path_buf(),
        line: 1,
        source,
    })?;
    match record {
        Record::Conversation(meta) => Ok(meta),
        Record::Message(_) => Err(StorageError::MissingHeader {
            path: path.to_path_buf(),
        }),
    }
}

impl ConversationStore for FileStore {
    fn create_conversation(
        &self,
        provider: &str,
        model: &str,
    ) -> Result<ConversationMeta, StorageError> {
        let meta = ConversationMeta {
            id: ConversationId(Uuid::new_v4().to_string()),
            provider: provider.to_string(),
            model: model.to_string(),
            created_at: Utc::now(),
        };

        let path = self.conversation_path(&meta.id);
        let mut line = serde_json::to_string(&Record::Conversation(meta.clone()))
            .map_err(|source| StorageError::Encode { source })?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&path)
            .map_err(|source| StorageError::io("creating conversation file", &path, source))?;
        file.write_all(line.as_bytes())
            .map_err(|source| StorageError::io("writing conversation header", &path, source))?;
        file.flush()
            .map_err(|source| StorageError::io("flushing conversation header", &path, source))?;

        tracing::debug!(id = %meta.id, provider, model, "conversation created");
        Ok(meta)
    }

    fn append_message(
        &self,
        id: &ConversationId,
        role: Role,
        content: &str,
    ) -> Result<(), StorageError> {
        let path = self.conversation_path(id);
        if !path.exists() {
            return Err(StorageError::NotFound { id: id.clone() });
        }
        self.append_record(
            &path,
            &Record::Message(StoredMessage {
                role,
                content: content.to_string(),
                created_at: Utc::now(),
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn store() -> (TempDir, FileStore) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path().join("conversations")).unwrap();
        (dir, store)
    }

    #[test]
    fn create_then_append_then_read_round_trips() {
        let (_dir, store) = store();
        let meta = store.create_conversation("anthropic", "claude-sonnet-4-5").unwrap();

        store.append_message(&meta.id, Role::User, "hi").unwrap();
        store.append_message(&meta.id, Role::Assistant, "hello").unwrap();

        let messages = store.read_messages(&meta.id).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "hi");
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "hello");
    }

    #[test]
    fn list_is_newest_first() {
        let (_dir, store) = store();
        let first = store.create_conversation("openai", "gpt-5").unwrap();
        // Keep the two creation timestamps distinct on coarse clocks.
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = store.create_conversation("google", "gemini-2.5-pro").unwrap();

        let listed = store.list_conversations().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[test]
    fn append_to_missing_conversation_fails() {
        let (_dir, store) = store();
        let err = store
            .append_message(&ConversationId::from("nope"), Role::User, "hi")
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[test]
    fn corrupted_line_reports_path_and_line() {
        let (_dir, store) = store();
        let meta = store.create_conversation("anthropic", "m").unwrap();
        let path = store.conversation_path(&meta.id);
        let mut contents = fs::read_to_string(&path).unwrap();
        contents.push_str("{not json\n");
        fs::write(&path, contents).unwrap();

        let err = store.read_messages(&meta.id).unwrap_err();
        match err {
            StorageError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("expected parse error, got {other}"),
        }
    }

    #[test]
    fn header_only_file_has_no_messages() {
        let (_dir, store) = store();
        let meta = store.create_conversation("google", "gemini-2.5-flash").unwrap();
        assert!(store.read_messages(&meta.id).unwrap().is_empty());
    }
}
