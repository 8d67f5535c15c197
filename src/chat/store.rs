//! Chat history persistence.
//!
//! The browser keeps one history per installation: the ordered messages plus
//! a duration map used for "thought for N s" annotations. Both are stored
//! together under the fixed key [`STORAGE_KEY`].
//!
//! Stores are synchronous; async callers go through `spawn_blocking`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::message::UiMessage;

/// Fixed storage key; also the default history file stem.
pub const STORAGE_KEY: &str = "chat-messages";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialise history: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

/// Elapsed milliseconds keyed by `"{message_id}-{part_index}"`.
pub type DurationMap = BTreeMap<String, f64>;

pub fn duration_key(message_id: &str, part_index: usize) -> String {
    format!("{message_id}-{part_index}")
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatHistory {
    #[serde(default)]
    pub messages: Vec<UiMessage>,
    #[serde(default)]
    pub durations: DurationMap,
}

impl ChatHistory {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.durations.is_empty()
    }
}

/// Load / save / clear for one chat history.
pub trait ChatStore: Send + Sync {
    /// Never fails: a missing or unreadable history loads as empty.
    fn load(&self) -> ChatHistory;

    fn save(&self, history: &ChatHistory) -> Result<(), StoreError>;

    fn clear(&self) -> Result<(), StoreError>;
}

// ── JSON file ────────────────────────────────────────────────────────────────

/// History persisted as one pretty-printed JSON file.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-write leaves the previous history intact.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ChatStore for JsonFileStore {
    fn load(&self) -> ChatHistory {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no chat history yet");
                return ChatHistory::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), "cannot read chat history: {e}");
                return ChatHistory::default();
            }
        };
        match serde_json::from_str(&data) {
            Ok(history) => history,
            Err(e) => {
                warn!(path = %self.path.display(), "malformed chat history, starting fresh: {e}");
                ChatHistory::default()
            }
        }
    }

    fn save(&self, history: &ChatHistory) -> Result<(), StoreError> {
        let data = serde_json::to_string_pretty(history)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|source| StoreError::Write { path: parent.to_path_buf(), source })?;
        }
        let tmp = self.tmp_path();
        fs::write(&tmp, data).map_err(|source| StoreError::Write { path: tmp.clone(), source })?;
        fs::rename(&tmp, &self.path)
            .map_err(|source| StoreError::Write { path: self.path.clone(), source })?;
        debug!(
            path = %self.path.display(),
            messages = history.messages.len(),
            durations = history.durations.len(),
            "chat history saved"
        );
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Remove { path: self.path.clone(), source }),
        }
    }
}

// ── In-memory ────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<ChatHistory>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChatStore for MemoryStore {
    fn load(&self) -> ChatHistory {
        self.inner.lock().map(|h| h.clone()).unwrap_or_default()
    }

    fn save(&self, history: &ChatHistory) -> Result<(), StoreError> {
        let mut guard = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        *guard = history.clone();
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut guard = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        *guard = ChatHistory::default();
        Ok(())
    }
}
