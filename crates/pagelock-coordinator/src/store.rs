//! Key-value storage area holding the lock record
//!
//! The coordinator is the only writer. Everyone else may read or watch the
//! change feed.

use async_trait::async_trait;
use pagelock_core::{PageLockError, PageLockResult};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;

const CHANGE_FEED_CAPACITY: usize = 64;

/// One entry of the storage change feed
#[derive(Debug, Clone, PartialEq)]
pub struct StorageChange {
    pub key: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

/// Persistent key-value store with a change feed
#[async_trait(?Send)]
pub trait StateStore {
    async fn get(&self, key: &str) -> PageLockResult<Option<Value>>;

    /// Replace the value under `key`. Emits a [`StorageChange`] when the
    /// stored value actually changed.
    async fn set(&self, key: &str, value: Value) -> PageLockResult<()>;

    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;
}

/// Apply `value` to `entries` and build the change record, if any.
fn apply(entries: &mut Map<String, Value>, key: &str, value: Value) -> Option<StorageChange> {
    let old_value = entries.insert(key.to_string(), value.clone());
    if old_value.as_ref() == Some(&value) {
        return None;
    }
    Some(StorageChange {
        key: key.to_string(),
        old_value,
        new_value: Some(value),
    })
}

/// Volatile store, for tests and throwaway sessions
pub struct MemoryStore {
    entries: RefCell<Map<String, Value>>,
    changes: broadcast::Sender<StorageChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            entries: RefCell::new(Map::new()),
            changes,
        }
    }

    /// Seed a value without emitting a change.
    pub fn with_entry(self, key: &str, value: Value) -> Self {
        self.entries.borrow_mut().insert(key.to_string(), value);
        self
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl StateStore for MemoryStore {
    async fn get(&self, key: &str) -> PageLockResult<Option<Value>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> PageLockResult<()> {
        let change = apply(&mut self.entries.borrow_mut(), key, value);
        if let Some(change) = change {
            let _ = self.changes.send(change);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}

/// Store backed by a JSON object file. The whole file is rewritten on each
/// change, through a temporary file and a rename.
pub struct JsonFileStore {
    path: PathBuf,
    entries: RefCell<Map<String, Value>>,
    changes: broadcast::Sender<StorageChange>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file is an empty store; a file
    /// that does not hold a JSON object is an error.
    pub async fn open(path: impl Into<PathBuf>) -> PageLockResult<Self> {
        let path = path.into();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(contents) if contents.trim().is_empty() => Map::new(),
            Ok(contents) => match serde_json::from_str::<Value>(&contents)? {
                Value::Object(map) => map,
                _ => {
                    return Err(PageLockError::storage(format!(
                        "{} does not contain a JSON object",
                        path.display()
                    )))
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), keys = entries.len(), "Opened storage area");
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Ok(Self {
            path,
            entries: RefCell::new(entries),
            changes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, data: String) -> PageLockResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait(?Send)]
impl StateStore for JsonFileStore {
    async fn get(&self, key: &str) -> PageLockResult<Option<Value>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> PageLockResult<()> {
        let mut next = self.entries.borrow().clone();
        let Some(change) = apply(&mut next, key, value) else {
            return Ok(());
        };

        let data = serde_json::to_string_pretty(&next)?;
        self.persist(data).await?;

        *self.entries.borrow_mut() = next;
        let _ = self.changes.send(change);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}
