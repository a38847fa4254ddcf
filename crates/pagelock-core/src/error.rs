//! Error types for PageLock

use crate::protocol::LinkError;
use thiserror::Error;

/// Result type alias for PageLock operations
pub type PageLockResult<T> = Result<T, PageLockError>;

/// Main error type for PageLock
#[derive(Error, Debug)]
pub enum PageLockError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Directory error: {0}")]
    Directory(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("DOM error: {0}")]
    Dom(String),

    #[error("Coordinator link error: {0}")]
    Link(#[from] LinkError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PageLockError {
    /// Create a new storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new directory error
    pub fn directory(msg: impl Into<String>) -> Self {
        Self::Directory(msg.into())
    }

    /// Create a new DOM error
    pub fn dom(msg: impl Into<String>) -> Self {
        Self::Dom(msg.into())
    }
}
