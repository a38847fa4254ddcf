//! PageLock configuration

use crate::error::{PageLockError, PageLockResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Storage key of the persisted lock record
pub const LOCK_STATE_KEY: &str = "lockState";

/// Name of the keyboard command that toggles the lock
pub const TOGGLE_COMMAND: &str = "toggle-lock";

/// PageLock configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PageLockConfig {
    /// User data directory
    pub data_dir: PathBuf,

    /// File (inside `data_dir`) backing the key-value storage area
    pub storage_file: String,

    /// Key the lock record lives under
    pub storage_key: String,

    /// Toolbar indicator settings
    pub badge: BadgeConfig,

    /// Input-blocking overlay settings
    pub overlay: OverlayConfig,

    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BadgeConfig {
    /// Text shown on tabs of the locked window
    pub text: String,

    /// Badge background color
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// DOM id of the overlay element
    pub element_id: String,

    /// Delay before retrying overlay insertion when the document has no root yet
    pub retry_delay_ms: u64,
}

impl Default for PageLockConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("pagelock"),
            storage_file: "storage.json".to_string(),
            storage_key: LOCK_STATE_KEY.to_string(),
            badge: BadgeConfig::default(),
            overlay: OverlayConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for BadgeConfig {
    fn default() -> Self {
        Self {
            text: "ON".to_string(),
            color: "#1a73e8".to_string(),
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            element_id: "__page_lock_overlay".to_string(),
            retry_delay_ms: 50,
        }
    }
}

impl OverlayConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl PageLockConfig {
    /// Configuration rooted at a specific data directory
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Path of the storage area file
    pub fn storage_path(&self) -> PathBuf {
        self.data_dir.join(&self.storage_file)
    }

    /// Path of the config file inside `data_dir`
    pub fn config_path(data_dir: &Path) -> PathBuf {
        data_dir.join("config.json")
    }

    /// Load configuration from file, falling back to defaults when the file
    /// is missing or unreadable
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!("Ignoring invalid config {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> PageLockResult<()> {
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| PageLockError::Config(format!("Failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PageLockConfig::default();
        assert_eq!(config.storage_key, "lockState");
        assert_eq!(config.badge.text, "ON");
        assert_eq!(config.badge.color, "#1a73e8");
        assert_eq!(config.overlay.element_id, "__page_lock_overlay");
        assert_eq!(config.overlay.retry_delay(), Duration::from_millis(50));
    }

    #[test]
    fn test_load_missing_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = PageLockConfig::load(&dir.path().join("nope.json"));
        assert_eq!(config.storage_file, "storage.json");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r##"{ "badge": { "color": "#ff0000" } }"##).unwrap();

        let config = PageLockConfig::load(&path);
        assert_eq!(config.badge.color, "#ff0000");
        assert_eq!(config.badge.text, "ON");
        assert_eq!(config.overlay.retry_delay_ms, 50);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = PageLockConfig::config_path(dir.path());
        let mut config = PageLockConfig::with_data_dir(dir.path());
        config.log_level = "debug".to_string();
        config.save(&path).unwrap();

        let loaded = PageLockConfig::load(&path);
        assert_eq!(loaded.log_level, "debug");
        assert_eq!(loaded.data_dir, dir.path());
    }
}
