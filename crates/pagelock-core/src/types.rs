//! Common types used throughout PageLock

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// Identifier of a browser window, as handed out by the directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub i64);

/// Identifier of a browser tab, as handed out by the directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i64);

impl WindowId {
    /// Interpret a loosely typed JSON value as a window id.
    ///
    /// Only integral numbers qualify; strings, booleans, fractional numbers
    /// and `null` all yield `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        let Value::Number(number) = value else {
            return None;
        };
        if let Some(n) = number.as_i64() {
            return Some(Self(n));
        }
        match number.as_f64() {
            Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Some(Self(f as i64))
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for WindowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Loading status of a tab as reported by the directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabStatus {
    Loading,
    Complete,
}

/// Browser tab metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: TabId,
    /// Owning window, absent for tabs that are being torn down
    pub window_id: Option<WindowId>,
    pub url: Option<Url>,
    pub title: Option<String>,
    pub active: bool,
    pub status: TabStatus,
}

/// The single persisted lock record.
///
/// `locked == false` implies `window_id == None` and vice versa. The fields are
/// private so the only way to build one is through [`LockState::unlocked`] and
/// [`LockState::locked_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockState {
    locked: bool,
    #[serde(rename = "windowId")]
    window_id: Option<WindowId>,
}

impl LockState {
    /// The state written on first install.
    pub const fn unlocked() -> Self {
        Self {
            locked: false,
            window_id: None,
        }
    }

    /// A state locking the given window.
    pub const fn locked_to(window_id: WindowId) -> Self {
        Self {
            locked: true,
            window_id: Some(window_id),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn window_id(&self) -> Option<WindowId> {
        self.window_id
    }

    /// Whether the lock currently applies to `window_id`.
    pub fn locks_window(&self, window_id: WindowId) -> bool {
        self.locked && self.window_id == Some(window_id)
    }

    /// Whether the lock applies to the window owning `tab`.
    pub fn locks_tab(&self, tab: &TabInfo) -> bool {
        match tab.window_id {
            Some(window_id) => self.locks_window(window_id),
            None => false,
        }
    }

    /// Decode a record read back from storage.
    ///
    /// Returns `None` when the record is malformed: not an object, `locked`
    /// missing or not a boolean, or `windowId` missing. A well-formed record
    /// that violates the locked/window pairing is normalized to
    /// [`LockState::unlocked`].
    pub fn from_stored(value: &Value) -> Option<Self> {
        let record = value.as_object()?;
        let locked = record.get("locked")?.as_bool()?;
        let window_id = record.get("windowId")?;

        if !locked {
            return Some(Self::unlocked());
        }

        Some(match WindowId::from_json(window_id) {
            Some(id) => Self::locked_to(id),
            None => Self::unlocked(),
        })
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "locked": self.locked,
            "windowId": self.window_id.map(|id| id.0),
        })
    }
}

impl Default for LockState {
    fn default() -> Self {
        Self::unlocked()
    }
}
