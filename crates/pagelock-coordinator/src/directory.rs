//! Browser-side services the coordinator talks to
//!
//! The coordinator never owns windows or tabs. It asks a [`Directory`] which
//! tabs exist, pushes notifications through a [`TabMessenger`] and paints
//! indicators through a [`BadgeSurface`].

use async_trait::async_trait;
use pagelock_core::{AgentMessage, PageLockResult, TabId, TabInfo, WindowId};
use thiserror::Error;

/// Per-target delivery failures. Both are expected in normal operation and
/// are absorbed by the sender.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    /// The tab has no agent listening (internal page, agent not yet injected,
    /// tab closed)
    #[error("no live target in tab {0}")]
    NoLiveTarget(TabId),

    /// The tab does not support indicators
    #[error("tab {0} does not support indicators")]
    UnsupportedSurface(TabId),
}

/// Enumerates windows and tabs
#[async_trait(?Send)]
pub trait Directory {
    /// The window the user interacted with last, if any
    async fn last_focused_window(&self) -> Option<WindowId>;

    /// The window of the active tab of the current window, if any
    async fn current_window(&self) -> Option<WindowId>;

    /// All tabs currently open in `window_id`. An unknown window has no tabs.
    async fn tabs_in_window(&self, window_id: WindowId) -> PageLockResult<Vec<TabInfo>>;
}

/// Delivers notifications to tab agents.
///
/// `send` hands the message to the transport and returns; it does not wait
/// for the agent to act on it.
#[async_trait(?Send)]
pub trait TabMessenger {
    async fn send(&self, tab_id: TabId, message: AgentMessage) -> Result<(), DeliveryError>;
}

/// Per-tab toolbar indicator
#[async_trait(?Send)]
pub trait BadgeSurface {
    async fn set_badge_text(&self, tab_id: TabId, text: &str) -> Result<(), DeliveryError>;

    async fn set_badge_color(&self, tab_id: TabId, color: &str) -> Result<(), DeliveryError>;
}
