//! Lock state transitions and request handling
//!
//! The [`Coordinator`] owns the global lock record. It is not safe to drive
//! from several tasks at once: two interleaved transitions can both read the
//! same prior state. [`crate::CoordinatorHandle`] serializes access.

use crate::broadcast::{broadcast, BroadcastSummary};
use crate::directory::{BadgeSurface, DeliveryError, Directory, TabMessenger};
use crate::store::StateStore;
use pagelock_core::config::{LOCK_STATE_KEY, TOGGLE_COMMAND};
use pagelock_core::protocol::StateReport;
use pagelock_core::{
    AgentMessage, BadgeConfig, LockState, PageLockConfig, PageLockResult, Request, Response,
    Sender, TabId, TabInfo, TabStatus, WindowId,
};
use std::rc::Rc;
use tracing::{debug, info, warn};

pub struct Coordinator {
    store: Rc<dyn StateStore>,
    directory: Rc<dyn Directory>,
    messenger: Rc<dyn TabMessenger>,
    badges: Rc<dyn BadgeSurface>,
    storage_key: String,
    badge: BadgeConfig,
}

impl Coordinator {
    pub fn new(
        store: Rc<dyn StateStore>,
        directory: Rc<dyn Directory>,
        messenger: Rc<dyn TabMessenger>,
        badges: Rc<dyn BadgeSurface>,
    ) -> Self {
        Self {
            store,
            directory,
            messenger,
            badges,
            storage_key: LOCK_STATE_KEY.to_string(),
            badge: BadgeConfig::default(),
        }
    }

    /// Take the storage key and indicator look from `config`.
    pub fn with_config(mut self, config: &PageLockConfig) -> Self {
        self.storage_key = config.storage_key.clone();
        self.badge = config.badge.clone();
        self
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Read the lock record. Missing or malformed records read as unlocked.
    pub async fn read_state(&self) -> PageLockResult<LockState> {
        let stored = self.store.get(&self.storage_key).await?;
        Ok(stored
            .as_ref()
            .and_then(LockState::from_stored)
            .unwrap_or_default())
    }

    async fn write_state(&self, state: LockState) -> PageLockResult<()> {
        self.store.set(&self.storage_key, state.to_value()).await
    }

    /// Install hook: write the default record unless a valid one exists.
    pub async fn on_installed(&self) -> PageLockResult<()> {
        let stored = self.store.get(&self.storage_key).await?;
        if stored.as_ref().and_then(LockState::from_stored).is_none() {
            info!("Initializing lock state");
            self.write_state(LockState::unlocked()).await?;
        }
        Ok(())
    }

    /// Answer `LOCK_GET_STATE`.
    ///
    /// A requesting tab is answered for its own window; otherwise an explicit
    /// window id is used; otherwise the raw global flag is reported.
    pub async fn get_state(
        &self,
        sender: &Sender,
        window_id: Option<WindowId>,
    ) -> PageLockResult<StateReport> {
        let state = self.read_state().await?;
        let locked = match (&sender.tab, window_id) {
            (Some(tab), _) => state.locks_tab(tab),
            (None, Some(window_id)) => state.locks_window(window_id),
            (None, None) => state.is_locked(),
        };
        Ok(StateReport { locked, state })
    }

    /// Answer `LOCK_SET`. The window argument only matters when locking.
    pub async fn set_state(&self, locked: bool, window_id: Option<WindowId>) -> PageLockResult<()> {
        if locked {
            self.enable_lock(window_id).await
        } else {
            self.disable_lock().await
        }
    }

    /// Dispatch a decoded request.
    pub async fn handle(&self, request: Request, sender: &Sender) -> PageLockResult<Response> {
        match request {
            Request::GetState { window_id } => {
                Ok(Response::State(self.get_state(sender, window_id).await?))
            }
            Request::Set { locked, window_id } => {
                self.set_state(locked, window_id).await?;
                Ok(Response::ack())
            }
        }
    }

    /// Lock `window_id`, or the last-focused window when none is given.
    /// A previously locked window is released first.
    pub async fn enable_lock(&self, window_id: Option<WindowId>) -> PageLockResult<()> {
        let target = match window_id {
            Some(id) => Some(id),
            None => self.directory.last_focused_window().await,
        };
        let Some(target) = target else {
            debug!("No window to lock");
            return Ok(());
        };

        let previous = self.read_state().await?;
        if let Some(old) = previous.window_id() {
            if previous.is_locked() && old != target {
                self.notify_window(old, false).await;
            }
        }

        self.write_state(LockState::locked_to(target)).await?;
        info!(window = %target, "Window locked");
        self.notify_window(target, true).await;
        Ok(())
    }

    /// Unlock. Safe when nothing is locked.
    pub async fn disable_lock(&self) -> PageLockResult<()> {
        let previous = self.read_state().await?;
        self.write_state(LockState::unlocked()).await?;

        if let Some(old) = previous.window_id() {
            info!(window = %old, "Window unlocked");
            self.notify_window(old, false).await;
        }
        Ok(())
    }

    /// Keyboard command hook. Only `toggle-lock` is acted upon.
    pub async fn on_command(&self, command: &str) -> PageLockResult<()> {
        if command != TOGGLE_COMMAND {
            debug!(command, "Ignoring command");
            return Ok(());
        }

        let Some(window_id) = self.directory.last_focused_window().await else {
            debug!("Toggle without a focused window");
            return Ok(());
        };

        if self.read_state().await?.locks_window(window_id) {
            self.disable_lock().await
        } else {
            self.enable_lock(Some(window_id)).await
        }
    }

    /// Navigation hook, run when a tab reports an update. Only the
    /// load-complete signal is acted upon.
    pub async fn on_tab_updated(
        &self,
        tab: &TabInfo,
        status: Option<TabStatus>,
    ) -> PageLockResult<()> {
        if status != Some(TabStatus::Complete) {
            return Ok(());
        }

        let state = self.read_state().await?;
        if !state.locks_tab(tab) {
            absorb(self.set_badge(tab.id, false).await);
            return Ok(());
        }

        absorb(self.messenger.send(tab.id, AgentMessage::Enable).await);
        absorb(self.set_badge(tab.id, true).await);
        Ok(())
    }

    /// Tell every tab of `window_id` the lock changed, then update their
    /// indicators.
    async fn notify_window(&self, window_id: WindowId, locked: bool) {
        let tabs = match self.directory.tabs_in_window(window_id).await {
            Ok(tabs) => tabs,
            Err(e) => {
                warn!(window = %window_id, error = %e, "Could not enumerate tabs");
                return;
            }
        };
        let ids: Vec<TabId> = tabs.iter().map(|tab| tab.id).collect();

        let message = AgentMessage::for_lock(locked);
        let sent: BroadcastSummary =
            broadcast(ids.iter().copied(), |tab_id| self.messenger.send(tab_id, message)).await;
        let painted = broadcast(ids, |tab_id| self.set_badge(tab_id, locked)).await;

        debug!(
            window = %window_id,
            ?message,
            delivered = sent.delivered,
            skipped = sent.skipped,
            badges = painted.delivered,
            "Notified window"
        );
    }

    async fn set_badge(&self, tab_id: TabId, locked: bool) -> Result<(), DeliveryError> {
        let text = if locked { self.badge.text.as_str() } else { "" };
        self.badges.set_badge_text(tab_id, text).await?;
        if locked {
            self.badges.set_badge_color(tab_id, &self.badge.color).await?;
        }
        Ok(())
    }
}

fn absorb(result: Result<(), DeliveryError>) {
    if let Err(e) = result {
        debug!(error = %e, "Skipping tab");
    }
}
