//! Control panel: one switch locking the current window

use crate::view::PanelView;
use pagelock_core::config::LOCK_STATE_KEY;
use pagelock_core::{CoordinatorLink, LinkError, LockState, WindowId};
use pagelock_coordinator::{Directory, StorageChange};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy)]
struct PanelState {
    locked: bool,
    loading: bool,
    window_id: Option<WindowId>,
}

struct PanelInner {
    link: Rc<dyn CoordinatorLink>,
    directory: Rc<dyn Directory>,
    storage_key: String,
    state: Cell<PanelState>,
    mounted: Cell<bool>,
    watcher: RefCell<Option<JoinHandle<()>>>,
}

/// The panel's view model. Clones share state.
#[derive(Clone)]
pub struct ControlPanel {
    inner: Rc<PanelInner>,
}

impl ControlPanel {
    pub fn new(link: Rc<dyn CoordinatorLink>, directory: Rc<dyn Directory>) -> Self {
        Self::with_storage_key(link, directory, LOCK_STATE_KEY)
    }

    /// A panel following `storage_key` instead of `lockState`.
    pub fn with_storage_key(
        link: Rc<dyn CoordinatorLink>,
        directory: Rc<dyn Directory>,
        storage_key: impl Into<String>,
    ) -> Self {
        Self {
            inner: Rc::new(PanelInner {
                link,
                directory,
                storage_key: storage_key.into(),
                state: Cell::new(PanelState {
                    locked: false,
                    loading: true,
                    window_id: None,
                }),
                mounted: Cell::new(true),
                watcher: RefCell::new(None),
            }),
        }
    }

    /// Resolve the active window and ask whether it is locked.
    ///
    /// Results arriving after [`ControlPanel::unmount`] are dropped. A failed
    /// query leaves the panel loading.
    pub async fn mount(&self) {
        let window_id = self.inner.directory.current_window().await;
        if !self.is_mounted() {
            return;
        }
        self.update(|state| state.window_id = window_id);

        let report = self.inner.link.get_state(window_id).await;
        if !self.is_mounted() {
            return;
        }
        match report {
            Ok(report) => self.update(|state| {
                state.locked = report.locked;
                state.loading = false;
            }),
            Err(e) => log::warn!("Could not read lock state: {}", e),
        }
    }

    /// Follow the storage change feed until unmounted.
    ///
    /// Uses `spawn_local`, so this must be called from within a
    /// `tokio::task::LocalSet`.
    pub fn watch(&self, mut feed: broadcast::Receiver<StorageChange>) {
        let panel = self.clone();
        let task = tokio::task::spawn_local(async move {
            loop {
                match feed.recv().await {
                    Ok(change) => panel.apply_change(&change),
                    Err(RecvError::Lagged(skipped)) => {
                        log::debug!("Panel missed {} storage changes", skipped)
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        if let Some(previous) = self.inner.watcher.borrow_mut().replace(task) {
            previous.abort();
        }
    }

    /// Re-derive the switch from a storage change. Changes to other keys are
    /// ignored.
    pub fn apply_change(&self, change: &StorageChange) {
        if !self.is_mounted() || change.key != self.inner.storage_key {
            return;
        }
        let new_state = change
            .new_value
            .as_ref()
            .and_then(LockState::from_stored)
            .unwrap_or_default();
        self.update(|state| {
            state.locked = match state.window_id {
                Some(window_id) => new_state.locks_window(window_id),
                None => false,
            };
        });
    }

    /// Flip the switch. The view changes at once; the request goes out for
    /// the window that is current at the time of the toggle.
    pub async fn toggle(&self, locked: bool) -> Result<(), LinkError> {
        if self.inner.state.get().loading {
            return Ok(());
        }
        self.update(|state| state.locked = locked);

        let window_id = self.inner.directory.current_window().await;
        self.inner.link.set_state(locked, window_id).await
    }

    /// Stop following changes and drop pending results.
    pub fn unmount(&self) {
        self.inner.mounted.set(false);
        if let Some(watcher) = self.inner.watcher.borrow_mut().take() {
            watcher.abort();
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.get()
    }

    pub fn view(&self) -> PanelView {
        let state = self.inner.state.get();
        PanelView::render(state.locked, state.loading)
    }

    fn update(&self, f: impl FnOnce(&mut PanelState)) {
        let mut state = self.inner.state.get();
        f(&mut state);
        self.inner.state.set(state);
    }
}
