//! In-memory browser double for coordinator tests

use crate::directory::{BadgeSurface, DeliveryError, Directory, TabMessenger};
use crate::store::{MemoryStore, StateStore};
use async_trait::async_trait;
use pagelock_core::config::LOCK_STATE_KEY;
use pagelock_core::{AgentMessage, PageLockResult, TabId, TabInfo, TabStatus, WindowId};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

type Delivery = (TabId, AgentMessage, Option<Value>);

#[derive(Default)]
pub(crate) struct FakeBrowser {
    tabs: RefCell<Vec<TabInfo>>,
    focused: Cell<Option<WindowId>>,
    unreachable: RefCell<HashSet<TabId>>,
    badgeless: RefCell<HashSet<TabId>>,
    deliveries: RefCell<Vec<Delivery>>,
    badge_text: RefCell<HashMap<TabId, String>>,
    badge_color: RefCell<HashMap<TabId, String>>,
    observed: RefCell<Option<Rc<MemoryStore>>>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a loaded tab. The first window added gets focus.
    pub fn add_tab(&self, window_id: WindowId, tab_id: TabId) {
        if self.focused.get().is_none() && self.tabs.borrow().is_empty() {
            self.focused.set(Some(window_id));
        }
        self.tabs.borrow_mut().push(TabInfo {
            id: tab_id,
            window_id: Some(window_id),
            url: None,
            title: None,
            active: false,
            status: TabStatus::Complete,
        });
    }

    pub fn tab(&self, tab_id: TabId) -> Option<TabInfo> {
        self.tabs.borrow().iter().find(|t| t.id == tab_id).cloned()
    }

    pub fn focus(&self, window_id: Option<WindowId>) {
        self.focused.set(window_id);
    }

    pub fn set_unreachable(&self, tab_id: TabId) {
        self.unreachable.borrow_mut().insert(tab_id);
    }

    pub fn set_badgeless(&self, tab_id: TabId) {
        self.badgeless.borrow_mut().insert(tab_id);
    }

    /// Record the stored lock record next to every delivered message.
    pub fn observe_store(&self, store: Rc<MemoryStore>) {
        *self.observed.borrow_mut() = Some(store);
    }

    pub fn clear_log(&self) {
        self.deliveries.borrow_mut().clear();
    }

    pub fn messages_for(&self, tab_id: TabId) -> Vec<AgentMessage> {
        self.deliveries_for(tab_id)
            .into_iter()
            .map(|(message, _)| message)
            .collect()
    }

    pub fn deliveries_for(&self, tab_id: TabId) -> Vec<(AgentMessage, Option<Value>)> {
        self.deliveries
            .borrow()
            .iter()
            .filter(|(id, _, _)| *id == tab_id)
            .map(|(_, message, stored)| (*message, stored.clone()))
            .collect()
    }

    pub fn badge_text(&self, tab_id: TabId) -> Option<String> {
        self.badge_text.borrow().get(&tab_id).cloned()
    }

    pub fn badge(&self, tab_id: TabId) -> Option<(String, Option<String>)> {
        let text = self.badge_text(tab_id)?;
        Some((text, self.badge_color.borrow().get(&tab_id).cloned()))
    }

    fn check_badge(&self, tab_id: TabId) -> Result<(), DeliveryError> {
        if self.badgeless.borrow().contains(&tab_id) {
            Err(DeliveryError::UnsupportedSurface(tab_id))
        } else {
            Ok(())
        }
    }
}

#[async_trait(?Send)]
impl Directory for FakeBrowser {
    async fn last_focused_window(&self) -> Option<WindowId> {
        self.focused.get()
    }

    async fn current_window(&self) -> Option<WindowId> {
        self.focused.get()
    }

    async fn tabs_in_window(&self, window_id: WindowId) -> PageLockResult<Vec<TabInfo>> {
        Ok(self
            .tabs
            .borrow()
            .iter()
            .filter(|t| t.window_id == Some(window_id))
            .cloned()
            .collect())
    }
}

#[async_trait(?Send)]
impl TabMessenger for FakeBrowser {
    async fn send(&self, tab_id: TabId, message: AgentMessage) -> Result<(), DeliveryError> {
        if self.unreachable.borrow().contains(&tab_id) {
            return Err(DeliveryError::NoLiveTarget(tab_id));
        }
        let observed = self.observed.borrow().clone();
        let stored = match observed {
            Some(store) => store.get(LOCK_STATE_KEY).await.ok().flatten(),
            None => None,
        };
        self.deliveries.borrow_mut().push((tab_id, message, stored));
        Ok(())
    }
}

#[async_trait(?Send)]
impl BadgeSurface for FakeBrowser {
    async fn set_badge_text(&self, tab_id: TabId, text: &str) -> Result<(), DeliveryError> {
        self.check_badge(tab_id)?;
        self.badge_text.borrow_mut().insert(tab_id, text.to_string());
        Ok(())
    }

    async fn set_badge_color(&self, tab_id: TabId, color: &str) -> Result<(), DeliveryError> {
        self.check_badge(tab_id)?;
        self.badge_color.borrow_mut().insert(tab_id, color.to_string());
        Ok(())
    }
}
