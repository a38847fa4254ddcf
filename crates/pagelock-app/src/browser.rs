//! In-process browser: windows, tabs and the pages loaded in them
//!
//! Every loaded page with a web URL gets a fresh document and a fresh tab
//! agent. Internal pages (`chrome://`, `about:` and the like) never get an
//! agent, so messages to them fail with [`DeliveryError::NoLiveTarget`].

use async_trait::async_trait;
use pagelock_agent::{TabAgent, Timers, BLOCKED_EVENT_TYPES};
use pagelock_coordinator::{BadgeSurface, DeliveryError, Directory, TabMessenger};
use pagelock_core::{
    AgentMessage, OverlayConfig, PageLockError, PageLockResult, TabId, TabInfo, TabStatus,
    WindowId,
};
use pagelock_dom::{AddEventListenerOptions, Document, Event, Node};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use url::Url;

/// Schemes whose pages accept injected agents
const SCRIPTABLE_SCHEMES: &[&str] = &["http", "https", "file"];

/// Toolbar indicator of one tab
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Badge {
    pub text: String,
    pub color: Option<String>,
}

/// What happened to one synthetic input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputOutcome {
    /// A page script saw the event
    pub reached_page: bool,
    /// The default action was cancelled
    pub default_prevented: bool,
}

/// A loaded document and the script state that goes with it
struct Page {
    document: Rc<Document>,
    agent: Option<TabAgent>,
    content: Rc<Node>,
    received: Rc<Cell<usize>>,
}

impl Page {
    fn load(url: &Url, overlay: &OverlayConfig, timers: Rc<dyn Timers>) -> Self {
        let document = Rc::new(Document::with_body());
        let content = document.create_element("main");
        content.set_attribute("id", "content");
        if let Some(body) = document.body() {
            body.append_child(content.clone());
        }

        // Stand-in for the page's own scripts
        let received = Rc::new(Cell::new(0));
        for &event_type in BLOCKED_EVENT_TYPES {
            let received = received.clone();
            document.document_target().add_event_listener(
                event_type,
                Rc::new(move |_: &Event| received.set(received.get() + 1)),
                AddEventListenerOptions::default(),
            );
        }

        let agent = SCRIPTABLE_SCHEMES
            .contains(&url.scheme())
            .then(|| TabAgent::inject(document.clone(), timers, overlay.clone()));

        Self {
            document,
            agent,
            content,
            received,
        }
    }
}

fn parse_url(url: &str) -> PageLockResult<Url> {
    Url::parse(url).map_err(|e| PageLockError::directory(format!("invalid URL {}: {}", url, e)))
}

struct TabEntry {
    info: TabInfo,
    page: Option<Page>,
    badge: Badge,
}

pub struct LocalBrowser {
    windows: RefCell<BTreeMap<WindowId, Vec<TabId>>>,
    tabs: RefCell<HashMap<TabId, TabEntry>>,
    focused: Cell<Option<WindowId>>,
    next_window: Cell<i64>,
    next_tab: Cell<i64>,
    overlay: OverlayConfig,
    timers: Rc<dyn Timers>,
}

impl LocalBrowser {
    pub fn new(overlay: OverlayConfig, timers: Rc<dyn Timers>) -> Self {
        Self {
            windows: RefCell::new(BTreeMap::new()),
            tabs: RefCell::new(HashMap::new()),
            focused: Cell::new(None),
            next_window: Cell::new(1),
            next_tab: Cell::new(1),
            overlay,
            timers,
        }
    }

    /// Open an empty window. The new window takes focus.
    pub fn open_window(&self) -> WindowId {
        let id = WindowId(self.next_window.get());
        self.next_window.set(id.0 + 1);
        self.windows.borrow_mut().insert(id, Vec::new());
        self.focused.set(Some(id));
        tracing::debug!(window = %id, "Opened window");
        id
    }

    /// Open a tab in `window_id` and make it the active one. The page is not
    /// loaded until [`LocalBrowser::load_page`].
    pub fn open_tab(&self, window_id: WindowId, url: &str) -> PageLockResult<TabId> {
        let url = parse_url(url)?;

        let id = TabId(self.next_tab.get());
        {
            let mut windows = self.windows.borrow_mut();
            let tabs = windows
                .get_mut(&window_id)
                .ok_or_else(|| PageLockError::NotFound(format!("window {}", window_id)))?;
            tabs.push(id);
        }
        self.next_tab.set(id.0 + 1);

        let mut all = self.tabs.borrow_mut();
        for entry in all.values_mut() {
            if entry.info.window_id == Some(window_id) {
                entry.info.active = false;
            }
        }
        all.insert(
            id,
            TabEntry {
                info: TabInfo {
                    id,
                    window_id: Some(window_id),
                    url: Some(url),
                    title: None,
                    active: true,
                    status: TabStatus::Loading,
                },
                page: None,
                badge: Badge::default(),
            },
        );
        tracing::debug!(tab = %id, window = %window_id, "Opened tab");
        Ok(id)
    }

    /// Finish loading the tab's current URL. Replaces any previous page, so
    /// the old agent and its listeners go away with it.
    pub fn load_page(&self, tab_id: TabId) -> PageLockResult<TabInfo> {
        let mut tabs = self.tabs.borrow_mut();
        let entry = tabs
            .get_mut(&tab_id)
            .ok_or_else(|| PageLockError::NotFound(format!("tab {}", tab_id)))?;

        entry.page = entry
            .info
            .url
            .as_ref()
            .map(|url| Page::load(url, &self.overlay, self.timers.clone()));
        entry.info.title = entry.info.url.as_ref().map(|url| url.to_string());
        entry.info.status = TabStatus::Complete;
        Ok(entry.info.clone())
    }

    /// Start navigating the tab to `url`. The current page is unloaded.
    pub fn navigate(&self, tab_id: TabId, url: &str) -> PageLockResult<()> {
        let url = parse_url(url)?;
        let mut tabs = self.tabs.borrow_mut();
        let entry = tabs
            .get_mut(&tab_id)
            .ok_or_else(|| PageLockError::NotFound(format!("tab {}", tab_id)))?;
        entry.info.url = Some(url);
        entry.info.status = TabStatus::Loading;
        entry.page = None;
        Ok(())
    }

    pub fn close_tab(&self, tab_id: TabId) -> PageLockResult<()> {
        let entry = self
            .tabs
            .borrow_mut()
            .remove(&tab_id)
            .ok_or_else(|| PageLockError::NotFound(format!("tab {}", tab_id)))?;
        if let Some(window_id) = entry.info.window_id {
            if let Some(tabs) = self.windows.borrow_mut().get_mut(&window_id) {
                tabs.retain(|id| *id != tab_id);
            }
        }
        Ok(())
    }

    pub fn focus(&self, window_id: WindowId) -> PageLockResult<()> {
        if !self.windows.borrow().contains_key(&window_id) {
            return Err(PageLockError::NotFound(format!("window {}", window_id)));
        }
        self.focused.set(Some(window_id));
        Ok(())
    }

    pub fn focused_window(&self) -> Option<WindowId> {
        self.focused.get()
    }

    pub fn windows(&self) -> Vec<WindowId> {
        self.windows.borrow().keys().copied().collect()
    }

    /// Tabs of `window_id` in strip order
    pub fn tabs_of(&self, window_id: WindowId) -> Vec<TabInfo> {
        let ids = self
            .windows
            .borrow()
            .get(&window_id)
            .cloned()
            .unwrap_or_default();
        let tabs = self.tabs.borrow();
        ids.iter()
            .filter_map(|id| tabs.get(id).map(|entry| entry.info.clone()))
            .collect()
    }

    pub fn tab(&self, tab_id: TabId) -> Option<TabInfo> {
        self.tabs.borrow().get(&tab_id).map(|entry| entry.info.clone())
    }

    /// The agent of the tab's current page, if it has one
    pub fn agent(&self, tab_id: TabId) -> Option<TabAgent> {
        self.tabs
            .borrow()
            .get(&tab_id)
            .and_then(|entry| entry.page.as_ref())
            .and_then(|page| page.agent.clone())
    }

    pub fn document(&self, tab_id: TabId) -> Option<Rc<Document>> {
        self.tabs
            .borrow()
            .get(&tab_id)
            .and_then(|entry| entry.page.as_ref())
            .map(|page| page.document.clone())
    }

    pub fn badge(&self, tab_id: TabId) -> Option<Badge> {
        self.tabs.borrow().get(&tab_id).map(|entry| entry.badge.clone())
    }

    /// Whether the tab's page currently has input blocked
    pub fn is_blocked(&self, tab_id: TabId) -> bool {
        self.agent(tab_id).map(|agent| agent.is_blocked()).unwrap_or(false)
    }

    /// Simulate the user producing an `event_type` input on the tab's page.
    pub fn send_input(&self, tab_id: TabId, event_type: &str) -> PageLockResult<InputOutcome> {
        let (document, content, received) = {
            let tabs = self.tabs.borrow();
            let page = tabs
                .get(&tab_id)
                .and_then(|entry| entry.page.as_ref())
                .ok_or_else(|| PageLockError::NotFound(format!("page in tab {}", tab_id)))?;
            (
                page.document.clone(),
                page.content.clone(),
                page.received.clone(),
            )
        };

        let before = received.get();
        let target = document.hit_test(&content);
        let event = Event::new_trusted(event_type, true, true);
        let not_prevented = document
            .dispatch(&event, &target)
            .map_err(|e| PageLockError::dom(e.to_string()))?;

        Ok(InputOutcome {
            reached_page: received.get() > before,
            default_prevented: !not_prevented,
        })
    }
}

#[async_trait(?Send)]
impl Directory for LocalBrowser {
    async fn last_focused_window(&self) -> Option<WindowId> {
        self.focused.get()
    }

    async fn current_window(&self) -> Option<WindowId> {
        let window_id = self.focused.get()?;
        self.tabs_of(window_id)
            .into_iter()
            .find(|tab| tab.active)
            .and_then(|tab| tab.window_id)
    }

    async fn tabs_in_window(&self, window_id: WindowId) -> PageLockResult<Vec<TabInfo>> {
        Ok(self.tabs_of(window_id))
    }
}

#[async_trait(?Send)]
impl TabMessenger for LocalBrowser {
    async fn send(&self, tab_id: TabId, message: AgentMessage) -> Result<(), DeliveryError> {
        let agent = self
            .agent(tab_id)
            .ok_or(DeliveryError::NoLiveTarget(tab_id))?;
        agent.handle_message(message);
        Ok(())
    }
}

#[async_trait(?Send)]
impl BadgeSurface for LocalBrowser {
    async fn set_badge_text(&self, tab_id: TabId, text: &str) -> Result<(), DeliveryError> {
        let mut tabs = self.tabs.borrow_mut();
        let entry = tabs
            .get_mut(&tab_id)
            .ok_or(DeliveryError::UnsupportedSurface(tab_id))?;
        entry.badge.text = text.to_string();
        Ok(())
    }

    async fn set_badge_color(&self, tab_id: TabId, color: &str) -> Result<(), DeliveryError> {
        let mut tabs = self.tabs.borrow_mut();
        let entry = tabs
            .get_mut(&tab_id)
            .ok_or(DeliveryError::UnsupportedSurface(tab_id))?;
        entry.badge.color = Some(color.to_string());
        Ok(())
    }
}
