//! Tab agent: blocks all user input in one page while its window is locked
//!
//! A fresh agent is created for every page load. It starts Unblocked, asks
//! the coordinator once whether its window is locked, and afterwards only
//! reacts to `LOCK_ENABLE` / `LOCK_DISABLE` notifications.

use crate::overlay::{ensure_overlay, OverlayOutcome};
use crate::policy::{suppression_for, InputCategory, BLOCKED_EVENT_TYPES};
use crate::timers::Timers;
use pagelock_core::{AgentMessage, CoordinatorLink, OverlayConfig};
use pagelock_dom::{
    AddEventListenerOptions, Document, Event, EventListenerCallback, ListenerId, Node,
};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListenerSite {
    Window,
    Document,
}

/// Per-page blocking status. Never persisted.
#[derive(Default)]
struct TabBlockStatus {
    overlay: Option<Rc<Node>>,
    listeners: Vec<(ListenerSite, &'static str, ListenerId)>,
}

struct AgentInner {
    document: Rc<Document>,
    timers: Rc<dyn Timers>,
    config: OverlayConfig,
    enabled: Rc<Cell<bool>>,
    handler: EventListenerCallback,
    status: RefCell<TabBlockStatus>,
}

/// Handle to the agent of one page. Clones share the same agent.
#[derive(Clone)]
pub struct TabAgent {
    inner: Rc<AgentInner>,
}

impl TabAgent {
    /// Inject a new agent into `document`. The agent starts Unblocked.
    pub fn inject(document: Rc<Document>, timers: Rc<dyn Timers>, config: OverlayConfig) -> Self {
        let enabled = Rc::new(Cell::new(false));
        let handler = blocking_handler(enabled.clone());

        Self {
            inner: Rc::new(AgentInner {
                document,
                timers,
                config,
                enabled,
                handler,
                status: RefCell::new(TabBlockStatus::default()),
            }),
        }
    }

    /// Query the coordinator once and block if this tab's window is locked.
    /// Messaging failures leave the agent Unblocked.
    pub async fn sync_initial_state(&self, link: &dyn CoordinatorLink) {
        match link.get_state(None).await {
            Ok(report) if report.locked => self.enable(),
            Ok(_) => {}
            Err(e) => log::debug!("Initial lock query failed, staying unblocked: {}", e),
        }
    }

    /// Apply a notification from the coordinator.
    pub fn handle_message(&self, message: AgentMessage) {
        match message {
            AgentMessage::Enable => self.enable(),
            AgentMessage::Disable => self.disable(),
        }
    }

    /// Apply a raw notification. Messages of other types are ignored.
    pub fn handle_raw(&self, message: &Value) {
        if let Ok(message) = serde_json::from_value::<AgentMessage>(message.clone()) {
            self.handle_message(message);
        }
    }

    /// Enter Blocked. No-op when already Blocked.
    pub fn enable(&self) {
        if self.inner.enabled.get() {
            return;
        }
        self.inner.enabled.set(true);
        self.inner.add_listeners();
        self.inner.ensure_overlay();
        log::info!("Page input blocked");
    }

    /// Enter Unblocked. No-op when already Unblocked.
    pub fn disable(&self) {
        if !self.inner.enabled.get() {
            return;
        }
        self.inner.enabled.set(false);
        self.inner.remove_listeners();
        self.inner.remove_overlay();
        log::info!("Page input unblocked");
    }

    pub fn is_blocked(&self) -> bool {
        self.inner.enabled.get()
    }

    /// The overlay the agent currently owns, if any.
    pub fn overlay(&self) -> Option<Rc<Node>> {
        self.inner.status.borrow().overlay.clone()
    }

    /// Number of listeners the agent has registered.
    pub fn listener_count(&self) -> usize {
        self.inner.status.borrow().listeners.len()
    }

    pub fn document(&self) -> &Rc<Document> {
        &self.inner.document
    }
}

impl AgentInner {
    /// Isolated registrations run ahead of page listeners that were added
    /// earlier on the same target.
    fn add_listeners(&self) {
        let options = AddEventListenerOptions::isolated_capture();
        let mut status = self.status.borrow_mut();

        for &event_type in BLOCKED_EVENT_TYPES {
            let id = self.document.window_target().add_event_listener(
                event_type,
                self.handler.clone(),
                options,
            );
            status.listeners.push((ListenerSite::Window, event_type, id));

            let id = self.document.document_target().add_event_listener(
                event_type,
                self.handler.clone(),
                options,
            );
            status.listeners.push((ListenerSite::Document, event_type, id));
        }
    }

    fn remove_listeners(&self) {
        let listeners = std::mem::take(&mut self.status.borrow_mut().listeners);
        for (site, event_type, id) in listeners {
            let target = match site {
                ListenerSite::Window => self.document.window_target(),
                ListenerSite::Document => self.document.document_target(),
            };
            target.remove_event_listener(event_type, id);
        }
    }

    fn ensure_overlay(self: &Rc<Self>) {
        if self.status.borrow().overlay.is_some() {
            return;
        }

        match ensure_overlay(&self.document, &self.config) {
            OverlayOutcome::Adopted(node) | OverlayOutcome::Created(node) => {
                self.status.borrow_mut().overlay = Some(node);
            }
            OverlayOutcome::RootMissing => {
                log::debug!(
                    "Document root not ready, retrying overlay in {:?}",
                    self.config.retry_delay()
                );
                let weak: Weak<AgentInner> = Rc::downgrade(self);
                self.timers.set_timeout(
                    self.config.retry_delay(),
                    Box::new(move || {
                        if let Some(inner) = weak.upgrade() {
                            if inner.enabled.get() {
                                inner.ensure_overlay();
                            }
                        }
                    }),
                );
            }
        }
    }

    fn remove_overlay(&self) {
        if let Some(overlay) = self.status.borrow_mut().overlay.take() {
            overlay.remove();
        }
    }
}

/// The one handler shared by every registration.
fn blocking_handler(enabled: Rc<Cell<bool>>) -> EventListenerCallback {
    Rc::new(move |event: &Event| {
        if !enabled.get() {
            return;
        }
        let suppression = suppression_for(InputCategory::of(&event.event_type), event.cancelable);
        if suppression.prevent_default {
            event.prevent_default();
        }
        if suppression.stop_immediate {
            event.stop_immediate_propagation();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timers::QueuedTimers;
    use async_trait::async_trait;
    use pagelock_core::protocol::StateReport;
    use pagelock_core::{LinkError, LockState, Request, Response, WindowId};

    struct FixedLink(Result<bool, LinkError>);

    #[async_trait(?Send)]
    impl CoordinatorLink for FixedLink {
        async fn request(&self, _request: Request) -> Result<Response, LinkError> {
            let locked = self.0.clone()?;
            let state = if locked {
                LockState::locked_to(WindowId(1))
            } else {
                LockState::unlocked()
            };
            Ok(Response::State(StateReport { locked, state }))
        }
    }

    fn agent_with(doc: Document) -> (TabAgent, Rc<QueuedTimers>) {
        let timers = Rc::new(QueuedTimers::new());
        let agent = TabAgent::inject(Rc::new(doc), timers.clone(), OverlayConfig::default());
        (agent, timers)
    }

    #[test]
    fn test_starts_unblocked() {
        let (agent, _) = agent_with(Document::with_body());
        assert!(!agent.is_blocked());
        assert!(agent.overlay().is_none());
        assert_eq!(agent.listener_count(), 0);
    }

    #[test]
    fn test_enable_registers_on_window_and_document() {
        let (agent, _) = agent_with(Document::with_body());
        agent.enable();

        assert!(agent.is_blocked());
        assert_eq!(agent.listener_count(), BLOCKED_EVENT_TYPES.len() * 2);
        for event_type in BLOCKED_EVENT_TYPES {
            assert!(agent.document().window_target().has_listeners(event_type));
            assert!(agent.document().document_target().has_listeners(event_type));
        }
        assert!(agent.overlay().is_some());
    }

    #[test]
    fn test_enable_and_disable_are_idempotent() {
        let (agent, _) = agent_with(Document::with_body());
        agent.enable();
        agent.enable();
        assert_eq!(agent.listener_count(), BLOCKED_EVENT_TYPES.len() * 2);
        assert_eq!(agent.document().document_element().unwrap().children().len(), 2);

        agent.disable();
        agent.disable();
        assert!(!agent.is_blocked());
        assert_eq!(agent.document().window_target().listener_count(), 0);
        assert_eq!(agent.document().document_target().listener_count(), 0);
        assert!(agent.document().get_element_by_id("__page_lock_overlay").is_none());
    }

    #[test]
    fn test_disable_without_enable_is_safe() {
        let (agent, _) = agent_with(Document::new());
        agent.disable();
        assert!(!agent.is_blocked());
    }

    #[test]
    fn test_overlay_retries_until_root_exists() {
        let (agent, timers) = agent_with(Document::new());
        agent.enable();
        assert!(agent.overlay().is_none());
        assert_eq!(timers.pending(), 1);

        // Still no root: another retry is queued
        timers.run_pending();
        assert_eq!(timers.pending(), 1);

        let doc = agent.document();
        let html = doc.create_element("html");
        doc.set_document_element(html);
        timers.run_pending();

        assert!(agent.overlay().is_some());
        assert_eq!(timers.pending(), 0);
    }

    #[test]
    fn test_pending_retry_is_dropped_after_disable() {
        let (agent, timers) = agent_with(Document::new());
        agent.enable();
        agent.disable();

        let doc = agent.document();
        doc.set_document_element(doc.create_element("html"));
        timers.run_pending();

        assert!(agent.overlay().is_none());
        assert!(doc.get_element_by_id("__page_lock_overlay").is_none());
    }

    #[test]
    fn test_raw_messages() {
        let (agent, _) = agent_with(Document::with_body());
        agent.handle_raw(&serde_json::json!({ "type": "LOCK_ENABLE" }));
        assert!(agent.is_blocked());
        agent.handle_raw(&serde_json::json!({ "type": "SOMETHING" }));
        assert!(agent.is_blocked());
        agent.handle_raw(&serde_json::json!({ "type": "LOCK_DISABLE" }));
        assert!(!agent.is_blocked());
    }

    #[tokio::test]
    async fn test_initial_sync() {
        let (agent, _) = agent_with(Document::with_body());
        agent.sync_initial_state(&FixedLink(Ok(true))).await;
        assert!(agent.is_blocked());

        let (agent, _) = agent_with(Document::with_body());
        agent.sync_initial_state(&FixedLink(Ok(false))).await;
        assert!(!agent.is_blocked());
    }

    #[tokio::test]
    async fn test_initial_sync_failure_stays_unblocked() {
        let (agent, _) = agent_with(Document::with_body());
        agent
            .sync_initial_state(&FixedLink(Err(LinkError::NoReceiver)))
            .await;
        assert!(!agent.is_blocked());
    }
}
