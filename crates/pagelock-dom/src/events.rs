//! # DOM Events
//!
//! DOM event types and dispatch mechanism following the DOM Events standard.
//! Supports capture and bubble phases, stopPropagation,
//! stopImmediatePropagation, preventDefault and passive listeners.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::NodeId;

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId(u64);

impl EventId {
    /// Create a new unique EventId.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

/// Event phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EventPhase {
    /// No event is being processed.
    None = 0,
    /// Event is propagating through target's ancestors (capture).
    Capturing = 1,
    /// Event has arrived at the event target.
    AtTarget = 2,
    /// Event is propagating back up through ancestors (bubble).
    Bubbling = 3,
}

/// Identifies an object that can receive events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetId {
    Window,
    Document,
    Node(NodeId),
}

/// Common event interface for all DOM events.
#[derive(Debug)]
pub struct Event {
    /// Unique ID for this event.
    pub id: EventId,
    /// Event type (e.g., "click", "keydown").
    pub event_type: String,
    /// Whether the event bubbles.
    pub bubbles: bool,
    /// Whether the event is cancelable.
    pub cancelable: bool,
    /// Whether the event is trusted (dispatched by the browser).
    pub is_trusted: bool,
    phase: Cell<EventPhase>,
    target: Cell<Option<TargetId>>,
    current_target: Cell<Option<TargetId>>,
    propagation_stopped: Cell<bool>,
    immediate_propagation_stopped: Cell<bool>,
    default_prevented: Cell<bool>,
    /// Set while a passive listener runs; preventDefault is ignored then.
    in_passive_listener: Cell<bool>,
}

impl Event {
    /// Create a new event.
    pub fn new(event_type: &str, bubbles: bool, cancelable: bool) -> Self {
        Self {
            id: EventId::new(),
            event_type: event_type.to_string(),
            bubbles,
            cancelable,
            is_trusted: false,
            phase: Cell::new(EventPhase::None),
            target: Cell::new(None),
            current_target: Cell::new(None),
            propagation_stopped: Cell::new(false),
            immediate_propagation_stopped: Cell::new(false),
            default_prevented: Cell::new(false),
            in_passive_listener: Cell::new(false),
        }
    }

    /// Create a trusted event (from the browser).
    pub fn new_trusted(event_type: &str, bubbles: bool, cancelable: bool) -> Self {
        let mut event = Self::new(event_type, bubbles, cancelable);
        event.is_trusted = true;
        event
    }

    /// Get the current phase.
    pub fn phase(&self) -> EventPhase {
        self.phase.get()
    }

    /// Get the target.
    pub fn target(&self) -> Option<TargetId> {
        self.target.get()
    }

    /// Get the current target.
    pub fn current_target(&self) -> Option<TargetId> {
        self.current_target.get()
    }

    /// Stop propagation of the event.
    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    /// Stop immediate propagation of the event.
    pub fn stop_immediate_propagation(&self) {
        self.propagation_stopped.set(true);
        self.immediate_propagation_stopped.set(true);
    }

    /// Prevent the default action.
    pub fn prevent_default(&self) {
        if self.cancelable && !self.in_passive_listener.get() {
            self.default_prevented.set(true);
        }
    }

    /// Check if propagation is stopped.
    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }

    /// Check if immediate propagation is stopped.
    pub fn immediate_propagation_stopped(&self) -> bool {
        self.immediate_propagation_stopped.get()
    }

    /// Check if the default action was prevented.
    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    pub(crate) fn set_phase(&self, phase: EventPhase) {
        self.phase.set(phase);
    }

    pub(crate) fn set_target(&self, target: TargetId) {
        self.target.set(Some(target));
    }

    pub(crate) fn set_current_target(&self, target: Option<TargetId>) {
        self.current_target.set(target);
    }

    /// Stop flags are scoped to a single dispatch.
    pub(crate) fn reset_dispatch_flags(&self) {
        self.propagation_stopped.set(false);
        self.immediate_propagation_stopped.set(false);
    }
}

/// Options for adding an event listener.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddEventListenerOptions {
    /// If true, the listener is invoked during capture phase.
    pub capture: bool,
    /// If true, the listener is automatically removed after first invocation.
    pub once: bool,
    /// If true, indicates that the listener will never call preventDefault.
    pub passive: bool,
    /// Registered from an isolated world (an injected content script). Such
    /// listeners run ahead of page listeners on the same target and phase,
    /// whatever the registration order.
    pub isolated: bool,
}

impl AddEventListenerOptions {
    /// Capturing, non-passive listener.
    pub fn capture() -> Self {
        Self {
            capture: true,
            ..Default::default()
        }
    }

    /// Capturing, non-passive listener from an isolated world.
    pub fn isolated_capture() -> Self {
        Self {
            isolated: true,
            ..Self::capture()
        }
    }
}

/// An event listener callback. Shared so one handler can be registered on
/// several targets and event types.
pub type EventListenerCallback = Rc<dyn Fn(&Event)>;

/// Handle returned by [`EventTarget::add_event_listener`], used for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone)]
struct EventListener {
    id: ListenerId,
    callback: EventListenerCallback,
    options: AddEventListenerOptions,
}

/// Event target mixin - manages event listeners for a window, document or node.
#[derive(Default)]
pub struct EventTarget {
    /// Listeners keyed by event type.
    listeners: RefCell<HashMap<String, Vec<EventListener>>>,
}

impl EventTarget {
    /// Create a new event target.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event listener.
    pub fn add_event_listener(
        &self,
        event_type: &str,
        callback: EventListenerCallback,
        options: AddEventListenerOptions,
    ) -> ListenerId {
        let id = ListenerId::next();
        let mut listeners = self.listeners.borrow_mut();
        let list = listeners.entry(event_type.to_string()).or_default();
        list.push(EventListener {
            id,
            callback,
            options,
        });
        id
    }

    /// Remove a single listener. Returns whether it was registered.
    pub fn remove_event_listener(&self, event_type: &str, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let Some(list) = listeners.get_mut(event_type) else {
            return false;
        };
        let before = list.len();
        list.retain(|l| l.id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            listeners.remove(event_type);
        }
        removed
    }

    /// Check if there are any listeners for an event type.
    pub fn has_listeners(&self, event_type: &str) -> bool {
        self.listeners
            .borrow()
            .get(event_type)
            .map(|l| !l.is_empty())
            .unwrap_or(false)
    }

    /// Total number of registered listeners across all event types.
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().values().map(Vec::len).sum()
    }

    fn is_registered(&self, event_type: &str, id: ListenerId) -> bool {
        self.listeners
            .borrow()
            .get(event_type)
            .map(|list| list.iter().any(|l| l.id == id))
            .unwrap_or(false)
    }

    /// Invoke listeners for an event in the given phase.
    ///
    /// The listener list is snapshotted first, so callbacks may add or remove
    /// listeners. Listeners removed during dispatch are skipped.
    pub fn invoke_listeners(&self, event: &Event, phase: EventPhase) {
        let snapshot: Vec<EventListener> = match self.listeners.borrow().get(&event.event_type) {
            Some(list) => list.clone(),
            None => return,
        };

        let mut ordered: Vec<&EventListener> = match phase {
            // Capture listeners run before non-capture ones at the target
            EventPhase::AtTarget => snapshot
                .iter()
                .filter(|l| l.options.capture)
                .chain(snapshot.iter().filter(|l| !l.options.capture))
                .collect(),
            EventPhase::Capturing => snapshot.iter().filter(|l| l.options.capture).collect(),
            EventPhase::Bubbling => snapshot.iter().filter(|l| !l.options.capture).collect(),
            EventPhase::None => Vec::new(),
        };
        // Stable, so registration order holds within each world
        ordered.sort_by_key(|l| !l.options.isolated);

        for listener in ordered {
            if !self.is_registered(&event.event_type, listener.id) {
                continue;
            }
            if listener.options.once {
                self.remove_event_listener(&event.event_type, listener.id);
            }

            event.in_passive_listener.set(listener.options.passive);
            (listener.callback)(event);
            event.in_passive_listener.set(false);

            if event.immediate_propagation_stopped() {
                break;
            }
        }
    }
}

impl std::fmt::Debug for EventTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventTarget")
            .field("listener_count", &self.listener_count())
            .finish()
    }
}

/// Event dispatcher for propagating events along a target path.
pub struct EventDispatcher;

impl EventDispatcher {
    /// Dispatch an event along `path`, ordered from the outermost target
    /// (the window) to the event target itself.
    /// Returns true if the event was not prevented.
    pub fn dispatch(event: &Event, path: &[(TargetId, &EventTarget)]) -> bool {
        let Some(((target_id, target), ancestors)) = path.split_last() else {
            return true;
        };

        event.reset_dispatch_flags();
        event.set_target(*target_id);

        // Capture phase (outermost to target, excluding target)
        event.set_phase(EventPhase::Capturing);
        for (id, node) in ancestors {
            if event.propagation_stopped() {
                break;
            }
            event.set_current_target(Some(*id));
            node.invoke_listeners(event, EventPhase::Capturing);
        }

        // At target phase
        if !event.propagation_stopped() {
            event.set_phase(EventPhase::AtTarget);
            event.set_current_target(Some(*target_id));
            target.invoke_listeners(event, EventPhase::AtTarget);
        }

        // Bubble phase (target to outermost, excluding target)
        if event.bubbles && !event.propagation_stopped() {
            event.set_phase(EventPhase::Bubbling);
            for (id, node) in ancestors.iter().rev() {
                if event.propagation_stopped() {
                    break;
                }
                event.set_current_target(Some(*id));
                node.invoke_listeners(event, EventPhase::Bubbling);
            }
        }

        event.set_phase(EventPhase::None);
        event.set_current_target(None);

        !event.default_prevented()
    }
}
