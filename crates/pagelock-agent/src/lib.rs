//! Tab agent for PageLock
//!
//! Runs inside each page. While its window is locked it swallows every
//! pointer, touch, wheel and keyboard event before page scripts can see it,
//! and covers the viewport with a transparent overlay as a backstop.

pub mod agent;
pub mod overlay;
pub mod policy;
pub mod timers;

pub use agent::TabAgent;
pub use overlay::{ensure_overlay, OverlayOutcome};
pub use policy::{suppression_for, InputCategory, Suppression, BLOCKED_EVENT_TYPES};
pub use timers::{QueuedTimers, Timers, TokioTimers};
