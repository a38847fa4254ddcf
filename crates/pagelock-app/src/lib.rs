//! PageLock host
//!
//! Runs the coordinator, a local browser whose pages carry tab agents, and
//! the control panel in one process.

pub mod browser;
pub mod session;

pub use browser::{Badge, InputOutcome, LocalBrowser};
pub use session::{Session, SessionLayout, WindowLayout};
