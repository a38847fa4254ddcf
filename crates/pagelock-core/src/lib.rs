//! PageLock Core Library
//!
//! This crate provides shared types, errors, configuration, logging setup and
//! the wire protocol spoken between the coordinator, tab agents and the
//! control panel.

pub mod config;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod types;

pub use config::{BadgeConfig, OverlayConfig, PageLockConfig};
pub use error::{PageLockError, PageLockResult};
pub use logging::{init_logging, LogConfig, LogFormat};
pub use protocol::{AgentMessage, CoordinatorLink, LinkError, Request, Response, Sender};
pub use types::{LockState, TabId, TabInfo, TabStatus, WindowId};
