//! PageLock coordinator
//!
//! Holds the global lock record, answers lock queries and pushes
//! enable/disable notifications to the tabs of the affected windows.
//!
//! # Architecture
//!
//! - [`store`]: key-value storage area with a change feed
//! - [`directory`]: windows, tabs, messaging and indicator seams
//! - [`broadcast`]: best-effort fan-out to a window's tabs
//! - [`coordinator`]: state transitions and request handling
//! - [`handle`]: single-writer task in front of the coordinator

pub mod broadcast;
pub mod coordinator;
pub mod directory;
pub mod handle;
pub mod store;

#[cfg(test)]
mod test_support;

pub use broadcast::{broadcast, BroadcastSummary};
pub use coordinator::Coordinator;
pub use directory::{BadgeSurface, DeliveryError, Directory, TabMessenger};
pub use handle::{ActorLink, CoordinatorHandle};
pub use store::{JsonFileStore, MemoryStore, StateStore, StorageChange};
