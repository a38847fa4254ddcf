//! PageLock control panel
//!
//! A single switch that locks or unlocks the window the panel was opened
//! from. The panel never writes the lock record itself; it asks the
//! coordinator and follows the storage change feed.

pub mod panel;
pub mod view;

pub use panel::ControlPanel;
pub use view::PanelView;
