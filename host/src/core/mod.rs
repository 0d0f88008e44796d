//! Core state machines
//!
//! No I/O of their own: every side effect goes through a trait object handed
//! in by the host loop, which keeps these modules testable with mocks.

pub mod bridge;
pub mod input_monitor;
pub mod overlay;
pub mod startup;

pub use bridge::{BridgeConnection, BridgeStatus, EventBridge};
pub use input_monitor::{InputMonitor, MonitorStart, ACCESSIBILITY_GUIDANCE};
pub use overlay::{OverlayController, OverlaySettings, ToggleOutcome};
pub use startup::{start_in_order, StartupReport};
