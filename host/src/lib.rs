//! Desktop companion host
//!
//! Supervises the backend and UI workers, drives the renderer shell's
//! surfaces, and runs the guidance overlay with its live content bridge.
//! Every OS- or network-facing piece sits behind a trait in [`traits`] so the
//! host logic can be exercised with mocks.

pub mod config;
pub mod core;
pub mod error;
pub mod host;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use config::{Args, HostConfig};
pub use core::{BridgeStatus, EventBridge, InputMonitor, OverlayController, OverlaySettings};
pub use error::{HookError, HostError, HostResult};
pub use host::{Flow, Host, HostEvent, HostSettings};
pub use traits::{BridgeTransport, InputHook, ProcessManager, ScreenCapture, SurfaceHost};
