//! Service implementations
//!
//! Real implementations of the service traits. These own the actual I/O:
//! child processes, the OS input hook, the shell socket, HTTP and the screen.

pub mod hotkey;
pub mod input_hook;
pub mod mock_schedule;
pub mod polling;
pub mod process_manager;
pub mod process_output_handler;
pub mod screen_capture;
pub mod shell_link;

#[cfg(test)]
mod tests;

// Re-export all service implementations
pub use hotkey::Hotkey;
pub use input_hook::RdevInputHook;
pub use mock_schedule::ScheduledTransport;
pub use polling::PollingTransport;
pub use process_manager::{Readiness, RealProcessManager, WorkerSpec};
pub use screen_capture::ScreenshotsCapture;
pub use shell_link::{ShellLink, ShellSurfaceHost};
