//! Message types shared between the host, the renderer shell and tools

pub mod content;
pub mod control;
pub mod input;
pub mod step;
pub mod surface;

pub use content::{ContentUpdate, DEFAULT_HEADER};
pub use control::{
    BackendStatus, ControlRequest, ControlResponse, DisplayBounds, Failure, HookStatus, MonitoringState,
    OverlayAction, OverlayToggle, RestartOutcome, ScreenshotData,
};
pub use input::{ClickEvent, MouseHookDebug};
pub use step::{demo_steps, DemoStep, StartStepRequest, StartStepResponse};
pub use surface::{ContentSource, Geometry, PushEvent, ShellCommand, ShellMessage, SurfaceRole, SurfaceSpec};
