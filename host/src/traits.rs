//! Trait definitions with mockall annotations for testing
//!
//! Every side-effecting collaborator of the host loop sits behind one of
//! these traits: child processes, the renderer shell, the OS input hook,
//! the remote pub/sub channel and screen capture.

use serde_json::Value;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use url::Url;

use crate::error::{HookError, HostResult};
use crate::services::hotkey::Hotkey;
use shared::{ClickEvent, ContentSource, ControlRequest, ControlResponse, DisplayBounds, PushEvent, SurfaceId, SurfaceSpec};

/// Observed state of one named worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStatus {
    pub running: bool,
    pub pid: Option<u32>,
}

impl WorkerStatus {
    pub fn stopped() -> Self {
        Self { running: false, pid: None }
    }
}

/// Result of a `start` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started { pid: Option<u32> },
    AlreadyRunning { pid: Option<u32> },
}

/// Lifecycle notifications from supervised workers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    Exited { name: String, code: Option<i32> },
}

/// Inbound traffic from the renderer shell
#[derive(Debug)]
pub enum ShellEvent {
    LoadFinished {
        surface: SurfaceId,
    },
    LoadFailed {
        surface: SurfaceId,
        url: Option<String>,
    },
    SurfaceClosed {
        surface: SurfaceId,
    },
    Control {
        request: ControlRequest,
        reply: oneshot::Sender<ControlResponse>,
    },
    /// Re-activation request; reopens the app if every window is gone
    Activated,
    Disconnected,
}

/// Reconnection policy for the pub/sub bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Automatic attempts after the first failed connection
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(1000),
        }
    }
}

/// What the bridge connects to
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeRequest {
    pub endpoint: Url,
    pub room: String,
    pub policy: ReconnectPolicy,
}

/// Events surfaced by a bridge transport
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    Connected { sid: String },
    RoomJoined(Value),
    Content(Value),
    Status(Value),
    Disconnected { reason: String },
    ConnectError(String),
    GaveUp { attempts: u32 },
}

/// Live link to a bridge transport session.
///
/// Dropping or closing the link ends the session; events are detached first
/// so nothing is observed after [`BridgeLink::close`] returns.
#[derive(Debug)]
pub struct BridgeLink {
    events: Option<mpsc::Receiver<BridgeEvent>>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl BridgeLink {
    pub fn new(events: mpsc::Receiver<BridgeEvent>, shutdown: oneshot::Sender<()>) -> Self {
        Self {
            events: Some(events),
            shutdown: Some(shutdown),
        }
    }

    pub async fn recv(&mut self) -> Option<BridgeEvent> {
        match self.events.as_mut() {
            Some(events) => events.recv().await,
            None => None,
        }
    }

    pub fn close(&mut self) {
        // Listeners go first, then the session is told to disconnect.
        if let Some(mut events) = self.events.take() {
            events.close();
        }
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }

    pub fn is_closed(&self) -> bool {
        self.events.is_none()
    }
}

impl Drop for BridgeLink {
    fn drop(&mut self) {
        self.close();
    }
}

/// A captured frame of the primary display
#[derive(Debug, Clone, PartialEq)]
pub struct Screenshot {
    pub png: Vec<u8>,
    pub display: DisplayBounds,
}

/// Worker process supervision
///
/// Workers are addressed by name; at most one live process exists per name.
#[mockall::automock]
#[async_trait::async_trait]
pub trait ProcessManager: Send + Sync {
    /// Worker names in dependency (start) order
    fn worker_names(&self) -> Vec<String>;

    /// Spawn the worker unless a live instance already exists
    async fn start(&self, name: &str) -> HostResult<StartOutcome>;

    /// Wait for the worker's readiness rule to be satisfied
    async fn wait_ready(&self, name: &str) -> HostResult<()>;

    /// Signal the worker to exit; no-op when absent
    async fn stop(&self, name: &str) -> HostResult<()>;

    /// Stop, settle, start and wait for readiness
    async fn restart(&self, name: &str) -> HostResult<WorkerStatus>;

    async fn status(&self, name: &str) -> WorkerStatus;

    /// Stop every worker; safe when some or all are already gone
    async fn stop_all(&self) -> HostResult<()>;
}

/// Renderer surfaces owned by the shell
///
/// Commands are fire-and-forget; load results and closes come back as
/// [`ShellEvent`]s.
#[mockall::automock]
pub trait SurfaceHost: Send + Sync {
    fn create(&self, spec: &SurfaceSpec) -> HostResult<SurfaceId>;

    /// Begin loading content; an `Err` is a synchronous rejection
    fn load(&self, surface: SurfaceId, source: &ContentSource) -> HostResult<()>;

    fn show(&self, surface: SurfaceId) -> HostResult<()>;

    fn destroy(&self, surface: SurfaceId);

    fn push(&self, surface: SurfaceId, event: &PushEvent) -> HostResult<()>;
}

/// OS-level global input hook shared by click monitoring and the hotkey
#[mockall::automock]
#[async_trait::async_trait]
pub trait InputHook: Send + Sync {
    /// Route every click into `sink`
    async fn start_clicks(&self, sink: mpsc::UnboundedSender<ClickEvent>) -> Result<(), HookError>;

    fn stop_clicks(&self);

    async fn register_hotkey(&self, hotkey: Hotkey, sink: mpsc::UnboundedSender<Hotkey>) -> Result<(), HookError>;

    fn unregister_hotkeys(&self);
}

/// Remote pub/sub connection factory
#[mockall::automock]
pub trait BridgeTransport: Send + Sync {
    /// Start a session in the background and hand back its link
    fn open(&self, request: &BridgeRequest) -> BridgeLink;
}

impl<T: BridgeTransport + ?Sized> BridgeTransport for Box<T> {
    fn open(&self, request: &BridgeRequest) -> BridgeLink {
        (**self).open(request)
    }
}

/// Primary display capture
#[mockall::automock]
pub trait ScreenCapture: Send + Sync {
    fn capture_primary(&self) -> HostResult<Screenshot>;
}
