//! Main host implementation
//!
//! The host owns every component and is the single writer of their state.
//! External sources (shell link, worker exits, the input hook, the bridge
//! transport) feed channels that are merged in one select loop.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::config::{HostConfig, BACKEND_WORKER};
use crate::core::{start_in_order, InputMonitor, MonitorStart, OverlayController, ToggleOutcome};
use crate::error::HostResult;
use crate::services::hotkey::Hotkey;
use crate::services::screen_capture::screenshot_response;
use crate::traits::{
    BridgeEvent, BridgeTransport, InputHook, ProcessManager, ScreenCapture, ShellEvent, SurfaceHost, WorkerEvent,
};
use shared::{
    logging, process_debug, process_error, process_info, process_warn, BackendStatus, ClickEvent, Component,
    ContentSource, ControlRequest, ControlResponse, HookStatus, MonitoringState, MouseHookDebug, OverlayAction,
    OverlayToggle, PushEvent, RestartOutcome, SurfaceId, SurfaceSpec,
};

/// Everything that can wake the host loop
#[derive(Debug)]
pub enum HostEvent {
    Shell(ShellEvent),
    Worker(WorkerEvent),
    Click(ClickEvent),
    Hotkey(Hotkey),
    Bridge(BridgeEvent),
    /// The pending overlay open ran out of time
    OpenDeadline,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Host-level settings pulled out of [`HostConfig`]
#[derive(Debug, Clone)]
pub struct HostSettings {
    pub main_spec: SurfaceSpec,
    pub main_source: ContentSource,
    pub hotkey: Hotkey,
    pub start_workers: bool,
    pub keep_alive_without_windows: bool,
}

impl From<&HostConfig> for HostSettings {
    fn from(config: &HostConfig) -> Self {
        Self {
            main_spec: config.main_spec.clone(),
            main_source: config.main_source.clone(),
            hotkey: config.hotkey,
            start_workers: config.start_workers,
            keep_alive_without_windows: config.keep_alive_without_windows,
        }
    }
}

pub struct Host<P, S, H, B, C>
where
    P: ProcessManager + 'static,
    S: SurfaceHost,
    H: InputHook + 'static,
    B: BridgeTransport,
    C: ScreenCapture + 'static,
{
    settings: HostSettings,

    /// Injected services
    supervisor: Arc<P>,
    surfaces: S,
    hook: Arc<H>,
    transport: B,
    capture: Arc<C>,

    overlay: OverlayController,
    monitor: InputMonitor<H>,
    main_surface: Option<SurfaceId>,

    /// Inbound channels
    shell_rx: Option<mpsc::UnboundedReceiver<ShellEvent>>,
    worker_rx: Option<mpsc::UnboundedReceiver<WorkerEvent>>,
    click_rx: mpsc::UnboundedReceiver<ClickEvent>,
    hotkey_tx: mpsc::UnboundedSender<Hotkey>,
    hotkey_rx: mpsc::UnboundedReceiver<Hotkey>,

    /// Shutdown signal
    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl<P, S, H, B, C> Host<P, S, H, B, C>
where
    P: ProcessManager + 'static,
    S: SurfaceHost,
    H: InputHook + 'static,
    B: BridgeTransport,
    C: ScreenCapture + 'static,
{
    pub fn new(
        settings: HostSettings,
        overlay: OverlayController,
        supervisor: Arc<P>,
        surfaces: S,
        hook: Arc<H>,
        transport: B,
        capture: Arc<C>,
    ) -> Self {
        let (click_tx, click_rx) = mpsc::unbounded_channel();
        let (hotkey_tx, hotkey_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        Self {
            settings,
            supervisor,
            surfaces,
            monitor: InputMonitor::new(Arc::clone(&hook), click_tx),
            hook,
            transport,
            capture,
            overlay,
            main_surface: None,
            shell_rx: None,
            worker_rx: None,
            click_rx,
            hotkey_tx,
            hotkey_rx,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Attach the renderer shell's event stream (fluent API)
    pub fn with_shell_events(mut self, rx: mpsc::UnboundedReceiver<ShellEvent>) -> Self {
        self.shell_rx = Some(rx);
        self
    }

    /// Attach worker exit notifications (fluent API)
    pub fn with_worker_events(mut self, rx: mpsc::UnboundedReceiver<WorkerEvent>) -> Self {
        self.worker_rx = Some(rx);
        self
    }

    pub fn get_shutdown_sender(&self) -> mpsc::Sender<()> {
        self.shutdown_tx.clone()
    }

    pub fn overlay(&self) -> &OverlayController {
        &self.overlay
    }

    pub fn main_surface(&self) -> Option<SurfaceId> {
        self.main_surface
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitor.is_active()
    }

    /// Start workers, open the primary surface, install the hotkey and click hook
    pub async fn startup(&mut self) -> HostResult<()> {
        logging::log_startup(&Component::Host, "companion host");
        self.bring_up().await?;
        logging::log_success(&Component::Host, "Host initialized");
        Ok(())
    }

    /// Everything startup does after logging; re-run on activation
    async fn bring_up(&mut self) -> HostResult<()> {
        if self.settings.start_workers {
            let report = start_in_order(self.supervisor.as_ref()).await;
            if !report.all_ready() {
                process_warn!(
                    Component::Host,
                    "Started with {} degraded and {} failed workers",
                    report.degraded.len(),
                    report.failed.len()
                );
            }
        }

        let main = self.surfaces.create(&self.settings.main_spec)?;
        self.main_surface = Some(main);
        if let Err(e) = self.surfaces.load(main, &self.settings.main_source) {
            logging::log_error(&Component::Host, "Loading the primary surface", &e);
        }

        match self.hook.register_hotkey(self.settings.hotkey, self.hotkey_tx.clone()).await {
            Ok(()) => {}
            Err(e) => process_warn!(
                Component::Overlay,
                "Registration of global shortcut '{}' failed: {}",
                self.settings.hotkey,
                e
            ),
        }

        self.monitor.start().await;
        Ok(())
    }

    /// Main event loop
    pub async fn run(&mut self) -> HostResult<()> {
        process_info!(Component::Host, "🎯 Host event loop running");

        loop {
            let event = self.next_event().await;
            if self.dispatch(event).await == Flow::Quit {
                break;
            }
        }

        self.shutdown().await
    }

    /// Wait for the next event from any source
    pub async fn next_event(&mut self) -> HostEvent {
        let deadline = self.overlay.deadline();
        let shell_rx = &mut self.shell_rx;
        let worker_rx = &mut self.worker_rx;
        let overlay = &mut self.overlay;

        tokio::select! {
            Some(event) = async {
                if let Some(rx) = shell_rx.as_mut() {
                    rx.recv().await
                } else {
                    None
                }
            } => HostEvent::Shell(event),

            Some(event) = async {
                if let Some(rx) = worker_rx.as_mut() {
                    rx.recv().await
                } else {
                    None
                }
            } => HostEvent::Worker(event),

            Some(click) = self.click_rx.recv() => HostEvent::Click(click),

            Some(hotkey) = self.hotkey_rx.recv() => HostEvent::Hotkey(hotkey),

            Some(event) = overlay.next_bridge_event() => HostEvent::Bridge(event),

            _ = async {
                match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending::<()>().await,
                }
            } => HostEvent::OpenDeadline,

            _ = self.shutdown_rx.recv() => HostEvent::Shutdown,
        }
    }

    /// Apply one event to host state
    pub async fn dispatch(&mut self, event: HostEvent) -> Flow {
        match event {
            HostEvent::Shell(event) => return self.handle_shell_event(event).await,
            HostEvent::Worker(WorkerEvent::Exited { name, code }) => {
                let text = match code {
                    Some(code) => format!("{name} process exited with code {code}"),
                    None => format!("{name} process exited"),
                };
                self.push_to_main(PushEvent::ChildProcessOutput(text));
            }
            HostEvent::Click(click) => self.fan_out_click(click),
            HostEvent::Hotkey(hotkey) => {
                process_info!(Component::Overlay, "Global shortcut '{}' pressed", hotkey);
                self.toggle_overlay();
            }
            HostEvent::Bridge(event) => {
                self.overlay.on_bridge_event(event, &self.surfaces);
            }
            HostEvent::OpenDeadline => {
                self.overlay.check_deadline(Instant::now(), &self.surfaces);
            }
            HostEvent::Shutdown => {
                logging::log_shutdown(&Component::Host, "shutdown requested");
                return Flow::Quit;
            }
        }
        Flow::Continue
    }

    async fn handle_shell_event(&mut self, event: ShellEvent) -> Flow {
        match event {
            ShellEvent::LoadFinished { surface } if Some(surface) == self.main_surface => {
                if let Err(e) = self.surfaces.show(surface) {
                    process_warn!(Component::Host, "Failed to show primary surface: {}", e);
                }
            }
            ShellEvent::LoadFinished { surface } => {
                self.overlay.on_load_finished(surface, &self.surfaces, &self.transport);
            }
            ShellEvent::LoadFailed { surface, url } if Some(surface) == self.main_surface => {
                process_warn!(Component::Host, "Primary surface failed to load {:?}", url);
            }
            ShellEvent::LoadFailed { surface, url } => {
                self.overlay.on_load_failed(surface, url.as_deref(), &self.surfaces);
            }
            ShellEvent::SurfaceClosed { surface } if Some(surface) == self.main_surface => {
                self.main_surface = None;
                return self.all_windows_closed().await;
            }
            ShellEvent::SurfaceClosed { surface } => {
                self.overlay.on_surface_closed(surface);
            }
            ShellEvent::Control { request, reply } => self.handle_control(request, reply).await,
            ShellEvent::Activated if self.main_surface.is_some() => {
                process_debug!(Component::Host, "Activated with the primary surface open");
            }
            ShellEvent::Activated => {
                process_info!(Component::Host, "Activated with no windows, restarting");
                if let Err(e) = self.bring_up().await {
                    logging::log_error(&Component::Host, "Reopening after activation", &e);
                }
            }
            ShellEvent::Disconnected => {
                // Every surface lived in the shell.
                self.main_surface = None;
                if let Some(surface) = self.overlay.surface() {
                    self.overlay.on_surface_closed(surface);
                }
                return self.all_windows_closed().await;
            }
        }
        Flow::Continue
    }

    async fn all_windows_closed(&mut self) -> Flow {
        process_info!(Component::Host, "All windows closed");
        self.overlay.close(&self.surfaces);
        self.hook.unregister_hotkeys();
        if let Err(e) = self.supervisor.stop_all().await {
            logging::log_error(&Component::Supervisor, "Stopping workers", &e);
        }

        if self.settings.keep_alive_without_windows {
            Flow::Continue
        } else {
            Flow::Quit
        }
    }

    /// Toggle the overlay and describe the result the way the control channel expects
    pub fn toggle_overlay(&mut self) -> ControlResponse {
        let action = match self.overlay.toggle(&self.surfaces) {
            ToggleOutcome::Opening { .. } => {
                self.push_to_main(PushEvent::ChildProcessOutput("Overlay window created".to_string()));
                OverlayAction::Opened
            }
            ToggleOutcome::Ignored => OverlayAction::Opened,
            ToggleOutcome::Closed => OverlayAction::Closed,
            ToggleOutcome::Failed(e) => return ControlResponse::failure(e),
        };

        ControlResponse::Overlay(OverlayToggle {
            success: true,
            pid: None,
            action,
        })
    }

    async fn handle_control(&mut self, request: ControlRequest, reply: oneshot::Sender<ControlResponse>) {
        process_debug!(Component::Host, "Control request {:?}", request);

        let response = match request {
            ControlRequest::GetBackendStatus => {
                let status = self.supervisor.status(BACKEND_WORKER).await;
                ControlResponse::BackendStatus(BackendStatus {
                    is_running: status.running,
                    pid: status.pid,
                })
            }
            ControlRequest::RestartBackend => {
                let supervisor = Arc::clone(&self.supervisor);
                tokio::spawn(async move {
                    let response = match supervisor.restart(BACKEND_WORKER).await {
                        Ok(status) => ControlResponse::Restart(RestartOutcome {
                            success: true,
                            pid: status.pid,
                            error: None,
                        }),
                        Err(e) => ControlResponse::failure(e),
                    };
                    let _ = reply.send(response);
                });
                return;
            }
            ControlRequest::TriggerOverlay => self.toggle_overlay(),
            ControlRequest::TakeScreenshot => {
                let capture = Arc::clone(&self.capture);
                tokio::spawn(async move {
                    let response = match tokio::task::spawn_blocking(move || capture.capture_primary()).await {
                        Ok(Ok(shot)) => ControlResponse::Screenshot(screenshot_response(&shot)),
                        Ok(Err(e)) => ControlResponse::failure(e),
                        Err(e) => ControlResponse::failure(e),
                    };
                    let _ = reply.send(response);
                });
                return;
            }
            ControlRequest::StartMouseMonitoring => match self.monitor.start().await {
                MonitorStart::Started | MonitorStart::AlreadyActive => ControlResponse::Monitoring(MonitoringState {
                    success: true,
                    active: self.monitor.is_active(),
                }),
                MonitorStart::PermissionDenied { guidance } => ControlResponse::failure(guidance),
                MonitorStart::Failed { error } => ControlResponse::failure(error),
            },
            ControlRequest::StopMouseMonitoring => {
                self.monitor.stop();
                ControlResponse::Monitoring(MonitoringState {
                    success: true,
                    active: self.monitor.is_active(),
                })
            }
            ControlRequest::GetMouseHookStatus => ControlResponse::HookStatus(HookStatus {
                active: self.monitor.is_active(),
            }),
        };

        let _ = reply.send(response);
    }

    /// Deliver a click to the primary surface and, while it is open, the overlay
    fn fan_out_click(&self, click: ClickEvent) {
        process_debug!(Component::InputMonitor, "Mouse click: x={}, y={}", click.x, click.y);
        let event = PushEvent::MouseHookDebug(MouseHookDebug::click_detected(click));

        for surface in [self.main_surface, self.overlay.delivery_target()].into_iter().flatten() {
            if let Err(e) = self.surfaces.push(surface, &event) {
                process_debug!(Component::InputMonitor, "Skipped click delivery to {}: {}", surface, e);
            }
        }
    }

    fn push_to_main(&self, event: PushEvent) {
        if let Some(main) = self.main_surface {
            if let Err(e) = self.surfaces.push(main, &event) {
                process_debug!(Component::Host, "Dropped {} push: {}", event.channel(), e);
            }
        }
    }

    /// Tear everything down; safe to call more than once
    pub async fn shutdown(&mut self) -> HostResult<()> {
        self.monitor.stop();
        self.overlay.close(&self.surfaces);
        self.hook.unregister_hotkeys();

        if let Err(e) = self.supervisor.stop_all().await {
            process_error!(Component::Host, "❌ Failed to stop workers: {}", e);
        }

        logging::log_success(&Component::Host, "Host shutdown complete");
        Ok(())
    }
}
