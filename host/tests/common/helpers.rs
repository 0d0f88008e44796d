//! Test doubles and a builder for host tests
//!
//! The surface host, bridge transport and input hook are hand-written fakes
//! that record what the host did; the supervisor and screen capture use the
//! mockall-generated mocks.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};

use super::fixtures::TestFixtures;
use host::error::{HookError, HostError, HostResult};
use host::services::Hotkey;
use host::traits::{
    BridgeEvent, BridgeLink, BridgeRequest, BridgeTransport, InputHook, MockProcessManager, MockScreenCapture,
    ShellEvent, SurfaceHost, WorkerStatus,
};
use host::{Flow, Host, HostEvent, HostSettings, OverlayController};
use shared::{ClickEvent, ContentSource, ControlRequest, ControlResponse, PushEvent, SurfaceId, SurfaceRole, SurfaceSpec};

/// One call made on the surface host
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Create(SurfaceId, SurfaceRole),
    Load(SurfaceId, ContentSource),
    Show(SurfaceId),
    Destroy(SurfaceId),
    Push(SurfaceId, PushEvent),
}

#[derive(Default)]
struct SurfaceLog {
    next_id: u64,
    calls: Vec<SurfaceCall>,
    reject_urls: bool,
}

/// Surface host that records every call; clones share the log
#[derive(Clone, Default)]
pub struct RecordingSurfaces {
    log: Arc<Mutex<SurfaceLog>>,
}

impl RecordingSurfaces {
    /// Synchronously reject every URL load
    pub fn rejecting_urls() -> Self {
        let surfaces = Self::default();
        surfaces.log.lock().unwrap().reject_urls = true;
        surfaces
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.log.lock().unwrap().calls.clone()
    }

    pub fn clear(&self) {
        self.log.lock().unwrap().calls.clear();
    }

    pub fn pushes_to(&self, surface: SurfaceId) -> Vec<PushEvent> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SurfaceCall::Push(target, event) if target == surface => Some(event),
                _ => None,
            })
            .collect()
    }

    pub fn loads_of(&self, surface: SurfaceId) -> Vec<ContentSource> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SurfaceCall::Load(target, source) if target == surface => Some(source),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: SurfaceCall) {
        self.log.lock().unwrap().calls.push(call);
    }
}

impl SurfaceHost for RecordingSurfaces {
    fn create(&self, spec: &SurfaceSpec) -> HostResult<SurfaceId> {
        let surface = {
            let mut log = self.log.lock().unwrap();
            log.next_id += 1;
            SurfaceId(log.next_id)
        };
        self.record(SurfaceCall::Create(surface, spec.role));
        Ok(surface)
    }

    fn load(&self, surface: SurfaceId, source: &ContentSource) -> HostResult<()> {
        self.record(SurfaceCall::Load(surface, source.clone()));
        let reject = self.log.lock().unwrap().reject_urls;
        match source {
            ContentSource::Url(url) if reject => Err(HostError::ContentUnavailable {
                source_desc: url.clone(),
            }),
            _ => Ok(()),
        }
    }

    fn show(&self, surface: SurfaceId) -> HostResult<()> {
        self.record(SurfaceCall::Show(surface));
        Ok(())
    }

    fn destroy(&self, surface: SurfaceId) {
        self.record(SurfaceCall::Destroy(surface));
    }

    fn push(&self, surface: SurfaceId, event: &PushEvent) -> HostResult<()> {
        self.record(SurfaceCall::Push(surface, event.clone()));
        Ok(())
    }
}

/// Bridge transport whose sessions are driven by the test
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    sessions: Arc<Mutex<Vec<(BridgeRequest, mpsc::Sender<BridgeEvent>, oneshot::Receiver<()>)>>>,
}

impl ScriptedTransport {
    pub fn opened(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<BridgeRequest> {
        self.sessions.lock().unwrap().last().map(|(request, _, _)| request.clone())
    }

    /// Feed an event into the most recent session; false once it is gone
    pub fn emit(&self, event: BridgeEvent) -> bool {
        let sessions = self.sessions.lock().unwrap();
        match sessions.last() {
            Some((_, events, _)) => events.try_send(event).is_ok(),
            None => false,
        }
    }

    /// Whether the host has ended the most recent session
    pub fn last_closed(&self) -> bool {
        let mut sessions = self.sessions.lock().unwrap();
        match sessions.last_mut() {
            Some((_, events, shutdown)) => events.is_closed() && shutdown.try_recv().is_ok(),
            None => false,
        }
    }
}

impl BridgeTransport for ScriptedTransport {
    fn open(&self, request: &BridgeRequest) -> BridgeLink {
        let (events_tx, events_rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.sessions
            .lock()
            .unwrap()
            .push((request.clone(), events_tx, shutdown_rx));
        BridgeLink::new(events_rx, shutdown_tx)
    }
}

#[derive(Default)]
struct HookState {
    deny: Option<HookError>,
    clicks: Option<mpsc::UnboundedSender<ClickEvent>>,
    hotkeys: Vec<(Hotkey, mpsc::UnboundedSender<Hotkey>)>,
}

/// Input hook the test can click and type through
#[derive(Default)]
pub struct FakeInputHook {
    state: Mutex<HookState>,
}

impl FakeInputHook {
    pub fn denying() -> Self {
        let hook = Self::default();
        hook.state.lock().unwrap().deny = Some(HookError::PermissionDenied {
            detail: "EventTapError".to_string(),
        });
        hook
    }

    pub fn click(&self, x: f64, y: f64) -> bool {
        match &self.state.lock().unwrap().clicks {
            Some(sink) => sink.send(ClickEvent::now(x, y)).is_ok(),
            None => false,
        }
    }

    pub fn press(&self, hotkey: Hotkey) {
        for (registered, sink) in &self.state.lock().unwrap().hotkeys {
            if *registered == hotkey {
                let _ = sink.send(hotkey);
            }
        }
    }

    pub fn hotkey_count(&self) -> usize {
        self.state.lock().unwrap().hotkeys.len()
    }
}

#[async_trait]
impl InputHook for FakeInputHook {
    async fn start_clicks(&self, sink: mpsc::UnboundedSender<ClickEvent>) -> Result<(), HookError> {
        let mut state = self.state.lock().unwrap();
        if let Some(e) = &state.deny {
            return Err(e.clone());
        }
        state.clicks = Some(sink);
        Ok(())
    }

    fn stop_clicks(&self) {
        self.state.lock().unwrap().clicks = None;
    }

    async fn register_hotkey(&self, hotkey: Hotkey, sink: mpsc::UnboundedSender<Hotkey>) -> Result<(), HookError> {
        self.state.lock().unwrap().hotkeys.push((hotkey, sink));
        Ok(())
    }

    fn unregister_hotkeys(&self) {
        self.state.lock().unwrap().hotkeys.clear();
    }
}

pub type TestHost = Host<MockProcessManager, RecordingSurfaces, FakeInputHook, ScriptedTransport, MockScreenCapture>;

/// Handles the test keeps after the host takes ownership of its services
pub struct Probes {
    pub surfaces: RecordingSurfaces,
    pub transport: ScriptedTransport,
    pub hook: Arc<FakeInputHook>,
    pub shell_tx: mpsc::UnboundedSender<ShellEvent>,
}

/// Builder pattern for creating test hosts with sensible defaults
pub struct HostBuilder {
    settings: HostSettings,
    supervisor: MockProcessManager,
    capture: MockScreenCapture,
    surfaces: RecordingSurfaces,
    hook: FakeInputHook,
}

impl HostBuilder {
    pub fn new() -> Self {
        let mut supervisor = MockProcessManager::new();
        supervisor.expect_worker_names().returning(Vec::new).times(0..);
        supervisor.expect_stop_all().returning(|| Ok(())).times(0..);
        supervisor
            .expect_status()
            .returning(|_| WorkerStatus::stopped())
            .times(0..);

        Self {
            settings: TestFixtures::host_settings(),
            supervisor,
            capture: MockScreenCapture::new(),
            surfaces: RecordingSurfaces::default(),
            hook: FakeInputHook::default(),
        }
    }

    pub fn with_settings<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut HostSettings),
    {
        setup(&mut self.settings);
        self
    }

    /// Replace the default supervisor expectations
    pub fn with_supervisor<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockProcessManager),
    {
        let mut supervisor = MockProcessManager::new();
        setup(&mut supervisor);
        self.supervisor = supervisor;
        self
    }

    pub fn with_capture<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockScreenCapture),
    {
        setup(&mut self.capture);
        self
    }

    pub fn with_surfaces(mut self, surfaces: RecordingSurfaces) -> Self {
        self.surfaces = surfaces;
        self
    }

    pub fn with_hook(mut self, hook: FakeInputHook) -> Self {
        self.hook = hook;
        self
    }

    pub fn build(self) -> (TestHost, Probes) {
        let transport = ScriptedTransport::default();
        let hook = Arc::new(self.hook);
        let (shell_tx, shell_rx) = mpsc::unbounded_channel();

        let host = Host::new(
            self.settings,
            OverlayController::new(TestFixtures::overlay_settings()),
            Arc::new(self.supervisor),
            self.surfaces.clone(),
            Arc::clone(&hook),
            transport.clone(),
            Arc::new(self.capture),
        )
        .with_shell_events(shell_rx);

        let probes = Probes {
            surfaces: self.surfaces,
            transport,
            hook,
            shell_tx,
        };
        (host, probes)
    }
}

impl Default for HostBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TestHelpers;

impl TestHelpers {
    /// A started host with its main surface loaded and shown
    pub async fn running_host() -> (TestHost, Probes) {
        let (mut host, probes) = HostBuilder::new().build();
        host.startup().await.unwrap();
        host.dispatch(HostEvent::Shell(ShellEvent::LoadFinished {
            surface: TestFixtures::MAIN_SURFACE,
        }))
        .await;
        (host, probes)
    }

    /// Pull the next event off the host's sources and apply it
    pub async fn step(host: &mut TestHost) -> Flow {
        let event = tokio::time::timeout(std::time::Duration::from_secs(5), host.next_event())
            .await
            .expect("host produced no event");
        host.dispatch(event).await
    }

    /// Open the overlay through the hotkey and complete its first render
    pub async fn open_overlay(host: &mut TestHost, probes: &Probes) -> SurfaceId {
        probes.hook.press(TestFixtures::host_settings().hotkey);
        Self::step(host).await;
        let surface = host.overlay().surface().expect("overlay surface");
        host.dispatch(HostEvent::Shell(ShellEvent::LoadFinished { surface })).await;
        assert!(host.overlay().is_open());
        surface
    }

    /// Issue a control request and wait for its reply
    pub async fn control(host: &mut TestHost, request: ControlRequest) -> ControlResponse {
        let (reply, response) = oneshot::channel();
        host.dispatch(HostEvent::Shell(ShellEvent::Control { request, reply })).await;
        tokio::time::timeout(std::time::Duration::from_secs(5), response)
            .await
            .expect("control reply timed out")
            .expect("control reply dropped")
    }
}
