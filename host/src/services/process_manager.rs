//! Real process management service implementation
//!
//! Supervises the named worker processes (backend, UI renderers) with
//! per-worker readiness rules and graceful shutdown.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use url::Url;

use crate::error::{HostError, HostResult};
use crate::services::process_output_handler::{configure_child_stdio, spawn_output_forwarders};
use crate::traits::{ProcessManager, StartOutcome, WorkerEvent, WorkerStatus};
use shared::{process_debug, process_info, process_warn, Component};

/// How the supervisor decides a freshly started worker is usable
#[derive(Debug, Clone, PartialEq)]
pub enum Readiness {
    /// Wait a fixed delay
    Settle(Duration),
    /// Poll `url` until it answers, up to `timeout`
    Http { url: Url, timeout: Duration, interval: Duration },
}

/// Static description of a worker
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerSpec {
    pub name: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub readiness: Readiness,
}

impl WorkerSpec {
    pub fn new(name: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: Vec::new(),
            readiness: Readiness::Settle(Duration::ZERO),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_readiness(mut self, readiness: Readiness) -> Self {
        self.readiness = readiness;
        self
    }
}

/// Live worker entry. Only the worker's own exit watcher removes it.
struct WorkerHandle {
    pid: Option<u32>,
    epoch: u64,
    kill: Option<oneshot::Sender<()>>,
    /// Flips to `true` once the watcher has observed the exit
    exited: watch::Receiver<bool>,
}

type WorkerTable = Arc<Mutex<HashMap<String, WorkerHandle>>>;

/// Real process manager implementation
pub struct RealProcessManager {
    /// Workers in start order
    specs: Vec<WorkerSpec>,

    workers: WorkerTable,

    /// Exit notifications for the host loop
    events: Option<mpsc::UnboundedSender<WorkerEvent>>,

    next_epoch: AtomicU64,

    /// Time between SIGTERM and a hard kill
    stop_grace: Duration,

    /// Pause between stop and start on restart
    restart_settle: Duration,

    http: reqwest::Client,
}

impl RealProcessManager {
    pub fn new(specs: Vec<WorkerSpec>) -> Self {
        Self {
            specs,
            workers: Arc::new(Mutex::new(HashMap::new())),
            events: None,
            next_epoch: AtomicU64::new(1),
            stop_grace: Duration::from_secs(3),
            restart_settle: Duration::from_millis(1000),
            http: reqwest::Client::new(),
        }
    }

    /// Configure the exit notification channel (fluent API)
    pub fn with_events(mut self, events: mpsc::UnboundedSender<WorkerEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Configure the SIGTERM grace period (fluent API)
    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    /// Configure the restart settle delay (fluent API)
    pub fn with_restart_settle(mut self, settle: Duration) -> Self {
        self.restart_settle = settle;
        self
    }

    fn spec(&self, name: &str) -> HostResult<&WorkerSpec> {
        self.specs
            .iter()
            .find(|spec| spec.name == name)
            .ok_or_else(|| HostError::UnknownWorker { name: name.to_string() })
    }

    fn build_command(spec: &WorkerSpec) -> Command {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args).kill_on_drop(true);
        if let Some(dir) = &spec.working_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }
        configure_child_stdio(&mut cmd);
        cmd
    }

    /// Signal the worker and hand back its exit signal so the caller can await the exit.
    ///
    /// A worker already being stopped is not signalled again, but its exit
    /// signal is still returned.
    async fn signal_stop(&self, name: &str) -> Option<watch::Receiver<bool>> {
        let mut workers = self.workers.lock().await;
        let handle = workers.get_mut(name)?;

        if let Some(kill) = handle.kill.take() {
            let _ = kill.send(());
            process_info!(Component::Supervisor, "🛑 Stopping {} (PID: {:?})", name, handle.pid);
        }
        Some(handle.exited.clone())
    }

    /// Wait for a signalled worker's watcher to observe the exit
    async fn await_exit(&self, name: &str, mut exited: watch::Receiver<bool>) {
        let limit = self.stop_grace + Duration::from_secs(2);
        // A dropped sender means the watcher is gone, which also counts as exited.
        if tokio::time::timeout(limit, exited.wait_for(|done| *done)).await.is_err() {
            process_warn!(Component::Supervisor, "⚠️ {} did not report exit within {:?}", name, limit);
        }
    }

    async fn probe_http(&self, name: &str, url: &Url, timeout: Duration, interval: Duration) -> HostResult<()> {
        let started = tokio::time::Instant::now();

        loop {
            if !self.status(name).await.running {
                return Err(HostError::WorkerExited { name: name.to_string() });
            }

            match self.http.get(url.clone()).timeout(interval.max(Duration::from_millis(250))).send().await {
                Ok(response) => {
                    process_debug!(
                        Component::Supervisor,
                        "✅ {} answered readiness probe with {}",
                        name,
                        response.status()
                    );
                    return Ok(());
                }
                Err(e) => process_debug!(Component::Supervisor, "⏳ {} not ready yet: {}", name, e),
            }

            if started.elapsed() >= timeout {
                return Err(HostError::DegradedStart {
                    name: name.to_string(),
                    waited: started.elapsed(),
                });
            }
            tokio::time::sleep(interval).await;
        }
    }
}

/// Ask the worker to exit, escalating to a hard kill after `grace`
async fn terminate(child: &mut Child, name: &str, grace: Duration) -> std::io::Result<ExitStatus> {
    if request_exit(child, name) {
        if let Ok(status) = tokio::time::timeout(grace, child.wait()).await {
            return status;
        }
        process_warn!(Component::Supervisor, "⚠️ {} ignored SIGTERM for {:?}, killing", name, grace);
    }

    child.kill().await?;
    child.wait().await
}

#[cfg(unix)]
fn request_exit(child: &Child, name: &str) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return false;
    };

    match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        Ok(()) => true,
        Err(e) => {
            process_debug!(Component::Supervisor, "SIGTERM to {} failed: {}", name, e);
            false
        }
    }
}

#[cfg(not(unix))]
fn request_exit(_child: &Child, _name: &str) -> bool {
    false
}

/// Sole writer that clears a worker's handle
async fn watch_worker(
    name: String,
    epoch: u64,
    mut child: Child,
    mut kill_rx: oneshot::Receiver<()>,
    exited: watch::Sender<bool>,
    grace: Duration,
    workers: WorkerTable,
    events: Option<mpsc::UnboundedSender<WorkerEvent>>,
) {
    let status = tokio::select! {
        status = child.wait() => status,
        _ = &mut kill_rx => terminate(&mut child, &name, grace).await,
    };

    {
        let mut workers = workers.lock().await;
        if workers.get(&name).map(|handle| handle.epoch) == Some(epoch) {
            workers.remove(&name);
        }
    }
    let _ = exited.send(true);

    let code = match status {
        Ok(status) => {
            process_info!(Component::Supervisor, "{} process exited with code {:?}", name, status.code());
            status.code()
        }
        Err(e) => {
            process_warn!(Component::Supervisor, "⚠️ Lost track of {}: {}", name, e);
            None
        }
    };

    if let Some(events) = events {
        let _ = events.send(WorkerEvent::Exited { name, code });
    }
}

#[async_trait]
impl ProcessManager for RealProcessManager {
    fn worker_names(&self) -> Vec<String> {
        self.specs.iter().map(|spec| spec.name.clone()).collect()
    }

    async fn start(&self, name: &str) -> HostResult<StartOutcome> {
        let spec = self.spec(name)?;
        let mut workers = self.workers.lock().await;

        if let Some(handle) = workers.get(name) {
            process_info!(Component::Supervisor, "{} is already running (PID: {:?})", name, handle.pid);
            return Ok(StartOutcome::AlreadyRunning { pid: handle.pid });
        }

        process_info!(Component::Supervisor, "Starting {} service...", name);
        let mut child = Self::build_command(spec).spawn().map_err(|e| HostError::spawn(name, e))?;
        let pid = child.id();
        spawn_output_forwarders(&mut child, name);

        let epoch = self.next_epoch.fetch_add(1, Ordering::Relaxed);
        let (kill_tx, kill_rx) = oneshot::channel();
        let (exited_tx, exited_rx) = watch::channel(false);
        // The watcher blocks on the table lock until the entry below is inserted.
        tokio::spawn(watch_worker(
            name.to_string(),
            epoch,
            child,
            kill_rx,
            exited_tx,
            self.stop_grace,
            Arc::clone(&self.workers),
            self.events.clone(),
        ));

        workers.insert(
            name.to_string(),
            WorkerHandle {
                pid,
                epoch,
                kill: Some(kill_tx),
                exited: exited_rx,
            },
        );

        process_debug!(Component::Supervisor, "🏭 Spawned {} (PID: {:?})", name, pid);
        Ok(StartOutcome::Started { pid })
    }

    async fn wait_ready(&self, name: &str) -> HostResult<()> {
        let readiness = self.spec(name)?.readiness.clone();

        match readiness {
            Readiness::Settle(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            Readiness::Http { url, timeout, interval } => self.probe_http(name, &url, timeout, interval).await,
        }
    }

    async fn stop(&self, name: &str) -> HostResult<()> {
        self.spec(name)?;
        // The watcher finishes the job; the handle stays until the exit is observed.
        let _ = self.signal_stop(name).await;
        Ok(())
    }

    async fn restart(&self, name: &str) -> HostResult<WorkerStatus> {
        self.spec(name)?;

        if let Some(exited) = self.signal_stop(name).await {
            self.await_exit(name, exited).await;
        }
        // Heuristic only: the old process may still hold its port.
        tokio::time::sleep(self.restart_settle).await;

        self.start(name).await?;
        if let Err(e) = self.wait_ready(name).await {
            process_warn!(Component::Supervisor, "⚠️ {} restarted degraded: {}", name, e);
        }

        Ok(self.status(name).await)
    }

    async fn status(&self, name: &str) -> WorkerStatus {
        let workers = self.workers.lock().await;
        match workers.get(name) {
            Some(handle) => WorkerStatus {
                running: true,
                pid: handle.pid,
            },
            None => WorkerStatus::stopped(),
        }
    }

    async fn stop_all(&self) -> HostResult<()> {
        let mut pending = Vec::new();
        for spec in self.specs.iter().rev() {
            if let Some(exited) = self.signal_stop(&spec.name).await {
                pending.push((spec.name.clone(), exited));
            }
        }

        for (name, exited) in pending {
            self.await_exit(&name, exited).await;
        }

        process_debug!(Component::Supervisor, "🛑 All workers stopped");
        Ok(())
    }
}
