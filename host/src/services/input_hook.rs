//! Global input hook built on rdev
//!
//! One `rdev::listen` thread serves both click monitoring and hotkeys. The OS
//! needs accessibility permission for the hook; on macOS a refused event tap
//! shows up as `EventTapError` right after the thread starts.

use async_trait::async_trait;
use rdev::{listen, Event, EventType};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use crate::error::HookError;
use crate::services::hotkey::{Hotkey, Modifiers};
use crate::traits::InputHook;
use shared::{process_debug, process_error, process_info, ClickEvent, Component};

/// Sinks the listener thread delivers into
#[derive(Default)]
struct Routing {
    clicks: Option<mpsc::UnboundedSender<ClickEvent>>,
    hotkeys: Vec<(Hotkey, mpsc::UnboundedSender<Hotkey>)>,
}

pub struct RdevInputHook {
    routing: Arc<Mutex<Routing>>,
    /// Set once a listener thread survived its startup window
    listening: tokio::sync::Mutex<bool>,
    /// How long a fresh listener gets to report an install failure
    startup_window: Duration,
}

impl RdevInputHook {
    pub fn new() -> Self {
        Self {
            routing: Arc::new(Mutex::new(Routing::default())),
            listening: tokio::sync::Mutex::new(false),
            startup_window: Duration::from_millis(250),
        }
    }

    /// Start the listener thread unless one is already running.
    ///
    /// Failures are not remembered, so a later call tries again once the user
    /// has granted permission.
    async fn ensure_listener(&self) -> Result<(), HookError> {
        let mut listening = self.listening.lock().await;
        if *listening {
            return Ok(());
        }

        let (failed_tx, failed_rx) = oneshot::channel();
        let routing = Arc::clone(&self.routing);

        std::thread::Builder::new()
            .name("input-hook".to_string())
            .spawn(move || {
                let callback = route_events(routing);
                // Blocks for the life of the process unless the hook fails.
                if let Err(e) = listen(callback) {
                    let _ = failed_tx.send(format!("{e:?}"));
                }
            })
            .map_err(|e| HookError::Unavailable { detail: e.to_string() })?;

        await_install(failed_rx, self.startup_window).await?;
        *listening = true;
        process_debug!(Component::InputMonitor, "Global input hook installed");
        Ok(())
    }
}

/// Wait out a fresh listener's startup window without holding up the runtime.
///
/// The listener thread only reports when `listen` fails; silence for the whole
/// window means the hook is installed.
async fn await_install(failed: oneshot::Receiver<String>, window: Duration) -> Result<(), HookError> {
    match tokio::time::timeout(window, failed).await {
        Err(_) => Ok(()),
        Ok(Ok(detail)) => Err(classify(detail)),
        Ok(Err(_)) => Err(HookError::Unavailable {
            detail: "input listener exited".to_string(),
        }),
    }
}

impl Default for RdevInputHook {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn classify(detail: String) -> HookError {
    if detail.contains("EventTap") || detail.to_lowercase().contains("permission") {
        HookError::PermissionDenied { detail }
    } else {
        HookError::Unavailable { detail }
    }
}

/// Build the listener callback: tracks the cursor and modifiers, emits clicks and hotkeys
fn route_events(routing: Arc<Mutex<Routing>>) -> impl FnMut(Event) + 'static {
    let mut cursor = (0.0_f64, 0.0_f64);
    let mut modifiers = Modifiers::default();

    move |event: Event| {
        if modifiers.update(&event.event_type) {
            return;
        }

        match event.event_type {
            EventType::MouseMove { x, y } => cursor = (x, y),
            EventType::ButtonPress(_) => {
                let routing = lock(&routing);
                if let Some(clicks) = routing.clicks.as_ref() {
                    let _ = clicks.send(ClickEvent::now(cursor.0, cursor.1));
                }
            }
            EventType::KeyPress(key) => {
                let routing = lock(&routing);
                for (hotkey, sink) in routing.hotkeys.iter() {
                    if hotkey.matches(key, &modifiers) {
                        let _ = sink.send(*hotkey);
                    }
                }
            }
            _ => {}
        }
    }
}

#[async_trait]
impl InputHook for RdevInputHook {
    async fn start_clicks(&self, sink: mpsc::UnboundedSender<ClickEvent>) -> Result<(), HookError> {
        if let Err(e) = self.ensure_listener().await {
            process_error!(Component::InputMonitor, "Failed to start mouse hook: {}", e);
            return Err(e);
        }
        lock(&self.routing).clicks = Some(sink);
        Ok(())
    }

    fn stop_clicks(&self) {
        // rdev has no clean stop; the thread stays and clicks are just not routed.
        lock(&self.routing).clicks = None;
    }

    async fn register_hotkey(&self, hotkey: Hotkey, sink: mpsc::UnboundedSender<Hotkey>) -> Result<(), HookError> {
        self.ensure_listener().await?;
        let mut routing = lock(&self.routing);
        routing.hotkeys.retain(|(existing, _)| *existing != hotkey);
        routing.hotkeys.push((hotkey, sink));
        process_info!(Component::Overlay, "Global hotkey '{}' registered", hotkey);
        Ok(())
    }

    fn unregister_hotkeys(&self) {
        lock(&self.routing).hotkeys.clear();
    }
}
