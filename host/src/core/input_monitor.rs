//! Input monitor: global click capture with permission-aware startup

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::HookError;
use crate::traits::InputHook;
use shared::{process_error, process_info, process_warn, ClickEvent, Component};

/// Shown when the OS refuses the hook
pub const ACCESSIBILITY_GUIDANCE: &str =
    "Please enable accessibility permissions in System Preferences > Security & Privacy > Privacy > Accessibility";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorStart {
    Started,
    AlreadyActive,
    PermissionDenied { guidance: String },
    Failed { error: String },
}

pub struct InputMonitor<H: InputHook + ?Sized> {
    hook: Arc<H>,
    sink: mpsc::UnboundedSender<ClickEvent>,
    active: bool,
}

impl<H: InputHook + ?Sized> InputMonitor<H> {
    /// Clicks are delivered into `sink` while the monitor is active
    pub fn new(hook: Arc<H>, sink: mpsc::UnboundedSender<ClickEvent>) -> Self {
        Self {
            hook,
            sink,
            active: false,
        }
    }

    pub async fn start(&mut self) -> MonitorStart {
        if self.active {
            process_info!(Component::InputMonitor, "Mouse hook already active");
            return MonitorStart::AlreadyActive;
        }

        match self.hook.start_clicks(self.sink.clone()).await {
            Ok(()) => {
                self.active = true;
                process_info!(Component::InputMonitor, "🖱️ Mouse hook started");
                MonitorStart::Started
            }
            Err(HookError::PermissionDenied { detail }) => {
                process_error!(Component::InputMonitor, "Failed to start mouse hook: {}", detail);
                process_warn!(Component::InputMonitor, "{}", ACCESSIBILITY_GUIDANCE);
                MonitorStart::PermissionDenied {
                    guidance: ACCESSIBILITY_GUIDANCE.to_string(),
                }
            }
            Err(e) => {
                process_error!(Component::InputMonitor, "Failed to start mouse hook: {}", e);
                MonitorStart::Failed { error: e.to_string() }
            }
        }
    }

    pub fn stop(&mut self) {
        if !self.active {
            process_info!(Component::InputMonitor, "Mouse hook not active");
            return;
        }
        self.hook.stop_clicks();
        self.active = false;
        process_info!(Component::InputMonitor, "Mouse hook stopped");
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}
