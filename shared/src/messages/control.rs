//! Request/response operations the primary UI can invoke on the host

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum ControlRequest {
    GetBackendStatus,
    RestartBackend,
    TriggerOverlay,
    TakeScreenshot,
    StartMouseMonitoring,
    StopMouseMonitoring,
    GetMouseHookStatus,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OverlayAction {
    Opened,
    Closed,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BackendStatus {
    #[serde(rename = "isRunning")]
    pub is_running: bool,
    pub pid: Option<u32>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OverlayToggle {
    pub success: bool,
    pub pid: Option<u32>,
    pub action: OverlayAction,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayBounds {
    pub width: u32,
    pub height: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ScreenshotData {
    pub success: bool,
    /// Base64-encoded PNG
    pub data: String,
    /// Size in bytes of the PNG before encoding
    pub size: usize,
    pub display: DisplayBounds,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct MonitoringState {
    pub success: bool,
    pub active: bool,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct HookStatus {
    pub active: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Failure {
    pub success: bool,
    pub error: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RestartOutcome {
    pub success: bool,
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response to a [`ControlRequest`]; serialized without a tag so the UI sees
/// plain result objects.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum ControlResponse {
    Screenshot(ScreenshotData),
    Overlay(OverlayToggle),
    BackendStatus(BackendStatus),
    Monitoring(MonitoringState),
    Failure(Failure),
    Restart(RestartOutcome),
    HookStatus(HookStatus),
}

impl ControlResponse {
    pub fn failure(error: impl std::fmt::Display) -> Self {
        ControlResponse::Failure(Failure {
            success: false,
            error: error.to_string(),
        })
    }

    pub fn is_success(&self) -> bool {
        match self {
            ControlResponse::Screenshot(s) => s.success,
            ControlResponse::Overlay(o) => o.success,
            ControlResponse::Monitoring(m) => m.success,
            ControlResponse::Restart(r) => r.success,
            ControlResponse::Failure(_) => false,
            ControlResponse::BackendStatus(_) | ControlResponse::HookStatus(_) => true,
        }
    }
}
