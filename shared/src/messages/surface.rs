//! Host ↔ renderer shell wire protocol
//!
//! The host never renders anything itself. It tells a connected renderer
//! shell which surfaces to create and what to load into them, pushes events
//! on named channels, and hears back about load results and closes.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::content::ContentUpdate;
use super::control::{ControlRequest, ControlResponse};
use super::input::MouseHookDebug;
use crate::types::SurfaceId;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum SurfaceRole {
    Main,
    Overlay,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Geometry {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: u32,
    pub height: u32,
    pub min_width: u32,
    pub min_height: u32,
}

/// Everything the shell needs to build a surface
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceSpec {
    pub role: SurfaceRole,
    pub title: String,
    pub geometry: Geometry,
    pub always_on_top: bool,
    pub frameless: bool,
    pub transparent: bool,
    /// Content scripts run in an isolated context
    pub isolated_context: bool,
    /// Content gets direct OS access (never true for hosted views)
    pub os_privileges: bool,
    /// Created hidden, shown after first render
    pub show_on_create: bool,
}

impl SurfaceSpec {
    pub fn main(geometry: Geometry) -> Self {
        Self {
            role: SurfaceRole::Main,
            title: "Companion".to_string(),
            geometry,
            always_on_top: false,
            frameless: false,
            transparent: false,
            isolated_context: true,
            os_privileges: false,
            show_on_create: false,
        }
    }

    pub fn overlay(geometry: Geometry) -> Self {
        Self {
            role: SurfaceRole::Overlay,
            title: "Overlay Screen".to_string(),
            geometry,
            always_on_top: true,
            frameless: true,
            transparent: true,
            isolated_context: true,
            os_privileges: false,
            show_on_create: false,
        }
    }
}

/// Where a surface's view comes from
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", content = "location", rename_all = "kebab-case")]
pub enum ContentSource {
    Url(String),
    File(PathBuf),
}

impl ContentSource {
    /// Whether a failed-load URL reported by the shell belongs to this source
    pub fn matches_url(&self, url: &str) -> bool {
        match self {
            ContentSource::Url(base) => url.starts_with(base.as_str()),
            ContentSource::File(path) => {
                let path = path.to_string_lossy();
                url.ends_with(path.as_ref())
            }
        }
    }
}

impl std::fmt::Display for ContentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentSource::Url(url) => f.write_str(url),
            ContentSource::File(path) => write!(f, "file://{}", path.display()),
        }
    }
}

/// Events pushed from the host to a live surface
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "channel", content = "payload")]
pub enum PushEvent {
    #[serde(rename = "overlay-set-content")]
    OverlaySetContent(ContentUpdate),
    #[serde(rename = "mouse-hook-debug")]
    MouseHookDebug(MouseHookDebug),
    #[serde(rename = "child-process-output")]
    ChildProcessOutput(String),
}

impl PushEvent {
    pub fn channel(&self) -> &'static str {
        match self {
            PushEvent::OverlaySetContent(_) => "overlay-set-content",
            PushEvent::MouseHookDebug(_) => "mouse-hook-debug",
            PushEvent::ChildProcessOutput(_) => "child-process-output",
        }
    }
}

/// Host → shell frames
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ShellCommand {
    CreateSurface { surface: SurfaceId, spec: SurfaceSpec },
    Load { surface: SurfaceId, source: ContentSource },
    Show { surface: SurfaceId },
    Destroy { surface: SurfaceId },
    Push { surface: SurfaceId, event: PushEvent },
    Reply { request_id: u64, response: ControlResponse },
}

/// Shell → host frames
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ShellMessage {
    LoadFinished {
        surface: SurfaceId,
    },
    LoadFailed {
        surface: SurfaceId,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        error_code: Option<i32>,
        #[serde(default)]
        description: Option<String>,
    },
    SurfaceClosed {
        surface: SurfaceId,
    },
    Request {
        request_id: u64,
        request: ControlRequest,
    },
    /// The app was re-activated (dock click) while no window was open
    Activate,
}
