//! Core types used throughout the companion host

use serde::{Deserialize, Serialize};
use std::fmt;

/// Host component identifier used to tag log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Component {
    /// The event loop that owns everything else
    Host,
    /// Worker process supervision
    Supervisor,
    /// Overlay surface lifecycle
    Overlay,
    /// Remote pub/sub relay into the overlay
    Bridge,
    /// Global click hook
    InputMonitor,
    /// Renderer shell link
    Shell,
}

impl Component {
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Host => "host",
            Component::Supervisor => "supervisor",
            Component::Overlay => "overlay",
            Component::Bridge => "bridge",
            Component::InputMonitor => "input-monitor",
            Component::Shell => "shell",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a renderer surface, allocated by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface-{}", self.0)
    }
}
