//! Overlay window controller
//!
//! Owns the singleton overlay surface and, through the `Open` state, the
//! bridge connection that feeds it. Every transition runs on the host loop.
//!
//! ```text
//! Closed --toggle--> Opening --load-finished--> Open --toggle--> Closed
//!                      |  \--timeout / surface-closed--> Closed
//!                      \--toggle (dropped)
//! ```

use std::time::Duration;
use tokio::time::Instant;

use crate::core::bridge::{BridgeStatus, EventBridge};
use crate::error::HostError;
use crate::traits::{BridgeEvent, BridgeRequest, BridgeTransport, SurfaceHost};
use shared::{process_debug, process_info, process_warn, Component, ContentSource, PushEvent, SurfaceId, SurfaceSpec};

/// Everything needed to build and feed the overlay
#[derive(Debug, Clone)]
pub struct OverlaySettings {
    pub spec: SurfaceSpec,
    pub primary: ContentSource,
    /// Packaged content loaded when the primary source fails
    pub fallback: Option<ContentSource>,
    pub open_timeout: Duration,
    pub bridge: BridgeRequest,
}

#[derive(Debug)]
enum OverlayState {
    Closed,
    Opening {
        surface: SurfaceId,
        fallback_attempted: bool,
        deadline: Instant,
    },
    Open {
        surface: SurfaceId,
        bridge: EventBridge,
    },
}

#[derive(Debug)]
pub enum ToggleOutcome {
    /// A surface was created and is loading
    Opening { surface: SurfaceId },
    /// An open is already in flight; the toggle was dropped
    Ignored,
    Closed,
    Failed(HostError),
}

pub struct OverlayController {
    settings: OverlaySettings,
    state: OverlayState,
}

impl OverlayController {
    pub fn new(settings: OverlaySettings) -> Self {
        Self {
            settings,
            state: OverlayState::Closed,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, OverlayState::Closed)
    }

    pub fn is_opening(&self) -> bool {
        matches!(self.state, OverlayState::Opening { .. })
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, OverlayState::Open { .. })
    }

    /// The surface that may receive pushed events
    pub fn delivery_target(&self) -> Option<SurfaceId> {
        match &self.state {
            OverlayState::Open { surface, .. } => Some(*surface),
            _ => None,
        }
    }

    /// Surface that exists right now, loaded or not
    pub fn surface(&self) -> Option<SurfaceId> {
        match &self.state {
            OverlayState::Closed => None,
            OverlayState::Opening { surface, .. } | OverlayState::Open { surface, .. } => Some(*surface),
        }
    }

    pub fn bridge_status(&self) -> Option<BridgeStatus> {
        match &self.state {
            OverlayState::Open { bridge, .. } => bridge.status(),
            _ => None,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        match &self.state {
            OverlayState::Opening { deadline, .. } => Some(*deadline),
            _ => None,
        }
    }

    pub fn toggle<S>(&mut self, surfaces: &S) -> ToggleOutcome
    where
        S: SurfaceHost + ?Sized,
    {
        match &self.state {
            OverlayState::Closed => self.open(surfaces),
            OverlayState::Opening { surface, .. } => {
                process_debug!(Component::Overlay, "Toggle dropped, {} is still loading", surface);
                ToggleOutcome::Ignored
            }
            OverlayState::Open { .. } => {
                self.close(surfaces);
                ToggleOutcome::Closed
            }
        }
    }

    fn open<S>(&mut self, surfaces: &S) -> ToggleOutcome
    where
        S: SurfaceHost + ?Sized,
    {
        let surface = match surfaces.create(&self.settings.spec) {
            Ok(surface) => surface,
            Err(e) => {
                process_warn!(Component::Overlay, "Failed to create overlay surface: {}", e);
                return ToggleOutcome::Failed(e);
            }
        };
        process_info!(Component::Overlay, "Overlay window created ({})", surface);

        let mut fallback_attempted = false;
        if let Err(e) = surfaces.load(surface, &self.settings.primary) {
            process_warn!(Component::Overlay, "Failed to load {}: {}", self.settings.primary, e);
            fallback_attempted = self.load_fallback(surfaces, surface);
        }

        self.state = OverlayState::Opening {
            surface,
            fallback_attempted,
            deadline: Instant::now() + self.settings.open_timeout,
        };
        ToggleOutcome::Opening { surface }
    }

    /// Returns whether a fallback was attempted
    fn load_fallback<S>(&self, surfaces: &S, surface: SurfaceId) -> bool
    where
        S: SurfaceHost + ?Sized,
    {
        let Some(fallback) = &self.settings.fallback else {
            return false;
        };

        process_info!(Component::Overlay, "Loading packaged overlay from {}", fallback);
        if let Err(e) = surfaces.load(surface, fallback) {
            // A second failure leaves a blank surface.
            process_warn!(Component::Overlay, "Packaged overlay failed too: {}", e);
        }
        true
    }

    /// First render finished; show the surface and start the bridge
    pub fn on_load_finished<S, B>(&mut self, surface: SurfaceId, surfaces: &S, transport: &B) -> bool
    where
        S: SurfaceHost + ?Sized,
        B: BridgeTransport + ?Sized,
    {
        match &self.state {
            OverlayState::Opening { surface: current, .. } if *current == surface => {}
            _ => return false,
        }

        if let Err(e) = surfaces.show(surface) {
            process_warn!(Component::Overlay, "Failed to show {}: {}", surface, e);
        }

        let mut bridge = EventBridge::new();
        bridge.connect(transport, self.settings.bridge.clone());
        self.state = OverlayState::Open { surface, bridge };
        process_info!(Component::Overlay, "Overlay shown ({})", surface);
        true
    }

    /// Asynchronous load failure; falls back once per open
    pub fn on_load_failed<S>(&mut self, surface: SurfaceId, url: Option<&str>, surfaces: &S) -> bool
    where
        S: SurfaceHost + ?Sized,
    {
        let OverlayState::Opening {
            surface: current,
            fallback_attempted,
            ..
        } = &self.state
        else {
            return false;
        };
        if *current != surface || *fallback_attempted {
            return false;
        }
        if let Some(url) = url {
            if !self.settings.primary.matches_url(url) {
                return false;
            }
        }

        let attempted = self.load_fallback(surfaces, surface);
        if let OverlayState::Opening { fallback_attempted, .. } = &mut self.state {
            *fallback_attempted = attempted;
        }
        attempted
    }

    /// The shell closed the surface on its own
    pub fn on_surface_closed(&mut self, surface: SurfaceId) -> bool {
        if self.surface() != Some(surface) {
            return false;
        }
        self.release();
        process_info!(Component::Overlay, "Overlay window closed");
        true
    }

    /// Give up on an open that never rendered
    pub fn check_deadline<S>(&mut self, now: Instant, surfaces: &S) -> bool
    where
        S: SurfaceHost + ?Sized,
    {
        match self.deadline() {
            Some(deadline) if now >= deadline => {
                process_warn!(
                    Component::Overlay,
                    "Overlay did not render within {:?}, closing",
                    self.settings.open_timeout
                );
                self.close(surfaces);
                true
            }
            _ => false,
        }
    }

    /// Tear down the bridge, then destroy the surface
    pub fn close<S>(&mut self, surfaces: &S)
    where
        S: SurfaceHost + ?Sized,
    {
        if let Some(surface) = self.release() {
            surfaces.destroy(surface);
            process_info!(Component::Overlay, "Overlay window closed");
        }
    }

    fn release(&mut self) -> Option<SurfaceId> {
        match std::mem::replace(&mut self.state, OverlayState::Closed) {
            OverlayState::Closed => None,
            OverlayState::Opening { surface, .. } => Some(surface),
            OverlayState::Open { surface, mut bridge } => {
                bridge.teardown();
                Some(surface)
            }
        }
    }

    pub async fn next_bridge_event(&mut self) -> Option<BridgeEvent> {
        match &mut self.state {
            OverlayState::Open { bridge, .. } => bridge.next_event().await,
            _ => None,
        }
    }

    /// Apply a bridge event; content goes to the overlay while it is open
    pub fn on_bridge_event<S>(&mut self, event: BridgeEvent, surfaces: &S) -> bool
    where
        S: SurfaceHost + ?Sized,
    {
        let OverlayState::Open { surface, bridge } = &mut self.state else {
            return false;
        };
        let Some(update) = bridge.observe(event) else {
            return false;
        };

        match surfaces.push(*surface, &PushEvent::OverlaySetContent(update)) {
            Ok(()) => true,
            Err(e) => {
                process_debug!(Component::Overlay, "Dropped overlay content: {}", e);
                false
            }
        }
    }
}
