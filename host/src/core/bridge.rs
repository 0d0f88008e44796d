//! Event bridge: relays the backend's pub/sub channel into overlay content

use crate::traits::{BridgeEvent, BridgeLink, BridgeRequest, BridgeTransport};
use shared::{process_debug, process_info, process_warn, Component, ContentUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeStatus {
    Connecting,
    Connected,
    /// Lost the session; the transport is reconnecting
    Reconnecting,
    /// Reconnection attempts exhausted
    GaveUp,
}

/// The single live connection
#[derive(Debug)]
pub struct BridgeConnection {
    pub request: BridgeRequest,
    pub status: BridgeStatus,
    link: BridgeLink,
}

/// Holds at most one [`BridgeConnection`]
#[derive(Debug, Default)]
pub struct EventBridge {
    connection: Option<BridgeConnection>,
}

impl EventBridge {
    pub fn new() -> Self {
        Self { connection: None }
    }

    /// Open a connection unless a usable one already exists.
    ///
    /// Returns `false` when the call was a no-op.
    pub fn connect<B>(&mut self, transport: &B, request: BridgeRequest) -> bool
    where
        B: BridgeTransport + ?Sized,
    {
        if let Some(connection) = &self.connection {
            if connection.status != BridgeStatus::GaveUp {
                process_debug!(Component::Bridge, "Bridge already {:?}, not reconnecting", connection.status);
                return false;
            }
        }
        self.teardown();

        process_info!(
            Component::Bridge,
            "Connecting overlay bridge to {} (room {})",
            request.endpoint,
            request.room
        );
        let link = transport.open(&request);
        self.connection = Some(BridgeConnection {
            request,
            status: BridgeStatus::Connecting,
            link,
        });
        true
    }

    pub fn status(&self) -> Option<BridgeStatus> {
        self.connection.as_ref().map(|connection| connection.status)
    }

    pub fn is_active(&self) -> bool {
        self.connection.is_some()
    }

    /// Next transport event; `None` when there is no connection or it ended
    pub async fn next_event(&mut self) -> Option<BridgeEvent> {
        match self.connection.as_mut() {
            Some(connection) => connection.link.recv().await,
            None => None,
        }
    }

    /// Fold a transport event into the connection status; content comes back normalized
    pub fn observe(&mut self, event: BridgeEvent) -> Option<ContentUpdate> {
        let connection = self.connection.as_mut()?;

        match event {
            BridgeEvent::Connected { sid } => {
                connection.status = BridgeStatus::Connected;
                process_info!(Component::Bridge, "Overlay bridge connected: {}", sid);
                None
            }
            BridgeEvent::RoomJoined(ack) => {
                process_info!(Component::Bridge, "Overlay bridge joined room: {}", ack);
                None
            }
            BridgeEvent::Content(payload) => {
                let update = ContentUpdate::from_payload(payload);
                process_debug!(Component::Bridge, "Forwarding content '{}'", update.header);
                Some(update)
            }
            BridgeEvent::Status(payload) => {
                process_debug!(Component::Bridge, "Backend status: {}", payload);
                None
            }
            BridgeEvent::Disconnected { reason } => {
                connection.status = BridgeStatus::Reconnecting;
                process_warn!(Component::Bridge, "Overlay bridge disconnected: {}", reason);
                None
            }
            BridgeEvent::ConnectError(message) => {
                process_warn!(Component::Bridge, "Overlay bridge connect error: {}", message);
                None
            }
            BridgeEvent::GaveUp { attempts } => {
                connection.status = BridgeStatus::GaveUp;
                process_warn!(
                    Component::Bridge,
                    "Overlay bridge gave up after {} reconnection attempts",
                    attempts
                );
                None
            }
        }
    }

    /// Detach listeners, then disconnect. Nothing is observable afterwards.
    pub fn teardown(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.link.close();
            process_debug!(Component::Bridge, "Overlay bridge torn down ({})", connection.request.endpoint);
        }
    }
}
