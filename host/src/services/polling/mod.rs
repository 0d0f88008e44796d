//! Long-polling pub/sub client for the backend's real-time channel
//!
//! Speaks Engine.IO v4 / Socket.IO v5 over plain HTTP requests, which gets
//! through proxies that break upgraded sockets. One background task owns a
//! session at a time and reconnects according to the request's policy.

pub mod packet;

use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use url::Url;

use crate::error::{HostError, HostResult};
use crate::traits::{BridgeEvent, BridgeLink, BridgeRequest, BridgeTransport};
use packet::{decode_payload, encode_payload, EnginePacket, Handshake, SocketPacket};
use shared::{process_debug, process_info, process_warn, Component};

/// Ack id used for the room join; it is the only acknowledged emit per session
const JOIN_ACK_ID: u64 = 0;

pub struct PollingTransport {
    client: reqwest::Client,
    handshake_timeout: Duration,
}

impl PollingTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            handshake_timeout: Duration::from_secs(10),
        }
    }

    /// Configure the connect timeout (fluent API)
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }
}

impl Default for PollingTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeTransport for PollingTransport {
    fn open(&self, request: &BridgeRequest) -> BridgeLink {
        let (events_tx, events_rx) = mpsc::channel(64);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(run_bridge(
            self.client.clone(),
            request.clone(),
            self.handshake_timeout,
            events_tx,
            shutdown_rx,
        ));

        BridgeLink::new(events_rx, shutdown_tx)
    }
}

/// How a single session ended
#[derive(Debug)]
enum SessionEnd {
    Shutdown,
    ReceiverGone,
    Lost { reason: String, established: bool },
}

/// Session loop with bounded reconnection.
///
/// The attempt counter resets whenever a session got as far as the namespace
/// connect, so only consecutive failures count toward giving up.
async fn run_bridge(
    client: reqwest::Client,
    request: BridgeRequest,
    handshake_timeout: Duration,
    events: mpsc::Sender<BridgeEvent>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut attempts = 0u32;

    loop {
        let mut session = Session::new(client.clone(), request.endpoint.clone());
        let end = session.run(&request.room, handshake_timeout, &events, &mut shutdown).await;

        let (reason, established) = match end {
            SessionEnd::Shutdown | SessionEnd::ReceiverGone => return,
            SessionEnd::Lost { reason, established } => (reason, established),
        };

        let event = if established {
            attempts = 0;
            BridgeEvent::Disconnected { reason }
        } else {
            BridgeEvent::ConnectError(reason)
        };
        if events.send(event).await.is_err() {
            return;
        }

        if attempts >= request.policy.max_attempts {
            process_warn!(Component::Bridge, "Giving up on {} after {} reconnection attempts", request.endpoint, attempts);
            let _ = events.send(BridgeEvent::GaveUp { attempts }).await;
            return;
        }
        attempts += 1;

        tokio::select! {
            _ = &mut shutdown => return,
            _ = tokio::time::sleep(request.policy.delay) => {}
        }
        process_debug!(Component::Bridge, "Reconnection attempt {}/{}", attempts, request.policy.max_attempts);
    }
}

fn session_url(base: &Url, sid: Option<&str>) -> Url {
    let mut url = base.clone();
    url.set_path("/socket.io/");
    url.set_fragment(None);
    {
        let mut query = url.query_pairs_mut();
        query.clear();
        query.append_pair("EIO", "4");
        query.append_pair("transport", "polling");
        if let Some(sid) = sid {
            query.append_pair("sid", sid);
        }
    }
    url
}

struct Session {
    client: reqwest::Client,
    endpoint: Url,
    sid: Option<String>,
    established: bool,
}

impl Session {
    fn new(client: reqwest::Client, endpoint: Url) -> Self {
        Self {
            client,
            endpoint,
            sid: None,
            established: false,
        }
    }

    fn lost(&self, reason: impl std::fmt::Display) -> SessionEnd {
        SessionEnd::Lost {
            reason: reason.to_string(),
            established: self.established,
        }
    }

    async fn run(
        &mut self,
        room: &str,
        handshake_timeout: Duration,
        events: &mpsc::Sender<BridgeEvent>,
        shutdown: &mut oneshot::Receiver<()>,
    ) -> SessionEnd {
        let handshake = tokio::select! {
            _ = &mut *shutdown => return SessionEnd::Shutdown,
            result = self.handshake(handshake_timeout) => match result {
                Ok(handshake) => handshake,
                Err(e) => return self.lost(e),
            },
        };
        self.sid = Some(handshake.sid.clone());

        let connect = match SocketPacket::Connect(None).into_engine() {
            Ok(packet) => packet,
            Err(e) => return self.lost(e),
        };
        if let Err(e) = self.post(&[connect]).await {
            return self.lost(e);
        }

        let poll_timeout = Duration::from_millis(handshake.ping_interval + handshake.ping_timeout);

        loop {
            let packets = tokio::select! {
                _ = &mut *shutdown => {
                    self.close().await;
                    return SessionEnd::Shutdown;
                }
                result = self.poll(poll_timeout) => match result {
                    Ok(packets) => packets,
                    Err(e) => return self.lost(e),
                },
            };

            for packet in packets {
                match self.handle(packet, room).await {
                    Ok(Some(event)) => {
                        if events.send(event).await.is_err() {
                            self.close().await;
                            return SessionEnd::ReceiverGone;
                        }
                    }
                    Ok(None) => {}
                    Err(end) => return end,
                }
            }
        }
    }

    async fn handshake(&self, timeout: Duration) -> HostResult<Handshake> {
        let body = self
            .client
            .get(session_url(&self.endpoint, None))
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        match decode_payload(&body).into_iter().next() {
            Some(EnginePacket::Open(handshake)) => Ok(handshake),
            other => Err(HostError::transport(format!("expected open packet, got {other:?}"))),
        }
    }

    async fn poll(&self, timeout: Duration) -> HostResult<Vec<EnginePacket>> {
        let body = self
            .client
            .get(session_url(&self.endpoint, self.sid.as_deref()))
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(decode_payload(&body))
    }

    async fn post(&self, packets: &[EnginePacket]) -> HostResult<()> {
        self.client
            .post(session_url(&self.endpoint, self.sid.as_deref()))
            .header(CONTENT_TYPE, "text/plain;charset=UTF-8")
            .timeout(Duration::from_secs(10))
            .body(encode_payload(packets))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Best-effort namespace disconnect followed by engine close
    async fn close(&self) {
        let mut packets = Vec::new();
        if self.established {
            if let Ok(disconnect) = SocketPacket::Disconnect.into_engine() {
                packets.push(disconnect);
            }
        }
        packets.push(EnginePacket::Close);

        if let Err(e) = self.post(&packets).await {
            process_debug!(Component::Bridge, "Close not delivered: {}", e);
        }
    }

    async fn handle(&mut self, packet: EnginePacket, room: &str) -> Result<Option<BridgeEvent>, SessionEnd> {
        match packet {
            EnginePacket::Ping => {
                self.post(&[EnginePacket::Pong]).await.map_err(|e| self.lost(e))?;
                Ok(None)
            }
            EnginePacket::Close => Err(self.lost("transport close")),
            EnginePacket::Message(text) => match SocketPacket::decode(&text) {
                Ok(packet) => self.handle_socket(packet, room).await,
                Err(e) => {
                    process_warn!(Component::Bridge, "Skipping socket packet: {}", e);
                    Ok(None)
                }
            },
            EnginePacket::Open(_) | EnginePacket::Pong | EnginePacket::Upgrade | EnginePacket::Noop => Ok(None),
        }
    }

    async fn handle_socket(&mut self, packet: SocketPacket, room: &str) -> Result<Option<BridgeEvent>, SessionEnd> {
        match packet {
            SocketPacket::Connect(data) => {
                self.established = true;
                let sid = data
                    .as_ref()
                    .and_then(|d| d.get("sid"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .or_else(|| self.sid.clone())
                    .unwrap_or_default();
                process_info!(Component::Bridge, "Overlay bridge connected: {}", sid);

                let join = SocketPacket::event("join_user_room", Some(JOIN_ACK_ID), vec![json!({ "user_id": room })])
                    .into_engine()
                    .map_err(|e| self.lost(e))?;
                self.post(&[join]).await.map_err(|e| self.lost(e))?;

                Ok(Some(BridgeEvent::Connected { sid }))
            }
            SocketPacket::Ack { id, args } if id == JOIN_ACK_ID => {
                Ok(Some(BridgeEvent::RoomJoined(args.into_iter().next().unwrap_or(Value::Null))))
            }
            SocketPacket::Ack { id, .. } => {
                process_debug!(Component::Bridge, "Ignoring ack for unknown id {}", id);
                Ok(None)
            }
            SocketPacket::Event { name, args, .. } => {
                let payload = args.into_iter().next().unwrap_or(Value::Null);
                match name.as_str() {
                    "popup_message" => Ok(Some(BridgeEvent::Content(payload))),
                    "status" => Ok(Some(BridgeEvent::Status(payload))),
                    other => {
                        process_debug!(Component::Bridge, "Ignoring event '{}'", other);
                        Ok(None)
                    }
                }
            }
            SocketPacket::Disconnect => Err(self.lost("io server disconnect")),
            SocketPacket::ConnectError(data) => {
                let message = data.get("message").and_then(Value::as_str).map(str::to_string);
                Err(SessionEnd::Lost {
                    reason: message.unwrap_or_else(|| data.to_string()),
                    established: false,
                })
            }
        }
    }
}
