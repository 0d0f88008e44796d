//! Local WebSocket link to the renderer shell
//!
//! The shell is the only process that draws anything. It connects to
//! `ws://<addr>/shell`, receives [`ShellCommand`]s and answers with
//! [`ShellMessage`]s. Exactly one shell is served at a time; commands issued
//! before it connects wait in the outbound queue.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::error::{HostError, HostResult};
use crate::traits::{ShellEvent, SurfaceHost};
use shared::{
    process_debug, process_error, process_info, process_warn, Component, ContentSource, ControlResponse, PushEvent,
    ShellCommand, ShellMessage, SurfaceId, SurfaceSpec,
};

/// State shared by the connection handlers
struct LinkState {
    /// Parked while no shell is connected; taken by the active connection
    outbound: Mutex<Option<mpsc::UnboundedReceiver<ShellCommand>>>,
    commands: mpsc::UnboundedSender<ShellCommand>,
    events: mpsc::UnboundedSender<ShellEvent>,
}

pub struct ShellLink {
    listener: TcpListener,
    state: Arc<LinkState>,
}

impl ShellLink {
    /// Bind the endpoint and hand back the surface host plus the inbound event stream
    pub async fn bind(addr: SocketAddr) -> HostResult<(Self, ShellSurfaceHost, mpsc::UnboundedReceiver<ShellEvent>)> {
        let listener = TcpListener::bind(addr).await?;
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let state = Arc::new(LinkState {
            outbound: Mutex::new(Some(commands_rx)),
            commands: commands_tx.clone(),
            events: events_tx,
        });

        let surfaces = ShellSurfaceHost::new(commands_tx);
        Ok((Self { listener, state }, surfaces, events_rx))
    }

    pub fn local_addr(&self) -> HostResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve the endpoint in the background
    pub fn spawn(self) -> JoinHandle<()> {
        let router = Router::new()
            .route("/shell", get(shell_handler))
            .with_state(Arc::clone(&self.state));

        tokio::spawn(async move {
            if let Ok(addr) = self.listener.local_addr() {
                process_info!(Component::Shell, "🔌 Waiting for renderer shell on ws://{}/shell", addr);
            }
            if let Err(e) = axum::serve(self.listener, router).await {
                process_error!(Component::Shell, "Shell link server failed: {}", e);
            }
        })
    }
}

async fn shell_handler(ws: WebSocketUpgrade, State(state): State<Arc<LinkState>>) -> Response {
    ws.on_upgrade(move |socket| handle_shell(socket, state))
}

async fn handle_shell(socket: WebSocket, state: Arc<LinkState>) {
    let outbound = state.outbound.lock().await.take();
    let Some(mut outbound) = outbound else {
        process_warn!(Component::Shell, "Refusing second renderer shell connection");
        let _ = socket.close().await;
        return;
    };
    process_info!(Component::Shell, "🔗 Renderer shell connected");

    let (mut sender, mut receiver) = socket.split();
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

    let outgoing = tokio::spawn(async move {
        loop {
            let command = tokio::select! {
                _ = &mut stop_rx => break,
                command = outbound.recv() => match command {
                    Some(command) => command,
                    None => break,
                },
            };

            let text = match serde_json::to_string(&command) {
                Ok(text) => text,
                Err(e) => {
                    process_error!(Component::Shell, "Failed to serialize shell command: {}", e);
                    continue;
                }
            };
            if let Err(e) = sender.send(Message::Text(text)).await {
                process_warn!(Component::Shell, "Failed to send to renderer shell: {}", e);
                break;
            }
        }
        outbound
    });

    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                process_warn!(Component::Shell, "Renderer shell socket error: {}", e);
                break;
            }
        };

        match msg {
            Message::Text(text) => match serde_json::from_str::<ShellMessage>(&text) {
                Ok(message) => dispatch(message, &state),
                Err(e) => process_warn!(Component::Shell, "Unparseable shell message: {}", e),
            },
            Message::Close(_) => break,
            Message::Binary(_) => process_debug!(Component::Shell, "Ignoring binary frame from shell"),
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    let _ = stop_tx.send(());
    if let Ok(mut outbound) = outgoing.await {
        // Whatever is queued was meant for surfaces that died with the shell.
        while outbound.try_recv().is_ok() {}
        *state.outbound.lock().await = Some(outbound);
    }

    process_info!(Component::Shell, "👋 Renderer shell disconnected");
    let _ = state.events.send(ShellEvent::Disconnected);
}

fn dispatch(message: ShellMessage, state: &Arc<LinkState>) {
    let event = match message {
        ShellMessage::LoadFinished { surface } => ShellEvent::LoadFinished { surface },
        ShellMessage::LoadFailed {
            surface,
            url,
            error_code,
            description,
        } => {
            process_debug!(
                Component::Shell,
                "{} failed to load {:?} ({:?}: {:?})",
                surface,
                url,
                error_code,
                description
            );
            ShellEvent::LoadFailed { surface, url }
        }
        ShellMessage::SurfaceClosed { surface } => ShellEvent::SurfaceClosed { surface },
        ShellMessage::Activate => ShellEvent::Activated,
        ShellMessage::Request { request_id, request } => {
            let (reply_tx, reply_rx) = oneshot::channel();
            let commands = state.commands.clone();
            tokio::spawn(async move {
                let response = reply_rx
                    .await
                    .unwrap_or_else(|_| ControlResponse::failure("request was dropped"));
                let _ = commands.send(ShellCommand::Reply { request_id, response });
            });
            ShellEvent::Control {
                request,
                reply: reply_tx,
            }
        }
    };

    let _ = state.events.send(event);
}

/// [`SurfaceHost`] that forwards everything to the connected shell
pub struct ShellSurfaceHost {
    commands: mpsc::UnboundedSender<ShellCommand>,
    next_id: AtomicU64,
}

impl ShellSurfaceHost {
    fn new(commands: mpsc::UnboundedSender<ShellCommand>) -> Self {
        Self {
            commands,
            next_id: AtomicU64::new(1),
        }
    }

    fn send(&self, command: ShellCommand) -> HostResult<()> {
        self.commands
            .send(command)
            .map_err(|_| HostError::shell("shell link is gone"))
    }
}

impl SurfaceHost for ShellSurfaceHost {
    fn create(&self, spec: &SurfaceSpec) -> HostResult<SurfaceId> {
        let surface = SurfaceId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.send(ShellCommand::CreateSurface {
            surface,
            spec: spec.clone(),
        })?;
        Ok(surface)
    }

    fn load(&self, surface: SurfaceId, source: &ContentSource) -> HostResult<()> {
        if let ContentSource::File(path) = source {
            if !path.exists() {
                return Err(HostError::ContentUnavailable {
                    source_desc: source.to_string(),
                });
            }
        }
        self.send(ShellCommand::Load {
            surface,
            source: source.clone(),
        })
    }

    fn show(&self, surface: SurfaceId) -> HostResult<()> {
        self.send(ShellCommand::Show { surface })
    }

    fn destroy(&self, surface: SurfaceId) {
        let _ = self.send(ShellCommand::Destroy { surface });
    }

    fn push(&self, surface: SurfaceId, event: &PushEvent) -> HostResult<()> {
        self.send(ShellCommand::Push {
            surface,
            event: event.clone(),
        })
    }
}
