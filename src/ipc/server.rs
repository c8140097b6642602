//! Unix domain socket server for IPC
//!
//! Provides request-response communication and pushes voice events to
//! subscribed clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::commands::lookup;
use crate::control::{CommandInfo, ControlAction, ControlStatus, Input};
use crate::events::VoiceEvent;

use super::protocol::{DaemonStatus, Push, Request, Response, MAX_FRAME_LEN};

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    ctx: ClientContext,
    shutdown_tx: broadcast::Sender<()>,
}

/// Shared server state
struct ServerState {
    status: DaemonStatus,
    start_time: Instant,
}

/// Everything a client handler needs
#[derive(Clone)]
struct ClientContext {
    state: Arc<RwLock<ServerState>>,
    /// Control actions for the voice navigator
    input_tx: mpsc::UnboundedSender<Input>,
    /// Voice events for subscribed clients
    event_tx: broadcast::Sender<VoiceEvent>,
}

type SharedWriter = Arc<Mutex<OwnedWriteHalf>>;

impl Server {
    /// Create a new IPC server
    pub fn new(
        socket_path: &Path,
        initial: ControlStatus,
        input_tx: mpsc::UnboundedSender<Input>,
        event_tx: broadcast::Sender<VoiceEvent>,
    ) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        let state = Arc::new(RwLock::new(ServerState {
            status: DaemonStatus::new(initial),
            start_time: Instant::now(),
        }));

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            ctx: ClientContext {
                state,
                input_tx,
                event_tx,
            },
            shutdown_tx,
        })
    }

    /// Fold a voice event into the served status
    pub async fn apply_event(&self, event: &VoiceEvent) {
        let mut server_state = self.ctx.state.write().await;
        let old_state = server_state.status.control.state;
        server_state.status.apply(event);
        let new_state = server_state.status.control.state;

        if old_state != new_state {
            info!(from = %old_state, to = %new_state, "IPC server: session state updated");
        }
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let ctx = self.ctx.clone();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, ctx) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(stream: UnixStream, ctx: ClientContext) -> Result<()> {
        let (mut reader, writer) = stream.into_split();
        let writer: SharedWriter = Arc::new(Mutex::new(writer));
        let mut forwarder = None;

        let result = Self::serve_requests(&mut reader, &writer, &ctx, &mut forwarder).await;

        if let Some(handle) = forwarder {
            handle.abort();
        }
        result
    }

    /// Answer requests until the client disconnects
    async fn serve_requests<R: AsyncRead + Unpin>(
        reader: &mut R,
        writer: &SharedWriter,
        ctx: &ClientContext,
        forwarder: &mut Option<JoinHandle<()>>,
    ) -> Result<()> {
        while let Some(msg_buf) = read_frame(reader).await? {
            let request: Request = match serde_json::from_slice(&msg_buf) {
                Ok(request) => request,
                Err(e) => {
                    warn!(?e, "failed to parse request");
                    let response = Response::Error {
                        code: "bad_request".to_string(),
                        message: e.to_string(),
                    };
                    send_message(&mut *writer.lock().await, &response).await?;
                    continue;
                }
            };

            debug!(?request, "received request");

            let (response, subscribe) = Self::process_request(request, ctx).await;

            // Subscribe before confirming so no event slips between the two
            let events = (subscribe && forwarder.is_none()).then(|| ctx.event_tx.subscribe());

            send_message(&mut *writer.lock().await, &response).await?;

            if let Some(events) = events {
                debug!("client subscribed to voice events");
                *forwarder = Some(tokio::spawn(forward_events(events, Arc::clone(writer))));
            }
        }

        debug!("client disconnected");
        Ok(())
    }

    /// Process a request and return a response
    /// Returns (Response, should_subscribe)
    async fn process_request(request: Request, ctx: &ClientContext) -> (Response, bool) {
        match request {
            Request::Ping => (Response::Pong, false),

            Request::GetStatus => {
                let mut state = ctx.state.write().await;
                state.status.uptime_secs = state.start_time.elapsed().as_secs();
                (Response::Status(state.status.clone()), false)
            }

            Request::ToggleListening => (Self::queue_action(ControlAction::ToggleListening, ctx), false),

            Request::ToggleMute => (Self::queue_action(ControlAction::ToggleMute, ctx), false),

            Request::ListCommands => {
                let commands = lookup().iter().map(CommandInfo::from).collect();
                (Response::Commands { commands }, false)
            }

            Request::Subscribe => (Response::Subscribed, true),
        }
    }

    /// Hand a user action to the voice navigator
    fn queue_action(action: ControlAction, ctx: &ClientContext) -> Response {
        match ctx.input_tx.send(Input::Control(action)) {
            Ok(()) => Response::Accepted { action },
            Err(_) => Response::Error {
                code: "unavailable".to_string(),
                message: "voice navigator is not running".to_string(),
            },
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

/// Push voice events to a subscribed client until it goes away
async fn forward_events(mut events: broadcast::Receiver<VoiceEvent>, writer: SharedWriter) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let push = Push::Event { event };
                if let Err(e) = send_message(&mut *writer.lock().await, &push).await {
                    debug!(?e, "stopping event push");
                    return;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(skipped = n, "subscriber lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

/// Read one length-prefixed frame; `None` on clean disconnect or oversize frame
async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    // Read message length (4-byte little-endian)
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        warn!(len, "message too large, disconnecting");
        return Ok(None);
    }

    let mut msg_buf = vec![0u8; len];
    reader.read_exact(&mut msg_buf).await?;
    Ok(Some(msg_buf))
}

/// Send a length-prefixed JSON message
async fn send_message<W, T>(writer: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let msg_bytes = serde_json::to_vec(msg)?;
    let msg_len = (msg_bytes.len() as u32).to_le_bytes();

    writer.write_all(&msg_len).await?;
    writer.write_all(&msg_bytes).await?;

    Ok(())
}
