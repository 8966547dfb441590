//! TCP server for the frame adapter
//!
//! Handles incoming connections and manages client lifecycle.
//! Uses tokio for async networking; the synchronous driver loop talks to it
//! only through channels (see [`crate::runtime`]).
//!
//! Each client has a bounded outbound queue. Frames for a client whose queue
//! is full are dropped, so a client that stops reading never holds more than
//! [`CLIENT_QUEUE_LINES`] lines.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{debug, info, warn};

use crate::protocol::*;
use crate::runtime::{InboundEvent, OutboundMessage};
use crate::types::RenderMode;

pub const ENV_HOST: &str = "SHOCK_FACTOR_HOST";
pub const ENV_PORT: &str = "SHOCK_FACTOR_PORT";
pub const ENV_MAX_PENDING: &str = "SHOCK_FACTOR_MAX_PENDING";
pub const ENV_DISABLED: &str = "SHOCK_FACTOR_ADAPTER_DISABLED";

/// Longest accepted inbound line, in bytes (newline excluded).
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Outbound lines buffered per client before frames are dropped.
pub const CLIENT_QUEUE_LINES: usize = 32;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub protocol_version: String,
    pub max_pending_events: usize,
    /// Set by `SHOCK_FACTOR_ADAPTER_DISABLED=1|true`.
    pub disabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7878,
            protocol_version: PROTOCOL_VERSION.to_string(),
            max_pending_events: 16,
            disabled: false,
        }
    }
}

impl ServerConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let host = lookup(ENV_HOST)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.host);
        let port = parse_or(ENV_PORT, lookup(ENV_PORT), defaults.port);
        let max_pending_events =
            parse_or(ENV_MAX_PENDING, lookup(ENV_MAX_PENDING), defaults.max_pending_events);
        let disabled = lookup(ENV_DISABLED)
            .map(|v| {
                let v = v.trim();
                v == "1" || v.eq_ignore_ascii_case("true")
            })
            .unwrap_or(defaults.disabled);

        Self {
            host,
            port,
            protocol_version: defaults.protocol_version,
            max_pending_events,
            disabled,
        }
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid adapter address {}:{}", self.host, self.port))
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    match raw.as_deref().map(str::trim) {
        None | Some("") => default,
        Some(v) => v.parse().unwrap_or_else(|_| {
            warn!(key, value = v, "invalid value, using default");
            default
        }),
    }
}

/// Handle to a connected client
struct ClientHandle {
    id: u64,
    stream_frames: bool,
    handshaken: bool,
    last_seq: Option<u64>,
    tx: mpsc::Sender<String>,
}

/// Shared server state
pub struct ServerState {
    config: ServerConfig,
    clients: RwLock<Vec<ClientHandle>>,
    connected: AtomicUsize,
    dropped_frames: AtomicU64,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            clients: RwLock::new(Vec::new()),
            connected: AtomicUsize::new(0),
            dropped_frames: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Currently connected clients (handshaken or not).
    pub fn client_count(&self) -> usize {
        self.connected.load(Ordering::Relaxed)
    }

    /// Frames not delivered because a client's queue was full.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }

    async fn register(&self, client_id: u64, tx: mpsc::Sender<String>) {
        self.clients.write().await.push(ClientHandle {
            id: client_id,
            stream_frames: false,
            handshaken: false,
            last_seq: None,
            tx,
        });
    }

    async fn is_handshaken(&self, client_id: u64) -> bool {
        let clients = self.clients.read().await;
        clients
            .iter()
            .find(|c| c.id == client_id)
            .map(|c| c.handshaken)
            .unwrap_or(false)
    }

    /// Whether `seq` is strictly greater than the last accepted one.
    async fn seq_in_order(&self, client_id: u64, seq: u64) -> bool {
        let clients = self.clients.read().await;
        match clients.iter().find(|c| c.id == client_id) {
            Some(ClientHandle {
                last_seq: Some(prev),
                ..
            }) => seq > *prev,
            _ => true,
        }
    }

    async fn record_seq(&self, client_id: u64, seq: u64) {
        let mut clients = self.clients.write().await;
        if let Some(client) = clients.iter_mut().find(|c| c.id == client_id) {
            client.last_seq = Some(seq);
        }
    }

    async fn dispatch(&self, msg: OutboundMessage) {
        let clients = self.clients.read().await;
        match msg {
            OutboundMessage::ToClient { client_id, line } => {
                if let Some(c) = clients.iter().find(|c| c.id == client_id) {
                    if let Err(TrySendError::Full(_)) = c.tx.try_send(line) {
                        warn!(client_id, "client queue full, reply dropped");
                    }
                }
            }
            OutboundMessage::BroadcastFrame { line } => {
                for c in clients.iter().filter(|c| c.handshaken && c.stream_frames) {
                    if let Err(TrySendError::Full(_)) = c.tx.try_send(line.clone()) {
                        self.dropped_frames.fetch_add(1, Ordering::Relaxed);
                        debug!(client_id = c.id, "client queue full, frame dropped");
                    }
                }
            }
        }
    }
}

/// Start the TCP server
///
/// Runs until the listener fails. `ready_tx` receives the bound address
/// (useful with port 0).
pub async fn run_server(
    state: Arc<ServerState>,
    event_tx: mpsc::Sender<InboundEvent>,
    mut out_rx: mpsc::UnboundedReceiver<OutboundMessage>,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    let addr = state.config.socket_addr()?;
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind adapter on {}", addr))?;
    let bound = listener.local_addr()?;
    info!(%bound, "frame adapter listening");
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    // Outbound dispatcher.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                state.dispatch(msg).await;
            }
        });
    }

    let mut client_id_counter = 0u64;
    loop {
        let (socket, peer) = listener.accept().await?;
        client_id_counter += 1;
        let client_id = client_id_counter;
        info!(client_id, %peer, "client connected");

        let state = Arc::clone(&state);
        let event_tx = event_tx.clone();
        tokio::spawn(async move {
            state.connected.fetch_add(1, Ordering::Relaxed);
            if let Err(e) = handle_client(socket, client_id, &state, event_tx).await {
                warn!(client_id, error = %e, "client error");
            }
            state.clients.write().await.retain(|c| c.id != client_id);
            state.connected.fetch_sub(1, Ordering::Relaxed);
            info!(client_id, "client disconnected");
        });
    }
}

/// One inbound read.
enum InboundLine {
    Line(Vec<u8>),
    TooLong,
    Eof,
}

/// Read up to the next newline, refusing to buffer more than
/// [`MAX_LINE_BYTES`]. An oversized line is consumed and reported as
/// [`InboundLine::TooLong`].
async fn read_line_capped<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> io::Result<InboundLine> {
    let limit = MAX_LINE_BYTES as u64 + 1;
    buf.clear();
    let n = (&mut *reader).take(limit).read_until(b'\n', buf).await?;
    if n == 0 {
        return Ok(InboundLine::Eof);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        return Ok(InboundLine::Line(std::mem::take(buf)));
    }
    if buf.len() <= MAX_LINE_BYTES {
        // Last line without a trailing newline.
        return Ok(InboundLine::Line(std::mem::take(buf)));
    }

    loop {
        buf.clear();
        let n = (&mut *reader).take(limit).read_until(b'\n', buf).await?;
        if n == 0 || buf.last() == Some(&b'\n') {
            return Ok(InboundLine::TooLong);
        }
    }
}

fn to_line<T: serde::Serialize>(msg: &T) -> Option<String> {
    match serde_json::to_string(msg) {
        Ok(line) => Some(line),
        Err(e) => {
            warn!(error = %e, "failed to encode outbound message");
            None
        }
    }
}

async fn reply<T: serde::Serialize>(tx: &mpsc::Sender<String>, msg: &T) {
    if let Some(line) = to_line(msg) {
        let _ = tx.send(line).await;
    }
}

async fn send_error(tx: &mpsc::Sender<String>, seq: u64, code: ErrorCode, message: &str) {
    reply(tx, &create_error(seq, code, message)).await;
}

/// Handle a single client connection
async fn handle_client(
    socket: TcpStream,
    client_id: u64,
    state: &Arc<ServerState>,
    event_tx: mpsc::Sender<InboundEvent>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);

    let (tx, mut rx) = mpsc::channel::<String>(CLIENT_QUEUE_LINES);
    state.register(client_id, tx.clone()).await;

    let write_task = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if writer.write_all(line.as_bytes()).await.is_err()
                || writer.write_all(b"\n").await.is_err()
                || writer.flush().await.is_err()
            {
                break;
            }
        }
    });

    let mut buf = Vec::with_capacity(1024);
    loop {
        let raw = match read_line_capped(&mut reader, &mut buf).await? {
            InboundLine::Eof => break,
            InboundLine::TooLong => {
                let message = format!("line exceeds {MAX_LINE_BYTES} bytes");
                send_error(&tx, 0, ErrorCode::InvalidMessage, &message).await;
                continue;
            }
            InboundLine::Line(raw) => raw,
        };
        let line = match String::from_utf8(raw) {
            Ok(line) => line,
            Err(e) => {
                let lossy = String::from_utf8_lossy(e.as_bytes());
                let seq = extract_seq_best_effort(&lossy).unwrap_or(0);
                send_error(&tx, seq, ErrorCode::InvalidMessage, "line is not valid UTF-8").await;
                continue;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        debug!(client_id, line = trimmed, "inbound");

        match parse_message(trimmed) {
            Ok(ParsedMessage::Hello(hello)) => {
                if state.is_handshaken(client_id).await
                    && !state.seq_in_order(client_id, hello.seq).await
                {
                    send_error(
                        &tx,
                        hello.seq,
                        ErrorCode::SeqOutOfOrder,
                        "seq must be strictly increasing",
                    )
                    .await;
                    continue;
                }

                let major = state.config.protocol_version.split('.').next().unwrap_or("1");
                if hello.protocol_version.split('.').next() != Some(major) {
                    send_error(
                        &tx,
                        hello.seq,
                        ErrorCode::ProtocolMismatch,
                        &format!("protocol version {} not supported", hello.protocol_version),
                    )
                    .await;
                    break;
                }

                {
                    let mut clients = state.clients.write().await;
                    if let Some(client) = clients.iter_mut().find(|c| c.id == client_id) {
                        client.handshaken = true;
                        client.stream_frames = hello.stream_frames;
                        client.last_seq = Some(hello.seq);
                    }
                }
                info!(
                    client_id,
                    name = hello.client.name.as_str(),
                    stream_frames = hello.stream_frames,
                    "client handshake"
                );

                let welcome = create_welcome(hello.seq, &state.config.protocol_version, client_id);
                reply(&tx, &welcome).await;
            }

            Ok(ParsedMessage::Event(msg)) => {
                if !state.is_handshaken(client_id).await {
                    send_error(
                        &tx,
                        msg.seq,
                        ErrorCode::HandshakeRequired,
                        "send hello before event",
                    )
                    .await;
                    continue;
                }
                if !state.seq_in_order(client_id, msg.seq).await {
                    send_error(
                        &tx,
                        msg.seq,
                        ErrorCode::SeqOutOfOrder,
                        "seq must be strictly increasing",
                    )
                    .await;
                    continue;
                }

                let mode = match msg.mode.as_deref().map(str::parse::<RenderMode>) {
                    None => None,
                    Some(Ok(mode)) => Some(mode),
                    Some(Err(e)) => {
                        send_error(&tx, msg.seq, ErrorCode::InvalidMode, &e.to_string()).await;
                        continue;
                    }
                };

                // Rejected events leave `seq` unused so the client can retry it.
                // Ack is sent by the driver loop once the event is applied.
                let seq = msg.seq;
                let inbound = InboundEvent {
                    client_id,
                    seq,
                    event: msg.event,
                    mode,
                    full_view: msg.full_view,
                };
                match event_tx.try_send(inbound) {
                    Ok(()) => state.record_seq(client_id, seq).await,
                    Err(_) => {
                        send_error(&tx, seq, ErrorCode::Backpressure, "event queue is full").await
                    }
                }
            }

            Ok(ParsedMessage::Unknown(unknown)) => {
                send_error(
                    &tx,
                    unknown.seq,
                    ErrorCode::InvalidMessage,
                    &format!("unknown message type `{}`", unknown.msg_type),
                )
                .await;
            }

            Err(e) => {
                let seq = extract_seq_best_effort(trimmed).unwrap_or(0);
                send_error(&tx, seq, ErrorCode::InvalidMessage, &e.to_string()).await;
            }
        }
    }

    // Let queued replies (e.g. a protocol mismatch error) drain before closing.
    drop(tx);
    state.clients.write().await.retain(|c| c.id != client_id);
    let _ = write_task.await;
    Ok(())
}
