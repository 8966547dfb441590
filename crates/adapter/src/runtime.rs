//! Adapter runtime integration.
//!
//! Bridges the sync driver loop with the async TCP server.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tokio::runtime::Runtime;
use tokio::sync::{mpsc, oneshot};
use tracing::error;

use crate::protocol::{create_ack, create_frame};
use crate::server::{run_server, ServerConfig, ServerState};
use crate::types::{EffectEvent, FramePayload, RenderMode};

/// Event delivered to the driver loop.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub client_id: u64,
    pub seq: u64,
    pub event: EffectEvent,
    pub mode: Option<RenderMode>,
    pub full_view: Option<bool>,
}

/// Outbound message to be delivered by the server.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    ToClient { client_id: u64, line: String },
    /// Sent to every handshaken client that asked for frames.
    BroadcastFrame { line: String },
}

/// Publishes generated frames to streaming clients.
///
/// Cheap to clone; every clone shares the same outbound `seq` counter.
#[derive(Debug, Clone)]
pub struct FrameSink {
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
    seq: Arc<AtomicU64>,
}

impl FrameSink {
    /// Encode `frame` and queue it for broadcast.
    ///
    /// Fails once the server side has shut down.
    pub fn publish(&self, frame: &FramePayload) -> anyhow::Result<()> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let line = serde_json::to_string(&create_frame(seq, frame))?;
        self.out_tx
            .send(OutboundMessage::BroadcastFrame { line })
            .map_err(|_| anyhow::anyhow!("frame adapter is not running"))
    }
}

/// Running adapter instance.
pub struct Adapter {
    _rt: Runtime,
    state: Arc<ServerState>,
    event_rx: mpsc::Receiver<InboundEvent>,
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
    frame_seq: Arc<AtomicU64>,
    local_addr: Option<SocketAddr>,
}

impl Adapter {
    /// Start the adapter from environment variables.
    ///
    /// Returns `Ok(None)` if `SHOCK_FACTOR_ADAPTER_DISABLED` is set.
    pub fn start_from_env() -> anyhow::Result<Option<Self>> {
        let config = ServerConfig::from_env();
        if config.disabled {
            return Ok(None);
        }
        Self::start(config).map(Some)
    }

    /// Start the server on its own runtime and wait until it is bound.
    pub fn start(config: ServerConfig) -> anyhow::Result<Self> {
        let max_pending = config.max_pending_events.max(1);
        let (event_tx, event_rx) = mpsc::channel::<InboundEvent>(max_pending);
        let (out_tx, out_rx) = mpsc::unbounded_channel::<OutboundMessage>();
        let (ready_tx, ready_rx) = oneshot::channel::<SocketAddr>();

        let rt = Runtime::new().context("failed to create tokio runtime")?;
        let state = Arc::new(ServerState::new(config));
        let server_state = Arc::clone(&state);
        let server = rt.spawn(async move {
            if let Err(e) = run_server(server_state, event_tx, out_rx, Some(ready_tx)).await {
                error!(error = %e, "frame adapter stopped");
                return Err(e);
            }
            Ok(())
        });

        // A dropped ready sender means the server failed before binding.
        let local_addr = match rt.block_on(ready_rx) {
            Ok(addr) => Some(addr),
            Err(_) => {
                return match rt.block_on(server) {
                    Ok(Err(e)) => Err(e),
                    Ok(Ok(())) => Err(anyhow::anyhow!("frame adapter exited before binding")),
                    Err(join) => Err(anyhow::anyhow!("frame adapter task failed: {join}")),
                };
            }
        };

        Ok(Self {
            _rt: rt,
            state,
            event_rx,
            out_tx,
            frame_seq: Arc::new(AtomicU64::new(0)),
            local_addr,
        })
    }

    /// Address the server is bound to.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn client_count(&self) -> usize {
        self.state.client_count()
    }

    pub fn try_recv(&mut self) -> Option<InboundEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn send(&self, msg: OutboundMessage) {
        let _ = self.out_tx.send(msg);
    }

    /// Acknowledge an applied event.
    pub fn ack(&self, client_id: u64, seq: u64) {
        self.send_encoded(client_id, &create_ack(seq));
    }

    pub fn frame_sink(&self) -> FrameSink {
        FrameSink {
            out_tx: self.out_tx.clone(),
            seq: Arc::clone(&self.frame_seq),
        }
    }

    fn send_encoded<T: serde::Serialize>(&self, client_id: u64, msg: &T) {
        match serde_json::to_string(msg) {
            Ok(line) => self.send(OutboundMessage::ToClient { client_id, line }),
            Err(e) => error!(client_id, error = %e, "failed to encode reply"),
        }
    }
}
