//! Protocol module - JSON message types for the frame adapter
//!
//! Line-delimited JSON. Every message carries `type`, `seq` (per-sender
//! sequence number) and `ts` (milliseconds since the Unix epoch).

use serde::{Deserialize, Serialize};

use crate::types::{EffectEvent, FrameMeta, FramePayload, RenderMode};

pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Defines a single-variant enum that (de)serializes as the literal `type` tag.
macro_rules! message_tag {
    ($name:ident, $variant:ident, $tag:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        pub enum $name {
            #[default]
            #[serde(rename = $tag)]
            $variant,
        }
    };
}

message_tag!(HelloType, Hello, "hello");
message_tag!(EventType, Event, "event");
message_tag!(WelcomeType, Welcome, "welcome");
message_tag!(AckType, Ack, "ack");
message_tag!(ErrorType, Error, "error");
message_tag!(FrameType, Frame, "frame");

// ============== Client -> Server Messages ==============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

/// First message on a connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloMessage {
    #[serde(rename = "type", default)]
    pub msg_type: HelloType,
    pub seq: u64,
    #[serde(default)]
    pub ts: u64,
    pub client: ClientInfo,
    pub protocol_version: String,
    /// Receive a `frame` message for every generated frame.
    #[serde(default = "default_true")]
    pub stream_frames: bool,
}

fn default_true() -> bool {
    true
}

/// Replace the effect event the driver renders.
///
/// `mode` is kept as a raw string so an unknown mode can be reported with
/// its own error code instead of a generic parse failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type", default)]
    pub msg_type: EventType,
    pub seq: u64,
    #[serde(default)]
    pub ts: u64,
    pub event: EffectEvent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_view: Option<bool>,
}

// ============== Server -> Client Messages ==============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeMessage {
    #[serde(rename = "type")]
    pub msg_type: WelcomeType,
    pub seq: u64,
    pub ts: u64,
    pub protocol_version: String,
    pub client_id: u64,
    pub modes: [RenderMode; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckStatus {
    #[serde(rename = "ok")]
    Ok,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckMessage {
    #[serde(rename = "type")]
    pub msg_type: AckType,
    pub seq: u64,
    pub ts: u64,
    pub status: AckStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "handshake_required")]
    HandshakeRequired,
    #[serde(rename = "protocol_mismatch")]
    ProtocolMismatch,
    #[serde(rename = "invalid_message")]
    InvalidMessage,
    #[serde(rename = "invalid_mode")]
    InvalidMode,
    #[serde(rename = "seq_out_of_order")]
    SeqOutOfOrder,
    #[serde(rename = "backpressure")]
    Backpressure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    #[serde(rename = "type")]
    pub msg_type: ErrorType,
    pub seq: u64,
    pub ts: u64,
    pub code: ErrorCode,
    pub message: String,
}

/// A generated frame, streamed to every client that asked for frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameMessage {
    #[serde(rename = "type")]
    pub msg_type: FrameType,
    pub seq: u64,
    pub ts: u64,
    pub ascii_lines: Vec<String>,
    pub meta: FrameMeta,
}

// ============== Parsing ==============

/// Parsed inbound message
#[derive(Debug, Clone)]
pub enum ParsedMessage {
    Hello(HelloMessage),
    Event(EventMessage),
    Unknown(UnknownMessage),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMessage {
    pub seq: u64,
    pub msg_type: String,
}

/// Parse an inbound line.
///
/// A well-formed message of an unrecognized `type` is not an error; it comes
/// back as [`ParsedMessage::Unknown`].
pub fn parse_message(json: &str) -> Result<ParsedMessage, serde_json::Error> {
    #[derive(Debug, Deserialize)]
    #[serde(tag = "type")]
    enum InboundMessage {
        #[serde(rename = "hello")]
        Hello(HelloMessage),
        #[serde(rename = "event")]
        Event(EventMessage),
    }

    match serde_json::from_str::<InboundMessage>(json) {
        Ok(InboundMessage::Hello(m)) => Ok(ParsedMessage::Hello(m)),
        Ok(InboundMessage::Event(m)) => Ok(ParsedMessage::Event(m)),
        Err(e) => {
            #[derive(Debug, Deserialize)]
            struct Envelope {
                #[serde(rename = "type")]
                msg_type: Option<String>,
                #[serde(default)]
                seq: u64,
            }
            let envelope = serde_json::from_str::<Envelope>(json)?;
            match envelope.msg_type {
                Some(t) if t != "hello" && t != "event" => Ok(ParsedMessage::Unknown(UnknownMessage {
                    seq: envelope.seq,
                    msg_type: t,
                })),
                _ => Err(e),
            }
        }
    }
}

/// Best-effort `seq` extraction from a line that failed to parse.
pub fn extract_seq_best_effort(s: &str) -> Option<u64> {
    let start = s.find("\"seq\"")?;
    let after_key = &s[start + 5..];
    let colon = after_key.find(':')?;
    let rest = after_key[colon + 1..].trim_start();
    let end = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
    if end == 0 {
        return None;
    }
    rest[..end].parse::<u64>().ok()
}

// ============== Utility Functions ==============

pub fn create_hello(seq: u64, client_name: &str, stream_frames: bool) -> HelloMessage {
    HelloMessage {
        msg_type: HelloType::Hello,
        seq,
        ts: current_timestamp_ms(),
        client: ClientInfo {
            name: client_name.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        protocol_version: PROTOCOL_VERSION.to_string(),
        stream_frames,
    }
}

pub fn create_event(
    seq: u64,
    event: EffectEvent,
    mode: Option<RenderMode>,
    full_view: Option<bool>,
) -> EventMessage {
    EventMessage {
        msg_type: EventType::Event,
        seq,
        ts: current_timestamp_ms(),
        event,
        mode: mode.map(|m| m.as_str().to_string()),
        full_view,
    }
}

pub fn create_welcome(seq: u64, protocol_version: &str, client_id: u64) -> WelcomeMessage {
    WelcomeMessage {
        msg_type: WelcomeType::Welcome,
        seq,
        ts: current_timestamp_ms(),
        protocol_version: protocol_version.to_string(),
        client_id,
        modes: RenderMode::ALL,
    }
}

pub fn create_ack(seq: u64) -> AckMessage {
    AckMessage {
        msg_type: AckType::Ack,
        seq,
        ts: current_timestamp_ms(),
        status: AckStatus::Ok,
    }
}

pub fn create_error(seq: u64, code: ErrorCode, message: &str) -> ErrorMessage {
    ErrorMessage {
        msg_type: ErrorType::Error,
        seq,
        ts: current_timestamp_ms(),
        code,
        message: message.to_string(),
    }
}

pub fn create_frame(seq: u64, frame: &FramePayload) -> FrameMessage {
    FrameMessage {
        msg_type: FrameType::Frame,
        seq,
        ts: current_timestamp_ms(),
        ascii_lines: frame.ascii_lines.clone(),
        meta: frame.meta,
    }
}

/// Get current timestamp in milliseconds
pub fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
