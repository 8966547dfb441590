//! Adapter module - drive the visualizer over a TCP socket
//!
//! External controllers (a show-control panel, a script, `nc`) can replace
//! the effect event being rendered and subscribe to the generated frames.
//!
//! # Protocol Overview
//!
//! **Line-delimited JSON** over TCP:
//!
//! 1. **Connection**: Client connects (default: 127.0.0.1:7878)
//! 2. **Handshake**: Client sends `hello`, server responds with `welcome`
//! 3. **Events**: Client sends `event`; the driver applies it and replies `ack`
//! 4. **Frames**: Clients that asked for it receive a `frame` per generated frame
//!
//! Errors come back as `error` messages with one of `handshake_required`,
//! `protocol_mismatch`, `invalid_message`, `invalid_mode`, `seq_out_of_order`
//! or `backpressure`.
//!
//! `seq` must increase per client and is only consumed by accepted messages,
//! so an event rejected with `invalid_mode` or `backpressure` can be resent
//! unchanged. Lines longer than 64 KiB or not valid UTF-8 get
//! `invalid_message`. A client that stops reading loses frames, not the
//! connection.
//!
//! # Environment Variables
//!
//! - `SHOCK_FACTOR_HOST`: Bind address (default: "127.0.0.1")
//! - `SHOCK_FACTOR_PORT`: Port number (default: 7878)
//! - `SHOCK_FACTOR_MAX_PENDING`: Queued events before `backpressure` (default: 16)
//! - `SHOCK_FACTOR_ADAPTER_DISABLED`: Set to "1" or "true" to disable the adapter
//!
//! # Example Protocol Flow
//!
//! ```text
//! Client -> Server: {"type":"hello","seq":1,"ts":0,"client":{"name":"panel","version":"0.1.0"},"protocol_version":"1.0.0"}
//! Server -> Client: {"type":"welcome","seq":1,"ts":1700000000000,"protocol_version":"1.0.0","client_id":1,"modes":["pulse","wordfire"]}
//! Client -> Server: {"type":"event","seq":2,"ts":0,"event":{"id":"e1","name":"drop","intensity":1.0,"text":"ON AIR"},"mode":"wordfire"}
//! Server -> Client: {"type":"ack","seq":2,"ts":1700000000050,"status":"ok"}
//! Server -> Client: {"type":"frame","seq":1,"ts":1700000000100,"asciiLines":["..."],"meta":{"intensity":1.0,"tick":42,"mode":"wordfire"}}
//! ```

pub mod protocol;
pub mod runtime;
pub mod server;

pub use shock_factor_types as types;

pub use protocol::*;
pub use runtime::{Adapter, FrameSink, InboundEvent, OutboundMessage};
pub use server::{run_server, ServerConfig, ServerState};
