use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};

use shock_factor::adapter::protocol::{create_ack, create_event, create_frame, create_hello};
use shock_factor::adapter::server::{run_server, ServerConfig, ServerState, CLIENT_QUEUE_LINES};
use shock_factor::adapter::{InboundEvent, OutboundMessage};
use shock_factor::core::FrameGenerator;
use shock_factor::types::{EffectEvent, RenderMode};

struct Harness {
    addr: SocketAddr,
    event_rx: mpsc::Receiver<InboundEvent>,
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
    server: tokio::task::JoinHandle<()>,
}

async fn start(max_pending_events: usize) -> Harness {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        max_pending_events,
        ..ServerConfig::default()
    };

    let (event_tx, event_rx) = mpsc::channel::<InboundEvent>(max_pending_events);
    let (out_tx, out_rx) = mpsc::unbounded_channel::<OutboundMessage>();
    let (ready_tx, ready_rx) = oneshot::channel();
    let state = Arc::new(ServerState::new(config));

    let server = tokio::spawn(async move {
        let _ = run_server(state, event_tx, out_rx, Some(ready_tx)).await;
    });

    let addr = tokio::time::timeout(Duration::from_secs(2), ready_rx)
        .await
        .expect("server did not signal ready")
        .expect("ready channel dropped");

    Harness {
        addr,
        event_rx,
        out_tx,
        server,
    }
}

async fn connect(addr: SocketAddr) -> (Lines<BufReader<OwnedReadHalf>>, OwnedWriteHalf) {
    let stream = TcpStream::connect(addr).await.expect("connect failed");
    let (read_half, write_half) = stream.into_split();
    (BufReader::new(read_half).lines(), write_half)
}

async fn send_line(w: &mut OwnedWriteHalf, line: &str) {
    w.write_all(line.as_bytes()).await.unwrap();
    w.write_all(b"\n").await.unwrap();
    w.flush().await.unwrap();
}

async fn next_json(lines: &mut Lines<BufReader<OwnedReadHalf>>) -> serde_json::Value {
    let line = tokio::time::timeout(Duration::from_secs(2), lines.next_line())
        .await
        .expect("timed out waiting for line")
        .unwrap()
        .expect("connection closed");
    serde_json::from_str(&line).unwrap()
}

async fn handshake(lines: &mut Lines<BufReader<OwnedReadHalf>>, w: &mut OwnedWriteHalf, stream: bool) {
    let hello = serde_json::to_string(&create_hello(1, "e2e-test", stream)).unwrap();
    send_line(w, &hello).await;
    let welcome = next_json(lines).await;
    assert_eq!(welcome["type"], "welcome");
    assert_eq!(welcome["seq"], 1);
    assert_eq!(welcome["protocol_version"], "1.0.0");
}

#[tokio::test]
async fn adapter_hello_event_ack_and_frame() {
    let mut h = start(8).await;
    let (mut lines, mut w) = connect(h.addr).await;
    handshake(&mut lines, &mut w, true).await;

    let event_line = r#"{"type":"event","seq":2,"ts":1,"event":{"id":"cue-1","name":"drop","intensity":0.9,"text":"ON AIR"},"mode":"wordfire","full_view":true}"#;
    send_line(&mut w, event_line).await;

    let inbound = tokio::time::timeout(Duration::from_secs(2), h.event_rx.recv())
        .await
        .unwrap()
        .expect("expected inbound event");
    assert_eq!(inbound.seq, 2);
    assert_eq!(inbound.event.id, "cue-1");
    assert_eq!(inbound.event.text.as_deref(), Some("ON AIR"));
    assert_eq!(inbound.mode, Some(RenderMode::WordFire));
    assert_eq!(inbound.full_view, Some(true));

    // ack after apply
    h.out_tx
        .send(OutboundMessage::ToClient {
            client_id: inbound.client_id,
            line: serde_json::to_string(&create_ack(2)).unwrap(),
        })
        .unwrap();
    let ack = next_json(&mut lines).await;
    assert_eq!(ack["type"], "ack");
    assert_eq!(ack["seq"], 2);
    assert_eq!(ack["status"], "ok");

    // frame broadcast
    let mut gen = FrameGenerator::new(3);
    let frame = gen.generate_frame(&inbound.event, RenderMode::WordFire, true);
    h.out_tx
        .send(OutboundMessage::BroadcastFrame {
            line: serde_json::to_string(&create_frame(1, &frame)).unwrap(),
        })
        .unwrap();
    let frame_v = next_json(&mut lines).await;
    assert_eq!(frame_v["type"], "frame");
    assert_eq!(frame_v["asciiLines"].as_array().unwrap().len(), 24);
    assert_eq!(frame_v["meta"]["mode"], "wordfire");

    h.server.abort();
}

#[tokio::test]
async fn adapter_rejects_events_before_hello() {
    let h = start(4).await;
    let (mut lines, mut w) = connect(h.addr).await;

    send_line(
        &mut w,
        r#"{"type":"event","seq":5,"event":{"id":"x","name":"y"}}"#,
    )
    .await;
    let err = next_json(&mut lines).await;
    assert_eq!(err["type"], "error");
    assert_eq!(err["code"], "handshake_required");
    assert_eq!(err["seq"], 5);

    h.server.abort();
}

#[tokio::test]
async fn adapter_reports_bad_input() {
    let mut h = start(4).await;
    let (mut lines, mut w) = connect(h.addr).await;
    handshake(&mut lines, &mut w, false).await;

    send_line(&mut w, "{not json").await;
    let err = next_json(&mut lines).await;
    assert_eq!(err["code"], "invalid_message");

    send_line(
        &mut w,
        r#"{"type":"event","seq":2,"event":{"id":"x","name":"y"},"mode":"strobe"}"#,
    )
    .await;
    let err = next_json(&mut lines).await;
    assert_eq!(err["code"], "invalid_mode");
    assert_eq!(err["seq"], 2);

    // The rejected event left seq 2 unused, so it can be retried.
    send_line(
        &mut w,
        r#"{"type":"event","seq":2,"event":{"id":"x","name":"y"},"mode":"pulse"}"#,
    )
    .await;
    let inbound = tokio::time::timeout(Duration::from_secs(2), h.event_rx.recv())
        .await
        .unwrap()
        .expect("retried event should be accepted");
    assert_eq!(inbound.seq, 2);
    assert_eq!(inbound.mode, Some(RenderMode::Pulse));

    // Once accepted, replays are out of order.
    send_line(
        &mut w,
        r#"{"type":"event","seq":2,"event":{"id":"x","name":"y"}}"#,
    )
    .await;
    let err = next_json(&mut lines).await;
    assert_eq!(err["code"], "seq_out_of_order");
    assert_eq!(err["seq"], 2);

    send_line(&mut w, r#"{"type":"strobe","seq":9}"#).await;
    let err = next_json(&mut lines).await;
    assert_eq!(err["code"], "invalid_message");
    assert_eq!(err["seq"], 9);

    assert!(h.event_rx.try_recv().is_err(), "only the retried event reached the driver");
    h.server.abort();
}

#[tokio::test]
async fn adapter_survives_invalid_utf8() {
    let h = start(4).await;
    let (mut lines, mut w) = connect(h.addr).await;
    handshake(&mut lines, &mut w, false).await;

    w.write_all(b"{\"type\":\"event\",\"seq\":2,\xff\xfe}\n")
        .await
        .unwrap();
    w.flush().await.unwrap();
    let err = next_json(&mut lines).await;
    assert_eq!(err["code"], "invalid_message");
    assert_eq!(err["seq"], 2);

    // The connection is still served.
    send_line(&mut w, r#"{"type":"strobe","seq":3}"#).await;
    let err = next_json(&mut lines).await;
    assert_eq!(err["code"], "invalid_message");
    assert_eq!(err["seq"], 3);

    h.server.abort();
}

#[tokio::test]
async fn adapter_rejects_oversized_lines() {
    let h = start(4).await;
    let (mut lines, mut w) = connect(h.addr).await;
    handshake(&mut lines, &mut w, false).await;

    let huge = format!(r#"{{"type":"event","seq":2,"pad":"{}"}}"#, "x".repeat(100 * 1024));
    send_line(&mut w, &huge).await;
    let err = next_json(&mut lines).await;
    assert_eq!(err["code"], "invalid_message");

    send_line(&mut w, r#"{"type":"strobe","seq":3}"#).await;
    let err = next_json(&mut lines).await;
    assert_eq!(err["seq"], 3);

    h.server.abort();
}

#[tokio::test]
async fn adapter_closes_on_protocol_mismatch() {
    let h = start(4).await;
    let (mut lines, mut w) = connect(h.addr).await;

    let mut hello = create_hello(1, "future-client", true);
    hello.protocol_version = "2.0.0".to_string();
    send_line(&mut w, &serde_json::to_string(&hello).unwrap()).await;

    let err = next_json(&mut lines).await;
    assert_eq!(err["type"], "error");
    assert_eq!(err["code"], "protocol_mismatch");
    assert_eq!(err["seq"], 1);

    let closed = tokio::time::timeout(Duration::from_secs(2), lines.next_line())
        .await
        .expect("server should close the connection")
        .unwrap();
    assert!(closed.is_none());

    h.server.abort();
}

#[tokio::test]
async fn adapter_backpressure_returns_error() {
    let h = start(1).await;
    let (mut lines, mut w) = connect(h.addr).await;
    handshake(&mut lines, &mut w, false).await;

    // Nobody drains `event_rx`: the first event fills the queue.
    for seq in 2..=3 {
        let event = create_event(seq, EffectEvent::new("bp", "bp"), Some(RenderMode::Pulse), None);
        send_line(&mut w, &serde_json::to_string(&event).unwrap()).await;
    }

    let err = next_json(&mut lines).await;
    assert_eq!(err["code"], "backpressure");
    assert_eq!(err["seq"], 3);

    h.server.abort();
}

#[tokio::test]
async fn frames_only_go_to_streaming_clients() {
    let h = start(4).await;
    let (mut quiet_lines, mut quiet_w) = connect(h.addr).await;
    handshake(&mut quiet_lines, &mut quiet_w, false).await;
    let (mut loud_lines, mut loud_w) = connect(h.addr).await;
    handshake(&mut loud_lines, &mut loud_w, true).await;

    let mut gen = FrameGenerator::new(1);
    let frame = gen.generate_frame(&EffectEvent::default(), RenderMode::Pulse, false);
    h.out_tx
        .send(OutboundMessage::BroadcastFrame {
            line: serde_json::to_string(&create_frame(1, &frame)).unwrap(),
        })
        .unwrap();

    let v = next_json(&mut loud_lines).await;
    assert_eq!(v["type"], "frame");
    assert_eq!(v["meta"]["tick"], 0);

    let quiet = tokio::time::timeout(Duration::from_millis(200), quiet_lines.next_line()).await;
    assert!(quiet.is_err(), "non-streaming client must not get frames");

    h.server.abort();
}

#[tokio::test]
async fn stalled_client_does_not_block_others() {
    let h = start(4).await;
    // Handshakes but never reads again.
    let (mut stalled_lines, mut stalled_w) = connect(h.addr).await;
    handshake(&mut stalled_lines, &mut stalled_w, true).await;
    let (mut live_lines, mut live_w) = connect(h.addr).await;
    handshake(&mut live_lines, &mut live_w, true).await;

    let mut gen = FrameGenerator::new(9);
    let event = EffectEvent::default();
    // Far more than the stalled client's queue and socket buffers hold.
    let total = (CLIENT_QUEUE_LINES * 20) as u64;
    for seq in 1..=total {
        let frame = gen.generate_frame(&event, RenderMode::WordFire, true);
        h.out_tx
            .send(OutboundMessage::BroadcastFrame {
                line: serde_json::to_string(&create_frame(seq, &frame)).unwrap(),
            })
            .unwrap();
        let v = next_json(&mut live_lines).await;
        assert_eq!(v["seq"], seq);
    }

    drop(stalled_lines);
    h.server.abort();
}
