#![allow(dead_code)]

use futures::stream::{SplitSink, SplitStream};
use futures::StreamExt;
use pester::scheduler::{ScheduleConfig, ScriptedRandom, TickScheduler};
use pester::server::{self, ServerHandle};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub type WsWrite = SplitSink<WsStream, Message>;
pub type WsRead = SplitStream<WsStream>;

/// Schedule with a short period so tests don't wait whole seconds.
pub fn fast_schedule(period_ms: u64) -> ScheduleConfig {
    ScheduleConfig {
        period: Duration::from_millis(period_ms),
        ..ScheduleConfig::default()
    }
}

/// Start a server on an ephemeral loopback port.
pub async fn start_server(
    schedule: ScheduleConfig,
    rng: ScriptedRandom,
    max_peers: usize,
) -> ServerHandle {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let scheduler = TickScheduler::with_random(schedule, rng);
    server::start(listener, scheduler, max_peers, CancellationToken::new()).unwrap()
}

pub fn ws_url(addr: SocketAddr, username: Option<&str>) -> String {
    match username {
        Some(name) => format!("ws://{}/ws?username={}", addr, name),
        None => format!("ws://{}/ws", addr),
    }
}

/// Connect a peer and consume its `connected` frame. Returns the connection
/// id from that frame. The peer is registered by the time this returns.
pub async fn connect_peer(addr: SocketAddr, username: Option<&str>) -> (WsWrite, WsRead, String) {
    let (ws, _) = connect_async(ws_url(addr, username)).await.unwrap();
    let (tx, mut rx) = ws.split();
    let hello = recv_json(&mut rx).await;
    assert_eq!(hello["event"], "connected");
    let id = hello["data"].as_str().expect("connected id").to_string();
    (tx, rx, id)
}

/// Receive the next text frame as JSON.
pub async fn recv_json(rx: &mut WsRead) -> serde_json::Value {
    let msg = tokio::time::timeout(Duration::from_secs(5), rx.next())
        .await
        .expect("timeout waiting for message")
        .expect("stream ended")
        .expect("ws error");
    match msg {
        Message::Text(text) => serde_json::from_str(text.as_str()).expect("invalid JSON"),
        other => panic!("expected text message, got {:?}", other),
    }
}

/// Receive a text frame within `timeout`, or None.
pub async fn try_recv_json(rx: &mut WsRead, timeout: Duration) -> Option<serde_json::Value> {
    match tokio::time::timeout(timeout, rx.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => Some(serde_json::from_str(text.as_str()).unwrap()),
        _ => None,
    }
}

/// Poll until `check` holds or two seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
