use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, Query, State,
    },
    response::IntoResponse,
    Json,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::sync::broadcast;

use crate::console::{ConsoleSnapshot, PeerGuard};
use crate::protocol::ServerFrame;
use crate::session::{ConnectionId, PeerInfo};

use super::error::ApiError;
use super::AppState;

#[derive(Serialize)]
pub(super) struct HealthResponse {
    status: &'static str,
}

pub(super) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub(super) async fn status(State(state): State<AppState>) -> Json<ConsoleSnapshot> {
    Json(state.console.snapshot())
}

pub(super) async fn not_found() -> ApiError {
    ApiError::NotFound
}

#[derive(Debug, Deserialize)]
pub(super) struct WsParams {
    username: Option<String>,
}

pub(super) async fn ws_peer(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(params): Query<WsParams>,
) -> Result<impl IntoResponse, ApiError> {
    // Subscribe before registering so no frame from the first tick that
    // counts this peer is missed.
    let frames = state.broker.subscribe();
    let info = PeerInfo::new(params.username.as_deref(), addr);
    let Some(guard) = state
        .console
        .try_connect(ConnectionId::new(), info, state.max_peers)
    else {
        tracing::warn!(%addr, max = state.max_peers, "rejecting peer: limit reached");
        return Err(ApiError::PeerLimitReached(state.max_peers));
    };

    // Dropped with the callback if the upgrade never completes.
    Ok(ws.on_upgrade(move |socket| handle_ws_peer(socket, state, guard, frames)))
}

async fn handle_ws_peer(
    socket: WebSocket,
    state: AppState,
    guard: PeerGuard,
    mut frames: broadcast::Receiver<ServerFrame>,
) {
    let id = guard.id();

    let (mut ws_tx, mut ws_rx) = socket.split();

    if send_frame(&mut ws_tx, &ServerFrame::Connected(id.to_string()))
        .await
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            result = frames.recv() => {
                match result {
                    Ok(frame) => {
                        if send_frame(&mut ws_tx, &frame).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::debug!(peer = %id, skipped = n, "peer lagging, frames dropped");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            // Peers only listen; anything they send is ignored.
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        tracing::debug!(peer = %id, error = %e, "websocket read failed");
                        break;
                    }
                }
            }

            _ = state.shutdown.cancelled() => {
                tracing::debug!(peer = %id, "closing peer for shutdown");
                let close_frame = CloseFrame {
                    code: axum::extract::ws::close_code::AWAY,
                    reason: "server shutting down".into(),
                };
                let _ = ws_tx.send(Message::Close(Some(close_frame))).await;
                let _ = ws_tx.flush().await;
                break;
            }
        }
    }

    drop(guard);
}

async fn send_frame(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    frame: &ServerFrame,
) -> Result<(), axum::Error> {
    let text = match frame.to_json() {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(error = %e, ?frame, "failed to encode frame");
            return Ok(());
        }
    };
    ws_tx.send(Message::Text(text.into())).await
}
