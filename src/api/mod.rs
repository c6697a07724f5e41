pub mod error;
mod handlers;

use axum::{
    http::{HeaderName, HeaderValue},
    routing::get,
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::broker::Broker;
use crate::config::DEFAULT_MAX_PEERS;
use crate::console::Console;

use handlers::*;

#[derive(Clone)]
pub struct AppState {
    pub console: Console,
    pub broker: Broker,
    /// Cancelled once at shutdown; every peer task closes its socket.
    pub shutdown: CancellationToken,
    pub max_peers: usize,
}

impl AppState {
    pub fn new(console: Console, broker: Broker, shutdown: CancellationToken) -> Self {
        Self {
            console,
            broker,
            shutdown,
            max_peers: DEFAULT_MAX_PEERS,
        }
    }

    pub fn with_max_peers(mut self, max_peers: usize) -> Self {
        self.max_peers = max_peers;
        self
    }
}

/// Build the HTTP router. Serve it with
/// `into_make_service_with_connect_info::<SocketAddr>()`; the websocket
/// handler records each peer's source address.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/ws", get(ws_peer))
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("content-security-policy"),
            HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
        ))
}
