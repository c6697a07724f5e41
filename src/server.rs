//! HTTP/WebSocket server and tick loop, started and stopped together.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::{self, AppState};
use crate::broker::Broker;
use crate::console::Console;
use crate::scheduler::TickScheduler;
use crate::ticker::spawn_ticker;

/// Time peers get to receive their close frame before the listener stops.
const CLOSE_GRACE: Duration = Duration::from_millis(100);

/// A running server. Dropping it leaves the tasks running; call
/// [`ServerHandle::shutdown`] to stop them.
pub struct ServerHandle {
    pub addr: SocketAddr,
    pub console: Console,
    pub broker: Broker,
    shutdown: CancellationToken,
    http_stop: CancellationToken,
    http: JoinHandle<io::Result<()>>,
    ticker: JoinHandle<()>,
}

/// Serve the API on `listener` and start ticking `scheduler`.
///
/// `shutdown` is the process-wide token. Cancelling it closes every peer
/// socket and stops the ticker; the HTTP listener stops after
/// [`ServerHandle::shutdown`] has given peers a moment to flush.
pub fn start(
    listener: TcpListener,
    scheduler: TickScheduler,
    max_peers: usize,
    shutdown: CancellationToken,
) -> io::Result<ServerHandle> {
    let addr = listener.local_addr()?;
    let console = Console::new();
    let broker = Broker::new();

    let state = AppState::new(console.clone(), broker.clone(), shutdown.clone())
        .with_max_peers(max_peers);
    let app = api::router(state);

    let http_stop = CancellationToken::new();
    let stop = http_stop.clone();
    let http = tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move { stop.cancelled().await })
        .await
    });

    let ticker = spawn_ticker(scheduler, console.clone(), broker.clone(), shutdown.clone());
    tracing::info!(%addr, max_peers, "listening for coworkers");

    Ok(ServerHandle {
        addr,
        console,
        broker,
        shutdown,
        http_stop,
        http,
        ticker,
    })
}

impl ServerHandle {
    /// Close every peer, stop the ticker and drain the HTTP server.
    pub async fn shutdown(self) -> io::Result<()> {
        self.shutdown.cancel();
        // Give peer tasks a moment to flush close frames before stopping the server
        tokio::time::sleep(CLOSE_GRACE).await;
        self.http_stop.cancel();

        if let Err(e) = self.ticker.await {
            tracing::warn!(?e, "ticker task panicked");
        }
        let served = self.http.await.map_err(io::Error::other)?;
        tracing::info!("server stopped");
        served
    }
}
