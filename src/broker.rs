use tokio::sync::broadcast;

use crate::protocol::{ServerFrame, Signal};

pub const BROADCAST_CAPACITY: usize = 64;

/// Outbound side of the transport: push a frame to every connected peer.
///
/// Delivery is best-effort. Implementations must not block and must not
/// report per-peer failures back to the caller.
pub trait Broadcaster: Send + Sync {
    fn broadcast(&self, frame: ServerFrame);

    fn message(&self, signal: Signal) {
        self.broadcast(ServerFrame::Message(signal));
    }

    fn keypress(&self, raw: String) {
        self.broadcast(ServerFrame::Keypress(raw));
    }
}

/// Fan-out of frames to websocket peers.
///
/// Each peer task holds its own receiver. A peer that falls more than
/// [`BROADCAST_CAPACITY`] frames behind skips the oldest ones; a peer whose
/// socket fails stops receiving without affecting the others.
#[derive(Clone)]
pub struct Broker {
    tx: broadcast::Sender<ServerFrame>,
}

impl Broker {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerFrame> {
        self.tx.subscribe()
    }

    #[cfg(test)]
    fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

impl Broadcaster for Broker {
    fn broadcast(&self, frame: ServerFrame) {
        tracing::debug!(channel = frame.channel(), ?frame, "broadcasting");
        // Ignore error - means no receivers
        let _ = self.tx.send(frame);
    }
}
