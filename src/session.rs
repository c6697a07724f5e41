use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Name shown for peers that connect without a `username` query parameter.
pub const ANONYMOUS: &str = "Anonymous";

/// Longest display name kept; longer names are truncated.
const MAX_DISPLAY_NAME_CHARS: usize = 64;

/// Opaque identifier assigned to each websocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Metadata recorded when a peer connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    pub display_name: String,
    pub connected_at: SystemTime,
    pub source_address: SocketAddr,
}

impl PeerInfo {
    pub fn new(display_name: Option<&str>, source_address: SocketAddr) -> Self {
        Self {
            display_name: normalize_display_name(display_name),
            connected_at: SystemTime::now(),
            source_address,
        }
    }
}

/// Trim a client-supplied name, fall back to [`ANONYMOUS`] when empty, and
/// cap it at 64 characters. Control characters are dropped so the name can
/// be printed on the operator console as-is.
pub fn normalize_display_name(raw: Option<&str>) -> String {
    let cleaned: String = raw
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_control())
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return ANONYMOUS.to_string();
    }
    trimmed.chars().take(MAX_DISPLAY_NAME_CHARS).collect()
}

/// Serializable view of one connected peer.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PeerSummary {
    pub id: ConnectionId,
    pub display_name: String,
    /// Milliseconds since the Unix epoch.
    pub connected_at_ms: u64,
    pub source_address: SocketAddr,
}

/// Connected peers keyed by connection id.
///
/// Plain data: the [`Console`](crate::console::Console) handle owns the lock
/// and the change notifications.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    peers: HashMap<ConnectionId, PeerInfo>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer. Re-adding an id replaces its metadata.
    pub fn add(&mut self, id: ConnectionId, info: PeerInfo) {
        self.peers.insert(id, info);
    }

    /// Remove a peer, returning its metadata if it was registered.
    pub fn remove(&mut self, id: &ConnectionId) -> Option<PeerInfo> {
        self.peers.remove(id)
    }

    pub fn count(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, id: &ConnectionId) -> Option<&PeerInfo> {
        self.peers.get(id)
    }

    /// Peers ordered by connection time, oldest first.
    pub fn snapshot(&self) -> Vec<PeerSummary> {
        let mut peers: Vec<PeerSummary> = self
            .peers
            .iter()
            .map(|(id, info)| PeerSummary {
                id: *id,
                display_name: info.display_name.clone(),
                connected_at_ms: info
                    .connected_at
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_millis() as u64)
                    .unwrap_or(0),
                source_address: info.source_address,
            })
            .collect();
        peers.sort_by(|a, b| {
            a.connected_at_ms
                .cmp(&b.connected_at_ms)
                .then_with(|| a.id.cmp(&b.id))
        });
        peers
    }
}
