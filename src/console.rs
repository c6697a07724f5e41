use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::input::{Command, CommandInterpreter, Outcome, Symbol};
use crate::protocol::Signal;
use crate::scheduler::SuppressionCounter;
use crate::session::{ConnectionId, PeerInfo, PeerSummary, SessionRegistry};
use crate::toggles::{Action, Behavior, ToggleState};

/// Everything the scheduler reads in a tick.
///
/// Kept behind a single lock so a tick never observes a toggle change or a
/// connect/disconnect halfway through its decisions.
#[derive(Debug, Default)]
pub struct ConsoleState {
    pub toggles: ToggleState,
    pub sessions: SessionRegistry,
    pub suppression: SuppressionCounter,
}

/// State-changed notifications for the display layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    Toggled { behavior: Behavior, on: bool },
    Triggered { action: Action },
    /// One-shot actions consumed by a tick.
    Fired { signals: Vec<Signal> },
    PeerConnected { id: ConnectionId, display_name: String },
    PeerDisconnected { id: ConnectionId },
}

/// Point-in-time copy of the console, for `/status` and the renderer.
#[derive(Debug, Clone, Serialize)]
pub struct ConsoleSnapshot {
    #[serde(skip)]
    pub toggles: ToggleState,
    pub behaviors: BTreeMap<&'static str, bool>,
    pub pending: BTreeMap<&'static str, bool>,
    pub suppression: u32,
    pub peer_count: usize,
    pub peers: Vec<PeerSummary>,
}

/// Shared handle to the toggle and session state.
///
/// Cheap to clone. All mutation goes through here so that every change is
/// followed by a [`ConsoleEvent`].
#[derive(Clone)]
pub struct Console {
    inner: Arc<Mutex<ConsoleState>>,
    events_tx: broadcast::Sender<ConsoleEvent>,
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Console {
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(Mutex::new(ConsoleState::default())),
            events_tx,
        }
    }

    /// Lock the state for a multi-field read or update.
    ///
    /// Callers that mutate through the guard are responsible for calling
    /// [`Console::notify`] after releasing it.
    pub fn lock(&self) -> MutexGuard<'_, ConsoleState> {
        self.inner.lock()
    }

    pub fn notify(&self, event: ConsoleEvent) {
        // Ignore error - means no display is listening
        let _ = self.events_tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConsoleEvent> {
        self.events_tx.subscribe()
    }

    /// Register a peer and return a guard that deregisters it on drop.
    pub fn connect(&self, id: ConnectionId, info: PeerInfo) -> PeerGuard {
        let (display_name, source) = (info.display_name.clone(), info.source_address);
        self.lock().sessions.add(id, info);
        self.connected(id, display_name, source)
    }

    /// Register a peer only if fewer than `max` are connected. The count
    /// check and the insert happen under one lock.
    pub fn try_connect(&self, id: ConnectionId, info: PeerInfo, max: usize) -> Option<PeerGuard> {
        let (display_name, source) = (info.display_name.clone(), info.source_address);
        {
            let mut state = self.lock();
            if state.sessions.count() >= max {
                return None;
            }
            state.sessions.add(id, info);
        }
        Some(self.connected(id, display_name, source))
    }

    fn connected(&self, id: ConnectionId, display_name: String, source: SocketAddr) -> PeerGuard {
        tracing::info!(peer = %id, name = %display_name, %source, "peer connected");
        self.notify(ConsoleEvent::PeerConnected { id, display_name });
        PeerGuard {
            console: self.clone(),
            id,
        }
    }

    /// Remove a peer. Returns `None` if it was not registered.
    pub fn disconnect(&self, id: &ConnectionId) -> Option<PeerInfo> {
        let removed = self.lock().sessions.remove(id);
        if let Some(ref info) = removed {
            tracing::info!(peer = %id, name = %info.display_name, "peer disconnected");
            self.notify(ConsoleEvent::PeerDisconnected { id: *id });
        }
        removed
    }

    pub fn peer_count(&self) -> usize {
        self.lock().sessions.count()
    }

    pub fn toggles(&self) -> ToggleState {
        self.lock().toggles.clone()
    }

    /// Feed one operator symbol through the command table.
    pub fn handle_symbol(&self, interpreter: &CommandInterpreter, symbol: Symbol) -> Outcome {
        let (outcome, toggles) = {
            let mut state = self.lock();
            let outcome = interpreter.interpret(&mut state.toggles, symbol);
            (outcome, state.toggles.clone())
        };
        match &outcome {
            Outcome::Applied(Command::Toggle(behavior)) => {
                let on = toggles.is_on(*behavior);
                tracing::debug!(%behavior, on, "behavior toggled");
                self.notify(ConsoleEvent::Toggled {
                    behavior: *behavior,
                    on,
                });
            }
            Outcome::Applied(Command::Trigger(action)) => {
                tracing::debug!(%action, "action armed");
                self.notify(ConsoleEvent::Triggered { action: *action });
            }
            Outcome::Forward(_) | Outcome::Ignored => {}
        }
        outcome
    }

    pub fn snapshot(&self) -> ConsoleSnapshot {
        let state = self.lock();
        ConsoleSnapshot {
            toggles: state.toggles.clone(),
            behaviors: state.toggles.behaviors(),
            pending: state.toggles.pending_actions(),
            suppression: state.suppression.value(),
            peer_count: state.sessions.count(),
            peers: state.sessions.snapshot(),
        }
    }
}

/// RAII registration of one peer. Dropping it deregisters the peer.
pub struct PeerGuard {
    console: Console,
    id: ConnectionId,
}

impl PeerGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for PeerGuard {
    fn drop(&mut self) {
        self.console.disconnect(&self.id);
    }
}
