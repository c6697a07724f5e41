//! Wire format for frames pushed to websocket peers.
//!
//! Every frame is a JSON text message of the form
//! `{"event": <channel>, "data": <payload>}`. Clients key their behavior off
//! the exact spelling of the `message` payloads, so [`Signal::as_str`] is a
//! compatibility contract.

use serde::{Deserialize, Serialize};

use crate::toggles::{Action, Behavior};

/// Payload vocabulary of the `message` channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Rickroll,
    Sleep,
    Notification,
    Wiggle,
    Click,
    Capitalize,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Rickroll => "rickroll",
            Signal::Sleep => "sleep",
            Signal::Notification => "notification",
            Signal::Wiggle => "wiggle",
            Signal::Click => "click",
            Signal::Capitalize => "capitalize",
        }
    }

    /// The signal a probabilistic behavior emits, if it emits one at all.
    pub fn for_behavior(behavior: Behavior) -> Option<Self> {
        match behavior {
            Behavior::Wiggle => Some(Signal::Wiggle),
            Behavior::Click => Some(Signal::Click),
            Behavior::Capitalize => Some(Signal::Capitalize),
            Behavior::Subtle | Behavior::Pissoff | Behavior::KeyboardShare => None,
        }
    }
}

impl From<Action> for Signal {
    fn from(action: Action) -> Self {
        match action {
            Action::Rickroll => Signal::Rickroll,
            Action::Sleep => Signal::Sleep,
            Action::Notification => Signal::Notification,
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A frame fanned out to every connected peer, or sent to one peer on
/// connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Sent once to a newly registered peer with its connection id.
    Connected(String),
    /// A scheduled or one-shot annoyance.
    Message(Signal),
    /// Raw operator input forwarded while the keyboard is shared.
    Keypress(String),
}

impl ServerFrame {
    /// Name of the logical channel this frame travels on.
    pub fn channel(&self) -> &'static str {
        match self {
            ServerFrame::Connected(_) => "connected",
            ServerFrame::Message(_) => "message",
            ServerFrame::Keypress(_) => "keypress",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
