//! Operator-controlled toggle state.
//!
//! Persistent behaviors stay on until flipped again. One-shot actions are
//! armed by the operator and consumed by the tick scheduler the first time a
//! tick runs with at least one peer connected.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A behavior that stays on until explicitly switched off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Behavior {
    Wiggle,
    Click,
    Capitalize,
    Subtle,
    Pissoff,
    KeyboardShare,
}

impl Behavior {
    pub const ALL: [Behavior; 6] = [
        Behavior::Wiggle,
        Behavior::Click,
        Behavior::Capitalize,
        Behavior::Subtle,
        Behavior::Pissoff,
        Behavior::KeyboardShare,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Behavior::Wiggle => "wiggle",
            Behavior::Click => "click",
            Behavior::Capitalize => "capitalize",
            Behavior::Subtle => "subtle",
            Behavior::Pissoff => "pissoff",
            Behavior::KeyboardShare => "keyboardShare",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Behavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A one-shot action: fires once per activation, then resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Rickroll,
    Sleep,
    Notification,
}

impl Action {
    /// Fixed firing order used by the scheduler.
    pub const ALL: [Action; 3] = [Action::Rickroll, Action::Sleep, Action::Notification];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Rickroll => "rickroll",
            Action::Sleep => "sleep",
            Action::Notification => "notification",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// On/off status of every behavior and pending status of every action.
///
/// All fields start cleared. The type itself has no locking; the
/// [`Console`](crate::console::Console) handle serializes access.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToggleState {
    persistent: [bool; 6],
    pending: [bool; 3],
}

impl ToggleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_on(&self, behavior: Behavior) -> bool {
        self.persistent[behavior.index()]
    }

    pub fn set(&mut self, behavior: Behavior, on: bool) {
        self.persistent[behavior.index()] = on;
    }

    /// Flip a behavior and return its new value.
    pub fn toggle(&mut self, behavior: Behavior) -> bool {
        let slot = &mut self.persistent[behavior.index()];
        *slot = !*slot;
        *slot
    }

    /// Arm a one-shot action. Arming an already pending action is a no-op:
    /// it still fires once.
    pub fn trigger(&mut self, action: Action) {
        self.pending[action.index()] = true;
    }

    pub fn is_pending(&self, action: Action) -> bool {
        self.pending[action.index()]
    }

    /// Clear the pending flag and report whether it was set.
    ///
    /// Takes `&mut self`, so the read and the clear cannot be split by
    /// another holder of the console lock.
    pub fn consume_if_pending(&mut self, action: Action) -> bool {
        std::mem::replace(&mut self.pending[action.index()], false)
    }

    /// True while keyboard input is routed to peers instead of the table.
    pub fn keyboard_shared(&self) -> bool {
        self.is_on(Behavior::KeyboardShare)
    }

    /// Number of behaviors that are on plus actions that are pending.
    pub fn active_count(&self) -> usize {
        self.persistent.iter().chain(self.pending.iter()).filter(|v| **v).count()
    }

    pub fn behaviors(&self) -> BTreeMap<&'static str, bool> {
        Behavior::ALL.iter().map(|b| (b.as_str(), self.is_on(*b))).collect()
    }

    pub fn pending_actions(&self) -> BTreeMap<&'static str, bool> {
        Action::ALL.iter().map(|a| (a.as_str(), self.is_pending(*a))).collect()
    }
}
