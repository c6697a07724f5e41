//! Operator command table.
//!
//! Maps one input symbol to exactly one mutation of [`ToggleState`]. While
//! the keyboard is shared the table is bypassed: every symbol except escape
//! is handed back to the caller for forwarding to peers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::toggles::{Action, Behavior, ToggleState};

/// A single decoded operator input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Char(char),
    Escape,
}

/// A state transition the table can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Toggle(Behavior),
    Trigger(Action),
}

impl Command {
    pub const ALL: [Command; 9] = [
        Command::Toggle(Behavior::Wiggle),
        Command::Toggle(Behavior::Click),
        Command::Toggle(Behavior::Capitalize),
        Command::Toggle(Behavior::Subtle),
        Command::Toggle(Behavior::Pissoff),
        Command::Toggle(Behavior::KeyboardShare),
        Command::Trigger(Action::Rickroll),
        Command::Trigger(Action::Sleep),
        Command::Trigger(Action::Notification),
    ];

    pub fn apply(self, toggles: &mut ToggleState) {
        match self {
            Command::Toggle(behavior) => {
                toggles.toggle(behavior);
            }
            Command::Trigger(action) => toggles.trigger(action),
        }
    }
}

/// Result of feeding one symbol to the interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The symbol mapped to a command, which has been applied.
    Applied(Command),
    /// Keyboard sharing is on; the caller should broadcast this text on the
    /// keypress channel. No toggle was touched.
    Forward(String),
    /// Unrecognized symbol. Nothing changed.
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeymapError {
    #[error("key '{key}' is bound to both {first} and {second}")]
    Duplicate {
        key: char,
        first: &'static str,
        second: &'static str,
    },
    #[error("key for {command} must be a printable character, got {key:?}")]
    Unprintable { command: &'static str, key: char },
}

/// One key per command, as written in the `[keys]` config section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeyBindings {
    pub wiggle: char,
    pub click: char,
    pub capitalize: char,
    pub subtle: char,
    pub pissoff: char,
    pub keyboard_share: char,
    pub rickroll: char,
    pub sleep: char,
    pub notification: char,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            wiggle: 'w',
            click: 'r',
            capitalize: 'c',
            subtle: 's',
            pissoff: 'p',
            keyboard_share: 'k',
            rickroll: 'l',
            sleep: 'z',
            notification: 'n',
        }
    }
}

impl KeyBindings {
    pub fn key_for(&self, command: Command) -> char {
        match command {
            Command::Toggle(Behavior::Wiggle) => self.wiggle,
            Command::Toggle(Behavior::Click) => self.click,
            Command::Toggle(Behavior::Capitalize) => self.capitalize,
            Command::Toggle(Behavior::Subtle) => self.subtle,
            Command::Toggle(Behavior::Pissoff) => self.pissoff,
            Command::Toggle(Behavior::KeyboardShare) => self.keyboard_share,
            Command::Trigger(Action::Rickroll) => self.rickroll,
            Command::Trigger(Action::Sleep) => self.sleep,
            Command::Trigger(Action::Notification) => self.notification,
        }
    }
}

fn command_name(command: Command) -> &'static str {
    match command {
        Command::Toggle(b) => b.as_str(),
        Command::Trigger(a) => a.as_str(),
    }
}

/// Case-insensitive symbol → command table.
#[derive(Debug, Clone)]
pub struct CommandInterpreter {
    table: HashMap<char, Command>,
    bindings: KeyBindings,
}

impl CommandInterpreter {
    /// Build the table, rejecting bindings that collide once lowercased or
    /// that could never be typed.
    pub fn new(bindings: KeyBindings) -> Result<Self, KeymapError> {
        let mut table = HashMap::with_capacity(Command::ALL.len());
        for command in Command::ALL {
            let raw = bindings.key_for(command);
            if raw.is_control() || raw.is_whitespace() {
                return Err(KeymapError::Unprintable {
                    command: command_name(command),
                    key: raw,
                });
            }
            let key = fold(raw);
            if let Some(existing) = table.insert(key, command) {
                return Err(KeymapError::Duplicate {
                    key,
                    first: command_name(existing),
                    second: command_name(command),
                });
            }
        }
        Ok(Self { table, bindings })
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    /// Look up a symbol without applying it.
    pub fn lookup(&self, ch: char) -> Option<Command> {
        self.table.get(&fold(ch)).copied()
    }

    /// Apply one symbol to `toggles`.
    pub fn interpret(&self, toggles: &mut ToggleState, symbol: Symbol) -> Outcome {
        if toggles.keyboard_shared() {
            return match symbol {
                Symbol::Escape => {
                    toggles.set(Behavior::KeyboardShare, false);
                    Outcome::Applied(Command::Toggle(Behavior::KeyboardShare))
                }
                Symbol::Char(ch) => Outcome::Forward(ch.to_string()),
            };
        }

        let Symbol::Char(ch) = symbol else {
            return Outcome::Ignored;
        };
        match self.lookup(ch) {
            Some(command) => {
                command.apply(toggles);
                Outcome::Applied(command)
            }
            None => Outcome::Ignored,
        }
    }
}

impl Default for CommandInterpreter {
    fn default() -> Self {
        Self::new(KeyBindings::default()).expect("default key bindings are distinct")
    }
}

fn fold(ch: char) -> char {
    ch.to_lowercase().next().unwrap_or(ch)
}
