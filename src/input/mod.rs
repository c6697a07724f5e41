pub mod command;
pub mod keys;

pub use command::{Command, CommandInterpreter, KeyBindings, KeymapError, Outcome, Symbol};
pub use keys::{decode_key, KeyInput};
