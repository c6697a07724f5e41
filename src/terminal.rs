use crossterm::event::{self, Event};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, size};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::input::{decode_key, KeyInput};

/// How long the reader blocks in `poll` before checking whether the
/// receiving side has gone away.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Error, Debug)]
pub enum TerminalError {
    #[error("failed to enable raw mode: {0}")]
    EnableRawMode(#[source] std::io::Error),
}

/// RAII guard for terminal raw mode.
///
/// When created, enables raw mode on the terminal. When dropped (even on panic),
/// restores the terminal to its previous state.
///
/// Raw mode delivers every keystroke, Ctrl+C included, to the key reader
/// instead of letting the terminal driver act on it.
pub struct RawModeGuard {
    _private: (),
}

impl RawModeGuard {
    pub fn new() -> Result<Self, TerminalError> {
        enable_raw_mode().map_err(TerminalError::EnableRawMode)?;
        Ok(Self { _private: () })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

/// Get the current terminal size as (rows, cols).
pub fn terminal_size() -> anyhow::Result<(u16, u16)> {
    let (cols, rows) = size()?;
    Ok((rows, cols))
}

/// Read key events on a blocking thread and forward decoded input.
///
/// The thread exits when the receiver is dropped or reading the terminal
/// fails. Non-key events and keys with no meaning to the console are
/// discarded.
pub fn spawn_key_reader(tx: mpsc::Sender<KeyInput>) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        while !tx.is_closed() {
            match event::poll(POLL_INTERVAL) {
                Ok(false) => continue,
                Ok(true) => {}
                Err(e) => {
                    tracing::error!(error = %e, "terminal poll failed");
                    break;
                }
            }
            let key = match event::read() {
                Ok(Event::Key(key)) => key,
                Ok(_) => continue,
                Err(e) => {
                    tracing::error!(error = %e, "terminal read failed");
                    break;
                }
            };
            if let Some(input) = decode_key(&key) {
                if tx.blocking_send(input).is_err() {
                    break;
                }
            }
        }
        tracing::debug!("key reader stopped");
    })
}
