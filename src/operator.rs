use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::broker::Broadcaster;
use crate::console::Console;
use crate::input::{CommandInterpreter, KeyInput, Outcome};

/// Apply operator key input until quit, input end, or shutdown.
///
/// Quit cancels `shutdown` so the rest of the process follows.
pub async fn run_operator<B: Broadcaster>(
    mut keys: mpsc::Receiver<KeyInput>,
    console: Console,
    interpreter: CommandInterpreter,
    out: B,
    shutdown: CancellationToken,
) {
    loop {
        let input = tokio::select! {
            _ = shutdown.cancelled() => break,
            input = keys.recv() => input,
        };
        match input {
            Some(KeyInput::Symbol(symbol)) => {
                if let Outcome::Forward(raw) = console.handle_symbol(&interpreter, symbol) {
                    out.keypress(raw);
                }
            }
            Some(KeyInput::Quit) => {
                tracing::info!("operator requested exit");
                shutdown.cancel();
                break;
            }
            None => {
                tracing::debug!("key input closed");
                break;
            }
        }
    }
}
