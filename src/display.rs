//! Operator status screen.
//!
//! [`render`] is a pure function from a [`ConsoleSnapshot`] to screen lines.
//! [`spawn_renderer`] redraws the whole screen after every
//! [`ConsoleEvent`](crate::console::ConsoleEvent).

use crossterm::{
    cursor::MoveTo,
    queue,
    style::Stylize,
    terminal::{Clear, ClearType},
};
use std::io::Write;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::console::{Console, ConsoleSnapshot};
use crate::input::{Command, KeyBindings};
use crate::terminal::terminal_size;
use crate::toggles::{Action, Behavior};

pub const FACE_SLEEPING: &str = "(-.-)Zzz...";
pub const FACE_ANGRY: &str = "(⋟﹏⋞)";
pub const FACE_PISSED: &str = "┌∩┐(◣_◢)┌∩┐";
pub const FACE_RAGE: &str = "ლ(ಠ益ಠ)ლ";

/// Face for the given number of active toggles and pending one-shots.
/// More than three goes back to sleeping.
pub fn face(active: usize) -> &'static str {
    match active {
        1 => FACE_ANGRY,
        2 => FACE_PISSED,
        3 => FACE_RAGE,
        _ => FACE_SLEEPING,
    }
}

/// One line of the status screen. `state` is drawn as a coloured ON/OFF
/// prefix when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub state: Option<bool>,
    pub text: String,
}

impl Line {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            state: None,
            text: text.into(),
        }
    }

    fn flag(on: bool, text: impl Into<String>) -> Self {
        Self {
            state: Some(on),
            text: text.into(),
        }
    }
}

impl std::fmt::Display for Line {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.state {
            Some(true) => write!(f, "ON\t: {}", self.text),
            Some(false) => write!(f, "OFF\t: {}", self.text),
            None => f.write_str(&self.text),
        }
    }
}

fn behavior_label(behavior: Behavior) -> &'static str {
    match behavior {
        Behavior::Wiggle => "Wiggle mouse",
        Behavior::Click => "Randomly click",
        Behavior::Capitalize => "Randomly capitalise",
        Behavior::Subtle => "Subtle mode",
        Behavior::Pissoff => "Piss off mode",
        Behavior::KeyboardShare => "Toggle share keyboard",
    }
}

fn action_label(action: Action) -> &'static str {
    match action {
        Action::Rickroll => "Rickroll",
        Action::Sleep => "Sleep",
        Action::Notification => "Notification",
    }
}

/// Lay out the status screen.
pub fn render(snapshot: &ConsoleSnapshot, keys: &KeyBindings) -> Vec<Line> {
    let toggles = &snapshot.toggles;
    if toggles.keyboard_shared() {
        return vec![Line::plain("Keyboard sharing is ON. Press ESC to disable.")];
    }

    let face = face(toggles.active_count());
    let noun = if snapshot.peer_count == 1 {
        "coworker"
    } else {
        "coworkers"
    };
    let rule = format!(
        "-{}---{}--------------------",
        "-".repeat(face.chars().count()),
        "-".repeat(snapshot.peer_count.to_string().len()),
    );

    let mut lines = vec![
        Line::plain(format!(" {face} | {} {noun} connected.", snapshot.peer_count)),
        Line::plain(rule.clone()),
    ];

    for behavior in Behavior::ALL {
        let on = match behavior {
            Behavior::Subtle => {
                toggles.is_on(Behavior::Subtle) && !toggles.is_on(Behavior::Pissoff)
            }
            other => toggles.is_on(other),
        };
        let key = keys.key_for(Command::Toggle(behavior)).to_uppercase();
        lines.push(Line::flag(
            on,
            format!("{} [ {key} ]", behavior_label(behavior)),
        ));
    }

    lines.push(Line::plain(rule.clone()));
    for action in Action::ALL {
        let key = keys.key_for(Command::Trigger(action));
        let pending = if toggles.is_pending(action) {
            " (armed)"
        } else {
            ""
        };
        lines.push(Line::plain(format!("{} [{key}]{pending}", action_label(action))));
    }
    lines.push(Line::plain("Exit [ Ctrl + C ]"));
    lines.push(Line::plain(rule));
    lines.push(Line::plain("Press desired key to toggle features"));
    lines
}

/// Columns taken by the `ON\t: ` / `OFF\t: ` prefix with 8-column tab stops.
pub const FLAG_PREFIX_WIDTH: usize = 10;

/// Cut each line's text so the drawn line, prefix included, fits in `cols`.
pub fn clip(lines: &mut [Line], cols: usize) {
    for line in lines {
        let budget = match line.state {
            Some(_) => cols.saturating_sub(FLAG_PREFIX_WIDTH),
            None => cols,
        };
        if line.text.chars().count() > budget {
            line.text = line.text.chars().take(budget).collect();
        }
    }
}

/// Clear the screen and write `lines` from the top-left corner.
///
/// Raw mode is usually on, so each line ends in `\r\n`.
pub fn draw<W: Write>(out: &mut W, lines: &[Line]) -> std::io::Result<()> {
    queue!(out, Clear(ClearType::All), MoveTo(0, 0))?;
    for line in lines {
        match line.state {
            Some(true) => write!(out, "{}\t: {}\r\n", "ON".green(), line.text)?,
            Some(false) => write!(out, "{}\t: {}\r\n", "OFF".red(), line.text)?,
            None => write!(out, "{}\r\n", line.text)?,
        }
    }
    out.flush()
}

/// Redraw the status screen on stdout after every console event.
pub fn spawn_renderer(
    console: Console,
    keys: KeyBindings,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let mut events = console.subscribe();
    tokio::spawn(async move {
        loop {
            let mut lines = render(&console.snapshot(), &keys);
            if let Ok((_, cols)) = terminal_size() {
                clip(&mut lines, cols as usize);
            }
            if let Err(e) = draw(&mut std::io::stdout(), &lines) {
                tracing::warn!(error = %e, "status redraw failed");
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Ok(event) => tracing::trace!(?event, "redraw"),
                    Err(RecvError::Lagged(n)) => tracing::trace!(skipped = n, "redraw after lag"),
                    Err(RecvError::Closed) => break,
                },
            }
        }
    })
}
