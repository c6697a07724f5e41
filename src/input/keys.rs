//! Decoding of terminal key events into operator symbols.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::Symbol;

/// What a key press means to the console loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Symbol(Symbol),
    /// Ctrl+C: stop the server.
    Quit,
}

/// Decode a crossterm key event.
///
/// # Decoding rules:
/// - Release/repeat events -> None
/// - Ctrl+C -> Quit
/// - Esc -> Escape
/// - Ctrl+letter -> matching control character (Ctrl+A -> 0x01)
/// - printable char -> that char (shift already applied)
/// - Enter -> '\r', Tab -> '\t', Backspace -> 0x7f
/// - anything else -> None
pub fn decode_key(event: &KeyEvent) -> Option<KeyInput> {
    if event.kind != KeyEventKind::Press {
        return None;
    }

    let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
    let ch = match event.code {
        KeyCode::Char('c') | KeyCode::Char('C') if ctrl => return Some(KeyInput::Quit),
        KeyCode::Esc => return Some(KeyInput::Symbol(Symbol::Escape)),
        KeyCode::Char(c) if ctrl && c.is_ascii_alphabetic() => {
            ((c.to_ascii_lowercase() as u8) & 0x1f) as char
        }
        KeyCode::Char(c) => c,
        KeyCode::Enter => '\r',
        KeyCode::Tab => '\t',
        KeyCode::Backspace => '\u{7f}',
        _ => return None,
    };
    Some(KeyInput::Symbol(Symbol::Char(ch)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn test_printable_char() {
        let event = key(KeyCode::Char('w'), KeyModifiers::NONE);
        assert_eq!(decode_key(&event), Some(KeyInput::Symbol(Symbol::Char('w'))));
    }

    #[test]
    fn test_shifted_char_kept_verbatim() {
        let event = key(KeyCode::Char('W'), KeyModifiers::SHIFT);
        assert_eq!(decode_key(&event), Some(KeyInput::Symbol(Symbol::Char('W'))));
    }

    #[test]
    fn test_ctrl_c_quits() {
        let event = key(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(decode_key(&event), Some(KeyInput::Quit));
    }

    #[test]
    fn test_ctrl_letter_becomes_control_char() {
        let event = key(KeyCode::Char('a'), KeyModifiers::CONTROL);
        assert_eq!(
            decode_key(&event),
            Some(KeyInput::Symbol(Symbol::Char('\u{1}')))
        );
    }

    #[test]
    fn test_escape() {
        let event = key(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(decode_key(&event), Some(KeyInput::Symbol(Symbol::Escape)));
    }

    #[test]
    fn test_editing_keys() {
        assert_eq!(
            decode_key(&key(KeyCode::Enter, KeyModifiers::NONE)),
            Some(KeyInput::Symbol(Symbol::Char('\r')))
        );
        assert_eq!(
            decode_key(&key(KeyCode::Tab, KeyModifiers::NONE)),
            Some(KeyInput::Symbol(Symbol::Char('\t')))
        );
        assert_eq!(
            decode_key(&key(KeyCode::Backspace, KeyModifiers::NONE)),
            Some(KeyInput::Symbol(Symbol::Char('\u{7f}')))
        );
    }

    #[test]
    fn test_release_ignored() {
        let mut event = key(KeyCode::Char('w'), KeyModifiers::NONE);
        event.kind = KeyEventKind::Release;
        assert_eq!(decode_key(&event), None);
    }

    #[test]
    fn test_unmapped_key_ignored() {
        assert_eq!(decode_key(&key(KeyCode::F(5), KeyModifiers::NONE)), None);
        assert_eq!(decode_key(&key(KeyCode::Up, KeyModifiers::NONE)), None);
    }
}
