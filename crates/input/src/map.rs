//! Key mapping from terminal events to input-line actions.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// What a key press does to the input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Char(char),
    Backspace,
    Submit,
    Quit,
}

/// Map a key event to an input action. Releases and unbound keys give `None`.
pub fn map_key(key: KeyEvent) -> Option<InputAction> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if should_quit(key) {
        return Some(InputAction::Quit);
    }

    match key.code {
        KeyCode::Enter => Some(InputAction::Submit),
        KeyCode::Backspace => Some(InputAction::Backspace),
        KeyCode::Char(_) if key.modifiers.contains(KeyModifiers::CONTROL) => None,
        KeyCode::Char(c) => Some(InputAction::Char(c)),
        _ => None,
    }
}

/// Check if key should quit the client.
pub fn should_quit(key: KeyEvent) -> bool {
    key.code == KeyCode::Esc
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
}
