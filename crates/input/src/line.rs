//! The line the player is typing.

use crate::map::InputAction;

/// Longest line accepted; further characters are dropped.
pub const MAX_LINE_LEN: usize = 140;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineBuffer {
    text: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    /// Append `c`. False if the line is full.
    pub fn push(&mut self, c: char) -> bool {
        if self.len() >= MAX_LINE_LEN {
            return false;
        }
        self.text.push(c);
        true
    }

    pub fn pop(&mut self) -> Option<char> {
        self.text.pop()
    }

    /// Take the line, leaving the buffer empty.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.text)
    }

    /// Apply an action. Returns the finished line on submit.
    ///
    /// `Quit` is left to the caller and does nothing here.
    pub fn apply(&mut self, action: InputAction) -> Option<String> {
        match action {
            InputAction::Char(c) => {
                self.push(c);
                None
            }
            InputAction::Backspace => {
                self.pop();
                None
            }
            InputAction::Submit => Some(self.take()),
            InputAction::Quit => None,
        }
    }
}
