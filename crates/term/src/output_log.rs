//! Scrolling message log for output areas.
//!
//! Newest lines sit at the front. Each message is word-wrapped to the log's
//! width with `">> "` in front of its first line, and the oldest lines fall
//! off the back once the log is full.

use std::collections::VecDeque;

use crate::theme::Role;

/// Indent marking the start of a message.
pub const MESSAGE_INDENT: &str = ">> ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLog {
    lines: VecDeque<(String, Role)>,
    max_length: usize,
    max_lines: usize,
}

impl OutputLog {
    pub fn new(max_length: usize, max_lines: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(max_lines),
            max_length,
            max_lines,
        }
    }

    /// Add a message. Returns how many lines it wrapped to.
    pub fn push(&mut self, text: &str, role: Role) -> usize {
        let wrapped = wrap(text, self.max_length, MESSAGE_INDENT);
        let count = wrapped.len();
        for line in wrapped.into_iter().rev() {
            self.lines.push_front((line, role));
        }
        self.lines.truncate(self.max_lines);
        count
    }

    /// Lines newest first.
    pub fn lines(&self) -> impl Iterator<Item = (&str, Role)> + '_ {
        self.lines.iter().map(|(line, role)| (line.as_str(), *role))
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn max_lines(&self) -> usize {
        self.max_lines
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

/// Greedy word wrap to `width` characters.
///
/// `initial_indent` prefixes the first line and counts toward its width. Runs
/// of whitespace collapse to one space; words longer than a line are split.
/// Blank input wraps to no lines.
pub fn wrap(text: &str, width: usize, initial_indent: &str) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::from(initial_indent);
    let mut current_len = initial_indent.chars().count();
    let mut has_word = false;

    for word in text.split_whitespace() {
        let mut word = word;
        while !word.is_empty() {
            let word_len = word.chars().count();
            let sep = usize::from(has_word);

            if current_len + sep + word_len <= width {
                if has_word {
                    current.push(' ');
                }
                current.push_str(word);
                current_len += sep + word_len;
                has_word = true;
                break;
            }

            if has_word {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
                has_word = false;
                continue;
            }

            // A word too long for an empty line gets split.
            let room = width.saturating_sub(current_len).max(1);
            let split = word
                .char_indices()
                .nth(room)
                .map(|(i, _)| i)
                .unwrap_or(word.len());
            current.push_str(&word[..split]);
            lines.push(std::mem::take(&mut current));
            current_len = 0;
            word = &word[split..];
        }
    }

    if has_word {
        lines.push(current);
    }
    lines
}
