//! Integer prompt validation.
//!
//! Rules, in order:
//!
//! 1. Empty input is a skip if skipping is allowed, otherwise invalid.
//! 2. A value in the allowed list is accepted even outside the range.
//! 3. A value outside `min..=max` or in the disallowed list is rejected.

use thiserror::Error;

/// Shown on the line above the input line after a rejected answer.
pub const INVALID_MESSAGE: &str = "Invalid input. Please enter a valid integer.";

const DEFAULT_MIN: i64 = -1_000_000_000;
const DEFAULT_MAX: i64 = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptAnswer {
    Value(i64),
    /// The player pressed enter on an empty line.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidInput {
    #[error("no value entered")]
    Empty,

    #[error("not an integer: {0:?}")]
    NotANumber(String),

    #[error("{value} is outside {min}..={max}")]
    OutOfRange { value: i64, min: i64, max: i64 },

    #[error("{0} is not allowed")]
    Disallowed(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntPrompt {
    min: i64,
    max: i64,
    disallowed: Vec<i64>,
    allowed: Vec<i64>,
    allow_skip: bool,
}

impl Default for IntPrompt {
    fn default() -> Self {
        Self::new(DEFAULT_MIN, DEFAULT_MAX)
    }
}

impl IntPrompt {
    /// Accept `min..=max`.
    pub fn new(min: i64, max: i64) -> Self {
        Self {
            min,
            max,
            disallowed: Vec::new(),
            allowed: Vec::new(),
            allow_skip: false,
        }
    }

    pub fn disallow(mut self, values: impl IntoIterator<Item = i64>) -> Self {
        self.disallowed.extend(values);
        self
    }

    /// Values accepted regardless of the range.
    pub fn allow(mut self, values: impl IntoIterator<Item = i64>) -> Self {
        self.allowed.extend(values);
        self
    }

    pub fn allow_skip(mut self, allow: bool) -> Self {
        self.allow_skip = allow;
        self
    }

    pub fn validate(&self, input: &str) -> Result<PromptAnswer, InvalidInput> {
        let input = input.trim();
        if input.is_empty() {
            return if self.allow_skip {
                Ok(PromptAnswer::Skip)
            } else {
                Err(InvalidInput::Empty)
            };
        }

        let value: i64 = input
            .parse()
            .map_err(|_| InvalidInput::NotANumber(input.to_string()))?;

        if self.allowed.contains(&value) {
            return Ok(PromptAnswer::Value(value));
        }
        if value < self.min || value > self.max {
            return Err(InvalidInput::OutOfRange {
                value,
                min: self.min,
                max: self.max,
            });
        }
        if self.disallowed.contains(&value) {
            return Err(InvalidInput::Disallowed(value));
        }
        Ok(PromptAnswer::Value(value))
    }
}
