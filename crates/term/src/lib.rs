//! Terminal multiplexer for the player screen.
//!
//! One physical terminal is split into independently addressable
//! [`Viewport`]s: the four player terminal quadrants and any number of boxed
//! output logs. A [`Screen`] owns them all, together with the active
//! [`Theme`], and is the only thing that writes to the terminal.
//!
//! Content for a viewport is written in the viewport's own coordinates.
//! Cursor sequences inside it are shifted by [`escape::translate`] before they
//! reach the terminal, so collaborators never need to know where on the
//! screen a viewport lives.
//!
//! ```
//! use terminal_monopoly_term::{Screen, Theme};
//!
//! let mut screen = Screen::with_terminals(Vec::new(), Theme::plain());
//! assert!(screen.update("Terminal 1", "hello", true).unwrap());
//! assert!(!screen.update("Terminal 1", "hello", true).unwrap());
//! ```

pub mod escape;
pub mod graphics;
pub mod output_log;
pub mod screen;
pub mod theme;
pub mod viewport;
pub mod vt;

pub use terminal_monopoly_types as types;

pub use escape::{cursor_str, translate};
pub use output_log::{wrap, OutputLog, MESSAGE_INDENT};
pub use screen::{Screen, INPUT_HOME};
pub use theme::{Role, Theme};
pub use viewport::{fit_line, Border, Content, RenderFn, Surface, Viewport};
pub use vt::{Cell, VirtualTerminal};
