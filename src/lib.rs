//! Terminal Monopoly (workspace facade crate).
//!
//! Re-exports the member crates under short names so binaries and tests can
//! write `terminal_monopoly::{net, term, input, types}`. The implementation
//! lives in dedicated crates under `crates/`.

pub mod logging;

pub use terminal_monopoly_input as input;
pub use terminal_monopoly_net as net;
pub use terminal_monopoly_term as term;
pub use terminal_monopoly_types as types;
