//! Process entry points and the control CLI surface :
//! argument parsing, config assembly, logging setup, and the thin
//! handler functions each `src/bin/*.rs` target calls into.

pub mod args;
pub mod client;
pub mod commands;
pub mod logging;
