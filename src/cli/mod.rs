//! Command-line interface for playlist-drawer.
//!
//! Offline views of the engine's pure parts: snap point planning, gesture
//! classification, dedup keys and reconciliation.

mod commands;

pub use commands::{Cli, run_command, print_summary};
