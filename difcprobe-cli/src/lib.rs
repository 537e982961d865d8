//! difcprobe CLI library
//!
//! The binary in `main.rs` is a thin wrapper; argument parsing, output
//! rendering, and command handlers live here so integration tests can
//! drive them directly.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
