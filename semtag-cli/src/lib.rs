//! semtag CLI
//!
//! Argument parsing, logging setup, command dispatch and error rendering
//! for the `semtag` binary.

pub mod args;
pub mod commands;
pub mod error;
pub mod telemetry;

pub use args::Cli;
pub use error::{CliError, CliResult};
