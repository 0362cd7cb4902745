//! Tooling
//!
//! Command-line surface over the reconciler.

pub mod cli;

pub use cli::{Cli, CliContext, Commands};
