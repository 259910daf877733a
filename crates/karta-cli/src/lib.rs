//! Command-line tooling for karta feature files.
//!
//! The `karta` binary checks that feature files compile, prints their
//! structured YAML or JSON form, and lists scenarios selected by tags or a
//! tag expression.

pub mod cli;
pub mod config;
pub mod logging;

pub use cli::{Cli, Commands, Format, run};
