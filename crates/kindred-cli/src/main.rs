//! # kindred CLI
//!
//! Command-line interface for kindred's "find similar work" search.
//!
//! This binary provides human-friendly access to `kindred-core`.
//! Run `kindred --help` for usage information.

mod cli;
pub mod ui;

use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run()
}
