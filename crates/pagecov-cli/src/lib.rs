//! pagecov CLI library
//!
//! Command-line front end for the pagecov harness: resolves a run
//! configuration, visits every configured page in its own test and reports
//! the results. Each test leaves `v8-coverage.json` in its output directory
//! when the browser supports coverage.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
mod output;
mod runner;

pub use commands::{Cli, ColorArg, Commands, ConfigArgs, RunArgs, SettingsArgs};
pub use config::RunConfig;
pub use error::{CliError, CliResult};
pub use output::LineReporter;
pub use runner::{page_visit_suite, run, run_with, RunOutcome, SUITE_NAME};

/// Log filter used when `RUST_LOG` is not set
#[must_use]
pub const fn default_log_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}
