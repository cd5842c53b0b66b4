//! Loginflow CLI Library
//!
//! Command-line interface for the login-flow acceptance suite.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

mod commands;
mod config;
mod error;
mod output;
mod runner;

pub use commands::{Cli, ColorArg, Commands, DriverArg, ListArgs, RunArgs, WindowPolicyArg};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{case_line, outcome_line, progress_char, ProgressReporter};
pub use runner::{build_suite_config, SuiteRunner};
