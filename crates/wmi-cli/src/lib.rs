//! wmi-watch: terminal front end for the Licorn WMI push channel
//!
//! Follows a page's push channel and prints the lists it keeps in sync,
//! or sends single mutation requests.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
mod output;
pub mod watch;

pub use commands::{ColorArg, Cli, Commands, ConfigArgs, ConfigFormat, MutateArgs, WatchArgs};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{format_notice, Printer};
pub use watch::{run_mutate, run_watch, WatchSummary, Watcher};
