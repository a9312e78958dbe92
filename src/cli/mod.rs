//! # Command-Line Interface
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `init` | Create the data directory and its git repository |
//! | `show` | Print a sample task (default when no command is given) |
//! | `create` | Create a task and commit it |
//! | `help` | Print usage for the tool or one command |
//!
//! ## Global Flags
//!
//! - `--color {auto,always,never}` - colorize log labels
//! - `--format {text,json}` - how objects are printed
//! - `--log-file <path>` - also append log lines to a file
//! - `--verbose` - log debug messages
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod object;
mod output;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
