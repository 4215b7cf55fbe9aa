//! # Command-Line Interface
//!
//! Thin shell over the storage layer.
//!
//! ## Commands
//!
//! | Command | Purpose | Example |
//! |---------|---------|---------|
//! | `get` | Read a key from one or more files | `kvf get .env .env.local PORT -d 8080` |
//! | `set` | Write a key into one or more files | `kvf set .env PORT 9090` |
//! | `list` | Dump every entry of a file | `kvf list .env --format json` |
//!
//! ## Exit Codes
//!
//! `0` when the value was found (or defaulted) or written, `1` otherwise.
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod get;
mod set;
mod list;

pub use app::{Cli, Commands, run};
pub use output::{Output, OutputFormat};
