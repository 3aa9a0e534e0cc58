//! # portid
//!
//! Library half of the `portid` binary: logging setup and the CLI command
//! handlers, exposed so the handlers can be tested without a terminal.
//!
//! ```no_run
//! use clap::Parser;
//! use portid::cli::Cli;
//!
//! let cli = Cli::parse();
//! println!("verbosity: {}", cli.verbose);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cli;
pub mod logging;

pub use logging::{
    init_logging, log_security_event, redact_sensitive, verbosity_to_level, LogConfig, LogError,
    LogFormat, LogGuard, LogLevel,
};
