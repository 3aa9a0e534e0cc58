//! # CLI
//!
//! - [`args`] - clap definitions
//! - [`commands`] - command handlers
//! - [`context`] - configuration loading and key store selection
//! - [`passphrase`] - key store passphrase input
//!
//! Handlers return their stdout text instead of printing, so they can be
//! driven from tests with an in-memory key store.

pub mod args;
pub mod commands;
pub mod context;
pub mod passphrase;

pub use args::{
    Cli, Commands, JwsCommands, JwsSignArgs, JwsVerifyArgs, KeyAlgorithmArg, KeyCommands,
    KeyExportArgs, KeyGenerateArgs, KeySeedArgs, PairwiseArgs,
};
pub use commands::CommandError;
pub use context::CommandContext;
