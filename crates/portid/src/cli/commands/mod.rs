//! # Command Handlers
//!
//! - [`init`] - write the default configuration
//! - [`key`] - generate, seed, list, and export keys
//! - [`pairwise`] - derive a pairwise key
//! - [`jws`] - sign and verify tokens
//!
//! Each handler returns the text destined for stdout. `main` maps
//! [`CommandError`] to an exit code and a message on stderr.

pub mod exit_codes;
pub mod init;
pub mod jws;
pub mod key;
pub mod pairwise;

use std::io::{self, Read};
use std::path::Path;

use portid_core::error::{ConfigError, CryptoError, JoseError, StoreError};
use portid_core::jwk::JsonWebKey;

use super::passphrase::PassphraseError;

pub use init::InitCommand;
pub use jws::{JwsSignCommand, JwsVerifyCommand};
pub use key::{KeyExportCommand, KeyGenerateCommand, KeyListCommand, KeySeedCommand};
pub use pairwise::PairwiseCommand;

/// Failures of any command.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// `init` found an existing configuration.
    #[error("portid is already initialized ({path}); use --force to overwrite")]
    AlreadyInitialized {
        /// The existing config file.
        path: String,
    },

    /// A reference that must not be overwritten is taken.
    #[error("'{reference}' already exists; use --force to replace it")]
    AlreadyExists {
        /// The occupied reference.
        reference: String,
    },

    /// Malformed command-line input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Key store error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Cryptographic error.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// JWS error.
    #[error(transparent)]
    Jose(#[from] JoseError),

    /// Passphrase input error.
    #[error(transparent)]
    Passphrase(#[from] PassphraseError),

    /// JSON output or key file error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File or stdin I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CommandError {
    /// Create an `InvalidInput` error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

/// Returns `arg`, or all of stdin when `arg` is `-`.
///
/// # Errors
///
/// Returns an I/O error if stdin cannot be read.
pub fn read_argument(arg: &str) -> Result<String, CommandError> {
    if arg != "-" {
        return Ok(arg.to_string());
    }
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;
    Ok(input)
}

/// Reads a JWK from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a JWK.
pub fn read_jwk(path: &Path) -> Result<JsonWebKey, CommandError> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
        CommandError::invalid_input(format!("{} is not a JWK: {e}", path.display()))
    })
}

fn to_pretty_json(jwk: &JsonWebKey) -> Result<String, CommandError> {
    Ok(serde_json::to_string_pretty(jwk)?)
}
