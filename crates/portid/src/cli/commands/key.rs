//! # Key Commands
//!
//! `portid key generate | seed | list | export`.
//!
//! `generate` and `export` print JWKs as pretty JSON. Seeds are never
//! printed; `export --private` of a seed is the only way to back one up.

use std::collections::BTreeMap;

use portid_core::algorithm::{Algorithm, HashAlgorithm};
use portid_core::config::Config;
use portid_core::jwk::JsonWebKey;
use portid_crypto::{CryptoOperations, SecretKey};
use tracing::info;

use super::{to_pretty_json, CommandError};
use crate::cli::args::KeyAlgorithmArg;
use crate::logging::log_security_event;

// ============================================================================
// generate
// ============================================================================

/// `portid key generate <REF> [--alg ALG]`.
#[derive(Debug, Clone)]
pub struct KeyGenerateCommand {
    /// Store reference, also the key id.
    pub reference: String,
    /// Requested algorithm.
    pub alg: KeyAlgorithmArg,
}

impl KeyGenerateCommand {
    /// Generates and stores the key.
    ///
    /// Returns the public JWK for key pairs and a confirmation line for
    /// HMAC secrets.
    ///
    /// # Errors
    ///
    /// Returns key generation or store errors.
    pub fn run(&self, ops: &CryptoOperations, config: &Config) -> Result<String, CommandError> {
        let algorithm = self.alg.to_algorithm(config.rsa.modulus_length);

        if self.alg.is_secret() {
            ops.generate_key(&self.reference, &algorithm)?;
            info!(reference = %self.reference, alg = %self.alg, "generated secret key");
            return Ok(format!("Generated {} key '{}'", self.alg, self.reference));
        }

        ops.generate_key_pair(&self.reference, &algorithm)?;
        info!(reference = %self.reference, alg = %self.alg, "generated key pair");
        to_pretty_json(&ops.export_jwk(&self.reference, true)?)
    }
}

// ============================================================================
// seed
// ============================================================================

/// `portid key seed <REF> [--force]`.
#[derive(Debug, Clone)]
pub struct KeySeedCommand {
    /// Store reference for the seed.
    pub reference: String,
    /// Replace an existing entry.
    pub force: bool,
}

impl KeySeedCommand {
    /// Stores a fresh random 32-byte seed as an HMAC-SHA512 secret.
    ///
    /// # Errors
    ///
    /// - [`CommandError::AlreadyExists`] if the reference is taken and `force` is off
    /// - store errors
    pub fn run(&self, ops: &CryptoOperations) -> Result<String, CommandError> {
        match ops.store().get(&self.reference, false) {
            Ok(_) if !self.force => {
                return Err(CommandError::AlreadyExists {
                    reference: self.reference.clone(),
                })
            }
            Ok(_) => {}
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err.into()),
        }

        let seed = SecretKey::generate();
        let mut jwk = JsonWebKey::oct(seed.as_bytes());
        jwk.kid = Some(self.reference.clone());
        ops.import_jwk(
            &self.reference,
            &jwk,
            &Algorithm::hmac(HashAlgorithm::Sha512),
        )?;

        info!(reference = %self.reference, "stored pairwise seed");
        Ok(format!("Stored pairwise seed '{}'", self.reference))
    }
}

// ============================================================================
// list
// ============================================================================

/// `portid key list`.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyListCommand;

impl KeyListCommand {
    /// Renders references and key ids, sorted by reference.
    ///
    /// Takes the listing rather than a store so the file store can be listed
    /// from its index without a passphrase.
    #[must_use]
    pub fn run(self, keys: &BTreeMap<String, String>) -> String {
        if keys.is_empty() {
            return "No keys stored.".to_string();
        }

        let width = keys.keys().map(String::len).max().unwrap_or(0).max(3);
        let mut out = format!("{:<width$}  KID", "REF");
        for (reference, kid) in keys {
            out.push_str(&format!("\n{reference:<width$}  {kid}"));
        }
        out
    }
}

// ============================================================================
// export
// ============================================================================

/// `portid key export <REF> [--private]`.
#[derive(Debug, Clone)]
pub struct KeyExportCommand {
    /// Store reference.
    pub reference: String,
    /// Include private members.
    pub private: bool,
}

impl KeyExportCommand {
    /// Exports the key as JWK JSON.
    ///
    /// # Errors
    ///
    /// - `KeyNotFound` / `NoPublicKey` from the store
    /// - `NonExtractable` for a private export of protected material
    pub fn run(&self, ops: &CryptoOperations) -> Result<String, CommandError> {
        let jwk = ops.export_jwk(&self.reference, !self.private)?;
        if self.private {
            log_security_event("private_key_export", &self.reference);
        }
        to_pretty_json(&jwk)
    }
}
