//! `portid pairwise <SEED_REF> <PERSONA> <PEER> [--save REF]`.
//!
//! Prints the public JWK of the key derived for the relationship. The key
//! is recomputed on every call; `--save` stores the pair for signing.

use portid_core::algorithm::{Algorithm, HashAlgorithm};
use portid_core::config::Config;
use portid_crypto::jwk::to_jwk;
use portid_crypto::CryptoOperations;
use tracing::{debug, info};

use super::{to_pretty_json, CommandError};
use crate::logging::redact_sensitive;

/// The `portid pairwise` handler.
#[derive(Debug, Clone)]
pub struct PairwiseCommand {
    /// Seed reference.
    pub seed: String,
    /// Persona identifier.
    pub persona: String,
    /// Peer identifier.
    pub peer: String,
    /// Reference to store the derived pair under.
    pub save: Option<String>,
}

impl PairwiseCommand {
    /// Derives the pair on the configured curve.
    ///
    /// # Errors
    ///
    /// Returns pairwise derivation or store errors.
    pub fn run(&self, ops: &CryptoOperations, config: &Config) -> Result<String, CommandError> {
        let algorithm = Algorithm::Ecdsa {
            named_curve: config.pairwise.curve.clone(),
            hash: HashAlgorithm::Sha256,
        };
        // Persona and peer together identify a relationship; keep them out
        // of log files.
        debug!(
            seed = %self.seed,
            persona = %redact_sensitive(&self.persona),
            peer = %redact_sensitive(&self.peer),
            "deriving pairwise key"
        );
        let mut pair = ops.generate_pairwise(&algorithm, &self.seed, &self.persona, &self.peer)?;

        if let Some(reference) = &self.save {
            pair = pair.with_kid(reference);
            ops.store().save(reference, pair.clone().into())?;
            info!(reference = %reference, "stored pairwise key");
        }

        to_pretty_json(&to_jwk(&pair.public_key)?)
    }
}
