//! # JWS Commands
//!
//! `portid jws sign` signs with a stored key. `portid jws verify` checks a
//! token against JWK files given on the command line and does not open the
//! key store.

use portid_core::algorithm::{Algorithm, HashAlgorithm};
use portid_core::config::{Config, JwsFormat};
use portid_core::jwk::{JsonWebKey, KeyTypeTag};
use portid_crypto::{CryptoKey, CryptoOperations};
use portid_jose::{from_jwa, Header, JwsToken, VerifyOptions};
use tracing::debug;

use super::CommandError;

/// `portid jws sign <REF> <PAYLOAD> [--format] [--kid]`.
#[derive(Debug, Clone)]
pub struct JwsSignCommand {
    /// Signing key reference.
    pub reference: String,
    /// Payload bytes.
    pub payload: Vec<u8>,
    /// Output format; `[jws] format` when absent.
    pub format: Option<JwsFormat>,
    /// Protected-header `kid` override.
    pub kid: Option<String>,
}

impl JwsSignCommand {
    /// Signs the payload and serializes the token.
    ///
    /// # Errors
    ///
    /// Returns key lookup, signing, or serialization errors.
    pub fn run(&self, ops: &CryptoOperations, config: &Config) -> Result<String, CommandError> {
        let mut header = Header::new();
        if let Some(kid) = &self.kid {
            header.insert("kid".to_string(), kid.clone());
        }

        let mut token = JwsToken::new(&self.payload);
        token.sign(ops, &self.reference, &header)?;
        Ok(token.serialize(self.format.unwrap_or(config.jws.format))?)
    }
}

/// `portid jws verify <TOKEN> [--key FILE]... [--all]`.
#[derive(Debug, Clone)]
pub struct JwsVerifyCommand {
    /// Serialized token.
    pub token: String,
    /// Candidate verification keys.
    pub keys: Vec<JsonWebKey>,
    /// Verification options.
    pub options: VerifyOptions,
}

impl JwsVerifyCommand {
    /// Parses and verifies the token.
    ///
    /// Returns `Ok(false)` for a well-formed token that does not verify.
    ///
    /// # Errors
    ///
    /// Returns an error for an unparseable token or an unusable key.
    pub fn run(&self, ops: &CryptoOperations) -> Result<bool, CommandError> {
        let token = JwsToken::deserialize(&self.token)?;
        let candidates = self
            .keys
            .iter()
            .map(|jwk| candidate_key(ops, jwk))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            signatures = token.signatures().len(),
            candidates = candidates.len(),
            "verifying JWS"
        );
        Ok(token.verify(ops, &candidates, self.options))
    }
}

/// Imports the public half of `jwk`, choosing the algorithm from its `alg`
/// member or, failing that, its key type.
fn candidate_key(ops: &CryptoOperations, jwk: &JsonWebKey) -> Result<CryptoKey, CommandError> {
    let mut public = jwk.to_public().ok_or_else(|| {
        CommandError::invalid_input("symmetric keys cannot verify a JWS from the command line")
    })?;
    // A sign-only private JWK projects to no operations at all.
    if public.key_ops.as_ref().is_some_and(Vec::is_empty) {
        public.key_ops = None;
    }

    let algorithm = match (public.alg.as_deref(), public.kty) {
        (Some(alg), _) => from_jwa(alg)?,
        (None, KeyTypeTag::Ec) => Algorithm::es256k(),
        (None, KeyTypeTag::Rsa) => Algorithm::rsassa(HashAlgorithm::Sha256),
        (None, KeyTypeTag::Oct) => {
            return Err(CommandError::invalid_input("oct key without public members"))
        }
    };

    Ok(ops.import_key(&public, &algorithm, true)?)
}
