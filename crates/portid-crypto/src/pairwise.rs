//! Deterministic per-peer key derivation.
//!
//! One seed yields a different, unlinkable key pair for every
//! `(persona, peer)` relationship:
//!
//! 1. `master = HMAC-SHA512(seed.k, persona_id)`, cached per seed and persona.
//! 2. For counter `c = 0, 1, ..`:
//!    `candidate = HMAC-SHA256(master, peer_id || be32(c))`, with the counter
//!    omitted when `c = 0`. The candidate is reduced modulo the curve order
//!    and accepted when `0 < d < n - 1`.
//! 3. The accepted scalar is the private key; the public key is `d·G`.
//!
//! Both HMAC steps run through [`CryptoOperations`], so a registered
//! hardware HMAC provider is used when present. Only secp256k1 has a
//! deterministic derivation, and only with the SHA-256 hash the ECDSA provider
//! signs with; RSA, other curves, and other hashes are refused.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use k256::elliptic_curve::ops::Reduce;
use k256::{FieldBytes, Scalar, U256};
use portid_core::algorithm::{Algorithm, HashAlgorithm, KeyType};
use portid_core::error::{CryptoError, PairwiseKeyError};
use portid_core::jwk::JsonWebKey;
use tracing::{debug, trace};
use zeroize::Zeroizing;

use crate::key::CryptoKeyPair;
use crate::operations::CryptoOperations;
use crate::provider::ec;

/// Default number of candidate scalars tried before giving up.
///
/// A candidate is rejected with probability about 2^-128, so the limit only
/// matters for a broken HMAC provider.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1024;

type MasterKey = Zeroizing<Vec<u8>>;
type CacheSlot = Arc<Mutex<Option<MasterKey>>>;

/// Pairwise key generator with its persona master-key cache.
///
/// The cache holds one slot per `(seed reference, persona)`. Deriving for
/// the same persona serialises on that slot; different personas proceed
/// independently.
pub struct PairwiseKeyGenerator {
    cache: Mutex<HashMap<(String, String), CacheSlot>>,
    max_attempts: u32,
}

impl PairwiseKeyGenerator {
    /// Creates a generator with an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Sets the number of candidates tried per peer.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Number of cached master keys.
    #[must_use]
    pub fn cached_personas(&self) -> usize {
        self.cache.lock().map_or(0, |cache| {
            cache
                .values()
                .filter(|slot| slot.lock().is_ok_and(|master| master.is_some()))
                .count()
        })
    }

    /// Drops every cached master key.
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    /// Derives the pair for `(persona_id, peer_id)`.
    ///
    /// # Errors
    ///
    /// - [`PairwiseKeyError::UnsupportedAlgorithm`] for anything but ECDSA on secp256k1
    /// - [`PairwiseKeyError::InvalidSeed`] if the seed is not a readable secret key
    /// - [`PairwiseKeyError::DerivationExhausted`] if every candidate is rejected
    /// - store errors (e.g. `KeyNotFound`) for the seed reference
    pub fn generate(
        &self,
        ops: &CryptoOperations,
        algorithm: &Algorithm,
        seed_reference: &str,
        persona_id: &str,
        peer_id: &str,
    ) -> Result<CryptoKeyPair, CryptoError> {
        match algorithm {
            Algorithm::Ecdsa { named_curve, hash }
                if ec::is_secp256k1(named_curve) && *hash == HashAlgorithm::Sha256 => {}
            other => {
                return Err(PairwiseKeyError::unsupported_algorithm(other.to_string()).into())
            }
        }

        let master = self.master_key(ops, seed_reference, persona_id)?;
        let scalar = self.derive_scalar(ops, &master, peer_id)?;
        debug!(seed = seed_reference, "derived pairwise key");
        ec::key_pair_from_scalar(algorithm, scalar.as_slice(), true)
    }

    /// Returns the persona master key, computing and caching it on first use.
    ///
    /// # Errors
    ///
    /// [`PairwiseKeyError::InvalidSeed`] or store errors for the seed.
    pub fn master_key(
        &self,
        ops: &CryptoOperations,
        seed_reference: &str,
        persona_id: &str,
    ) -> Result<MasterKey, CryptoError> {
        let slot = {
            let mut cache = self.cache.lock().map_err(|_| lock_poisoned())?;
            Arc::clone(
                cache
                    .entry((seed_reference.to_string(), persona_id.to_string()))
                    .or_default(),
            )
        };

        let mut master = slot.lock().map_err(|_| lock_poisoned())?;
        if let Some(cached) = master.as_ref() {
            debug!(seed = seed_reference, "master key cache hit");
            return Ok(cached.clone());
        }

        let computed = Self::compute_master_key(ops, seed_reference, persona_id)?;
        *master = Some(computed.clone());
        Ok(computed)
    }

    fn compute_master_key(
        ops: &CryptoOperations,
        seed_reference: &str,
        persona_id: &str,
    ) -> Result<MasterKey, CryptoError> {
        let seed = ops.store().get(seed_reference, false)?;
        if seed.key_type != KeyType::Secret {
            return Err(PairwiseKeyError::invalid_seed(seed_reference).into());
        }
        let seed_bytes = seed
            .raw_bytes()
            .map_err(|_| PairwiseKeyError::invalid_seed(seed_reference))?;

        let algorithm = Algorithm::hmac(HashAlgorithm::Sha512);
        let hmac_key = ops.import_key(&JsonWebKey::oct(seed_bytes), &algorithm, false)?;
        let master = ops.sign_with_key(persona_id.as_bytes(), &hmac_key, &algorithm)?;
        Ok(Zeroizing::new(master))
    }

    fn derive_scalar(
        &self,
        ops: &CryptoOperations,
        master: &[u8],
        peer_id: &str,
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let algorithm = Algorithm::hmac(HashAlgorithm::Sha256);
        let hmac_key = ops.import_key(&JsonWebKey::oct(master), &algorithm, false)?;
        let n_minus_one = -Scalar::ONE;

        for counter in 0..self.max_attempts {
            let mut message = peer_id.as_bytes().to_vec();
            if counter > 0 {
                message.extend_from_slice(&counter.to_be_bytes());
            }

            let candidate = Zeroizing::new(ops.sign_with_key(&message, &hmac_key, &algorithm)?);
            if candidate.len() != ec::PRIVATE_KEY_LEN {
                return Err(CryptoError::crypto(format!(
                    "HMAC-SHA256 produced {} bytes",
                    candidate.len()
                )));
            }

            let d = <Scalar as Reduce<U256>>::reduce_bytes(FieldBytes::from_slice(&candidate));
            if bool::from(d.is_zero()) || d == n_minus_one {
                trace!(counter, "rejected pairwise candidate");
                continue;
            }
            return Ok(Zeroizing::new(d.to_bytes().to_vec()));
        }

        Err(PairwiseKeyError::DerivationExhausted.into())
    }
}

fn lock_poisoned() -> CryptoError {
    CryptoError::crypto("pairwise cache lock poisoned")
}

impl Default for PairwiseKeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PairwiseKeyGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairwiseKeyGenerator")
            .field("cached_personas", &self.cached_personas())
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;
    use portid_core::algorithm::KeyUsage;
    use portid_core::error::StoreError;

    use crate::key::CryptoKey;

    fn ops_with_seed() -> CryptoOperations {
        let ops = CryptoOperations::in_memory();
        ops.import_jwk(
            "seed",
            &JsonWebKey::oct(b"abcdefg"),
            &Algorithm::hmac(HashAlgorithm::Sha256),
        )
        .unwrap();
        ops
    }

    #[test]
    fn test_master_key_is_cached() {
        let ops = ops_with_seed();
        let generator = PairwiseKeyGenerator::new();
        assert_eq!(generator.cached_personas(), 0);

        let first = generator.master_key(&ops, "seed", "persona").unwrap();
        let second = generator.master_key(&ops, "seed", "persona").unwrap();
        assert_eq!(first.as_slice(), second.as_slice());
        assert_eq!(first.len(), 64);
        assert_eq!(generator.cached_personas(), 1);

        generator.clear_cache();
        assert_eq!(generator.cached_personas(), 0);
    }

    #[test]
    fn test_missing_seed_is_key_not_found() {
        let ops = CryptoOperations::in_memory();
        let err = ops
            .generate_pairwise(&Algorithm::es256k(), "absent", "p", "q")
            .unwrap_err();
        assert!(matches!(err, CryptoError::Store(StoreError::KeyNotFound { .. })));
    }

    #[test]
    fn test_asymmetric_seed_is_invalid() {
        let ops = CryptoOperations::in_memory();
        ops.generate_key_pair("ec", &Algorithm::es256k()).unwrap();
        let err = ops
            .generate_pairwise(&Algorithm::es256k(), "ec", "p", "q")
            .unwrap_err();
        assert!(matches!(
            err,
            CryptoError::Pairwise(PairwiseKeyError::InvalidSeed { .. })
        ));
    }

    #[test]
    fn test_handle_seed_is_invalid() {
        let ops = CryptoOperations::in_memory();
        let seed = CryptoKey::from_handle(
            KeyType::Secret,
            Algorithm::hmac(HashAlgorithm::Sha512),
            [KeyUsage::Sign],
            "enclave:seed",
        );
        ops.store().save("hw-seed", seed.into()).unwrap();
        assert!(matches!(
            ops.generate_pairwise(&Algorithm::es256k(), "hw-seed", "p", "q"),
            Err(CryptoError::Pairwise(PairwiseKeyError::InvalidSeed { .. }))
        ));
    }

    #[test]
    fn test_rsa_is_unsupported() {
        let ops = ops_with_seed();
        let err = ops
            .generate_pairwise(&Algorithm::rsassa(HashAlgorithm::Sha256), "seed", "p", "q")
            .unwrap_err();
        assert!(matches!(
            err,
            CryptoError::Pairwise(PairwiseKeyError::UnsupportedAlgorithm { .. })
        ));
    }

    #[test]
    fn test_secp256k1_with_other_hash_is_unsupported() {
        let ops = ops_with_seed();
        for hash in [HashAlgorithm::Sha384, HashAlgorithm::Sha512] {
            let algorithm = Algorithm::Ecdsa {
                named_curve: "secp256k1".to_string(),
                hash,
            };
            assert!(matches!(
                ops.generate_pairwise(&algorithm, "seed", "p", "q"),
                Err(CryptoError::Pairwise(PairwiseKeyError::UnsupportedAlgorithm { .. }))
            ));
        }
    }

    #[test]
    fn test_zero_attempts_exhausts() {
        let ops = ops_with_seed()
            .with_pairwise_generator(PairwiseKeyGenerator::new().with_max_attempts(0));
        assert!(matches!(
            ops.generate_pairwise(&Algorithm::es256k(), "seed", "p", "q"),
            Err(CryptoError::Pairwise(PairwiseKeyError::DerivationExhausted))
        ));
    }

    #[test]
    fn test_pair_is_consistent() {
        let ops = ops_with_seed();
        let pair = ops
            .generate_pairwise(&Algorithm::es256k(), "seed", "persona", "peer")
            .unwrap();
        let signature = ops
            .sign_with_key(b"msg", &pair.private_key, &Algorithm::es256k())
            .unwrap();
        assert!(ops
            .verify(
                b"msg",
                &signature,
                crate::operations::KeySource::Key(&pair.public_key),
                &Algorithm::es256k()
            )
            .unwrap());
    }
}
