//! The public crypto facade.
//!
//! [`CryptoOperations`] combines a [`KeyStore`] with a [`CryptoRegistry`]:
//! it fetches keys by reference, resolves the provider for the key's role,
//! and delegates. Errors from the store, the registry, and the providers
//! reach the caller untranslated; nothing here retries.
//!
//! # Example
//!
//! ```
//! use portid_core::algorithm::{Algorithm, HashAlgorithm};
//! use portid_crypto::operations::{CryptoOperations, KeySource};
//!
//! let ops = CryptoOperations::in_memory();
//! let public = ops.generate_key_pair("did-signing", &Algorithm::es256k()).expect("generate");
//!
//! let signature = ops.sign(b"hello", "did-signing", &Algorithm::es256k()).expect("sign");
//! assert!(ops
//!     .verify(b"hello", &signature, KeySource::Key(&public), &Algorithm::es256k())
//!     .expect("verify"));
//! assert!(!ops
//!     .verify(b"hellO", &signature, KeySource::Reference("did-signing"), &Algorithm::es256k())
//!     .expect("verify"));
//!
//! let digest = ops.digest(HashAlgorithm::Sha256, b"abc").expect("digest");
//! assert_eq!(digest.len(), 32);
//! ```

use std::sync::Arc;

use portid_core::algorithm::{Algorithm, HashAlgorithm, KeyType, ProviderScope};
use portid_core::error::{CryptoError, StoreError};
use portid_core::jwk::{JsonWebKey, KeyTypeTag};
use tracing::debug;

use crate::key::{CryptoKey, CryptoKeyPair, KeyEntry};
use crate::pairwise::PairwiseKeyGenerator;
use crate::provider::CryptoProvider;
use crate::registry::CryptoRegistry;
use crate::store::{KeyStore, MemoryKeyStore};

/// Where a verification or encryption key comes from.
#[derive(Debug, Clone, Copy)]
pub enum KeySource<'a> {
    /// Look the public key up in the store.
    Reference(&'a str),
    /// Use this key directly.
    Key(&'a CryptoKey),
}

/// Store + registry facade.
pub struct CryptoOperations {
    store: Arc<dyn KeyStore>,
    registry: CryptoRegistry,
    pairwise: PairwiseKeyGenerator,
}

impl std::fmt::Debug for CryptoOperations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoOperations")
            .field("registry", &self.registry)
            .field("pairwise", &self.pairwise)
            .finish_non_exhaustive()
    }
}

impl CryptoOperations {
    /// Creates the facade over `store` and `registry`.
    #[must_use]
    pub fn new(store: Arc<dyn KeyStore>, registry: CryptoRegistry) -> Self {
        Self {
            store,
            registry,
            pairwise: PairwiseKeyGenerator::new(),
        }
    }

    /// Replaces the pairwise generator (e.g. to change its attempt limit).
    #[must_use]
    pub fn with_pairwise_generator(mut self, pairwise: PairwiseKeyGenerator) -> Self {
        self.pairwise = pairwise;
        self
    }

    /// A facade over a fresh [`MemoryKeyStore`] and the default providers.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKeyStore::new()), CryptoRegistry::with_defaults())
    }

    /// The backing key store.
    #[must_use]
    pub fn store(&self) -> &dyn KeyStore {
        self.store.as_ref()
    }

    /// The provider registry.
    #[must_use]
    pub const fn registry(&self) -> &CryptoRegistry {
        &self.registry
    }

    /// The pairwise generator and its master-key cache.
    #[must_use]
    pub const fn pairwise(&self) -> &PairwiseKeyGenerator {
        &self.pairwise
    }

    fn provider(
        &self,
        algorithm: &Algorithm,
        scope: ProviderScope,
    ) -> Result<&dyn CryptoProvider, CryptoError> {
        let provider = self.registry.resolve(algorithm.name(), scope)?;
        debug!(algorithm = %algorithm, %scope, provider = provider.name(), "resolved provider");
        Ok(provider)
    }

    // ------------------------------------------------------------------------
    // Generation and import
    // ------------------------------------------------------------------------

    /// Generates a key pair, stores it under `reference` (which also becomes
    /// its `kid`), and returns the public half.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::UnsupportedAlgorithm`] if no private-scope provider is registered
    /// - [`CryptoError::UnsupportedParameter`] if the provider rejects `algorithm`
    /// - [`CryptoError::Store`] if the store rejects the write
    pub fn generate_key_pair(
        &self,
        reference: &str,
        algorithm: &Algorithm,
    ) -> Result<CryptoKey, CryptoError> {
        let provider = self.provider(algorithm, ProviderScope::Private)?;
        let pair = provider.generate_key_pair(algorithm, true)?.with_kid(reference);
        let public = pair.public_key.clone();
        self.store.save(reference, KeyEntry::Pair(pair))?;
        debug!(reference, algorithm = %algorithm, "generated key pair");
        Ok(public)
    }

    /// Generates a secret key and stores it under `reference`.
    ///
    /// # Errors
    ///
    /// As [`Self::generate_key_pair`], resolving a secret-scope provider.
    pub fn generate_key(&self, reference: &str, algorithm: &Algorithm) -> Result<(), CryptoError> {
        let provider = self.provider(algorithm, ProviderScope::Secret)?;
        let key = provider.generate_key(algorithm, true)?.with_kid(reference);
        self.store.save(reference, KeyEntry::Key(key))?;
        debug!(reference, algorithm = %algorithm, "generated secret key");
        Ok(())
    }

    /// Builds a key from a JWK without storing it.
    ///
    /// The provider scope follows from the JWK: `oct` is secret, a JWK with
    /// private members is private, anything else public.
    ///
    /// # Errors
    ///
    /// Provider import errors, or [`CryptoError::UnsupportedAlgorithm`].
    pub fn import_key(
        &self,
        jwk: &JsonWebKey,
        algorithm: &Algorithm,
        extractable: bool,
    ) -> Result<CryptoKey, CryptoError> {
        let scope = match jwk.kty {
            KeyTypeTag::Oct => ProviderScope::Secret,
            _ if jwk.is_private() => ProviderScope::Private,
            _ => ProviderScope::Public,
        };
        self.provider(algorithm, scope)?
            .import_jwk(algorithm, jwk, extractable)
    }

    /// Imports a JWK and stores it under `reference`.
    ///
    /// # Errors
    ///
    /// As [`Self::import_key`], plus store failures.
    pub fn import_jwk(
        &self,
        reference: &str,
        jwk: &JsonWebKey,
        algorithm: &Algorithm,
    ) -> Result<CryptoKey, CryptoError> {
        let key = self.import_key(jwk, algorithm, true)?;
        self.store.save(reference, KeyEntry::Key(key.clone()))?;
        debug!(reference, algorithm = %algorithm, "imported key");
        Ok(key)
    }

    /// Exports the key under `reference` as a JWK.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::Store`] (`KeyNotFound`, `NoPublicKey`)
    /// - [`CryptoError::NonExtractable`] for non-extractable private material
    pub fn export_jwk(&self, reference: &str, public_only: bool) -> Result<JsonWebKey, CryptoError> {
        let key = self.store.get(reference, public_only)?;
        self.provider(&key.algorithm, key.key_type.scope())?
            .export_jwk(&key)
    }

    // ------------------------------------------------------------------------
    // Sign / verify
    // ------------------------------------------------------------------------

    /// Signs `data` with the private (or secret) key under `reference`.
    ///
    /// # Errors
    ///
    /// [`StoreError::KeyNotFound`] via [`CryptoError::Store`], registry
    /// errors, and provider errors.
    pub fn sign(
        &self,
        data: &[u8],
        reference: &str,
        algorithm: &Algorithm,
    ) -> Result<Vec<u8>, CryptoError> {
        let key = self.store.get(reference, false)?;
        debug!(reference, algorithm = %algorithm, "signing");
        self.sign_with_key(data, &key, algorithm)
    }

    /// Signs `data` with an explicit key.
    ///
    /// # Errors
    ///
    /// [`CryptoError::InvalidKey`] if the key belongs to another algorithm
    /// family, plus registry and provider errors.
    pub fn sign_with_key(
        &self,
        data: &[u8],
        key: &CryptoKey,
        algorithm: &Algorithm,
    ) -> Result<Vec<u8>, CryptoError> {
        ensure_family(key, algorithm)?;
        self.provider(algorithm, key.key_type.scope())?
            .sign(algorithm, key, data)
    }

    /// Checks `signature` over `data`.
    ///
    /// A stored reference is looked up as its public projection; a stored
    /// secret (HMAC) key is used as is. A signature that does not match is
    /// `Ok(false)`, never an error.
    ///
    /// # Errors
    ///
    /// Store, registry, and key errors.
    pub fn verify(
        &self,
        data: &[u8],
        signature: &[u8],
        key: KeySource<'_>,
        algorithm: &Algorithm,
    ) -> Result<bool, CryptoError> {
        let key = self.resolve_public(key)?;
        ensure_family(&key, algorithm)?;
        let scope = match key.key_type {
            KeyType::Secret => ProviderScope::Secret,
            KeyType::Public | KeyType::Private => ProviderScope::Public,
        };
        self.provider(algorithm, scope)?
            .verify(algorithm, &key, signature, data)
    }

    fn resolve_public(&self, source: KeySource<'_>) -> Result<CryptoKey, CryptoError> {
        match source {
            KeySource::Key(key) => Ok(key.clone()),
            KeySource::Reference(reference) => match self.store.get(reference, true) {
                Err(StoreError::NoPublicKey { .. }) => Ok(self.store.get(reference, false)?),
                other => Ok(other?),
            },
        }
    }

    // ------------------------------------------------------------------------
    // Digest / encryption
    // ------------------------------------------------------------------------

    /// Hashes `data`.
    ///
    /// # Errors
    ///
    /// [`CryptoError::UnsupportedAlgorithm`] for unregistered hashes (SHA-1).
    pub fn digest(&self, hash: HashAlgorithm, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let algorithm = Algorithm::digest(hash);
        self.provider(&algorithm, ProviderScope::All)?
            .digest(&algorithm, data)
    }

    /// Encrypts `data` to a public key.
    ///
    /// # Errors
    ///
    /// Store, registry, and provider errors.
    pub fn encrypt(
        &self,
        data: &[u8],
        key: KeySource<'_>,
        algorithm: &Algorithm,
    ) -> Result<Vec<u8>, CryptoError> {
        let key = self.resolve_public(key)?;
        ensure_family(&key, algorithm)?;
        self.provider(algorithm, ProviderScope::Public)?
            .encrypt(algorithm, &key, data)
    }

    /// Decrypts `data` with the private key under `reference`.
    ///
    /// # Errors
    ///
    /// Store, registry, and provider errors.
    pub fn decrypt(
        &self,
        data: &[u8],
        reference: &str,
        algorithm: &Algorithm,
    ) -> Result<Vec<u8>, CryptoError> {
        let key = self.store.get(reference, false)?;
        ensure_family(&key, algorithm)?;
        self.provider(algorithm, ProviderScope::Private)?
            .decrypt(algorithm, &key, data)
    }

    // ------------------------------------------------------------------------
    // Pairwise
    // ------------------------------------------------------------------------

    /// Derives the pairwise key pair for `(persona_id, peer_id)` from the
    /// seed under `seed_reference`. The result is not stored.
    ///
    /// # Errors
    ///
    /// [`CryptoError::Pairwise`] for unsupported algorithms or a non-`oct`
    /// seed, [`CryptoError::Store`] if the seed is missing.
    pub fn generate_pairwise(
        &self,
        algorithm: &Algorithm,
        seed_reference: &str,
        persona_id: &str,
        peer_id: &str,
    ) -> Result<CryptoKeyPair, CryptoError> {
        self.pairwise
            .generate(self, algorithm, seed_reference, persona_id, peer_id)
    }
}

fn ensure_family(key: &CryptoKey, algorithm: &Algorithm) -> Result<(), CryptoError> {
    if key.algorithm.name() == algorithm.name() {
        Ok(())
    } else {
        Err(CryptoError::invalid_key(format!(
            "{} key cannot be used with {}",
            key.algorithm.name(),
            algorithm.name()
        )))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;
    use portid_core::algorithm::{KeyUsage, DEFAULT_MODULUS_LENGTH};

    #[test]
    fn test_generate_key_pair_stores_pair() {
        let ops = CryptoOperations::in_memory();
        let public = ops.generate_key_pair("k1", &Algorithm::es256k()).unwrap();

        assert_eq!(public.key_type, KeyType::Public);
        assert_eq!(public.kid.as_deref(), Some("k1"));
        assert_eq!(ops.store().get("k1", false).unwrap().key_type, KeyType::Private);
        assert_eq!(
            ops.store().list().unwrap().get("k1").map(String::as_str),
            Some("k1")
        );
    }

    #[test]
    fn test_sign_missing_reference() {
        let ops = CryptoOperations::in_memory();
        let err = ops.sign(b"x", "absent", &Algorithm::es256k()).unwrap_err();
        assert!(matches!(err, CryptoError::Store(StoreError::KeyNotFound { .. })));
        assert!(err.to_string().contains("absent"));
    }

    #[test]
    fn test_rejects_unsupported_curve() {
        let ops = CryptoOperations::in_memory();
        let p256 = Algorithm::Ecdsa {
            named_curve: "P-256".to_string(),
            hash: HashAlgorithm::Sha256,
        };
        assert!(matches!(
            ops.generate_key_pair("k", &p256),
            Err(CryptoError::UnsupportedParameter { .. })
        ));
    }

    #[test]
    fn test_digest_sha1_unregistered() {
        let ops = CryptoOperations::in_memory();
        let err = ops.digest(HashAlgorithm::Sha1, b"").unwrap_err();
        assert!(matches!(err, CryptoError::UnsupportedAlgorithm { ref name } if name == "SHA-1"));
    }

    #[test]
    fn test_hmac_sign_verify_by_reference() {
        let ops = CryptoOperations::in_memory();
        let alg = Algorithm::hmac(HashAlgorithm::Sha256);
        ops.generate_key("mac", &alg).unwrap();

        let tag = ops.sign(b"data", "mac", &alg).unwrap();
        assert!(ops.verify(b"data", &tag, KeySource::Reference("mac"), &alg).unwrap());
        assert!(!ops.verify(b"dada", &tag, KeySource::Reference("mac"), &alg).unwrap());
    }

    #[test]
    fn test_family_mismatch() {
        let ops = CryptoOperations::in_memory();
        ops.generate_key_pair("ec", &Algorithm::es256k()).unwrap();
        let err = ops
            .sign(b"x", "ec", &Algorithm::rsassa(HashAlgorithm::Sha256))
            .unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKey { .. }));
    }

    #[test]
    fn test_import_export_jwk() {
        let ops = CryptoOperations::in_memory();
        ops.generate_key_pair("source", &Algorithm::es256k()).unwrap();
        let private = ops.export_jwk("source", false).unwrap();
        assert!(private.is_private());

        ops.import_jwk("restored", &private, &Algorithm::es256k()).unwrap();
        let signature = ops.sign(b"m", "restored", &Algorithm::es256k()).unwrap();
        assert!(ops
            .verify(b"m", &signature, KeySource::Reference("source"), &Algorithm::es256k())
            .unwrap());

        let public = ops.export_jwk("restored", true).unwrap();
        assert!(!public.is_private());
        assert_eq!(public.x, private.x);
        assert_eq!(public.kid, private.kid);
    }

    #[test]
    fn test_export_secret_public_only_fails() {
        let ops = CryptoOperations::in_memory();
        ops.generate_key("mac", &Algorithm::hmac(HashAlgorithm::Sha256))
            .unwrap();
        assert!(matches!(
            ops.export_jwk("mac", true),
            Err(CryptoError::Store(StoreError::NoPublicKey { .. }))
        ));
    }

    #[test]
    fn test_rsa_oaep_roundtrip() {
        let ops = CryptoOperations::in_memory();
        let alg = Algorithm::RsaOaep {
            modulus_length: DEFAULT_MODULUS_LENGTH,
            hash: HashAlgorithm::Sha256,
        };
        let public = ops.generate_key_pair("enc", &alg).unwrap();
        assert!(public.usages.contains(&KeyUsage::Encrypt));

        let ciphertext = ops.encrypt(b"secret", KeySource::Key(&public), &alg).unwrap();
        assert_eq!(ops.decrypt(&ciphertext, "enc", &alg).unwrap(), b"secret");
    }
}
