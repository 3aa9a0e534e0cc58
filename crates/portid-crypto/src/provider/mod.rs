//! Algorithm providers.
//!
//! One [`CryptoProvider`] per algorithm family. A provider validates its own
//! algorithm parameters and fails with [`CryptoError::UnsupportedParameter`]
//! when it cannot honour them, so the registry never inspects parameters.
//! Operations a family does not have fall through to the default methods,
//! which fail with [`CryptoError::UnsupportedOperation`].
//!
//! # Example
//!
//! ```
//! use portid_core::algorithm::{Algorithm, HashAlgorithm};
//! use portid_crypto::provider::{CryptoProvider, ShaProvider};
//!
//! let sha = ShaProvider;
//! let digest = sha
//!     .digest(&Algorithm::digest(HashAlgorithm::Sha256), b"abc")
//!     .expect("digest");
//! assert_eq!(digest.len(), 32);
//!
//! // SHA providers do not sign.
//! assert!(sha.generate_key(&Algorithm::digest(HashAlgorithm::Sha256), true).is_err());
//! ```

pub mod ec;
pub mod hmac;
pub mod oaep;
pub mod rsa;
pub mod sha;

pub use ec::EcdsaProvider;
pub use hmac::HmacProvider;
pub use oaep::RsaOaepProvider;
pub use rsa::RsaSsaProvider;
pub use sha::ShaProvider;

use portid_core::algorithm::{Algorithm, KeyType, KeyUsage};
use portid_core::error::CryptoError;
use portid_core::jwk::JsonWebKey;

use crate::jwk;
use crate::key::{CryptoKey, CryptoKeyPair};

/// An implementation of one algorithm family.
///
/// Implementations must be `Send + Sync`; the registry shares them across
/// threads behind an `Arc`.
pub trait CryptoProvider: Send + Sync {
    /// The algorithm family name, e.g. `ECDSA`.
    fn name(&self) -> &'static str;

    /// Usages a generated private key carries.
    fn private_key_usages(&self) -> &'static [KeyUsage] {
        &[]
    }

    /// Usages a generated public key carries.
    fn public_key_usages(&self) -> &'static [KeyUsage] {
        &[]
    }

    /// Usages a generated symmetric key carries.
    fn symmetric_key_usages(&self) -> &'static [KeyUsage] {
        &[]
    }

    /// Generates a symmetric key.
    ///
    /// # Errors
    ///
    /// [`CryptoError::UnsupportedOperation`] unless overridden.
    fn generate_key(
        &self,
        algorithm: &Algorithm,
        extractable: bool,
    ) -> Result<CryptoKey, CryptoError> {
        let _ = (algorithm, extractable);
        Err(self.unsupported("generateKey"))
    }

    /// Generates an asymmetric key pair.
    ///
    /// # Errors
    ///
    /// [`CryptoError::UnsupportedOperation`] unless overridden.
    fn generate_key_pair(
        &self,
        algorithm: &Algorithm,
        extractable: bool,
    ) -> Result<CryptoKeyPair, CryptoError> {
        let _ = (algorithm, extractable);
        Err(self.unsupported("generateKeyPair"))
    }

    /// Signs `data` (or computes a MAC over it).
    ///
    /// # Errors
    ///
    /// [`CryptoError::UnsupportedOperation`] unless overridden.
    fn sign(
        &self,
        algorithm: &Algorithm,
        key: &CryptoKey,
        data: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let _ = (algorithm, key, data);
        Err(self.unsupported("sign"))
    }

    /// Checks `signature` over `data`.
    ///
    /// A signature that is malformed or does not match is `Ok(false)`; errors
    /// are reserved for unusable keys and parameters.
    ///
    /// # Errors
    ///
    /// [`CryptoError::UnsupportedOperation`] unless overridden.
    fn verify(
        &self,
        algorithm: &Algorithm,
        key: &CryptoKey,
        signature: &[u8],
        data: &[u8],
    ) -> Result<bool, CryptoError> {
        let _ = (algorithm, key, signature, data);
        Err(self.unsupported("verify"))
    }

    /// Hashes `data`.
    ///
    /// # Errors
    ///
    /// [`CryptoError::UnsupportedOperation`] unless overridden.
    fn digest(&self, algorithm: &Algorithm, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let _ = (algorithm, data);
        Err(self.unsupported("digest"))
    }

    /// Encrypts `data` to `key`.
    ///
    /// # Errors
    ///
    /// [`CryptoError::UnsupportedOperation`] unless overridden.
    fn encrypt(
        &self,
        algorithm: &Algorithm,
        key: &CryptoKey,
        data: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let _ = (algorithm, key, data);
        Err(self.unsupported("encrypt"))
    }

    /// Decrypts `data` with `key`.
    ///
    /// # Errors
    ///
    /// [`CryptoError::UnsupportedOperation`] unless overridden.
    fn decrypt(
        &self,
        algorithm: &Algorithm,
        key: &CryptoKey,
        data: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let _ = (algorithm, key, data);
        Err(self.unsupported("decrypt"))
    }

    /// Builds a key from a JWK.
    ///
    /// # Errors
    ///
    /// [`CryptoError::UnsupportedOperation`] unless overridden.
    fn import_jwk(
        &self,
        algorithm: &Algorithm,
        jwk: &JsonWebKey,
        extractable: bool,
    ) -> Result<CryptoKey, CryptoError> {
        let _ = (algorithm, jwk, extractable);
        Err(self.unsupported("importKey"))
    }

    /// Serializes a key as a JWK.
    ///
    /// Private and secret keys are only exported when extractable.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::NonExtractable`] for non-extractable private or secret keys
    /// - [`CryptoError::InvalidKey`] if the material cannot be encoded
    fn export_jwk(&self, key: &CryptoKey) -> Result<JsonWebKey, CryptoError> {
        if key.key_type != KeyType::Public && !key.extractable {
            return Err(CryptoError::NonExtractable);
        }
        jwk::to_jwk(key)
    }

    /// Shorthand for an `UnsupportedOperation` error naming this provider.
    fn unsupported(&self, operation: &str) -> CryptoError {
        CryptoError::unsupported_operation(self.name(), operation)
    }
}

/// Rejects a descriptor of the wrong family.
pub(crate) fn wrong_family(provider: &str, algorithm: &Algorithm) -> CryptoError {
    CryptoError::unsupported_parameter(provider, format!("name={}", algorithm.name()))
}
