//! Runtime key handles.
//!
//! A [`CryptoKey`] is an immutable value: its role, algorithm, permitted
//! usages, and material. Material is either raw bytes the SDK may read, or an
//! opaque handle owned by an external (typically hardware) key store whose
//! bytes are never exposed.
//!
//! Raw encodings:
//!
//! | Key | Encoding |
//! |-----|----------|
//! | EC private | 32-byte big-endian scalar |
//! | EC public | 65-byte uncompressed SEC1 point |
//! | RSA private / public | PKCS#1 DER |
//! | HMAC secret | raw key bytes |

use std::collections::BTreeSet;
use std::fmt;

use portid_core::algorithm::{Algorithm, KeyType, KeyUsage};
use portid_core::error::CryptoError;
use zeroize::Zeroizing;

use crate::provider::{ec, rsa};

/// Key material: readable bytes or an opaque external handle.
#[derive(Clone)]
pub enum KeyMaterial {
    /// Bytes held in process memory, zeroized on drop.
    Raw(Zeroizing<Vec<u8>>),
    /// Reference into an external key store. Signing with it requires a
    /// provider that understands the handle.
    Handle(String),
}

impl KeyMaterial {
    /// Wraps raw bytes.
    #[must_use]
    pub fn raw(bytes: Vec<u8>) -> Self {
        Self::Raw(Zeroizing::new(bytes))
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw(bytes) => write!(f, "Raw([REDACTED; {}])", bytes.len()),
            Self::Handle(handle) => f.debug_tuple("Handle").field(handle).finish(),
        }
    }
}

/// A key as seen by providers and the operations facade.
#[derive(Debug, Clone)]
pub struct CryptoKey {
    /// Public, private, or secret.
    pub key_type: KeyType,
    /// Whether private material may be exported.
    pub extractable: bool,
    /// The algorithm this key was generated or imported for.
    pub algorithm: Algorithm,
    /// Operations this key permits.
    pub usages: BTreeSet<KeyUsage>,
    /// The key material.
    pub material: KeyMaterial,
    /// Key identifier, when known.
    pub kid: Option<String>,
}

impl CryptoKey {
    /// Builds a key over raw material.
    #[must_use]
    pub fn from_raw(
        key_type: KeyType,
        algorithm: Algorithm,
        usages: impl IntoIterator<Item = KeyUsage>,
        bytes: Vec<u8>,
        extractable: bool,
    ) -> Self {
        Self {
            key_type,
            extractable,
            algorithm,
            usages: usages.into_iter().collect(),
            material: KeyMaterial::raw(bytes),
            kid: None,
        }
    }

    /// Builds a key backed by an external handle. Never extractable.
    #[must_use]
    pub fn from_handle(
        key_type: KeyType,
        algorithm: Algorithm,
        usages: impl IntoIterator<Item = KeyUsage>,
        handle: impl Into<String>,
    ) -> Self {
        Self {
            key_type,
            extractable: false,
            algorithm,
            usages: usages.into_iter().collect(),
            material: KeyMaterial::Handle(handle.into()),
            kid: None,
        }
    }

    /// Returns the key with `kid` set.
    #[must_use]
    pub fn with_kid(mut self, kid: impl Into<String>) -> Self {
        self.kid = Some(kid.into());
        self
    }

    /// The raw bytes, if the material is readable.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::NonExtractable`] for handle-backed keys.
    pub fn raw_bytes(&self) -> Result<&[u8], CryptoError> {
        match &self.material {
            KeyMaterial::Raw(bytes) => Ok(bytes.as_slice()),
            KeyMaterial::Handle(_) => Err(CryptoError::NonExtractable),
        }
    }

    /// Fails unless this key permits `usage`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKey`] naming the missing usage.
    pub fn ensure_usage(&self, usage: KeyUsage) -> Result<(), CryptoError> {
        if self.usages.contains(&usage) {
            Ok(())
        } else {
            Err(CryptoError::invalid_key(format!(
                "{} key does not permit {usage:?}",
                self.key_type
            )))
        }
    }

    /// Fails unless this key has the given role.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKey`] on mismatch.
    pub fn ensure_type(&self, key_type: KeyType) -> Result<(), CryptoError> {
        if self.key_type == key_type {
            Ok(())
        } else {
            Err(CryptoError::invalid_key(format!(
                "expected {key_type} key, got {}",
                self.key_type
            )))
        }
    }

    /// The public projection of this key.
    ///
    /// Public keys are returned unchanged. Raw EC and RSA private keys have
    /// their public half recomputed; private usages map onto their public
    /// counterparts (`sign` to `verify`, `decrypt` to `encrypt`, `unwrapKey`
    /// to `wrapKey`).
    ///
    /// # Errors
    ///
    /// - [`CryptoError::InvalidKey`] for secret keys, which have no public half
    /// - [`CryptoError::NonExtractable`] for handle-backed private keys
    pub fn to_public(&self) -> Result<Self, CryptoError> {
        match self.key_type {
            KeyType::Public => Ok(self.clone()),
            KeyType::Secret => Err(CryptoError::invalid_key(
                "secret key has no public projection",
            )),
            KeyType::Private => {
                let private = self.raw_bytes()?;
                let public = match &self.algorithm {
                    Algorithm::Ecdsa { .. } => ec::public_from_private(private)?,
                    Algorithm::RsassaPkcs1V15 { .. } | Algorithm::RsaOaep { .. } => {
                        rsa::public_from_private(private)?
                    }
                    other => {
                        return Err(CryptoError::invalid_key(format!(
                            "{} has no asymmetric key pair",
                            other.name()
                        )))
                    }
                };
                Ok(Self {
                    key_type: KeyType::Public,
                    extractable: true,
                    algorithm: self.algorithm.clone(),
                    usages: self.usages.iter().filter_map(|u| public_usage(*u)).collect(),
                    material: KeyMaterial::raw(public),
                    kid: self.kid.clone(),
                })
            }
        }
    }
}

/// Maps a usage onto the one the public half of a pair carries.
const fn public_usage(usage: KeyUsage) -> Option<KeyUsage> {
    match usage {
        KeyUsage::Sign | KeyUsage::Verify => Some(KeyUsage::Verify),
        KeyUsage::Decrypt | KeyUsage::Encrypt => Some(KeyUsage::Encrypt),
        KeyUsage::UnwrapKey | KeyUsage::WrapKey => Some(KeyUsage::WrapKey),
        KeyUsage::DeriveKey | KeyUsage::DeriveBits => None,
    }
}

/// A generated or derived asymmetric pair.
#[derive(Debug, Clone)]
pub struct CryptoKeyPair {
    /// The private half.
    pub private_key: CryptoKey,
    /// The public half.
    pub public_key: CryptoKey,
}

impl CryptoKeyPair {
    /// Sets `kid` on both halves.
    #[must_use]
    pub fn with_kid(self, kid: &str) -> Self {
        Self {
            private_key: self.private_key.with_kid(kid),
            public_key: self.public_key.with_kid(kid),
        }
    }
}

/// What a key store holds under one reference.
///
/// Storing the pair lets handle-backed private keys answer public lookups
/// without recomputing the public half.
#[derive(Debug, Clone)]
pub enum KeyEntry {
    /// A single key of any role.
    Key(CryptoKey),
    /// A private key together with its public half.
    Pair(CryptoKeyPair),
}

impl KeyEntry {
    /// The entry's key identifier, preferring the private half of a pair.
    #[must_use]
    pub fn kid(&self) -> Option<&str> {
        match self {
            Self::Key(key) => key.kid.as_deref(),
            Self::Pair(pair) => pair
                .private_key
                .kid
                .as_deref()
                .or(pair.public_key.kid.as_deref()),
        }
    }
}

impl From<CryptoKey> for KeyEntry {
    fn from(key: CryptoKey) -> Self {
        Self::Key(key)
    }
}

impl From<CryptoKeyPair> for KeyEntry {
    fn from(pair: CryptoKeyPair) -> Self {
        Self::Pair(pair)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;
    use portid_core::algorithm::HashAlgorithm;

    fn hmac_key() -> CryptoKey {
        CryptoKey::from_raw(
            KeyType::Secret,
            Algorithm::hmac(HashAlgorithm::Sha256),
            [KeyUsage::Sign, KeyUsage::Verify],
            vec![7; 32],
            true,
        )
    }

    #[test]
    fn test_debug_redacts_raw_material() {
        let out = format!("{:?}", hmac_key());
        assert!(out.contains("Raw([REDACTED; 32])"));
        assert!(!out.contains("[7, 7"));
    }

    #[test]
    fn test_secret_key_has_no_public_projection() {
        assert!(matches!(
            hmac_key().to_public(),
            Err(CryptoError::InvalidKey { .. })
        ));
    }

    #[test]
    fn test_handle_key_is_not_extractable() {
        let key = CryptoKey::from_handle(
            KeyType::Private,
            Algorithm::es256k(),
            [KeyUsage::Sign],
            "enclave:alias-1",
        );
        assert!(!key.extractable);
        assert!(matches!(key.raw_bytes(), Err(CryptoError::NonExtractable)));
        assert!(matches!(key.to_public(), Err(CryptoError::NonExtractable)));
    }

    #[test]
    fn test_ec_private_projects_to_public() {
        let private = CryptoKey::from_raw(
            KeyType::Private,
            Algorithm::es256k(),
            [KeyUsage::Sign],
            vec![0x11; 32],
            true,
        )
        .with_kid("k1");

        let public = private.to_public().unwrap();
        assert_eq!(public.key_type, KeyType::Public);
        assert_eq!(public.raw_bytes().unwrap().len(), 65);
        assert_eq!(public.kid.as_deref(), Some("k1"));
        assert!(public.usages.contains(&KeyUsage::Verify));
        assert!(!public.usages.contains(&KeyUsage::Sign));
    }

    #[test]
    fn test_ensure_usage() {
        let key = hmac_key();
        assert!(key.ensure_usage(KeyUsage::Sign).is_ok());
        assert!(key.ensure_usage(KeyUsage::Decrypt).is_err());
    }

    #[test]
    fn test_entry_kid_prefers_private() {
        let key = hmac_key().with_kid("secret-1");
        assert_eq!(KeyEntry::from(key).kid(), Some("secret-1"));
    }
}
