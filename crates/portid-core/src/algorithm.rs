//! Algorithm descriptors and key-usage vocabulary.
//!
//! An [`Algorithm`] names an algorithm family and carries the parameters a
//! provider needs (hash function, named curve, modulus length). The family
//! name returned by [`Algorithm::name`] is the key the provider registry
//! dispatches on; parameter validation is left to the provider itself.
//!
//! # Example
//!
//! ```
//! use portid_core::algorithm::{Algorithm, HashAlgorithm};
//!
//! let es256k = Algorithm::es256k();
//! assert_eq!(es256k.name(), "ECDSA");
//!
//! let digest = Algorithm::digest(HashAlgorithm::Sha1);
//! assert_eq!(digest.name(), "SHA-1");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Family name for ECDSA.
pub const ECDSA: &str = "ECDSA";

/// Family name for RSASSA-PKCS1-v1_5.
pub const RSASSA_PKCS1_V1_5: &str = "RSASSA-PKCS1-v1_5";

/// Family name for RSA-OAEP.
pub const RSA_OAEP: &str = "RSA-OAEP";

/// Family name for HMAC.
pub const HMAC: &str = "HMAC";

/// The secp256k1 curve name.
pub const SECP256K1: &str = "secp256k1";

/// Default RSA modulus length in bits.
pub const DEFAULT_MODULUS_LENGTH: usize = 2048;

// ============================================================================
// HashAlgorithm
// ============================================================================

/// Hash functions that may appear in an algorithm descriptor.
///
/// `Sha1` exists so callers can name it; no default provider accepts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// SHA-1 (legacy).
    #[serde(rename = "SHA-1")]
    Sha1,
    /// SHA-256.
    #[serde(rename = "SHA-256")]
    Sha256,
    /// SHA-384.
    #[serde(rename = "SHA-384")]
    Sha384,
    /// SHA-512.
    #[serde(rename = "SHA-512")]
    Sha512,
}

impl HashAlgorithm {
    /// The WebCrypto-style name (`SHA-256` etc.).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }

    /// Digest output length in bytes.
    #[must_use]
    pub const fn output_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Parse a hash name, accepting `SHA-256` and `SHA256` spellings.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().replace('-', "").as_str() {
            "SHA1" => Some(Self::Sha1),
            "SHA256" => Some(Self::Sha256),
            "SHA384" => Some(Self::Sha384),
            "SHA512" => Some(Self::Sha512),
            _ => None,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Algorithm
// ============================================================================

/// Tagged algorithm descriptor keyed by family name.
///
/// Serializes in the WebCrypto shape, e.g.
/// `{"name":"ECDSA","namedCurve":"secp256k1","hash":"SHA-256"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum Algorithm {
    /// ECDSA over a named curve.
    #[serde(rename = "ECDSA")]
    Ecdsa {
        /// Curve name, e.g. `secp256k1`. Validated by the provider.
        #[serde(rename = "namedCurve")]
        named_curve: String,
        /// Message hash.
        hash: HashAlgorithm,
    },
    /// RSASSA-PKCS1-v1_5 signatures.
    #[serde(rename = "RSASSA-PKCS1-v1_5")]
    RsassaPkcs1V15 {
        /// Modulus length in bits, used for generation.
        #[serde(rename = "modulusLength")]
        modulus_length: usize,
        /// Message hash.
        hash: HashAlgorithm,
    },
    /// RSA-OAEP encryption.
    #[serde(rename = "RSA-OAEP")]
    RsaOaep {
        /// Modulus length in bits, used for generation.
        #[serde(rename = "modulusLength")]
        modulus_length: usize,
        /// OAEP hash.
        hash: HashAlgorithm,
    },
    /// HMAC.
    #[serde(rename = "HMAC")]
    Hmac {
        /// Inner hash.
        hash: HashAlgorithm,
        /// Key length in bits for generation; defaults to the hash block size.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        length: Option<usize>,
    },
    /// Plain message digest.
    #[serde(rename = "digest")]
    Digest {
        /// The hash function.
        hash: HashAlgorithm,
    },
}

impl Algorithm {
    /// ECDSA on secp256k1 with SHA-256 (`ES256K`).
    #[must_use]
    pub fn es256k() -> Self {
        Self::Ecdsa {
            named_curve: SECP256K1.to_string(),
            hash: HashAlgorithm::Sha256,
        }
    }

    /// RSASSA-PKCS1-v1_5 with the given hash and the default modulus length.
    #[must_use]
    pub const fn rsassa(hash: HashAlgorithm) -> Self {
        Self::RsassaPkcs1V15 {
            modulus_length: DEFAULT_MODULUS_LENGTH,
            hash,
        }
    }

    /// A plain digest descriptor.
    #[must_use]
    pub const fn digest(hash: HashAlgorithm) -> Self {
        Self::Digest { hash }
    }

    /// HMAC with the given hash and default key length.
    #[must_use]
    pub const fn hmac(hash: HashAlgorithm) -> Self {
        Self::Hmac { hash, length: None }
    }

    /// The family name the registry dispatches on.
    ///
    /// Digest descriptors dispatch on the hash name itself.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ecdsa { .. } => ECDSA,
            Self::RsassaPkcs1V15 { .. } => RSASSA_PKCS1_V1_5,
            Self::RsaOaep { .. } => RSA_OAEP,
            Self::Hmac { .. } => HMAC,
            Self::Digest { hash } => hash.name(),
        }
    }

    /// The hash carried by this descriptor.
    #[must_use]
    pub const fn hash(&self) -> HashAlgorithm {
        match self {
            Self::Ecdsa { hash, .. }
            | Self::RsassaPkcs1V15 { hash, .. }
            | Self::RsaOaep { hash, .. }
            | Self::Hmac { hash, .. }
            | Self::Digest { hash } => *hash,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ecdsa { named_curve, hash } => write!(f, "ECDSA/{named_curve}/{hash}"),
            Self::RsassaPkcs1V15 {
                modulus_length,
                hash,
            } => write!(f, "RSASSA-PKCS1-v1_5/{modulus_length}/{hash}"),
            Self::RsaOaep {
                modulus_length,
                hash,
            } => write!(f, "RSA-OAEP/{modulus_length}/{hash}"),
            Self::Hmac { hash, .. } => write!(f, "HMAC/{hash}"),
            Self::Digest { hash } => write!(f, "{hash}"),
        }
    }
}

// ============================================================================
// Key vocabulary
// ============================================================================

/// What a key may be used for. Serializes to JWK `key_ops` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyUsage {
    /// Produce signatures or MACs.
    Sign,
    /// Check signatures or MACs.
    Verify,
    /// Encrypt content.
    Encrypt,
    /// Decrypt content.
    Decrypt,
    /// Wrap another key.
    WrapKey,
    /// Unwrap another key.
    UnwrapKey,
    /// Derive a key.
    DeriveKey,
    /// Derive bits.
    DeriveBits,
}

/// Role of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// Asymmetric public half.
    Public,
    /// Asymmetric private half.
    Private,
    /// Symmetric secret.
    Secret,
}

impl KeyType {
    /// The provider scope that handles keys of this type.
    #[must_use]
    pub const fn scope(self) -> ProviderScope {
        match self {
            Self::Public => ProviderScope::Public,
            Self::Private => ProviderScope::Private,
            Self::Secret => ProviderScope::Secret,
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Private => write!(f, "private"),
            Self::Secret => write!(f, "secret"),
        }
    }
}

/// Which key role a registered provider may act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderScope {
    /// Public-key operations (verify, encrypt).
    Public,
    /// Private-key operations (generate, sign, decrypt).
    Private,
    /// Symmetric-key operations.
    Secret,
    /// Any role.
    All,
}

impl fmt::Display for ProviderScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Private => write!(f, "private"),
            Self::Secret => write!(f, "secret"),
            Self::All => write!(f, "all"),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_family_names() {
        assert_eq!(Algorithm::es256k().name(), ECDSA);
        assert_eq!(Algorithm::rsassa(HashAlgorithm::Sha384).name(), RSASSA_PKCS1_V1_5);
        assert_eq!(Algorithm::hmac(HashAlgorithm::Sha512).name(), HMAC);
        assert_eq!(Algorithm::digest(HashAlgorithm::Sha256).name(), "SHA-256");
    }

    #[test]
    fn test_hash_from_name_spellings() {
        assert_eq!(HashAlgorithm::from_name("SHA-256"), Some(HashAlgorithm::Sha256));
        assert_eq!(HashAlgorithm::from_name("sha512"), Some(HashAlgorithm::Sha512));
        assert_eq!(HashAlgorithm::from_name("MD5"), None);
    }

    #[test]
    fn test_display_includes_parameters() {
        assert_eq!(Algorithm::es256k().to_string(), "ECDSA/secp256k1/SHA-256");
    }

    #[test]
    fn test_descriptor_serializes_in_webcrypto_shape() {
        let value = serde_json::to_value(Algorithm::es256k()).unwrap();
        assert_eq!(value["name"], "ECDSA");
        assert_eq!(value["namedCurve"], "secp256k1");
        assert_eq!(value["hash"], "SHA-256");

        let rsa: Algorithm = serde_json::from_str(
            r#"{"name":"RSASSA-PKCS1-v1_5","modulusLength":3072,"hash":"SHA-384"}"#,
        )
        .unwrap();
        assert_eq!(
            rsa,
            Algorithm::RsassaPkcs1V15 {
                modulus_length: 3072,
                hash: HashAlgorithm::Sha384
            }
        );
    }

    #[test]
    fn test_key_usage_serializes_as_key_ops() {
        let json = serde_json::to_string(&[KeyUsage::Sign, KeyUsage::WrapKey]).unwrap();
        assert_eq!(json, r#"["sign","wrapKey"]"#);
    }

    #[test]
    fn test_key_type_scope() {
        assert_eq!(KeyType::Private.scope(), ProviderScope::Private);
        assert_eq!(KeyType::Secret.scope(), ProviderScope::Secret);
    }
}
