//! JSON Web Key data model (RFC 7517 subset).
//!
//! Only the members this SDK reads or writes are modelled. Binary members are
//! kept as base64url strings exactly as they appear on the wire; providers
//! decode them when importing.
//!
//! # Example
//!
//! ```
//! use portid_core::jwk::{JsonWebKey, KeyTypeTag};
//!
//! let seed = JsonWebKey::oct(b"abcdefg");
//! assert_eq!(seed.kty, KeyTypeTag::Oct);
//! assert_eq!(seed.k.as_deref(), Some("YWJjZGVmZw"));
//! assert!(seed.to_public().is_none());
//! ```

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::algorithm::KeyUsage;

/// The `kty` member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyTypeTag {
    /// Elliptic curve key.
    #[serde(rename = "EC")]
    Ec,
    /// RSA key.
    #[serde(rename = "RSA")]
    Rsa,
    /// Octet sequence (symmetric) key.
    #[serde(rename = "oct")]
    Oct,
}

/// A JSON Web Key.
///
/// A private key always yields a consistent public key through
/// [`JsonWebKey::to_public`]: the public members are carried unchanged and
/// only the private members are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKey {
    /// Key type.
    pub kty: KeyTypeTag,
    /// Key identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Intended use (`sig` or `enc`).
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    /// Permitted operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_ops: Option<Vec<KeyUsage>>,
    /// JWA algorithm name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    /// EC curve name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    /// EC x coordinate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    /// EC y coordinate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    /// RSA modulus.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    /// RSA public exponent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    /// Private exponent (RSA) or private scalar (EC).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    /// RSA first prime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,
    /// RSA second prime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    /// RSA first CRT exponent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp: Option<String>,
    /// RSA second CRT exponent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dq: Option<String>,
    /// RSA CRT coefficient.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qi: Option<String>,
    /// Symmetric key value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<String>,
}

impl JsonWebKey {
    /// An empty key of the given type.
    #[must_use]
    pub const fn new(kty: KeyTypeTag) -> Self {
        Self {
            kty,
            kid: None,
            key_use: None,
            key_ops: None,
            alg: None,
            crv: None,
            x: None,
            y: None,
            n: None,
            e: None,
            d: None,
            p: None,
            q: None,
            dp: None,
            dq: None,
            qi: None,
            k: None,
        }
    }

    /// A symmetric key holding `secret`.
    #[must_use]
    pub fn oct(secret: &[u8]) -> Self {
        let mut jwk = Self::new(KeyTypeTag::Oct);
        jwk.k = Some(URL_SAFE_NO_PAD.encode(secret));
        jwk
    }

    /// Returns `true` if private members are present.
    #[must_use]
    pub fn is_private(&self) -> bool {
        match self.kty {
            KeyTypeTag::Oct => false,
            KeyTypeTag::Ec | KeyTypeTag::Rsa => self.d.is_some(),
        }
    }

    /// The public projection of this key.
    ///
    /// Returns `None` for symmetric keys, which have no public half.
    #[must_use]
    pub fn to_public(&self) -> Option<Self> {
        if self.kty == KeyTypeTag::Oct {
            return None;
        }
        let mut public = self.clone();
        public.d = None;
        public.p = None;
        public.q = None;
        public.dp = None;
        public.dq = None;
        public.qi = None;
        if let Some(ops) = public.key_ops.as_mut() {
            ops.retain(|op| matches!(op, KeyUsage::Verify | KeyUsage::Encrypt | KeyUsage::WrapKey));
        }
        Some(public)
    }

    /// RFC 7638 thumbprint: base64url SHA-256 over the required members.
    ///
    /// Returns `None` when a required member is missing.
    #[must_use]
    pub fn thumbprint(&self) -> Option<String> {
        // Members must appear in lexicographic order with no whitespace.
        let canonical = match self.kty {
            KeyTypeTag::Ec => format!(
                r#"{{"crv":"{}","kty":"EC","x":"{}","y":"{}"}}"#,
                self.crv.as_deref()?,
                self.x.as_deref()?,
                self.y.as_deref()?
            ),
            KeyTypeTag::Rsa => format!(
                r#"{{"e":"{}","kty":"RSA","n":"{}"}}"#,
                self.e.as_deref()?,
                self.n.as_deref()?
            ),
            KeyTypeTag::Oct => format!(r#"{{"k":"{}","kty":"oct"}}"#, self.k.as_deref()?),
        };
        Some(URL_SAFE_NO_PAD.encode(Sha256::digest(canonical.as_bytes())))
    }
}
