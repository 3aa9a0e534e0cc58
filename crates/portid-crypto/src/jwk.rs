//! Conversion between [`CryptoKey`] and [`JsonWebKey`].
//!
//! Providers call into this after validating their algorithm parameters; the
//! file key store uses it to persist entries.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use portid_core::algorithm::{Algorithm, KeyType, KeyUsage};
use portid_core::error::CryptoError;
use portid_core::jwk::{JsonWebKey, KeyTypeTag};

use crate::key::CryptoKey;
use crate::provider::{ec, rsa};

/// Decodes a required base64url member.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidKey`] if the member is missing or not base64url.
pub fn decode_member(name: &str, value: Option<&String>) -> Result<Vec<u8>, CryptoError> {
    let value = value.ok_or_else(|| CryptoError::invalid_key(format!("JWK is missing `{name}`")))?;
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|_| CryptoError::invalid_key(format!("JWK member `{name}` is not base64url")))
}

/// Usages a key gets when its JWK carries no `key_ops`.
#[must_use]
pub fn default_usages(algorithm: &Algorithm, key_type: KeyType) -> Vec<KeyUsage> {
    let encrypts = matches!(algorithm, Algorithm::RsaOaep { .. });
    match (key_type, encrypts) {
        (KeyType::Private, false) => vec![KeyUsage::Sign],
        (KeyType::Public, false) => vec![KeyUsage::Verify],
        (KeyType::Private, true) => vec![KeyUsage::Decrypt, KeyUsage::UnwrapKey],
        (KeyType::Public, true) => vec![KeyUsage::Encrypt, KeyUsage::WrapKey],
        (KeyType::Secret, _) => vec![KeyUsage::Sign, KeyUsage::Verify],
    }
}

/// Serializes a key with raw material as a JWK.
///
/// Does not check `extractable`; callers exporting to the outside must.
///
/// # Errors
///
/// - [`CryptoError::NonExtractable`] for handle-backed keys
/// - [`CryptoError::InvalidKey`] if the material cannot be encoded
pub fn to_jwk(key: &CryptoKey) -> Result<JsonWebKey, CryptoError> {
    let raw = key.raw_bytes()?;
    let mut out = match &key.algorithm {
        Algorithm::Ecdsa { named_curve, .. } => ec::jwk_from_raw(key.key_type, named_curve, raw)?,
        Algorithm::RsassaPkcs1V15 { .. } | Algorithm::RsaOaep { .. } => {
            rsa::jwk_from_raw(key.key_type, raw)?
        }
        Algorithm::Hmac { .. } => JsonWebKey::oct(raw),
        Algorithm::Digest { .. } => {
            return Err(CryptoError::invalid_key("digest descriptors carry no key"))
        }
    };
    out.kid.clone_from(&key.kid);
    out.key_ops = Some(key.usages.iter().copied().collect());
    Ok(out)
}

/// Builds a key from a JWK for `algorithm`.
///
/// The key type follows from the JWK (`oct` is secret, `d` makes it private).
/// Missing `key_ops` fall back to [`default_usages`]; a missing `kid` falls
/// back to the RFC 7638 thumbprint.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidKey`] if `kty` does not fit the algorithm or
/// the members are malformed, and [`CryptoError::UnsupportedParameter`] for
/// an unsupported EC curve.
pub fn from_jwk(
    source: &JsonWebKey,
    algorithm: &Algorithm,
    extractable: bool,
) -> Result<CryptoKey, CryptoError> {
    let (key_type, raw) = match (source.kty, algorithm) {
        (KeyTypeTag::Ec, Algorithm::Ecdsa { .. }) => ec::raw_from_jwk(source)?,
        (KeyTypeTag::Rsa, Algorithm::RsassaPkcs1V15 { .. } | Algorithm::RsaOaep { .. }) => {
            rsa::raw_from_jwk(source)?
        }
        (KeyTypeTag::Oct, Algorithm::Hmac { .. }) => {
            (KeyType::Secret, decode_member("k", source.k.as_ref())?)
        }
        (kty, _) => {
            return Err(CryptoError::invalid_key(format!(
                "{kty:?} JWK cannot be used with {}",
                algorithm.name()
            )))
        }
    };

    let usages = source
        .key_ops
        .clone()
        .unwrap_or_else(|| default_usages(algorithm, key_type));
    let mut key = CryptoKey::from_raw(key_type, algorithm.clone(), usages, raw, extractable);
    key.kid = source.kid.clone().or_else(|| source.thumbprint());
    Ok(key)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;
    use portid_core::algorithm::HashAlgorithm;

    #[test]
    fn test_kty_must_fit_algorithm() {
        let err = from_jwk(&JsonWebKey::oct(b"k"), &Algorithm::es256k(), true).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKey { .. }));
    }

    #[test]
    fn test_missing_kid_uses_thumbprint() {
        let source = JsonWebKey::oct(b"abcdefg");
        let key = from_jwk(&source, &Algorithm::hmac(HashAlgorithm::Sha256), true).unwrap();
        assert_eq!(key.kid, source.thumbprint());
        assert!(key.usages.contains(&KeyUsage::Sign));
    }

    #[test]
    fn test_explicit_key_ops_are_kept() {
        let mut source = JsonWebKey::oct(b"abcdefg");
        source.key_ops = Some(vec![KeyUsage::Verify]);
        let key = from_jwk(&source, &Algorithm::hmac(HashAlgorithm::Sha256), true).unwrap();
        assert_eq!(key.usages.len(), 1);
        assert!(key.usages.contains(&KeyUsage::Verify));
    }

    #[test]
    fn test_missing_member_is_named() {
        let mut source = JsonWebKey::new(KeyTypeTag::Ec);
        source.crv = Some("secp256k1".to_string());
        source.x = Some("AA".to_string());
        let err = from_jwk(&source, &Algorithm::es256k(), true).unwrap_err();
        assert!(err.to_string().contains("`y`"));
    }

    #[test]
    fn test_unsupported_curve() {
        let mut source = JsonWebKey::new(KeyTypeTag::Ec);
        source.crv = Some("P-256".to_string());
        assert!(matches!(
            from_jwk(&source, &Algorithm::es256k(), true),
            Err(CryptoError::UnsupportedParameter { .. })
        ));
    }
}
