//! ECDSA over secp256k1.
//!
//! Messages are hashed with SHA-256 and signed as a prehash. Signatures are
//! the 64-byte `r || s` form with `s` normalized to the low half of the
//! curve order, which is what `ES256K` requires.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use portid_core::algorithm::{Algorithm, HashAlgorithm, KeyType, KeyUsage, ECDSA, SECP256K1};
use portid_core::error::CryptoError;
use portid_core::jwk::{JsonWebKey, KeyTypeTag};
use sha2::{Digest, Sha256};

use super::{wrong_family, CryptoProvider};
use crate::jwk;
use crate::key::{CryptoKey, CryptoKeyPair};
use crate::keys::SecretKey;

/// Length of a raw private scalar.
pub const PRIVATE_KEY_LEN: usize = 32;

/// Length of an uncompressed SEC1 public point.
pub const PUBLIC_KEY_LEN: usize = 65;

/// Length of an `r || s` signature.
pub const SIGNATURE_LEN: usize = 64;

/// Returns `true` for the accepted spellings of secp256k1.
#[must_use]
pub fn is_secp256k1(curve: &str) -> bool {
    matches!(curve, SECP256K1 | "K-256" | "P-256K")
}

/// Recomputes the uncompressed public point for a raw private scalar.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidKey`] if the scalar is malformed or out of range.
pub fn public_from_private(private: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let signing_key = signing_key(private)?;
    Ok(encode_public(signing_key.verifying_key()))
}

/// Builds a pair from a private scalar already known to be valid.
///
/// Used for generation and for deterministic pairwise derivation.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidKey`] if the scalar is zero or not below the order.
pub fn key_pair_from_scalar(
    algorithm: &Algorithm,
    scalar: &[u8],
    extractable: bool,
) -> Result<CryptoKeyPair, CryptoError> {
    let signing_key = signing_key(scalar)?;
    let public = encode_public(signing_key.verifying_key());
    Ok(CryptoKeyPair {
        private_key: CryptoKey::from_raw(
            KeyType::Private,
            algorithm.clone(),
            [KeyUsage::Sign],
            signing_key.to_bytes().to_vec(),
            extractable,
        ),
        public_key: CryptoKey::from_raw(
            KeyType::Public,
            algorithm.clone(),
            [KeyUsage::Verify],
            public,
            true,
        ),
    })
}

fn signing_key(private: &[u8]) -> Result<SigningKey, CryptoError> {
    if private.len() != PRIVATE_KEY_LEN {
        return Err(CryptoError::invalid_key(format!(
            "secp256k1 private key must be {PRIVATE_KEY_LEN} bytes, got {}",
            private.len()
        )));
    }
    SigningKey::from_slice(private)
        .map_err(|_| CryptoError::invalid_key("secp256k1 scalar out of range"))
}

fn encode_public(verifying_key: &VerifyingKey) -> Vec<u8> {
    verifying_key.to_encoded_point(false).as_bytes().to_vec()
}

fn verifying_key(key: &CryptoKey) -> Result<VerifyingKey, CryptoError> {
    let public = match key.key_type {
        KeyType::Public => {
            key.ensure_usage(KeyUsage::Verify)?;
            key.raw_bytes()?.to_vec()
        }
        KeyType::Private => public_from_private(key.raw_bytes()?)?,
        KeyType::Secret => return Err(CryptoError::invalid_key("ECDSA cannot use a secret key")),
    };
    VerifyingKey::from_sec1_bytes(&public)
        .map_err(|_| CryptoError::invalid_key("malformed secp256k1 public point"))
}

/// JWK members for a raw EC key. `crv` is always the RFC 8812 name, whichever
/// alias the key was created with.
pub(crate) fn jwk_from_raw(
    key_type: KeyType,
    curve: &str,
    raw: &[u8],
) -> Result<JsonWebKey, CryptoError> {
    if !is_secp256k1(curve) {
        return Err(CryptoError::unsupported_parameter(
            ECDSA,
            format!("crv={curve}"),
        ));
    }
    let (public, private) = match key_type {
        KeyType::Private => (public_from_private(raw)?, Some(raw)),
        KeyType::Public => (raw.to_vec(), None),
        KeyType::Secret => return Err(CryptoError::invalid_key("EC keys are never secret")),
    };
    let (x, y) = public
        .get(1..33)
        .zip(public.get(33..PUBLIC_KEY_LEN))
        .filter(|_| public.len() == PUBLIC_KEY_LEN)
        .ok_or_else(|| CryptoError::invalid_key("EC public key must be uncompressed"))?;

    let mut out = JsonWebKey::new(KeyTypeTag::Ec);
    out.crv = Some(SECP256K1.to_string());
    out.x = Some(URL_SAFE_NO_PAD.encode(x));
    out.y = Some(URL_SAFE_NO_PAD.encode(y));
    out.d = private.map(|d| URL_SAFE_NO_PAD.encode(d));
    Ok(out)
}

/// Raw material for an EC JWK, validated against the curve.
pub(crate) fn raw_from_jwk(source: &JsonWebKey) -> Result<(KeyType, Vec<u8>), CryptoError> {
    let curve = source.crv.as_deref().unwrap_or_default();
    if !is_secp256k1(curve) {
        return Err(CryptoError::unsupported_parameter(
            ECDSA,
            format!("crv={curve}"),
        ));
    }

    if source.d.is_some() {
        let d = jwk::decode_member("d", source.d.as_ref())?;
        let public = public_from_private(&d)?;
        // A private JWK must describe the same point as its public members.
        if source.x.is_some() || source.y.is_some() {
            let mut claimed = vec![0x04];
            claimed.extend(jwk::decode_member("x", source.x.as_ref())?);
            claimed.extend(jwk::decode_member("y", source.y.as_ref())?);
            if claimed != public {
                return Err(CryptoError::invalid_key(
                    "EC private scalar does not match x/y",
                ));
            }
        }
        return Ok((KeyType::Private, d));
    }

    let mut point = vec![0x04];
    point.extend(jwk::decode_member("x", source.x.as_ref())?);
    point.extend(jwk::decode_member("y", source.y.as_ref())?);
    VerifyingKey::from_sec1_bytes(&point)
        .map_err(|_| CryptoError::invalid_key("EC point is not on secp256k1"))?;
    Ok((KeyType::Public, point))
}

/// Software ECDSA on secp256k1 with SHA-256.
#[derive(Debug, Default, Clone, Copy)]
pub struct EcdsaProvider;

impl EcdsaProvider {
    fn validate(algorithm: &Algorithm) -> Result<(), CryptoError> {
        let Algorithm::Ecdsa { named_curve, hash } = algorithm else {
            return Err(wrong_family(ECDSA, algorithm));
        };
        if !is_secp256k1(named_curve) {
            return Err(CryptoError::unsupported_parameter(
                ECDSA,
                format!("namedCurve={named_curve}"),
            ));
        }
        if *hash != HashAlgorithm::Sha256 {
            return Err(CryptoError::unsupported_parameter(
                ECDSA,
                format!("hash={hash}"),
            ));
        }
        Ok(())
    }
}

impl CryptoProvider for EcdsaProvider {
    fn name(&self) -> &'static str {
        ECDSA
    }

    fn private_key_usages(&self) -> &'static [KeyUsage] {
        &[KeyUsage::Sign]
    }

    fn public_key_usages(&self) -> &'static [KeyUsage] {
        &[KeyUsage::Verify]
    }

    fn generate_key_pair(
        &self,
        algorithm: &Algorithm,
        extractable: bool,
    ) -> Result<CryptoKeyPair, CryptoError> {
        Self::validate(algorithm)?;
        let secret = SecretKey::generate();
        key_pair_from_scalar(algorithm, secret.as_bytes(), extractable)
    }

    fn sign(
        &self,
        algorithm: &Algorithm,
        key: &CryptoKey,
        data: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        Self::validate(algorithm)?;
        key.ensure_type(KeyType::Private)?;
        key.ensure_usage(KeyUsage::Sign)?;
        let signing_key = signing_key(key.raw_bytes()?)?;

        let digest = Sha256::digest(data);
        let (signature, _recovery_id) = signing_key
            .sign_prehash_recoverable(&digest)
            .map_err(|_| CryptoError::crypto("secp256k1 signing failed"))?;
        let normalized = signature.normalize_s().unwrap_or(signature);

        Ok(normalized.to_bytes().to_vec())
    }

    fn verify(
        &self,
        algorithm: &Algorithm,
        key: &CryptoKey,
        signature: &[u8],
        data: &[u8],
    ) -> Result<bool, CryptoError> {
        Self::validate(algorithm)?;
        let verifying_key = verifying_key(key)?;

        let Ok(signature) = Signature::from_slice(signature) else {
            return Ok(false);
        };
        let digest = Sha256::digest(data);
        Ok(verifying_key.verify_prehash(&digest, &signature).is_ok())
    }

    fn import_jwk(
        &self,
        algorithm: &Algorithm,
        source: &JsonWebKey,
        extractable: bool,
    ) -> Result<CryptoKey, CryptoError> {
        Self::validate(algorithm)?;
        jwk::from_jwk(source, algorithm, extractable)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;

    fn es256k() -> Algorithm {
        Algorithm::es256k()
    }

    #[test]
    fn test_sign_verify_roundtrip() {
        let provider = EcdsaProvider;
        let pair = provider.generate_key_pair(&es256k(), true).unwrap();

        let sig = provider.sign(&es256k(), &pair.private_key, b"hello").unwrap();
        assert_eq!(sig.len(), SIGNATURE_LEN);
        assert!(provider
            .verify(&es256k(), &pair.public_key, &sig, b"hello")
            .unwrap());
        assert!(!provider
            .verify(&es256k(), &pair.public_key, &sig, b"hellO")
            .unwrap());
    }

    #[test]
    fn test_signatures_are_low_s() {
        let provider = EcdsaProvider;
        let pair = provider.generate_key_pair(&es256k(), true).unwrap();
        for i in 0u8..16 {
            let sig = provider.sign(&es256k(), &pair.private_key, &[i]).unwrap();
            let parsed = Signature::from_slice(&sig).unwrap();
            assert!(parsed.normalize_s().is_none(), "signature {i} was high-S");
        }
    }

    #[test]
    fn test_malformed_signature_is_false() {
        let provider = EcdsaProvider;
        let pair = provider.generate_key_pair(&es256k(), true).unwrap();
        assert!(!provider
            .verify(&es256k(), &pair.public_key, &[1, 2, 3], b"x")
            .unwrap());
        assert!(!provider
            .verify(&es256k(), &pair.public_key, &[0; SIGNATURE_LEN], b"x")
            .unwrap());
    }

    #[test]
    fn test_rejects_other_curves() {
        let provider = EcdsaProvider;
        let p256 = Algorithm::Ecdsa {
            named_curve: "P-256".to_string(),
            hash: HashAlgorithm::Sha256,
        };
        let err = provider.generate_key_pair(&p256, true).unwrap_err();
        assert!(matches!(err, CryptoError::UnsupportedParameter { .. }));
        assert!(err.to_string().contains("namedCurve=P-256"));
    }

    #[test]
    fn test_rejects_other_hashes() {
        let provider = EcdsaProvider;
        let alg = Algorithm::Ecdsa {
            named_curve: "K-256".to_string(),
            hash: HashAlgorithm::Sha512,
        };
        assert!(matches!(
            provider.generate_key_pair(&alg, true),
            Err(CryptoError::UnsupportedParameter { .. })
        ));
    }

    #[test]
    fn test_verify_with_private_key_derives_public() {
        let provider = EcdsaProvider;
        let pair = provider.generate_key_pair(&es256k(), true).unwrap();
        let sig = provider.sign(&es256k(), &pair.private_key, b"m").unwrap();
        assert!(provider
            .verify(&es256k(), &pair.private_key, &sig, b"m")
            .unwrap());
    }

    #[test]
    fn test_jwk_roundtrip_keeps_point() {
        let provider = EcdsaProvider;
        let pair = provider.generate_key_pair(&es256k(), true).unwrap();

        let private_jwk = provider.export_jwk(&pair.private_key).unwrap();
        let public_jwk = provider.export_jwk(&pair.public_key).unwrap();
        assert_eq!(private_jwk.x, public_jwk.x);
        assert_eq!(private_jwk.y, public_jwk.y);
        assert!(private_jwk.d.is_some());
        assert!(public_jwk.d.is_none());

        let imported = provider.import_jwk(&es256k(), &public_jwk, true).unwrap();
        assert_eq!(
            imported.raw_bytes().unwrap(),
            pair.public_key.raw_bytes().unwrap()
        );
    }

    #[test]
    fn test_curve_alias_exports_canonical_crv() {
        let provider = EcdsaProvider;
        for alias in ["K-256", "P-256K"] {
            let algorithm = Algorithm::Ecdsa {
                named_curve: alias.to_string(),
                hash: HashAlgorithm::Sha256,
            };
            let pair = provider.generate_key_pair(&algorithm, true).unwrap();
            let jwk = provider.export_jwk(&pair.public_key).unwrap();
            assert_eq!(jwk.crv.as_deref(), Some(SECP256K1), "{alias}");
        }
    }

    #[test]
    fn test_non_extractable_private_export_refused() {
        let provider = EcdsaProvider;
        let pair = provider.generate_key_pair(&es256k(), false).unwrap();
        assert!(matches!(
            provider.export_jwk(&pair.private_key),
            Err(CryptoError::NonExtractable)
        ));
        assert!(provider.export_jwk(&pair.public_key).is_ok());
    }

    #[test]
    fn test_import_rejects_mismatched_private_jwk() {
        let provider = EcdsaProvider;
        let a = provider.generate_key_pair(&es256k(), true).unwrap();
        let b = provider.generate_key_pair(&es256k(), true).unwrap();

        let mut jwk = provider.export_jwk(&a.private_key).unwrap();
        let other = provider.export_jwk(&b.public_key).unwrap();
        jwk.x = other.x;
        assert!(provider.import_jwk(&es256k(), &jwk, true).is_err());
    }

    #[test]
    fn test_no_symmetric_generation() {
        assert!(matches!(
            EcdsaProvider.generate_key(&es256k(), true),
            Err(CryptoError::UnsupportedOperation { .. })
        ));
    }
}
