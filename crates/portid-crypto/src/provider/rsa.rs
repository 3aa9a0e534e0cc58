//! RSASSA-PKCS1-v1_5 signatures, plus the RSA key plumbing shared with OAEP.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use portid_core::algorithm::{Algorithm, HashAlgorithm, KeyType, KeyUsage, RSASSA_PKCS1_V1_5};
use portid_core::config::{MAX_MODULUS_LENGTH, MIN_MODULUS_LENGTH};
use portid_core::error::CryptoError;
use portid_core::jwk::{JsonWebKey, KeyTypeTag};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256, Sha384, Sha512};

use super::{wrong_family, CryptoProvider};
use crate::jwk;
use crate::key::{CryptoKey, CryptoKeyPair};

// ============================================================================
// Shared RSA plumbing
// ============================================================================

/// Recomputes the PKCS#1 public key for a PKCS#1 private key.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidKey`] if the DER does not parse.
pub fn public_from_private(private_der: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let private = decode_private(private_der)?;
    encode_public(&private.to_public_key())
}

pub(crate) fn decode_private(der: &[u8]) -> Result<RsaPrivateKey, CryptoError> {
    RsaPrivateKey::from_pkcs1_der(der)
        .map_err(|e| CryptoError::invalid_key(format!("malformed RSA private key: {e}")))
}

pub(crate) fn encode_private(key: &RsaPrivateKey) -> Result<Vec<u8>, CryptoError> {
    key.to_pkcs1_der()
        .map(|der| der.as_bytes().to_vec())
        .map_err(|e| CryptoError::crypto(format!("RSA private key encoding failed: {e}")))
}

pub(crate) fn encode_public(key: &RsaPublicKey) -> Result<Vec<u8>, CryptoError> {
    key.to_pkcs1_der()
        .map(|der| der.as_bytes().to_vec())
        .map_err(|e| CryptoError::crypto(format!("RSA public key encoding failed: {e}")))
}

/// The public half of any RSA key, public or private.
pub(crate) fn public_key(key: &CryptoKey, usage: KeyUsage) -> Result<RsaPublicKey, CryptoError> {
    match key.key_type {
        KeyType::Public => {
            key.ensure_usage(usage)?;
            RsaPublicKey::from_pkcs1_der(key.raw_bytes()?)
                .map_err(|e| CryptoError::invalid_key(format!("malformed RSA public key: {e}")))
        }
        KeyType::Private => Ok(decode_private(key.raw_bytes()?)?.to_public_key()),
        KeyType::Secret => Err(CryptoError::invalid_key("RSA cannot use a secret key")),
    }
}

/// The private key, checked for role and usage.
pub(crate) fn private_key(key: &CryptoKey, usage: KeyUsage) -> Result<RsaPrivateKey, CryptoError> {
    key.ensure_type(KeyType::Private)?;
    key.ensure_usage(usage)?;
    decode_private(key.raw_bytes()?)
}

/// Generates a pair with public exponent 65537.
pub(crate) fn generate(
    family: &'static str,
    algorithm: &Algorithm,
    modulus_length: usize,
    private_usages: &[KeyUsage],
    public_usages: &[KeyUsage],
    extractable: bool,
) -> Result<CryptoKeyPair, CryptoError> {
    if !(MIN_MODULUS_LENGTH..=MAX_MODULUS_LENGTH).contains(&modulus_length)
        || modulus_length % 8 != 0
    {
        return Err(CryptoError::unsupported_parameter(
            family,
            format!("modulusLength={modulus_length}"),
        ));
    }

    let private = RsaPrivateKey::new(&mut rand::rngs::OsRng, modulus_length)
        .map_err(|e| CryptoError::crypto(format!("RSA key generation failed: {e}")))?;
    let public = encode_public(&private.to_public_key())?;

    Ok(CryptoKeyPair {
        private_key: CryptoKey::from_raw(
            KeyType::Private,
            algorithm.clone(),
            private_usages.iter().copied(),
            encode_private(&private)?,
            extractable,
        ),
        public_key: CryptoKey::from_raw(
            KeyType::Public,
            algorithm.clone(),
            public_usages.iter().copied(),
            public,
            true,
        ),
    })
}

fn b64(value: &BigUint) -> String {
    URL_SAFE_NO_PAD.encode(value.to_bytes_be())
}

fn big(name: &str, value: Option<&String>) -> Result<BigUint, CryptoError> {
    Ok(BigUint::from_bytes_be(&jwk::decode_member(name, value)?))
}

/// JWK members for a raw RSA key.
pub(crate) fn jwk_from_raw(key_type: KeyType, der: &[u8]) -> Result<JsonWebKey, CryptoError> {
    let mut out = JsonWebKey::new(KeyTypeTag::Rsa);
    match key_type {
        KeyType::Private => {
            let private = decode_private(der)?;
            let [p, q] = private.primes() else {
                return Err(CryptoError::invalid_key("multi-prime RSA keys are not supported"));
            };
            out.n = Some(b64(private.n()));
            out.e = Some(b64(private.e()));
            out.d = Some(b64(private.d()));
            out.p = Some(b64(p));
            out.q = Some(b64(q));
            out.dp = private.dp().map(b64);
            out.dq = private.dq().map(b64);
            out.qi = private.crt_coefficient().as_ref().map(b64);
        }
        KeyType::Public => {
            let public = RsaPublicKey::from_pkcs1_der(der)
                .map_err(|e| CryptoError::invalid_key(format!("malformed RSA public key: {e}")))?;
            out.n = Some(b64(public.n()));
            out.e = Some(b64(public.e()));
        }
        KeyType::Secret => return Err(CryptoError::invalid_key("RSA keys are never secret")),
    }
    Ok(out)
}

/// Raw PKCS#1 material for an RSA JWK.
pub(crate) fn raw_from_jwk(source: &JsonWebKey) -> Result<(KeyType, Vec<u8>), CryptoError> {
    let n = big("n", source.n.as_ref())?;
    let e = big("e", source.e.as_ref())?;

    if source.d.is_some() {
        let d = big("d", source.d.as_ref())?;
        let p = big("p", source.p.as_ref())?;
        let q = big("q", source.q.as_ref())?;
        let private = RsaPrivateKey::from_components(n, e, d, vec![p, q])
            .map_err(|err| CryptoError::invalid_key(format!("inconsistent RSA private JWK: {err}")))?;
        private
            .validate()
            .map_err(|err| CryptoError::invalid_key(format!("inconsistent RSA private JWK: {err}")))?;
        return Ok((KeyType::Private, encode_private(&private)?));
    }

    let public = RsaPublicKey::new(n, e)
        .map_err(|err| CryptoError::invalid_key(format!("invalid RSA public JWK: {err}")))?;
    Ok((KeyType::Public, encode_public(&public)?))
}

// ============================================================================
// RSASSA-PKCS1-v1_5
// ============================================================================

/// Hashes `data` and returns the matching PKCS#1 v1.5 scheme.
fn prehash(hash: HashAlgorithm, data: &[u8]) -> Result<(Pkcs1v15Sign, Vec<u8>), CryptoError> {
    match hash {
        HashAlgorithm::Sha256 => Ok((Pkcs1v15Sign::new::<Sha256>(), Sha256::digest(data).to_vec())),
        HashAlgorithm::Sha384 => Ok((Pkcs1v15Sign::new::<Sha384>(), Sha384::digest(data).to_vec())),
        HashAlgorithm::Sha512 => Ok((Pkcs1v15Sign::new::<Sha512>(), Sha512::digest(data).to_vec())),
        HashAlgorithm::Sha1 => Err(CryptoError::unsupported_parameter(
            RSASSA_PKCS1_V1_5,
            format!("hash={hash}"),
        )),
    }
}

/// Software RSASSA-PKCS1-v1_5 with SHA-256, SHA-384, or SHA-512.
#[derive(Debug, Default, Clone, Copy)]
pub struct RsaSsaProvider;

impl RsaSsaProvider {
    fn validate(algorithm: &Algorithm) -> Result<(usize, HashAlgorithm), CryptoError> {
        let Algorithm::RsassaPkcs1V15 {
            modulus_length,
            hash,
        } = algorithm
        else {
            return Err(wrong_family(RSASSA_PKCS1_V1_5, algorithm));
        };
        if *hash == HashAlgorithm::Sha1 {
            return Err(CryptoError::unsupported_parameter(
                RSASSA_PKCS1_V1_5,
                format!("hash={hash}"),
            ));
        }
        Ok((*modulus_length, *hash))
    }
}

impl CryptoProvider for RsaSsaProvider {
    fn name(&self) -> &'static str {
        RSASSA_PKCS1_V1_5
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
        let (modulus_length, _) = Self::validate(algorithm)?;
        generate(
            RSASSA_PKCS1_V1_5,
            algorithm,
            modulus_length,
            self.private_key_usages(),
            self.public_key_usages(),
            extractable,
        )
    }

    fn sign(
        &self,
        algorithm: &Algorithm,
        key: &CryptoKey,
        data: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let (_, hash) = Self::validate(algorithm)?;
        let private = private_key(key, KeyUsage::Sign)?;
        let (scheme, hashed) = prehash(hash, data)?;
        private
            .sign(scheme, &hashed)
            .map_err(|e| CryptoError::crypto(format!("RSA signing failed: {e}")))
    }

    fn verify(
        &self,
        algorithm: &Algorithm,
        key: &CryptoKey,
        signature: &[u8],
        data: &[u8],
    ) -> Result<bool, CryptoError> {
        let (_, hash) = Self::validate(algorithm)?;
        let public = public_key(key, KeyUsage::Verify)?;
        let (scheme, hashed) = prehash(hash, data)?;
        Ok(public.verify(scheme, &hashed, signature).is_ok())
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
