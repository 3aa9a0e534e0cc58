//! HMAC over the SHA-2 family.

use hmac::{Hmac, Mac};
use portid_core::algorithm::{Algorithm, HashAlgorithm, KeyType, KeyUsage, HMAC};
use portid_core::error::CryptoError;
use portid_core::jwk::JsonWebKey;
use rand::RngCore;
use sha2::{Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;

use super::{wrong_family, CryptoProvider};
use crate::jwk;
use crate::key::CryptoKey;

/// Computes `HMAC-<hash>(key, data)`.
///
/// # Errors
///
/// Returns [`CryptoError::UnsupportedParameter`] for SHA-1.
pub fn compute(hash: HashAlgorithm, key: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let bad_length = |_| CryptoError::invalid_key("HMAC key length rejected");
    match hash {
        HashAlgorithm::Sha256 => {
            let mut mac = Hmac::<Sha256>::new_from_slice(key).map_err(bad_length)?;
            mac.update(data);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        HashAlgorithm::Sha384 => {
            let mut mac = Hmac::<Sha384>::new_from_slice(key).map_err(bad_length)?;
            mac.update(data);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        HashAlgorithm::Sha512 => {
            let mut mac = Hmac::<Sha512>::new_from_slice(key).map_err(bad_length)?;
            mac.update(data);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        HashAlgorithm::Sha1 => Err(CryptoError::unsupported_parameter(
            HMAC,
            format!("hash={hash}"),
        )),
    }
}

/// Default generated key length in bits: the hash block size.
const fn block_bits(hash: HashAlgorithm) -> usize {
    match hash {
        HashAlgorithm::Sha1 | HashAlgorithm::Sha256 => 512,
        HashAlgorithm::Sha384 | HashAlgorithm::Sha512 => 1024,
    }
}

/// Software HMAC.
#[derive(Debug, Default, Clone, Copy)]
pub struct HmacProvider;

impl HmacProvider {
    fn validate(algorithm: &Algorithm) -> Result<(HashAlgorithm, Option<usize>), CryptoError> {
        let Algorithm::Hmac { hash, length } = algorithm else {
            return Err(wrong_family(HMAC, algorithm));
        };
        if *hash == HashAlgorithm::Sha1 {
            return Err(CryptoError::unsupported_parameter(HMAC, format!("hash={hash}")));
        }
        Ok((*hash, *length))
    }

    fn secret(key: &CryptoKey) -> Result<&[u8], CryptoError> {
        key.ensure_type(KeyType::Secret)?;
        key.raw_bytes()
    }
}

impl CryptoProvider for HmacProvider {
    fn name(&self) -> &'static str {
        HMAC
    }

    fn symmetric_key_usages(&self) -> &'static [KeyUsage] {
        &[KeyUsage::Sign, KeyUsage::Verify]
    }

    fn generate_key(
        &self,
        algorithm: &Algorithm,
        extractable: bool,
    ) -> Result<CryptoKey, CryptoError> {
        let (hash, length) = Self::validate(algorithm)?;
        let bits = length.unwrap_or_else(|| block_bits(hash));
        if bits == 0 || bits % 8 != 0 {
            return Err(CryptoError::unsupported_parameter(
                HMAC,
                format!("length={bits}"),
            ));
        }

        let mut bytes = vec![0u8; bits / 8];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Ok(CryptoKey::from_raw(
            KeyType::Secret,
            algorithm.clone(),
            self.symmetric_key_usages().iter().copied(),
            bytes,
            extractable,
        ))
    }

    fn sign(
        &self,
        algorithm: &Algorithm,
        key: &CryptoKey,
        data: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let (hash, _) = Self::validate(algorithm)?;
        key.ensure_usage(KeyUsage::Sign)?;
        compute(hash, Self::secret(key)?, data)
    }

    fn verify(
        &self,
        algorithm: &Algorithm,
        key: &CryptoKey,
        signature: &[u8],
        data: &[u8],
    ) -> Result<bool, CryptoError> {
        let (hash, _) = Self::validate(algorithm)?;
        key.ensure_usage(KeyUsage::Verify)?;
        let expected = compute(hash, Self::secret(key)?, data)?;
        Ok(expected.ct_eq(signature).into())
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
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    #[test]
    fn test_rfc4231_case_2() {
        let mac = compute(
            HashAlgorithm::Sha256,
            b"Jefe",
            b"what do ya want for nothing?",
        )
        .unwrap();
        assert_eq!(
            hex::encode(mac),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_generate_uses_block_size() {
        let provider = HmacProvider;
        let key = provider
            .generate_key(&Algorithm::hmac(HashAlgorithm::Sha512), true)
            .unwrap();
        assert_eq!(key.raw_bytes().unwrap().len(), 128);
        assert_eq!(key.key_type, KeyType::Secret);
    }

    #[test]
    fn test_sign_verify() {
        let provider = HmacProvider;
        let alg = Algorithm::hmac(HashAlgorithm::Sha256);
        let key = provider.generate_key(&alg, true).unwrap();

        let tag = provider.sign(&alg, &key, b"data").unwrap();
        assert!(provider.verify(&alg, &key, &tag, b"data").unwrap());
        assert!(!provider.verify(&alg, &key, &tag, b"date").unwrap());
        assert!(!provider.verify(&alg, &key, &tag[..16], b"data").unwrap());
    }

    #[test]
    fn test_oct_jwk_roundtrip() {
        let provider = HmacProvider;
        let alg = Algorithm::hmac(HashAlgorithm::Sha256);
        let imported = provider
            .import_jwk(&alg, &JsonWebKey::oct(b"abcdefg"), true)
            .unwrap();
        assert_eq!(imported.raw_bytes().unwrap(), b"abcdefg");

        let exported = provider.export_jwk(&imported).unwrap();
        assert_eq!(exported.k.as_deref(), Some(URL_SAFE_NO_PAD.encode(b"abcdefg").as_str()));
    }

    #[test]
    fn test_no_key_pairs() {
        assert!(matches!(
            HmacProvider.generate_key_pair(&Algorithm::hmac(HashAlgorithm::Sha256), true),
            Err(CryptoError::UnsupportedOperation { .. })
        ));
    }
}
