//! RSA-OAEP encryption.

use portid_core::algorithm::{Algorithm, HashAlgorithm, KeyUsage, RSA_OAEP};
use portid_core::error::CryptoError;
use portid_core::jwk::JsonWebKey;
use rsa::Oaep;
use sha2::{Sha256, Sha384, Sha512};

use super::rsa::{generate, private_key, public_key};
use super::{wrong_family, CryptoProvider};
use crate::jwk;
use crate::key::{CryptoKey, CryptoKeyPair};

/// Software RSA-OAEP with SHA-256, SHA-384, or SHA-512.
///
/// SHA-1 OAEP (the JWA `RSA-OAEP` name) is rejected.
#[derive(Debug, Default, Clone, Copy)]
pub struct RsaOaepProvider;

impl RsaOaepProvider {
    fn validate(algorithm: &Algorithm) -> Result<(usize, HashAlgorithm), CryptoError> {
        let Algorithm::RsaOaep {
            modulus_length,
            hash,
        } = algorithm
        else {
            return Err(wrong_family(RSA_OAEP, algorithm));
        };
        Ok((*modulus_length, *hash))
    }

    fn padding(hash: HashAlgorithm) -> Result<Oaep, CryptoError> {
        match hash {
            HashAlgorithm::Sha256 => Ok(Oaep::new::<Sha256>()),
            HashAlgorithm::Sha384 => Ok(Oaep::new::<Sha384>()),
            HashAlgorithm::Sha512 => Ok(Oaep::new::<Sha512>()),
            HashAlgorithm::Sha1 => Err(CryptoError::unsupported_parameter(
                RSA_OAEP,
                format!("hash={hash}"),
            )),
        }
    }
}

impl CryptoProvider for RsaOaepProvider {
    fn name(&self) -> &'static str {
        RSA_OAEP
    }

    fn private_key_usages(&self) -> &'static [KeyUsage] {
        &[KeyUsage::Decrypt, KeyUsage::UnwrapKey]
    }

    fn public_key_usages(&self) -> &'static [KeyUsage] {
        &[KeyUsage::Encrypt, KeyUsage::WrapKey]
    }

    fn generate_key_pair(
        &self,
        algorithm: &Algorithm,
        extractable: bool,
    ) -> Result<CryptoKeyPair, CryptoError> {
        let (modulus_length, hash) = Self::validate(algorithm)?;
        Self::padding(hash)?;
        generate(
            RSA_OAEP,
            algorithm,
            modulus_length,
            self.private_key_usages(),
            self.public_key_usages(),
            extractable,
        )
    }

    fn encrypt(
        &self,
        algorithm: &Algorithm,
        key: &CryptoKey,
        data: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let (_, hash) = Self::validate(algorithm)?;
        let padding = Self::padding(hash)?;
        let public = public_key(key, KeyUsage::Encrypt)?;
        public
            .encrypt(&mut rand::rngs::OsRng, padding, data)
            .map_err(|e| CryptoError::crypto(format!("RSA-OAEP encryption failed: {e}")))
    }

    fn decrypt(
        &self,
        algorithm: &Algorithm,
        key: &CryptoKey,
        data: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let (_, hash) = Self::validate(algorithm)?;
        let padding = Self::padding(hash)?;
        let private = private_key(key, KeyUsage::Decrypt)?;
        private
            .decrypt(padding, data)
            .map_err(|_| CryptoError::crypto("RSA-OAEP decryption failed"))
    }

    fn import_jwk(
        &self,
        algorithm: &Algorithm,
        source: &JsonWebKey,
        extractable: bool,
    ) -> Result<CryptoKey, CryptoError> {
        let (_, hash) = Self::validate(algorithm)?;
        Self::padding(hash)?;
        jwk::from_jwk(source, algorithm, extractable)
    }
}
