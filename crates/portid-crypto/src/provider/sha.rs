//! SHA-2 message digests.

use portid_core::algorithm::{Algorithm, HashAlgorithm};
use portid_core::error::CryptoError;
use sha2::{Digest, Sha256, Sha384, Sha512};

use super::CryptoProvider;

/// Digest provider registered once per SHA-2 name.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShaProvider;

impl CryptoProvider for ShaProvider {
    fn name(&self) -> &'static str {
        "SHA-2"
    }

    fn digest(&self, algorithm: &Algorithm, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match algorithm.hash() {
            HashAlgorithm::Sha256 => Ok(Sha256::digest(data).to_vec()),
            HashAlgorithm::Sha384 => Ok(Sha384::digest(data).to_vec()),
            HashAlgorithm::Sha512 => Ok(Sha512::digest(data).to_vec()),
            HashAlgorithm::Sha1 => Err(CryptoError::unsupported_parameter(
                self.name(),
                "hash=SHA-1",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_sha256_abc() {
        let out = ShaProvider
            .digest(&Algorithm::digest(HashAlgorithm::Sha256), b"abc")
            .unwrap();
        assert_eq!(
            hex::encode(out),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_output_lengths() {
        for hash in [HashAlgorithm::Sha256, HashAlgorithm::Sha384, HashAlgorithm::Sha512] {
            let out = ShaProvider.digest(&Algorithm::digest(hash), b"").unwrap();
            assert_eq!(out.len(), hash.output_len());
        }
    }

    #[test]
    fn test_sha1_refused() {
        assert!(ShaProvider
            .digest(&Algorithm::digest(HashAlgorithm::Sha1), b"")
            .is_err());
    }
}
