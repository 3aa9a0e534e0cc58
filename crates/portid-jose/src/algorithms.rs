//! JWA algorithm names.
//!
//! The table is the one place the JWS engine and the crypto facade agree on
//! vocabulary:
//!
//! | JWA | Descriptor |
//! |-----|------------|
//! | `ES256K` | ECDSA / secp256k1 / SHA-256 |
//! | `RS256`, `RS384`, `RS512` | RSASSA-PKCS1-v1_5 / SHA-256, 384, 512 |
//! | `RSA-OAEP` | RSA-OAEP / SHA-1 |
//! | `RSA-OAEP-256` | RSA-OAEP / SHA-256 |

use portid_core::algorithm::{Algorithm, HashAlgorithm, DEFAULT_MODULUS_LENGTH};
use portid_core::error::CryptoError;

/// `ES256K`.
pub const ES256K: &str = "ES256K";
/// `RS256`.
pub const RS256: &str = "RS256";
/// `RS384`.
pub const RS384: &str = "RS384";
/// `RS512`.
pub const RS512: &str = "RS512";
/// `RSA-OAEP` (SHA-1; providers refuse it).
pub const RSA_OAEP: &str = "RSA-OAEP";
/// `RSA-OAEP-256`.
pub const RSA_OAEP_256: &str = "RSA-OAEP-256";

/// Every JWA name the table knows.
pub const SUPPORTED: &[&str] = &[ES256K, RS256, RS384, RS512, RSA_OAEP, RSA_OAEP_256];

/// Maps a JWA name to its descriptor.
///
/// # Errors
///
/// Returns [`CryptoError::UnsupportedAlgorithm`] naming `jwa` for names
/// outside the table.
pub fn from_jwa(jwa: &str) -> Result<Algorithm, CryptoError> {
    let rsa_oaep = |hash| Algorithm::RsaOaep {
        modulus_length: DEFAULT_MODULUS_LENGTH,
        hash,
    };
    match jwa {
        ES256K => Ok(Algorithm::es256k()),
        RS256 => Ok(Algorithm::rsassa(HashAlgorithm::Sha256)),
        RS384 => Ok(Algorithm::rsassa(HashAlgorithm::Sha384)),
        RS512 => Ok(Algorithm::rsassa(HashAlgorithm::Sha512)),
        RSA_OAEP => Ok(rsa_oaep(HashAlgorithm::Sha1)),
        RSA_OAEP_256 => Ok(rsa_oaep(HashAlgorithm::Sha256)),
        other => Err(CryptoError::unsupported_algorithm(other)),
    }
}

/// The JWA name a key's descriptor declares, if the table has one.
///
/// Modulus length is ignored; EC curves must be secp256k1.
#[must_use]
pub fn to_jwa(algorithm: &Algorithm) -> Option<&'static str> {
    match algorithm {
        Algorithm::Ecdsa { named_curve, hash }
            if portid_crypto::provider::ec::is_secp256k1(named_curve)
                && *hash == HashAlgorithm::Sha256 =>
        {
            Some(ES256K)
        }
        Algorithm::RsassaPkcs1V15 { hash, .. } => match hash {
            HashAlgorithm::Sha256 => Some(RS256),
            HashAlgorithm::Sha384 => Some(RS384),
            HashAlgorithm::Sha512 => Some(RS512),
            HashAlgorithm::Sha1 => None,
        },
        Algorithm::RsaOaep { hash, .. } => match hash {
            HashAlgorithm::Sha1 => Some(RSA_OAEP),
            HashAlgorithm::Sha256 => Some(RSA_OAEP_256),
            HashAlgorithm::Sha384 | HashAlgorithm::Sha512 => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_table_is_bijective() {
        for jwa in SUPPORTED {
            let algorithm = from_jwa(jwa).unwrap();
            assert_eq!(to_jwa(&algorithm), Some(*jwa), "{jwa}");
        }
    }

    #[test]
    fn test_es256k_descriptor() {
        assert_eq!(from_jwa("ES256K").unwrap(), Algorithm::es256k());
    }

    #[test]
    fn test_unknown_name() {
        let err = from_jwa("HS256").unwrap_err();
        assert_eq!(err.to_string(), "unsupported algorithm: HS256");
    }

    #[test]
    fn test_undeclared_descriptors() {
        assert_eq!(to_jwa(&Algorithm::hmac(HashAlgorithm::Sha256)), None);
        let p256 = Algorithm::Ecdsa {
            named_curve: "P-256".to_string(),
            hash: HashAlgorithm::Sha256,
        };
        assert_eq!(to_jwa(&p256), None);
    }

    #[test]
    fn test_modulus_length_is_ignored() {
        let rs4096 = Algorithm::RsassaPkcs1V15 {
            modulus_length: 4096,
            hash: HashAlgorithm::Sha512,
        };
        assert_eq!(to_jwa(&rs4096), Some(RS512));
    }
}
