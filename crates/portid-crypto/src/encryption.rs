//! AEAD encryption for key entries at rest.
//!
//! Entries are sealed with ChaCha20-Poly1305 under a key derived from a
//! passphrase with Argon2id. Every seal draws a fresh random salt and nonce,
//! so sealing the same plaintext twice yields different envelopes. The
//! Argon2id cost parameters travel in the envelope so they can be raised
//! later without breaking existing files.
//!
//! # Envelope Format
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │ version: 1 (1 byte)                 │
//! │ argon2 memory KiB (u32 LE)          │
//! │ argon2 iterations (u32 LE)          │
//! │ argon2 parallelism (u32 LE)         │
//! │ salt: [u8; 16]                      │
//! │ nonce: [u8; 12]                     │
//! │ ciphertext: [u8; N]                 │
//! │ tag: [u8; 16]                       │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use portid_crypto::encryption::{open, seal, Envelope, KdfParams};
//!
//! let params = KdfParams::new(1024, 1, 1);
//! let envelope = seal(br#"{"kty":"oct","k":"YWJj"}"#, "passphrase", params).expect("seal");
//! let bytes = envelope.to_bytes();
//!
//! let parsed = Envelope::from_bytes(&bytes).expect("valid envelope");
//! let plaintext = open(&parsed, "passphrase").expect("open");
//! assert_eq!(plaintext.as_slice(), br#"{"kty":"oct","k":"YWJj"}"#);
//! ```

use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use portid_core::error::StoreError;
use rand::RngCore;
use zeroize::{Zeroize, Zeroizing};

// ============================================================================
// Constants
// ============================================================================

/// Current envelope format version.
pub const ENCRYPTION_VERSION: u8 = 1;

/// Length of the salt in bytes.
pub const SALT_LEN: usize = 16;

/// Length of the nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Length of the authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Length of the header preceding the ciphertext.
pub const HEADER_LEN: usize = 1 + 3 * 4 + SALT_LEN + NONCE_LEN;

const KEY_LEN: usize = 32;

// ============================================================================
// Types
// ============================================================================

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl KdfParams {
    /// Explicit parameters.
    #[must_use]
    pub const fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Self {
        Self {
            memory_kib,
            iterations,
            parallelism,
        }
    }
}

impl Default for KdfParams {
    /// OWASP recommendation: 64 MiB, 3 passes, 4 lanes.
    fn default() -> Self {
        Self::new(65536, 3, 4)
    }
}

/// A sealed key entry.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Format version.
    pub version: u8,
    /// Argon2id parameters used for this envelope.
    pub kdf: KdfParams,
    /// Random salt for key derivation.
    pub salt: [u8; SALT_LEN],
    /// Random nonce for the AEAD.
    pub nonce: [u8; NONCE_LEN],
    /// Ciphertext with the 16-byte tag appended.
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    /// Serializes the envelope.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.ciphertext.len());
        bytes.push(self.version);
        bytes.extend_from_slice(&self.kdf.memory_kib.to_le_bytes());
        bytes.extend_from_slice(&self.kdf.iterations.to_le_bytes());
        bytes.extend_from_slice(&self.kdf.parallelism.to_le_bytes());
        bytes.extend_from_slice(&self.salt);
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Parses an envelope.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidFormat`] if the input is truncated or the
    /// version is unknown.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() < HEADER_LEN + TAG_LEN {
            return Err(StoreError::InvalidFormat);
        }

        let (&version, rest) = bytes.split_first().ok_or(StoreError::InvalidFormat)?;
        if version != ENCRYPTION_VERSION {
            return Err(StoreError::InvalidFormat);
        }

        let (memory, rest) = take::<4>(rest)?;
        let (iterations, rest) = take::<4>(rest)?;
        let (parallelism, rest) = take::<4>(rest)?;
        let (salt, rest) = take::<SALT_LEN>(rest)?;
        let (nonce, ciphertext) = take::<NONCE_LEN>(rest)?;

        Ok(Self {
            version,
            kdf: KdfParams::new(
                u32::from_le_bytes(memory),
                u32::from_le_bytes(iterations),
                u32::from_le_bytes(parallelism),
            ),
            salt,
            nonce,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

fn take<const N: usize>(bytes: &[u8]) -> Result<([u8; N], &[u8]), StoreError> {
    let head = bytes.get(..N).ok_or(StoreError::InvalidFormat)?;
    let tail = bytes.get(N..).ok_or(StoreError::InvalidFormat)?;
    let head: [u8; N] = head.try_into().map_err(|_| StoreError::InvalidFormat)?;
    Ok((head, tail))
}

// ============================================================================
// Key Derivation
// ============================================================================

/// Derives the AEAD key. The caller zeroizes the result.
fn derive_key(
    passphrase: &str,
    salt: &[u8; SALT_LEN],
    kdf: KdfParams,
) -> Result<[u8; KEY_LEN], StoreError> {
    let params = Params::new(
        kdf.memory_kib,
        kdf.iterations,
        kdf.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|_| StoreError::InvalidFormat)?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut output = [0u8; KEY_LEN];
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut output)
        .map_err(|_| StoreError::EncryptionFailed)?;

    Ok(output)
}

// ============================================================================
// Seal / Open
// ============================================================================

/// Encrypts `plaintext` under `passphrase`.
///
/// # Errors
///
/// Returns [`StoreError::InvalidFormat`] for out-of-range Argon2 parameters
/// and [`StoreError::EncryptionFailed`] if derivation or encryption fails.
pub fn seal(plaintext: &[u8], passphrase: &str, kdf: KdfParams) -> Result<Envelope, StoreError> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);

    let mut encryption_key = derive_key(passphrase, &salt, kdf)?;

    let cipher = ChaCha20Poly1305::new_from_slice(&encryption_key)
        .map_err(|_| StoreError::EncryptionFailed);
    encryption_key.zeroize();

    let ciphertext = cipher?
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|_| StoreError::EncryptionFailed)?;

    Ok(Envelope {
        version: ENCRYPTION_VERSION,
        kdf,
        salt,
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Decrypts an envelope.
///
/// # Errors
///
/// Returns [`StoreError::InvalidFormat`] for an unknown version and
/// [`StoreError::DecryptionFailed`] for a wrong passphrase or tampered data.
pub fn open(envelope: &Envelope, passphrase: &str) -> Result<Zeroizing<Vec<u8>>, StoreError> {
    if envelope.version != ENCRYPTION_VERSION {
        return Err(StoreError::InvalidFormat);
    }
    if envelope.ciphertext.len() < TAG_LEN {
        return Err(StoreError::InvalidFormat);
    }

    let mut encryption_key = derive_key(passphrase, &envelope.salt, envelope.kdf)?;

    let cipher = ChaCha20Poly1305::new_from_slice(&encryption_key)
        .map_err(|_| StoreError::DecryptionFailed);
    encryption_key.zeroize();

    let plaintext = cipher?
        .decrypt(Nonce::from_slice(&envelope.nonce), envelope.ciphertext.as_ref())
        .map_err(|_| StoreError::DecryptionFailed)?;

    Ok(Zeroizing::new(plaintext))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;

    const FAST: KdfParams = KdfParams::new(1024, 1, 1);

    #[test]
    fn test_seal_open_roundtrip() {
        let envelope = seal(b"entry", "pw", FAST).unwrap();
        let parsed = Envelope::from_bytes(&envelope.to_bytes()).unwrap();
        assert_eq!(parsed.kdf, FAST);
        assert_eq!(open(&parsed, "pw").unwrap().as_slice(), b"entry");
    }

    #[test]
    fn test_wrong_passphrase() {
        let envelope = seal(b"entry", "pw", FAST).unwrap();
        assert!(matches!(
            open(&envelope, "other"),
            Err(StoreError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_fresh_salt_and_nonce() {
        let a = seal(b"entry", "pw", FAST).unwrap();
        let b = seal(b"entry", "pw", FAST).unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_tamper_detected() {
        let mut bytes = seal(b"entry", "pw", FAST).unwrap().to_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let parsed = Envelope::from_bytes(&bytes).unwrap();
        assert!(matches!(
            open(&parsed, "pw"),
            Err(StoreError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_truncated_and_versioned() {
        assert!(Envelope::from_bytes(&[1; 10]).is_err());

        let mut bytes = seal(b"entry", "pw", FAST).unwrap().to_bytes();
        bytes[0] = 2;
        assert!(matches!(
            Envelope::from_bytes(&bytes),
            Err(StoreError::InvalidFormat)
        ));
    }

    #[test]
    fn test_empty_plaintext() {
        let envelope = seal(b"", "pw", FAST).unwrap();
        assert_eq!(envelope.to_bytes().len(), HEADER_LEN + TAG_LEN);
        assert!(open(&envelope, "pw").unwrap().is_empty());
    }
}
