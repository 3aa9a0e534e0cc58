//! Seed material with secure memory handling.
//!
//! [`SecretKey`] holds the 32 random bytes behind a persona seed or a freshly
//! generated EC scalar. It is zeroized on drop, never printed, and compared in
//! constant time. It deliberately does not implement `Clone`.

use rand::RngCore;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The length of a secret key in bytes.
pub const SECRET_KEY_LEN: usize = 32;

/// A 32-byte secret with automatic zeroization.
///
/// # Example
///
/// ```
/// use portid_crypto::keys::SecretKey;
///
/// let seed = SecretKey::generate();
/// assert_eq!(seed.len(), 32);
/// assert_eq!(format!("{seed:?}"), "SecretKey([REDACTED])");
/// ```
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    bytes: [u8; SECRET_KEY_LEN],
}

impl SecretKey {
    /// Wraps existing bytes. The caller should zeroize its own copy.
    #[must_use]
    pub const fn new(bytes: [u8; SECRET_KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Fresh random bytes from the OS RNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; SECRET_KEY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// The raw bytes. Do not keep the reference beyond the immediate operation.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SECRET_KEY_LEN] {
        &self.bytes
    }

    /// Always 32.
    #[must_use]
    pub const fn len(&self) -> usize {
        SECRET_KEY_LEN
    }

    /// Always `false`.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Interprets the bytes as a secp256k1 signing scalar.
    ///
    /// Returns `None` if the value is zero or not below the curve order.
    #[must_use]
    pub fn to_signing_key(&self) -> Option<k256::ecdsa::SigningKey> {
        k256::ecdsa::SigningKey::from_bytes((&self.bytes).into()).ok()
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes.ct_eq(&other.bytes).into()
    }
}

impl Eq for SecretKey {}

impl From<[u8; SECRET_KEY_LEN]> for SecretKey {
    fn from(bytes: [u8; SECRET_KEY_LEN]) -> Self {
        Self::new(bytes)
    }
}
