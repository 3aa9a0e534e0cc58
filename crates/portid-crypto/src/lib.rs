//! # portid-crypto
//!
//! Cryptographic core of the portid identity SDK.
//!
//! ## Modules
//!
//! - [`key`] - `CryptoKey`, key pairs, and store entries
//! - [`keys`] - `SecretKey`, a zeroizing 32-byte secret used for seeds
//! - [`provider`] - One provider per algorithm family (ECDSA, RSA, HMAC, SHA-2)
//! - [`registry`] - Provider lookup by `(algorithm name, scope)`
//! - [`store`] - `KeyStore` trait with in-memory and encrypted-file backends
//! - [`encryption`] - Passphrase sealing for the file backend
//! - [`jwk`] - Conversion between keys and JSON Web Keys
//! - [`operations`] - The `CryptoOperations` facade
//! - [`pairwise`] - Deterministic per-peer key derivation
//!
//! ## Supported Algorithms
//!
//! - ECDSA on secp256k1 with SHA-256 (`ES256K`)
//! - RSASSA-PKCS1-v1_5 with SHA-256/384/512 (`RS256`, `RS384`, `RS512`)
//! - RSA-OAEP with SHA-256/384/512
//! - HMAC with SHA-256/384/512
//! - SHA-256/384/512 digests
//!
//! ## Security
//!
//! - No unsafe code allowed
//! - Constant-time MAC comparison
//! - Key material zeroized on drop and redacted from `Debug` output
//! - Hardware-backed keys are opaque handles whose bytes are never read

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod encryption;
pub mod jwk;
pub mod key;
pub mod keys;
pub mod operations;
pub mod pairwise;
pub mod provider;
pub mod registry;
pub mod store;

// Re-export commonly used types
pub use key::{CryptoKey, CryptoKeyPair, KeyEntry, KeyMaterial};
pub use keys::{SecretKey, SECRET_KEY_LEN};
pub use operations::{CryptoOperations, KeySource};
pub use pairwise::PairwiseKeyGenerator;
pub use provider::CryptoProvider;
pub use registry::CryptoRegistry;
pub use store::{FileKeyStore, KeyStore, MemoryKeyStore};
