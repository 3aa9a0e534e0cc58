//! # portid-core
//!
//! Core types, configuration, and error definitions for the portid identity SDK.
//!
//! This crate has no cryptographic dependencies. It defines the vocabulary the
//! other portid crates share:
//!
//! ## Modules
//!
//! - [`error`] - Error taxonomy and result alias
//! - [`algorithm`] - Algorithm descriptors, key usages, key types, provider scopes
//! - [`jwk`] - JSON Web Key data model and RFC 7638 thumbprints
//! - [`config`] - TOML configuration types
//! - [`config_loader`] - Loading and saving `config.toml`
//!
//! ## Example
//!
//! ```rust
//! use portid_core::{Algorithm, CryptoError, HashAlgorithm};
//!
//! let sha1 = Algorithm::digest(HashAlgorithm::Sha1);
//! let err = CryptoError::unsupported_algorithm(sha1.name());
//! assert_eq!(err.to_string(), "unsupported algorithm: SHA-1");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod algorithm;
pub mod config;
pub mod config_loader;
pub mod error;
pub mod jwk;

pub use algorithm::{Algorithm, HashAlgorithm, KeyType, KeyUsage, ProviderScope};
pub use config::{Config, JwsFormat, KeyStoreKind};
pub use config_loader::{expand_path, load_config, ConfigLoader};
pub use error::{
    ConfigError, CryptoError, JoseError, PairwiseKeyError, PortidError, Result, StoreError,
};
pub use jwk::{JsonWebKey, KeyTypeTag};
