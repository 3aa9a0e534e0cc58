//! Error types for the portid identity SDK.
//!
//! This module provides the error taxonomy for every failure mode of the
//! cryptographic core, organized by domain:
//!
//! - [`StoreError`] - Key storage failures
//! - [`CryptoError`] - Provider dispatch and cryptographic failures
//! - [`PairwiseKeyError`] - Deterministic pairwise derivation failures
//! - [`JoseError`] - JWS parsing, serialization, and signing failures
//! - [`ConfigError`] - Configuration failures
//! - [`PortidError`] - Top-level error that wraps all error types
//!
//! None of these errors is retried or recovered from inside the SDK. They are
//! returned synchronously to the immediate caller.
//!
//! # Example
//!
//! ```rust
//! use portid_core::error::{CryptoError, PortidError, StoreError};
//!
//! fn load(reference: &str) -> Result<(), PortidError> {
//!     Err(CryptoError::from(StoreError::key_not_found(reference)).into())
//! }
//!
//! let err = load("signing-key").unwrap_err();
//! assert_eq!(
//!     err.to_string(),
//!     "crypto error: key not found: signing-key"
//! );
//! ```

/// Top-level error type for the portid SDK.
///
/// This enum wraps all domain-specific error types and provides
/// automatic conversion via the `#[from]` attribute.
#[derive(Debug, thiserror::Error)]
pub enum PortidError {
    /// Key storage operation failed.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Cryptographic operation failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// JWS processing failed.
    #[error("jose error: {0}")]
    Jose(#[from] JoseError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Convenience result alias using [`PortidError`].
pub type Result<T, E = PortidError> = std::result::Result<T, E>;

// ============================================================================
// StoreError
// ============================================================================

/// Errors that can occur during key storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No entry exists under the requested reference.
    #[error("key not found: {reference}")]
    KeyNotFound {
        /// The reference that was looked up.
        reference: String,
    },

    /// A public projection was requested for a key that has none.
    #[error("no public key for reference: {reference}")]
    NoPublicKey {
        /// The reference holding a secret (symmetric) key.
        reference: String,
    },

    /// The backing storage rejected the write or read.
    #[error("storage failure: {context}")]
    StorageFailure {
        /// Context about the failure.
        context: String,
    },

    /// File system I/O error.
    #[error("I/O error: {0}")]
    IoError(#[source] std::io::Error),

    /// Key encryption failed.
    #[error("encryption failed")]
    EncryptionFailed,

    /// Key decryption failed (likely wrong passphrase).
    #[error("decryption failed (wrong passphrase?)")]
    DecryptionFailed,

    /// The stored entry or reference format is invalid.
    #[error("invalid key entry format")]
    InvalidFormat,

    /// Insufficient file system permissions.
    #[error("permission denied")]
    PermissionDenied,
}

impl StoreError {
    /// Create a `KeyNotFound` error.
    #[must_use]
    pub fn key_not_found(reference: impl Into<String>) -> Self {
        Self::KeyNotFound {
            reference: reference.into(),
        }
    }

    /// Create a `NoPublicKey` error.
    #[must_use]
    pub fn no_public_key(reference: impl Into<String>) -> Self {
        Self::NoPublicKey {
            reference: reference.into(),
        }
    }

    /// Create a `StorageFailure` error with context.
    #[must_use]
    pub fn storage_failure(context: impl Into<String>) -> Self {
        Self::StorageFailure {
            context: context.into(),
        }
    }

    /// Returns `true` if this error reports a missing reference.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. })
    }
}

impl From<std::io::Error> for StoreError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::IoError(error),
        }
    }
}

// ============================================================================
// CryptoError
// ============================================================================

/// Errors raised by the provider registry, the providers, and the
/// crypto operations facade.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// No provider is registered for the algorithm name and scope.
    #[error("unsupported algorithm: {name}")]
    UnsupportedAlgorithm {
        /// The algorithm name that was requested (e.g. `SHA-1`).
        name: String,
    },

    /// A provider rejected one of the algorithm parameters.
    #[error("unsupported parameter for {algorithm}: {parameter}")]
    UnsupportedParameter {
        /// The algorithm family name.
        algorithm: String,
        /// Description of the rejected parameter (e.g. `namedCurve=P-256`).
        parameter: String,
    },

    /// The provider does not implement the requested operation.
    #[error("{algorithm} does not support {operation}")]
    UnsupportedOperation {
        /// The algorithm family name.
        algorithm: String,
        /// The operation that was attempted.
        operation: String,
    },

    /// The key does not fit the operation (wrong type, usage, or encoding).
    #[error("invalid key: {context}")]
    InvalidKey {
        /// Context about why the key was rejected.
        context: String,
    },

    /// The key's raw material is held by an external key store and cannot be read.
    #[error("key material is not extractable")]
    NonExtractable,

    /// Deterministic pairwise derivation failed.
    #[error(transparent)]
    Pairwise(#[from] PairwiseKeyError),

    /// The key store failed; `KeyNotFound` surfaces here unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Provider-internal failure (e.g. a hardware call failing).
    #[error("crypto failure: {context}")]
    Crypto {
        /// Context about the failure.
        context: String,
    },
}

impl CryptoError {
    /// Create an `UnsupportedAlgorithm` error.
    #[must_use]
    pub fn unsupported_algorithm(name: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm { name: name.into() }
    }

    /// Create an `UnsupportedParameter` error.
    #[must_use]
    pub fn unsupported_parameter(
        algorithm: impl Into<String>,
        parameter: impl Into<String>,
    ) -> Self {
        Self::UnsupportedParameter {
            algorithm: algorithm.into(),
            parameter: parameter.into(),
        }
    }

    /// Create an `UnsupportedOperation` error.
    #[must_use]
    pub fn unsupported_operation(
        algorithm: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self::UnsupportedOperation {
            algorithm: algorithm.into(),
            operation: operation.into(),
        }
    }

    /// Create an `InvalidKey` error with context.
    #[must_use]
    pub fn invalid_key(context: impl Into<String>) -> Self {
        Self::InvalidKey {
            context: context.into(),
        }
    }

    /// Create a catch-all `Crypto` error with context.
    #[must_use]
    pub fn crypto(context: impl Into<String>) -> Self {
        Self::Crypto {
            context: context.into(),
        }
    }
}

// ============================================================================
// PairwiseKeyError
// ============================================================================

/// Errors that can occur while deriving pairwise keys.
#[derive(Debug, thiserror::Error)]
pub enum PairwiseKeyError {
    /// The algorithm or curve has no deterministic derivation.
    #[error("pairwise key generation is not supported for {algorithm}")]
    UnsupportedAlgorithm {
        /// Description of the requested algorithm and curve.
        algorithm: String,
    },

    /// The seed reference does not resolve to a raw symmetric (`oct`) key.
    #[error("seed {reference} is not a symmetric key")]
    InvalidSeed {
        /// The seed reference.
        reference: String,
    },

    /// Every candidate scalar in the derivation window was rejected.
    #[error("pairwise derivation exhausted all candidates")]
    DerivationExhausted,
}

impl PairwiseKeyError {
    /// Create an `UnsupportedAlgorithm` error.
    #[must_use]
    pub fn unsupported_algorithm(algorithm: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm {
            algorithm: algorithm.into(),
        }
    }

    /// Create an `InvalidSeed` error.
    #[must_use]
    pub fn invalid_seed(reference: impl Into<String>) -> Self {
        Self::InvalidSeed {
            reference: reference.into(),
        }
    }
}

// ============================================================================
// JoseError
// ============================================================================

/// Errors raised by the JWS token engine.
///
/// Note that signature verification never produces these for an invalid
/// signature; verification reports `false` instead.
#[derive(Debug, thiserror::Error)]
pub enum JoseError {
    /// Neither the header nor the signing key names an algorithm.
    #[error("missing signing algorithm")]
    MissingAlgorithm,

    /// The input is not a well-formed JWS.
    #[error("parse error: {context}")]
    Parse {
        /// Context about the parse failure.
        context: String,
    },

    /// The token cannot be written in the requested format.
    #[error("serialization error: {context}")]
    Serialization {
        /// Context about the failure.
        context: String,
    },

    /// A cryptographic operation failed while signing.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// JSON encoding or decoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A base64url segment could not be decoded.
    #[error("invalid base64url: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl JoseError {
    /// Create a `Parse` error with context.
    #[must_use]
    pub fn parse(context: impl Into<String>) -> Self {
        Self::Parse {
            context: context.into(),
        }
    }

    /// Create a `Serialization` error with context.
    #[must_use]
    pub fn serialization(context: impl Into<String>) -> Self {
        Self::Serialization {
            context: context.into(),
        }
    }
}

// ============================================================================
// ConfigError
// ============================================================================

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {context}")]
    ParseFailed {
        /// Context about the parsing failure.
        context: String,
    },

    /// A configuration value is invalid.
    #[error("invalid value for {field}: {value}")]
    InvalidValue {
        /// The field name with the invalid value.
        field: String,
        /// The invalid value.
        value: String,
    },

    /// The home directory could not be determined.
    #[error("could not determine home directory")]
    NoHomeDirectory,

    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Create a `FileNotFound` error.
    #[must_use]
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a `ParseFailed` error with context.
    #[must_use]
    pub fn parse_failed(context: impl Into<String>) -> Self {
        Self::ParseFailed {
            context: context.into(),
        }
    }

    /// Create an `InvalidValue` error.
    #[must_use]
    pub fn invalid_value(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
