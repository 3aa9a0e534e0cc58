//! Configuration types for the portid SDK and CLI.
//!
//! Configuration is stored in TOML format at `~/.portid/config.toml`. Every
//! section has serde defaults, so an empty file is a valid configuration.
//!
//! # Examples
//!
//! ```
//! use portid_core::config::{Config, JwsFormat, KeyStoreKind};
//!
//! let config = Config::default();
//! assert_eq!(config.keys.directory, "~/.portid/keys");
//! assert_eq!(config.keys.store, KeyStoreKind::File);
//! assert_eq!(config.jws.format, JwsFormat::Compact);
//! assert!(!config.jws.allow_first_candidate_fallback);
//! assert!(config.validate().is_ok());
//! ```
//!
//! # Default TOML Output
//!
//! ```toml
//! [keys]
//! directory = "~/.portid/keys"
//! store = "file"
//!
//! [pairwise]
//! curve = "secp256k1"
//!
//! [jws]
//! format = "compact"
//! allow_first_candidate_fallback = false
//!
//! [rsa]
//! modulus_length = 2048
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::algorithm::{DEFAULT_MODULUS_LENGTH, SECP256K1};
use crate::error::ConfigError;

/// Smallest RSA modulus the SDK will generate.
pub const MIN_MODULUS_LENGTH: usize = 2048;

/// Largest RSA modulus the SDK will generate.
pub const MAX_MODULUS_LENGTH: usize = 4096;

/// Top-level configuration.
///
/// # Examples
///
/// ```
/// use portid_core::config::{Config, JwsFormat};
///
/// let toml_str = r#"
/// [jws]
/// format = "general"
///
/// [rsa]
/// modulus_length = 3072
/// "#;
///
/// let config: Config = toml::from_str(toml_str).expect("valid TOML");
/// assert_eq!(config.jws.format, JwsFormat::General);
/// assert_eq!(config.rsa.modulus_length, 3072);
/// assert_eq!(config.pairwise.curve, "secp256k1");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Key storage configuration.
    #[serde(default)]
    pub keys: KeysConfig,

    /// Pairwise derivation configuration.
    #[serde(default)]
    pub pairwise: PairwiseConfig,

    /// JWS engine configuration.
    #[serde(default)]
    pub jws: JwsConfig,

    /// RSA key generation configuration.
    #[serde(default)]
    pub rsa: RsaConfig,
}

// ============================================================================
// [keys]
// ============================================================================

/// Which key store backs the SDK.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStoreKind {
    /// Encrypted files under `keys.directory`.
    #[default]
    File,
    /// Process memory only; nothing survives exit.
    Memory,
}

fn default_keys_dir() -> String {
    "~/.portid/keys".to_string()
}

/// Key storage configuration.
///
/// Keys are stored as encrypted JWK files in the configured directory:
/// ```text
/// ~/.portid/keys/
/// ├── seed.jwk.enc
/// └── signing.jwk.enc
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeysConfig {
    /// Directory for encrypted key files. Supports `~` expansion.
    #[serde(default = "default_keys_dir")]
    pub directory: String,

    /// Store implementation.
    #[serde(default)]
    pub store: KeyStoreKind,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            directory: default_keys_dir(),
            store: KeyStoreKind::default(),
        }
    }
}

// ============================================================================
// [pairwise]
// ============================================================================

fn default_curve() -> String {
    SECP256K1.to_string()
}

/// Pairwise derivation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PairwiseConfig {
    /// Curve used for pairwise keys. Only `secp256k1` has a deterministic derivation.
    #[serde(default = "default_curve")]
    pub curve: String,
}

impl Default for PairwiseConfig {
    fn default() -> Self {
        Self {
            curve: default_curve(),
        }
    }
}

// ============================================================================
// [jws]
// ============================================================================

/// JWS wire format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JwsFormat {
    /// `protected.payload.signature`, one signature.
    #[default]
    Compact,
    /// Flattened JSON, one signature.
    Flat,
    /// General JSON, any number of signatures.
    General,
}

impl fmt::Display for JwsFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compact => write!(f, "compact"),
            Self::Flat => write!(f, "flat"),
            Self::General => write!(f, "general"),
        }
    }
}

impl FromStr for JwsFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "flat" | "flattened" => Ok(Self::Flat),
            "general" | "json" => Ok(Self::General),
            other => Err(ConfigError::invalid_value("jws.format", other)),
        }
    }
}

/// JWS engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JwsConfig {
    /// Format used when the CLI serializes a signed token.
    #[serde(default)]
    pub format: JwsFormat,

    /// Verify against the first candidate key when no `kid` matches.
    ///
    /// This weakens verification and exists only for interoperability with
    /// signers that omit or mangle `kid`.
    #[serde(default)]
    pub allow_first_candidate_fallback: bool,
}

// ============================================================================
// [rsa]
// ============================================================================

const fn default_modulus_length() -> usize {
    DEFAULT_MODULUS_LENGTH
}

/// RSA key generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RsaConfig {
    /// Modulus length in bits (2048 to 4096).
    #[serde(default = "default_modulus_length")]
    pub modulus_length: usize,
}

impl Default for RsaConfig {
    fn default() -> Self {
        Self {
            modulus_length: default_modulus_length(),
        }
    }
}

impl Config {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if:
    /// - `keys.directory` is empty
    /// - `pairwise.curve` is anything other than `secp256k1`
    /// - `rsa.modulus_length` is outside 2048..=4096 or not a multiple of 8
    ///
    /// # Examples
    ///
    /// ```
    /// use portid_core::config::Config;
    ///
    /// let mut config = Config::default();
    /// config.pairwise.curve = "secp256r1".to_string();
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.keys.directory.is_empty() {
            return Err(ConfigError::invalid_value("keys.directory", "<empty>"));
        }

        if self.pairwise.curve != SECP256K1 {
            return Err(ConfigError::invalid_value(
                "pairwise.curve",
                &self.pairwise.curve,
            ));
        }

        let bits = self.rsa.modulus_length;
        if !(MIN_MODULUS_LENGTH..=MAX_MODULUS_LENGTH).contains(&bits) || bits % 8 != 0 {
            return Err(ConfigError::invalid_value(
                "rsa.modulus_length",
                bits.to_string(),
            ));
        }

        Ok(())
    }

    /// The default configuration as a commented TOML document.
    ///
    /// # Examples
    ///
    /// ```
    /// use portid_core::config::Config;
    ///
    /// let toml = Config::default_toml();
    /// assert!(toml.contains("[keys]"));
    /// assert!(toml.contains("[jws]"));
    /// ```
    #[must_use]
    pub fn default_toml() -> String {
        r#"[keys]
directory = "~/.portid/keys"
# "file" stores encrypted JWKs on disk; "memory" keeps them for the process only
store = "file"

[pairwise]
curve = "secp256k1"

[jws]
# compact | flat | general
format = "compact"
# Verify against the first candidate key when no kid matches (weakens verification)
allow_first_candidate_fallback = false

[rsa]
modulus_length = 2048
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_default_toml_parses_to_default() {
        let config: Config = toml::from_str(&Config::default_toml()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_store_kind_lowercase() {
        let config: Config = toml::from_str("[keys]\nstore = \"memory\"\n").unwrap();
        assert_eq!(config.keys.store, KeyStoreKind::Memory);
        assert_eq!(config.keys.directory, "~/.portid/keys");
    }

    #[test]
    fn test_validate_rejects_unsupported_curve() {
        let mut config = Config::default();
        config.pairwise.curve = "secp256r1".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("pairwise.curve"));
    }

    #[test]
    fn test_validate_rejects_modulus_out_of_range() {
        let mut config = Config::default();
        config.rsa.modulus_length = 1024;
        assert!(config.validate().is_err());

        config.rsa.modulus_length = 8192;
        assert!(config.validate().is_err());

        config.rsa.modulus_length = 3072;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_directory() {
        let mut config = Config::default();
        config.keys.directory = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_jws_format_from_str() {
        assert_eq!("Compact".parse::<JwsFormat>().unwrap(), JwsFormat::Compact);
        assert_eq!("flattened".parse::<JwsFormat>().unwrap(), JwsFormat::Flat);
        assert_eq!("general".parse::<JwsFormat>().unwrap(), JwsFormat::General);
        assert!("xml".parse::<JwsFormat>().is_err());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let mut config = Config::default();
        config.jws.format = JwsFormat::Flat;
        config.jws.allow_first_candidate_fallback = true;
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
