//! Per-invocation state: the loaded configuration and the key store it selects.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use portid_core::config::{Config, KeyStoreKind};
use portid_core::config_loader::{expand_path, ConfigLoader};
use portid_crypto::store::{FileKeyStore, ENTRY_EXTENSION};
use portid_crypto::{CryptoOperations, CryptoRegistry, KeyStore};
use portid_jose::VerifyOptions;
use tracing::{debug, warn};

use super::commands::CommandError;
use super::passphrase::{read_new_passphrase, read_passphrase};

/// Configuration for one CLI invocation.
#[derive(Debug, Clone)]
pub struct CommandContext {
    config: Config,
    config_path: PathBuf,
}

impl CommandContext {
    /// Resolves the config file: `explicit` if given, else the default
    /// location under `$PORTID_HOME` or `~/.portid`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf, CommandError> {
        match explicit {
            Some(path) => Ok(path.to_path_buf()),
            None => Ok(ConfigLoader::new()?.config_path()),
        }
    }

    /// Loads and validates the configuration. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Config`] for unreadable, malformed, or
    /// invalid configuration.
    pub fn load(explicit: Option<&Path>) -> Result<Self, CommandError> {
        let config_path = Self::resolve_config_path(explicit)?;
        let config = if config_path.exists() {
            ConfigLoader::load_from_path(&config_path)?
        } else {
            debug!(path = %config_path.display(), "no config file, using defaults");
            Config::default()
        };
        Self::from_config(config, config_path)
    }

    /// Wraps an already-loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Config`] if the configuration is invalid.
    pub fn from_config(config: Config, config_path: PathBuf) -> Result<Self, CommandError> {
        config.validate()?;
        Ok(Self {
            config,
            config_path,
        })
    }

    /// The loaded configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Where the configuration was (or would be) read from.
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// The key directory with `~` expanded.
    ///
    /// # Errors
    ///
    /// Returns an error if `~` cannot be expanded.
    pub fn keys_dir(&self) -> Result<PathBuf, CommandError> {
        Ok(expand_path(&self.config.keys.directory)?)
    }

    /// Opens the configured key store behind a default registry.
    ///
    /// The file store asks for its passphrase here; an empty store asks for
    /// a new one with confirmation.
    ///
    /// # Errors
    ///
    /// Returns passphrase or store errors.
    pub fn open_operations(&self) -> Result<CryptoOperations, CommandError> {
        let store: Arc<dyn KeyStore> = match self.config.keys.store {
            KeyStoreKind::Memory => {
                warn!("keys.store = \"memory\": keys are discarded when portid exits");
                return Ok(CryptoOperations::in_memory());
            }
            KeyStoreKind::File => {
                let keys_dir = self.keys_dir()?;
                let passphrase = if has_entries(&keys_dir) {
                    read_passphrase()?
                } else {
                    read_new_passphrase()?
                };
                Arc::new(FileKeyStore::with_path(keys_dir, passphrase.as_str())?)
            }
        };
        Ok(CryptoOperations::new(store, CryptoRegistry::with_defaults()))
    }

    /// Lists stored references and kids without unlocking the store.
    ///
    /// The file store keeps a cleartext index, so no passphrase is asked
    /// for. The memory store starts empty on every invocation.
    ///
    /// # Errors
    ///
    /// Returns store errors for an unreadable index.
    pub fn list_keys(&self) -> Result<BTreeMap<String, String>, CommandError> {
        match self.config.keys.store {
            KeyStoreKind::Memory => Ok(BTreeMap::new()),
            KeyStoreKind::File => Ok(FileKeyStore::list_at(&self.keys_dir()?)?),
        }
    }

    /// Verification options from `[jws]`, widened by command-line flags.
    #[must_use]
    pub const fn verify_options(
        &self,
        match_all: bool,
        allow_first_candidate: bool,
    ) -> VerifyOptions {
        VerifyOptions {
            match_all,
            allow_first_candidate_fallback: allow_first_candidate
                || self.config.jws.allow_first_candidate_fallback,
        }
    }
}

fn has_entries(keys_dir: &Path) -> bool {
    std::fs::read_dir(keys_dir).is_ok_and(|mut entries| {
        entries.any(|entry| {
            entry.is_ok_and(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .ends_with(ENTRY_EXTENSION)
            })
        })
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;
    use portid_core::algorithm::{Algorithm, HashAlgorithm, KeyType, KeyUsage};
    use portid_core::config::JwsFormat;
    use portid_crypto::encryption::KdfParams;
    use portid_crypto::CryptoKey;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let ctx = CommandContext::load(Some(&path)).unwrap();
        assert_eq!(ctx.config(), &Config::default());
        assert_eq!(ctx.config_path(), path);
    }

    #[test]
    fn test_explicit_file_is_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[jws]\nformat = \"flat\"\n").unwrap();

        let ctx = CommandContext::load(Some(&path)).unwrap();
        assert_eq!(ctx.config().jws.format, JwsFormat::Flat);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[pairwise]\ncurve = \"P-256\"\n").unwrap();

        assert!(matches!(
            CommandContext::load(Some(&path)),
            Err(CommandError::Config(_))
        ));
    }

    #[test]
    fn test_verify_options_merge() {
        let mut config = Config::default();
        let ctx = CommandContext::from_config(config.clone(), PathBuf::new()).unwrap();
        assert_eq!(ctx.verify_options(false, false), VerifyOptions::default());
        assert!(ctx.verify_options(false, true).allow_first_candidate_fallback);

        config.jws.allow_first_candidate_fallback = true;
        let ctx = CommandContext::from_config(config, PathBuf::new()).unwrap();
        let options = ctx.verify_options(true, false);
        assert!(options.match_all);
        assert!(options.allow_first_candidate_fallback);
    }

    #[test]
    fn test_memory_store_needs_no_passphrase() {
        let mut config = Config::default();
        config.keys.store = KeyStoreKind::Memory;
        let ctx = CommandContext::from_config(config, PathBuf::new()).unwrap();
        let ops = ctx.open_operations().unwrap();
        assert!(ops.store().list().unwrap().is_empty());
    }

    #[test]
    fn test_list_keys_reads_index_without_passphrase() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.keys.directory = dir.path().join("keys").display().to_string();
        let ctx = CommandContext::from_config(config, PathBuf::new()).unwrap();
        assert!(ctx.list_keys().unwrap().is_empty());

        let store = FileKeyStore::with_path(ctx.keys_dir().unwrap(), "correct horse")
            .unwrap()
            .with_kdf_params(KdfParams::new(1024, 1, 1));
        let seed = CryptoKey::from_raw(
            KeyType::Secret,
            Algorithm::hmac(HashAlgorithm::Sha512),
            [KeyUsage::Sign],
            vec![7; 32],
            true,
        )
        .with_kid("seed");
        store.save("seed", seed.into()).unwrap();

        let listed = ctx.list_keys().unwrap();
        assert_eq!(listed.get("seed").map(String::as_str), Some("seed"));
    }

    #[test]
    fn test_has_entries() {
        let dir = TempDir::new().unwrap();
        assert!(!has_entries(dir.path()));
        assert!(!has_entries(&dir.path().join("absent")));

        std::fs::write(dir.path().join("index.json"), "{}").unwrap();
        assert!(!has_entries(dir.path()));

        std::fs::write(dir.path().join("seed.jwk.enc"), b"x").unwrap();
        assert!(has_entries(dir.path()));
    }
}
