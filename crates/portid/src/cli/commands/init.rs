//! # Init Command
//!
//! `portid init` writes a default configuration and creates the key
//! directory next to it:
//!
//! ```text
//! ~/.portid/            (0700)
//! ├── config.toml       (0600)
//! └── keys/             (0700)
//! ```
//!
//! No key is generated; `portid key seed` and `portid key generate` do that
//! and ask for the store passphrase on first use.

use std::fs;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use portid_core::config::Config;
use portid_core::error::ConfigError;
use tracing::info;

use super::CommandError;

const KEYS_DIR_NAME: &str = "keys";

/// The `portid init` handler.
#[derive(Debug, Clone, Copy)]
pub struct InitCommand {
    /// Overwrite an existing configuration.
    pub force: bool,
}

impl InitCommand {
    /// Creates the handler.
    #[must_use]
    pub const fn new(force: bool) -> Self {
        Self { force }
    }

    /// Writes the configuration to `config_path`.
    ///
    /// Existing keys are never touched, even with `force`.
    ///
    /// # Errors
    ///
    /// - [`CommandError::AlreadyInitialized`] without `force` when the file exists
    /// - I/O errors creating directories or writing the file
    pub fn run(&self, config_path: &Path) -> Result<String, CommandError> {
        if config_path.exists() && !self.force {
            return Err(CommandError::AlreadyInitialized {
                path: config_path.display().to_string(),
            });
        }

        let base_dir = config_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        create_private_dir(base_dir)?;

        let keys_dir = base_dir.join(KEYS_DIR_NAME);
        let mut config = Config::default();
        config.keys.directory = keys_dir.display().to_string();
        config.validate()?;

        let toml = toml::to_string_pretty(&config)
            .map_err(|e| ConfigError::parse_failed(format!("failed to serialize config: {e}")))?;
        fs::write(config_path, toml)?;
        restrict(config_path, 0o600)?;

        create_private_dir(&keys_dir)?;
        info!(config = %config_path.display(), keys = %keys_dir.display(), "initialized");

        Ok(format!(
            "Initialized portid\n  config: {}\n  keys:   {}\n\nNext steps:\n  \
             portid key seed seed\n  portid key generate signing",
            config_path.display(),
            keys_dir.display()
        ))
    }
}

fn create_private_dir(dir: &Path) -> Result<(), CommandError> {
    fs::create_dir_all(dir)?;
    restrict(dir, 0o700)
}

#[cfg(unix)]
fn restrict(path: &Path, mode: u32) -> Result<(), CommandError> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(mode);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict(_path: &Path, _mode: u32) -> Result<(), CommandError> {
    Ok(())
}
