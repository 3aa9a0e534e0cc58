//! Configuration loader.
//!
//! Reads and writes `config.toml` under the portid base directory, which is
//! `$PORTID_HOME` when set and `~/.portid` otherwise. A missing file yields
//! the default configuration.
//!
//! # Examples
//!
//! ```no_run
//! use portid_core::config_loader::ConfigLoader;
//!
//! let loader = ConfigLoader::new().expect("failed to create loader");
//! if !loader.exists() {
//!     loader.write_default().expect("failed to write default config");
//! }
//! let config = loader.load().expect("failed to load config");
//! println!("keys live in {}", config.keys.directory);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::ConfigError;

/// The configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// The base directory name within the home directory.
const BASE_DIR_NAME: &str = ".portid";

/// Environment variable overriding the base directory.
pub const PORTID_HOME_ENV: &str = "PORTID_HOME";

/// Reads and writes the configuration file under a base directory.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a loader rooted at [`default_base_dir`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHomeDirectory`] if `PORTID_HOME` is unset and
    /// the home directory cannot be determined.
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self {
            base_dir: default_base_dir()?,
        })
    }

    /// Creates a loader rooted at `base_dir`.
    ///
    /// # Examples
    ///
    /// ```
    /// use portid_core::config_loader::ConfigLoader;
    /// use std::path::PathBuf;
    ///
    /// let loader = ConfigLoader::with_base_dir(PathBuf::from("/custom/portid"));
    /// assert_eq!(loader.config_path(), PathBuf::from("/custom/portid/config.toml"));
    /// ```
    #[must_use]
    pub const fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Path to `config.toml`.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.base_dir.join(CONFIG_FILE_NAME)
    }

    /// The base directory.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Loads the configuration, returning defaults if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseFailed`] if the file contains invalid TOML.
    /// Returns [`ConfigError::Io`] if the file cannot be read.
    pub fn load(&self) -> Result<Config, ConfigError> {
        let config_path = self.config_path();

        if !config_path.exists() {
            return Ok(Config::default());
        }

        Self::load_from_path(&config_path)
    }

    /// Loads the configuration, failing if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileNotFound`] if the file is absent, otherwise
    /// the same errors as [`load`](Self::load).
    pub fn load_required(&self) -> Result<Config, ConfigError> {
        let config_path = self.config_path();

        if !config_path.exists() {
            return Err(ConfigError::file_not_found(
                config_path.display().to_string(),
            ));
        }

        Self::load_from_path(&config_path)
    }

    /// Saves `config`, creating the base directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] on write failure and
    /// [`ConfigError::ParseFailed`] if the configuration cannot be serialized.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        self.ensure_base_dir()?;

        let toml_str = toml::to_string_pretty(config).map_err(|e| {
            ConfigError::parse_failed(format!("failed to serialize configuration: {e}"))
        })?;

        fs::write(self.config_path(), toml_str)?;
        Ok(())
    }

    /// Writes [`Config::default_toml`], creating the base directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] on write failure.
    pub fn write_default(&self) -> Result<(), ConfigError> {
        self.ensure_base_dir()?;
        fs::write(self.config_path(), Config::default_toml())?;
        Ok(())
    }

    /// Returns `true` if `config.toml` exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.config_path().exists()
    }

    fn ensure_base_dir(&self) -> Result<(), ConfigError> {
        if !self.base_dir.exists() {
            fs::create_dir_all(&self.base_dir)?;
        }
        Ok(())
    }

    /// Loads configuration from an explicit file, e.g. `portid -c PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::ParseFailed`] for invalid TOML.
    pub fn load_from_path(path: &Path) -> Result<Config, ConfigError> {
        let content = fs::read_to_string(path)?;

        toml::from_str(&content).map_err(|e| {
            ConfigError::parse_failed(format!("invalid TOML in {}: {e}", path.display()))
        })
    }
}

/// Expands a leading `~` to the home directory.
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDirectory`] if the path starts with `~` and
/// the home directory cannot be determined.
///
/// # Examples
///
/// ```
/// use portid_core::config_loader::expand_path;
///
/// let path = expand_path("/etc/portid/config.toml").expect("failed to expand path");
/// assert_eq!(path.to_string_lossy(), "/etc/portid/config.toml");
/// ```
pub fn expand_path(path: &str) -> Result<PathBuf, ConfigError> {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)?;
        Ok(home.join(rest))
    } else if path == "~" {
        dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)
    } else {
        Ok(PathBuf::from(path))
    }
}

/// The base directory: `$PORTID_HOME` if set and non-empty, else `~/.portid`.
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDirectory`] if the home directory is needed
/// but cannot be determined.
pub fn default_base_dir() -> Result<PathBuf, ConfigError> {
    match std::env::var(PORTID_HOME_ENV) {
        Ok(dir) if !dir.is_empty() => expand_path(&dir),
        _ => {
            let home = dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)?;
            Ok(home.join(BASE_DIR_NAME))
        }
    }
}

/// Loads the configuration from the default location with `keys.directory`
/// expanded to an absolute path.
///
/// # Errors
///
/// Propagates [`ConfigLoader::new`] and [`ConfigLoader::load`] errors.
pub fn load_config() -> Result<Config, ConfigError> {
    let mut config = ConfigLoader::new()?.load()?;
    config.keys.directory = expand_path(&config.keys.directory)?
        .to_string_lossy()
        .to_string();
    Ok(config)
}
