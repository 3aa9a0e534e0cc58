//! # Logging
//!
//! `tracing` subscriber setup for the `portid` binary.
//!
//! The library crates only emit events; this module decides where they go.
//! Console output always goes to stderr so that JWKs and tokens printed on
//! stdout stay machine-readable.
//!
//! ```no_run
//! use portid::logging::{init_logging, LogConfig, LogFormat, LogLevel};
//!
//! let config = LogConfig {
//!     level: LogLevel::Debug,
//!     format: LogFormat::Json,
//!     ..Default::default()
//! };
//! let _guard = init_logging(&config).expect("logging init");
//! tracing::info!("ready");
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as tfmt, EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Logging initialization failures.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// The log file or its directory could not be created.
    #[error("failed to create log file: {0}")]
    FileCreation(String),

    /// A global subscriber is already installed.
    #[error("failed to initialize logging: {0}")]
    SubscriberInit(String),

    /// The filter or file name is invalid.
    #[error("invalid log configuration: {0}")]
    InvalidConfig(String),
}

/// Minimum severity that reaches the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Everything, including per-signature JWS outcomes.
    Trace,
    /// Provider dispatch and cache decisions.
    Debug,
    /// Default.
    #[default]
    Info,
    /// Warnings and errors only.
    Warn,
    /// Errors only.
    Error,
}

impl LogLevel {
    /// Filter directive for this level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format, selectable with `--log-format`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Multi-line human-readable output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
    /// Single-line human-readable output.
    Compact,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
            Self::Compact => write!(f, "compact"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Minimum level. `RUST_LOG` is not consulted.
    pub level: LogLevel,
    /// Console and file format.
    pub format: LogFormat,
    /// Daily-rolling log file, written in addition to stderr.
    pub file_path: Option<PathBuf>,
}

/// Keeps the non-blocking file writer alive; logs are flushed on drop.
pub struct LogGuard {
    guard: Option<WorkerGuard>,
}

impl fmt::Debug for LogGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogGuard")
            .field("has_file_guard", &self.guard.is_some())
            .finish()
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns [`LogError`] if the log file cannot be set up or a subscriber is
/// already installed.
pub fn init_logging(config: &LogConfig) -> Result<LogGuard, LogError> {
    let filter = EnvFilter::try_new(config.level.as_str())
        .map_err(|e| LogError::InvalidConfig(e.to_string()))?;

    let mut layers: Vec<BoxedLayer> = vec![console_layer(config.format)];

    let guard = match &config.file_path {
        Some(path) => {
            let (writer, guard) = file_writer(path)?;
            layers.push(file_layer(config.format, writer));
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| LogError::SubscriberInit(e.to_string()))?;

    Ok(LogGuard { guard })
}

fn console_layer(format: LogFormat) -> BoxedLayer {
    let layer = tfmt::layer().with_writer(std::io::stderr).with_target(true);
    match format {
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Json => layer.json().with_current_span(true).boxed(),
        LogFormat::Compact => layer.compact().boxed(),
    }
}

fn file_layer(format: LogFormat, writer: NonBlocking) -> BoxedLayer {
    let layer = tfmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);
    match format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Pretty | LogFormat::Compact => layer.compact().boxed(),
    }
}

fn file_writer(path: &Path) -> Result<(NonBlocking, WorkerGuard), LogError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .map_err(|e| LogError::FileCreation(format!("{}: {e}", dir.display())))?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| LogError::InvalidConfig(format!("invalid log file name: {}", path.display())))?;

    let appender = tracing_appender::rolling::daily(dir, file_name);
    Ok(tracing_appender::non_blocking(appender))
}

/// Maps `-v` occurrences to a level.
///
/// | Flags | Level |
/// |-------|-------|
/// | none  | Warn  |
/// | `-v`  | Info  |
/// | `-vv` | Debug |
/// | `-vvv`| Trace |
#[must_use]
pub const fn verbosity_to_level(verbosity: u8) -> LogLevel {
    match verbosity {
        0 => LogLevel::Warn,
        1 => LogLevel::Info,
        2 => LogLevel::Debug,
        _ => LogLevel::Trace,
    }
}

/// Masks a sensitive value for display.
///
/// Values of twelve characters or more keep their first and last four
/// characters; shorter values are fully masked.
///
/// ```
/// use portid::logging::redact_sensitive;
///
/// assert_eq!(redact_sensitive("did:example:alice#key-1"), "did:***ey-1");
/// assert_eq!(redact_sensitive("hunter2"), "***");
/// ```
#[must_use]
pub fn redact_sensitive(value: &str) -> String {
    const MIN_LENGTH_FOR_PARTIAL: usize = 12;
    const VISIBLE_CHARS: usize = 4;

    let chars: Vec<char> = value.chars().collect();
    if chars.len() < MIN_LENGTH_FOR_PARTIAL {
        return "***".to_string();
    }

    let prefix: String = chars[..VISIBLE_CHARS].iter().collect();
    let suffix: String = chars[chars.len() - VISIBLE_CHARS..].iter().collect();
    format!("{prefix}***{suffix}")
}

/// Records a security-relevant action, such as exporting private key material.
///
/// Emitted at WARN so it survives the default filter.
pub fn log_security_event(event: &str, reference: &str) {
    tracing::warn!(
        target: "portid::security",
        security_event = event,
        reference,
        "security event: {event}"
    );
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_verbosity_to_level() {
        assert_eq!(verbosity_to_level(0), LogLevel::Warn);
        assert_eq!(verbosity_to_level(1), LogLevel::Info);
        assert_eq!(verbosity_to_level(2), LogLevel::Debug);
        assert_eq!(verbosity_to_level(3), LogLevel::Trace);
        assert_eq!(verbosity_to_level(u8::MAX), LogLevel::Trace);
    }

    #[test]
    fn test_redact_sensitive() {
        assert_eq!(redact_sensitive("123456789012"), "1234***9012");
        assert_eq!(redact_sensitive("12345678901"), "***");
        assert_eq!(redact_sensitive(""), "***");
        assert_eq!(redact_sensitive("did:example:bob#key-2"), "did:***ey-2");
    }

    #[test]
    fn test_redact_counts_chars_not_bytes() {
        // Eleven characters, more than twelve bytes.
        assert_eq!(redact_sensitive("ééééééééééé"), "***");
        assert_eq!(redact_sensitive("éééééééééééé"), "éééé***éééé");
    }

    #[test]
    fn test_display() {
        assert_eq!(LogLevel::Debug.to_string(), "debug");
        assert_eq!(LogFormat::Json.to_string(), "json");
        assert_eq!(LogFormat::default(), LogFormat::Pretty);
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn test_log_error_display() {
        let err = LogError::FileCreation("/nope: denied".to_string());
        assert_eq!(err.to_string(), "failed to create log file: /nope: denied");
    }

    #[test]
    fn test_guard_debug() {
        let guard = LogGuard { guard: None };
        assert!(format!("{guard:?}").contains("has_file_guard: false"));
    }

    #[test]
    fn test_invalid_file_name() {
        let config = LogConfig {
            file_path: Some(PathBuf::from("/")),
            ..LogConfig::default()
        };
        assert!(matches!(
            init_logging(&config),
            Err(LogError::InvalidConfig(_))
        ));
    }
}
