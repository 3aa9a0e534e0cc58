//! # Passphrase Input
//!
//! The file key store is unlocked with a passphrase taken from
//! `PORTID_PASSPHRASE` when set, or read from the terminal without echo.
//!
//! Environment variables may be readable by other processes on the same
//! machine. Prefer the prompt on shared hosts.

use std::io::Write;

use zeroize::Zeroizing;

/// Environment variable consulted before prompting.
pub const ENV_VAR: &str = "PORTID_PASSPHRASE";

/// Minimum length accepted when a new store is created.
pub const MIN_PASSPHRASE_LENGTH: usize = 8;

/// Passphrase input failures.
#[derive(Debug, thiserror::Error)]
pub enum PassphraseError {
    /// The environment variable was set but empty.
    #[error("{ENV_VAR} is set but empty")]
    Empty,

    /// Shorter than [`MIN_PASSPHRASE_LENGTH`].
    #[error("passphrase must be at least {min} characters")]
    TooShort {
        /// Minimum required length.
        min: usize,
    },

    /// The confirmation differed.
    #[error("passphrases do not match")]
    Mismatch,

    /// EOF or an empty line at the prompt.
    #[error("passphrase input cancelled")]
    Cancelled,

    /// Terminal I/O failed.
    #[error("failed to read passphrase: {0}")]
    Io(#[from] std::io::Error),
}

/// Reads the passphrase that unlocks an existing store.
///
/// # Errors
///
/// Returns [`PassphraseError`] for an empty variable or a cancelled prompt.
pub fn read_passphrase() -> Result<Zeroizing<String>, PassphraseError> {
    if let Some(value) = take_env()? {
        return Ok(value);
    }

    eprint!("Passphrase for the portid key store: ");
    std::io::stderr().flush()?;
    read_password()
}

/// Reads a passphrase for a store being created, with confirmation.
///
/// A value from the environment is not confirmed.
///
/// # Errors
///
/// Returns [`PassphraseError`] if the passphrase is short, cancelled, or
/// not confirmed.
pub fn read_new_passphrase() -> Result<Zeroizing<String>, PassphraseError> {
    if let Some(value) = take_env()? {
        return check_length(value);
    }

    eprint!("New passphrase for the portid key store: ");
    std::io::stderr().flush()?;
    let passphrase = check_length(read_password()?)?;

    eprint!("Confirm passphrase: ");
    std::io::stderr().flush()?;
    let confirmation = read_password()?;

    if !constant_time_eq(passphrase.as_bytes(), confirmation.as_bytes()) {
        return Err(PassphraseError::Mismatch);
    }
    Ok(passphrase)
}

fn take_env() -> Result<Option<Zeroizing<String>>, PassphraseError> {
    let Ok(value) = std::env::var(ENV_VAR) else {
        return Ok(None);
    };
    let value = Zeroizing::new(value);
    // Child processes must not inherit it.
    std::env::remove_var(ENV_VAR);
    if value.is_empty() {
        return Err(PassphraseError::Empty);
    }
    tracing::debug!("using passphrase from {ENV_VAR}");
    Ok(Some(value))
}

fn check_length(passphrase: Zeroizing<String>) -> Result<Zeroizing<String>, PassphraseError> {
    if passphrase.chars().count() < MIN_PASSPHRASE_LENGTH {
        return Err(PassphraseError::TooShort {
            min: MIN_PASSPHRASE_LENGTH,
        });
    }
    Ok(passphrase)
}

fn read_password() -> Result<Zeroizing<String>, PassphraseError> {
    let passphrase = rpassword::read_password()
        .map(Zeroizing::new)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => PassphraseError::Cancelled,
            _ => PassphraseError::Io(e),
        })?;
    if passphrase.is_empty() {
        return Err(PassphraseError::Cancelled);
    }
    Ok(passphrase)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;
    use std::sync::Mutex;

    // The environment is process-global.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    struct EnvGuard(Option<String>);

    impl EnvGuard {
        fn set(value: &str) -> Self {
            let original = std::env::var(ENV_VAR).ok();
            std::env::set_var(ENV_VAR, value);
            Self(original)
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.0 {
                Some(value) => std::env::set_var(ENV_VAR, value),
                None => std::env::remove_var(ENV_VAR),
            }
        }
    }

    #[test]
    fn test_env_passphrase_is_taken_once() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::set("correct horse");

        assert_eq!(read_passphrase().unwrap().as_str(), "correct horse");
        assert!(std::env::var(ENV_VAR).is_err());
    }

    #[test]
    fn test_empty_env_passphrase() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::set("");
        assert!(matches!(read_passphrase(), Err(PassphraseError::Empty)));
    }

    #[test]
    fn test_new_passphrase_length() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::set("short");
        assert!(matches!(
            read_new_passphrase(),
            Err(PassphraseError::TooShort { min: 8 })
        ));

        let _guard = EnvGuard::set("long enough");
        assert_eq!(read_new_passphrase().unwrap().as_str(), "long enough");
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
        assert!(constant_time_eq(b"", b""));
    }
}
