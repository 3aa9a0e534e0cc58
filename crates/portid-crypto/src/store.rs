//! Key storage traits and implementations.
//!
//! This module provides:
//! - The [`KeyStore`] trait, the durable reference-to-key mapping every other
//!   layer reads and writes through
//! - [`MemoryKeyStore`], a lock-guarded map used by default and in tests
//! - [`FileKeyStore`], one encrypted file per reference under `~/.portid/keys/`
//!
//! # Security Properties
//!
//! - **Encryption at rest**: file entries are sealed with ChaCha20-Poly1305
//!   under an Argon2id-derived key
//! - **Restricted permissions**: files are 0600, the directory 0700
//! - **Atomic writes**: temp file + rename
//! - **Linearizable references**: writes are serialised per store
//!
//! # Example
//!
//! ```
//! use portid_core::algorithm::{Algorithm, HashAlgorithm, KeyType, KeyUsage};
//! use portid_crypto::key::CryptoKey;
//! use portid_crypto::store::{KeyStore, MemoryKeyStore};
//!
//! let store = MemoryKeyStore::new();
//! let key = CryptoKey::from_raw(
//!     KeyType::Secret,
//!     Algorithm::hmac(HashAlgorithm::Sha256),
//!     [KeyUsage::Sign, KeyUsage::Verify],
//!     b"abcdefg".to_vec(),
//!     true,
//! )
//! .with_kid("seed-1");
//!
//! store.save("seed", key.into()).expect("save");
//! assert_eq!(store.list().expect("list").get("seed").map(String::as_str), Some("seed-1"));
//!
//! // A secret key has no public projection.
//! assert!(store.get("seed", true).is_err());
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use portid_core::algorithm::{Algorithm, KeyType};
use portid_core::error::StoreError;
use portid_core::jwk::JsonWebKey;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::encryption::{open, seal, Envelope, KdfParams};
use crate::jwk;
use crate::key::{CryptoKey, CryptoKeyPair, KeyEntry};

// ============================================================================
// KeyStore Trait
// ============================================================================

/// Durable keyed storage for key material.
///
/// Implementations must be `Send + Sync` and keep operations on a single
/// reference linearizable: a `save` followed by a `get` on the same
/// reference observes the write.
pub trait KeyStore: Send + Sync {
    /// Fetches the key stored under `reference`.
    ///
    /// With `public_only`, a pair or private key yields its public half.
    ///
    /// # Errors
    ///
    /// - [`StoreError::KeyNotFound`] if nothing is stored under `reference`
    /// - [`StoreError::NoPublicKey`] if `public_only` is set on a secret key
    fn get(&self, reference: &str, public_only: bool) -> Result<CryptoKey, StoreError>;

    /// Stores `entry` under `reference`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StorageFailure`] (or an I/O variant) if the
    /// write is rejected.
    fn save(&self, reference: &str, entry: KeyEntry) -> Result<(), StoreError>;

    /// Maps each reference whose entry carries a `kid` to that `kid`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be enumerated.
    fn list(&self) -> Result<BTreeMap<String, String>, StoreError>;
}

/// Projects a stored entry onto the key a `get` call returns.
fn project(reference: &str, entry: &KeyEntry, public_only: bool) -> Result<CryptoKey, StoreError> {
    match entry {
        KeyEntry::Pair(pair) if public_only => Ok(pair.public_key.clone()),
        KeyEntry::Pair(pair) => Ok(pair.private_key.clone()),
        KeyEntry::Key(key) if !public_only => Ok(key.clone()),
        KeyEntry::Key(key) => match key.key_type {
            KeyType::Public => Ok(key.clone()),
            KeyType::Secret => Err(StoreError::no_public_key(reference)),
            KeyType::Private => key
                .to_public()
                .map_err(|e| StoreError::storage_failure(format!("{reference}: {e}"))),
        },
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::storage_failure("key store lock poisoned")
}

// ============================================================================
// MemoryKeyStore
// ============================================================================

/// In-process key store.
///
/// Entries live only as long as the store. A single `RwLock` guards the
/// reference table.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    entries: RwLock<HashMap<String, KeyEntry>>,
}

impl MemoryKeyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().map(|map| map.len()).unwrap_or(0)
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyStore for MemoryKeyStore {
    fn get(&self, reference: &str, public_only: bool) -> Result<CryptoKey, StoreError> {
        let entries = self.entries.read().map_err(poisoned)?;
        let entry = entries
            .get(reference)
            .ok_or_else(|| StoreError::key_not_found(reference))?;
        project(reference, entry, public_only)
    }

    fn save(&self, reference: &str, entry: KeyEntry) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.insert(reference.to_string(), entry);
        Ok(())
    }

    fn list(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries
            .iter()
            .filter_map(|(reference, entry)| {
                entry.kid().map(|kid| (reference.clone(), kid.to_string()))
            })
            .collect())
    }
}

// ============================================================================
// FileKeyStore
// ============================================================================

/// File extension of sealed entries.
pub const ENTRY_EXTENSION: &str = "jwk.enc";

/// Name of the cleartext reference-to-kid index.
const INDEX_FILE: &str = "index.json";

/// A key as persisted: the JWK plus what the JWK cannot express.
#[derive(Serialize, Deserialize)]
struct StoredKey {
    algorithm: Algorithm,
    extractable: bool,
    jwk: JsonWebKey,
}

impl StoredKey {
    fn from_key(reference: &str, key: &CryptoKey) -> Result<Self, StoreError> {
        let jwk = jwk::to_jwk(key).map_err(|e| {
            StoreError::storage_failure(format!("cannot persist {reference}: {e}"))
        })?;
        Ok(Self {
            algorithm: key.algorithm.clone(),
            extractable: key.extractable,
            jwk,
        })
    }

    fn into_key(self) -> Result<CryptoKey, StoreError> {
        let mut key = jwk::from_jwk(&self.jwk, &self.algorithm, self.extractable)
            .map_err(|_| StoreError::InvalidFormat)?;
        key.kid = self.jwk.kid;
        Ok(key)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum StoredEntry {
    Key { key: StoredKey },
    Pair { private: StoredKey, public: StoredKey },
}

impl StoredEntry {
    fn from_entry(reference: &str, entry: &KeyEntry) -> Result<Self, StoreError> {
        Ok(match entry {
            KeyEntry::Key(key) => Self::Key {
                key: StoredKey::from_key(reference, key)?,
            },
            KeyEntry::Pair(pair) => Self::Pair {
                private: StoredKey::from_key(reference, &pair.private_key)?,
                public: StoredKey::from_key(reference, &pair.public_key)?,
            },
        })
    }

    fn into_entry(self) -> Result<KeyEntry, StoreError> {
        Ok(match self {
            Self::Key { key } => KeyEntry::Key(key.into_key()?),
            Self::Pair { private, public } => KeyEntry::Pair(CryptoKeyPair {
                private_key: private.into_key()?,
                public_key: public.into_key()?,
            }),
        })
    }
}

/// Encrypted file-backed key store.
///
/// Each reference is one file `<reference>.jwk.enc` holding a sealed JSON
/// record of the entry's JWK(s). Handle-backed keys cannot be written here,
/// since their material never leaves the external store.
///
/// `list()` reads a cleartext `index.json` mapping references to kids, so
/// enumerating the store never needs the passphrase.
///
/// # Example
///
/// ```no_run
/// use portid_crypto::store::FileKeyStore;
/// use std::path::PathBuf;
///
/// let store = FileKeyStore::with_path(PathBuf::from("/tmp/portid-keys"), "passphrase")
///     .expect("failed to create key store");
/// ```
pub struct FileKeyStore {
    keys_dir: PathBuf,
    passphrase: Zeroizing<String>,
    kdf: KdfParams,
    write_lock: Mutex<()>,
}

impl FileKeyStore {
    /// Opens the store at `~/.portid/keys/`.
    ///
    /// # Errors
    ///
    /// - `StoreError::IoError` if the home directory cannot be determined
    /// - `StoreError::IoError` or `PermissionDenied` if the directory cannot
    ///   be created or restricted
    pub fn new(passphrase: impl Into<String>) -> Result<Self, StoreError> {
        let keys_dir = dirs::home_dir()
            .ok_or_else(|| {
                StoreError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Could not determine home directory",
                ))
            })?
            .join(".portid")
            .join("keys");

        Self::with_path(keys_dir, passphrase)
    }

    /// Opens the store at `keys_dir`, creating it with 0700 permissions.
    ///
    /// # Errors
    ///
    /// - `StoreError::IoError` if directory creation fails
    /// - `StoreError::PermissionDenied` if permissions cannot be set
    pub fn with_path(keys_dir: PathBuf, passphrase: impl Into<String>) -> Result<Self, StoreError> {
        if !keys_dir.exists() {
            fs::create_dir_all(&keys_dir)?;
        }

        #[cfg(unix)]
        {
            let mut perms = fs::metadata(&keys_dir)?.permissions();
            perms.set_mode(0o700);
            fs::set_permissions(&keys_dir, perms)?;
        }

        Ok(Self {
            keys_dir,
            passphrase: Zeroizing::new(passphrase.into()),
            kdf: KdfParams::default(),
            write_lock: Mutex::new(()),
        })
    }

    /// Uses `kdf` for entries written from now on. Existing entries keep
    /// the parameters recorded in their envelope.
    #[must_use]
    pub const fn with_kdf_params(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    /// The directory holding the entries.
    #[must_use]
    pub fn keys_dir(&self) -> &Path {
        &self.keys_dir
    }

    fn entry_path(&self, reference: &str) -> PathBuf {
        self.keys_dir.join(format!("{reference}.{ENTRY_EXTENSION}"))
    }

    /// Rejects references that could escape the directory.
    ///
    /// Valid references are non-empty, use only ASCII alphanumerics, `-`,
    /// `_` and `.`, and do not start with `.` (reserved for temp files).
    fn validate_reference(reference: &str) -> Result<(), StoreError> {
        if reference.is_empty() || reference.starts_with('.') {
            return Err(StoreError::InvalidFormat);
        }
        if !reference
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(StoreError::InvalidFormat);
        }
        Ok(())
    }

    /// Temp file + fsync + 0600 + rename.
    fn write_atomic(&self, file_name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let temp_path = self.keys_dir.join(format!(".{file_name}.tmp"));

        {
            let mut file = File::create(&temp_path)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }

        #[cfg(unix)]
        {
            let mut perms = fs::metadata(&temp_path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&temp_path, perms)?;
        }

        fs::rename(&temp_path, self.keys_dir.join(file_name))?;
        Ok(())
    }

    fn read_index(&self) -> Result<BTreeMap<String, String>, StoreError> {
        read_index_file(&self.keys_dir)
    }

    /// Lists the store at `keys_dir` without opening it.
    ///
    /// Reads only the cleartext index, so no passphrase is needed. A missing
    /// directory lists as empty.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::IoError` or `InvalidFormat` for an unreadable index.
    pub fn list_at(keys_dir: &Path) -> Result<BTreeMap<String, String>, StoreError> {
        let mut index = read_index_file(keys_dir)?;
        index.retain(|reference, _| {
            keys_dir
                .join(format!("{reference}.{ENTRY_EXTENSION}"))
                .exists()
        });
        Ok(index)
    }
}

fn read_index_file(keys_dir: &Path) -> Result<BTreeMap<String, String>, StoreError> {
    let path = keys_dir.join(INDEX_FILE);
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let bytes = fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|_| StoreError::InvalidFormat)
}

impl std::fmt::Debug for FileKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileKeyStore")
            .field("keys_dir", &self.keys_dir)
            .field("passphrase", &"[REDACTED]")
            .field("kdf", &self.kdf)
            .finish()
    }
}

impl KeyStore for FileKeyStore {
    fn get(&self, reference: &str, public_only: bool) -> Result<CryptoKey, StoreError> {
        Self::validate_reference(reference)?;

        let path = self.entry_path(reference);
        if !path.exists() {
            return Err(StoreError::key_not_found(reference));
        }

        let mut bytes = Vec::new();
        File::open(&path)?.read_to_end(&mut bytes)?;

        let envelope = Envelope::from_bytes(&bytes)?;
        let plaintext = open(&envelope, &self.passphrase)?;
        let stored: StoredEntry =
            serde_json::from_slice(&plaintext).map_err(|_| StoreError::InvalidFormat)?;

        project(reference, &stored.into_entry()?, public_only)
    }

    fn save(&self, reference: &str, entry: KeyEntry) -> Result<(), StoreError> {
        Self::validate_reference(reference)?;

        let stored = StoredEntry::from_entry(reference, &entry)?;
        let plaintext = Zeroizing::new(
            serde_json::to_vec(&stored).map_err(|e| StoreError::storage_failure(e.to_string()))?,
        );
        let sealed = seal(&plaintext, &self.passphrase, self.kdf)?.to_bytes();

        let _guard = self.write_lock.lock().map_err(poisoned)?;

        self.write_atomic(&format!("{reference}.{ENTRY_EXTENSION}"), &sealed)?;

        let mut index = self.read_index()?;
        match entry.kid() {
            Some(kid) => index.insert(reference.to_string(), kid.to_string()),
            None => index.remove(reference),
        };
        let index_bytes =
            serde_json::to_vec_pretty(&index).map_err(|e| StoreError::storage_failure(e.to_string()))?;
        self.write_atomic(INDEX_FILE, &index_bytes)
    }

    fn list(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let _guard = self.write_lock.lock().map_err(poisoned)?;
        Self::list_at(&self.keys_dir)
    }
}

// ============================================================================
// Tests
// ============================================================================
