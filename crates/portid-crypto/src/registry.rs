//! Provider registry keyed by `(algorithm name, scope)`.
//!
//! The registry is:
//! - **Thread-safe**: providers sit behind `Arc`, so clones are cheap and
//!   can be shared across threads
//! - **Immutable in steady state**: providers are registered once at startup
//! - **Overridable**: registering the same `(name, scope)` again replaces the
//!   previous provider, which is how a hardware-backed implementation
//!   supersedes a software default
//!
//! # Example
//!
//! ```
//! use portid_core::algorithm::ProviderScope;
//! use portid_crypto::registry::CryptoRegistry;
//!
//! let registry = CryptoRegistry::with_defaults();
//! assert!(registry.supports("ECDSA", ProviderScope::Private));
//!
//! // SHA-256 is registered under `All`, so any scope resolves it.
//! assert!(registry.resolve("SHA-256", ProviderScope::Public).is_ok());
//!
//! let err = registry.resolve("SHA-1", ProviderScope::Public).err().expect("unregistered");
//! assert_eq!(err.to_string(), "unsupported algorithm: SHA-1");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use portid_core::algorithm::{ProviderScope, ECDSA, HMAC, RSASSA_PKCS1_V1_5, RSA_OAEP};
use portid_core::error::CryptoError;
use tracing::debug;

use crate::provider::{
    CryptoProvider, EcdsaProvider, HmacProvider, RsaOaepProvider, RsaSsaProvider, ShaProvider,
};

/// Registry of algorithm providers.
#[derive(Clone)]
pub struct CryptoRegistry {
    providers: Arc<HashMap<(String, ProviderScope), Arc<dyn CryptoProvider>>>,
}

impl CryptoRegistry {
    /// Creates a registry with the software providers.
    ///
    /// - `ECDSA`, `RSASSA-PKCS1-v1_5`, `RSA-OAEP` under `Private` and `Public`
    /// - `HMAC` under `Secret`
    /// - `SHA-256`, `SHA-384`, `SHA-512` under `All`
    ///
    /// `SHA-1` is deliberately absent.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();

        for scope in [ProviderScope::Private, ProviderScope::Public] {
            registry.register(ECDSA, scope, EcdsaProvider);
            registry.register(RSASSA_PKCS1_V1_5, scope, RsaSsaProvider);
            registry.register(RSA_OAEP, scope, RsaOaepProvider);
        }
        registry.register(HMAC, ProviderScope::Secret, HmacProvider);
        for name in ["SHA-256", "SHA-384", "SHA-512"] {
            registry.register(name, ProviderScope::All, ShaProvider);
        }

        registry
    }

    /// Creates an empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            providers: Arc::new(HashMap::new()),
        }
    }

    /// Registers `provider` for `(name, scope)`, replacing any previous entry.
    pub fn register<P: CryptoProvider + 'static>(
        &mut self,
        name: impl Into<String>,
        scope: ProviderScope,
        provider: P,
    ) {
        self.register_shared(name, scope, Arc::new(provider));
    }

    /// Registers an already shared provider.
    pub fn register_shared(
        &mut self,
        name: impl Into<String>,
        scope: ProviderScope,
        provider: Arc<dyn CryptoProvider>,
    ) {
        let name = name.into();
        debug!(algorithm = %name, %scope, provider = provider.name(), "registering provider");
        Arc::make_mut(&mut self.providers).insert((name, scope), provider);
    }

    /// Resolves the provider for `(name, scope)`.
    ///
    /// An exact entry wins; otherwise an entry registered under
    /// [`ProviderScope::All`] is used.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::UnsupportedAlgorithm`] naming `name` if neither exists.
    pub fn resolve(
        &self,
        name: &str,
        scope: ProviderScope,
    ) -> Result<&dyn CryptoProvider, CryptoError> {
        self.lookup(name, scope)
            .map(AsRef::as_ref)
            .ok_or_else(|| CryptoError::unsupported_algorithm(name))
    }

    fn lookup(&self, name: &str, scope: ProviderScope) -> Option<&Arc<dyn CryptoProvider>> {
        self.providers
            .get(&(name.to_string(), scope))
            .or_else(|| self.providers.get(&(name.to_string(), ProviderScope::All)))
    }

    /// Returns `true` if `resolve(name, scope)` would succeed.
    #[must_use]
    pub fn supports(&self, name: &str, scope: ProviderScope) -> bool {
        self.lookup(name, scope).is_some()
    }

    /// Lists registered `(name, scope)` pairs, sorted.
    #[must_use]
    pub fn registered(&self) -> Vec<(&str, ProviderScope)> {
        let mut entries: Vec<(&str, ProviderScope)> = self
            .providers
            .keys()
            .map(|(name, scope)| (name.as_str(), *scope))
            .collect();
        entries.sort_unstable();
        entries
    }

    /// Returns the number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for CryptoRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for CryptoRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoRegistry")
            .field("providers", &self.registered())
            .finish()
    }
}
