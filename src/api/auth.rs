//! Credential handling: the in-memory auth context handed to the API client,
//! persistent token storage, and CSRF cookie parsing.
//!
//! Tokens are read from storage only through `AuthContext::refresh_from`,
//! never ad hoc on each request.

use std::collections::HashMap;
use std::sync::Mutex;

use keyring::Entry;
use thiserror::Error;
use tokio::sync::RwLock;
use zeroize::Zeroizing;

/// Keychain service name for stored pharmacy credentials.
const SERVICE_NAME: &str = "com.pharmacy-ai.client";

/// Storage key for the bearer access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Name of the cookie the backend issues its anti-forgery token in.
pub const CSRF_COOKIE_NAME: &str = "csrftoken";

#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("Keychain operation failed: {0}")]
    OperationFailed(String),
}

impl From<keyring::Error> for TokenStoreError {
    fn from(err: keyring::Error) -> Self {
        TokenStoreError::OperationFailed(err.to_string())
    }
}

/// Persistent storage for opaque credentials, keyed by fixed names.
pub trait TokenStore: Send + Sync {
    /// Returns `None` if nothing is stored under `key`.
    fn load(&self, key: &str) -> Result<Option<String>, TokenStoreError>;

    fn save(&self, key: &str, value: &str) -> Result<(), TokenStoreError>;

    /// Idempotent: deleting a missing key succeeds.
    fn delete(&self, key: &str) -> Result<(), TokenStoreError>;
}

/// Token store backed by the OS keychain.
#[derive(Debug, Default)]
pub struct KeychainStore;

impl TokenStore for KeychainStore {
    fn load(&self, key: &str) -> Result<Option<String>, TokenStoreError> {
        let entry = Entry::new(SERVICE_NAME, key)?;
        match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(TokenStoreError::from(e)),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), TokenStoreError> {
        let entry = Entry::new(SERVICE_NAME, key)?;
        entry.set_password(value)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), TokenStoreError> {
        let entry = Entry::new(SERVICE_NAME, key)?;
        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(TokenStoreError::from(e)),
        }
    }
}

/// Process-local token store. Used with `--no-keychain` and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Zeroizing<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, TokenStoreError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).map(|v| v.as_str().to_string()))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), TokenStoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), Zeroizing::new(value.to_string()));
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), TokenStoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

/// Credentials the API client decorates requests with.
///
/// Shared between the client and the flows that need to know whether the
/// user is signed in. The access token is wiped from memory when replaced
/// or cleared.
#[derive(Default)]
pub struct AuthContext {
    access_token: RwLock<Option<Zeroizing<String>>>,
    csrf_token: RwLock<Option<String>>,
}

impl AuthContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context pre-seeded with the given tokens.
    pub fn with_tokens(access_token: Option<String>, csrf_token: Option<String>) -> Self {
        Self {
            access_token: RwLock::new(access_token.map(Zeroizing::new)),
            csrf_token: RwLock::new(csrf_token),
        }
    }

    pub async fn access_token(&self) -> Option<String> {
        self.access_token
            .read()
            .await
            .as_ref()
            .map(|t| t.as_str().to_string())
    }

    pub async fn has_access_token(&self) -> bool {
        self.access_token.read().await.is_some()
    }

    pub async fn set_access_token(&self, token: String) {
        *self.access_token.write().await = Some(Zeroizing::new(token));
    }

    /// Drop the access token (used on logout). The CSRF token is left alone.
    pub async fn clear(&self) {
        *self.access_token.write().await = None;
    }

    pub async fn csrf_token(&self) -> Option<String> {
        self.csrf_token.read().await.clone()
    }

    pub async fn set_csrf_token(&self, token: String) {
        *self.csrf_token.write().await = Some(token);
    }

    /// Reload the access token from persistent storage.
    ///
    /// Returns `true` if a token is present afterwards.
    pub async fn refresh_from(&self, store: &dyn TokenStore) -> Result<bool, TokenStoreError> {
        let stored = store.load(ACCESS_TOKEN_KEY)?.filter(|t| !t.is_empty());
        let present = stored.is_some();
        *self.access_token.write().await = stored.map(Zeroizing::new);
        log::debug!("Auth context refreshed from store (token present: {})", present);
        Ok(present)
    }
}

/// Find a cookie by name in a `Cookie:`-style header (`a=1; b=2`).
///
/// The value is percent-decoded. Returns `None` if the cookie is absent.
pub fn cookie_value(cookie_header: &str, name: &str) -> Option<String> {
    cookie_header
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(name)?.strip_prefix('='))
        .map(|raw| {
            urlencoding::decode(raw)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| raw.to_string())
        })
}

/// Extract a cookie from a single `Set-Cookie` header value (`name=value; Path=/; ...`).
pub fn set_cookie_value(set_cookie: &str, name: &str) -> Option<String> {
    let first = set_cookie.split(';').next()?;
    cookie_value(first, name)
}
