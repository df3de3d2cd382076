//! Runtime configuration read from the environment (after `.env` is loaded).

use crate::api::auth::{cookie_value, CSRF_COOKIE_NAME};

/// Backend origin used when nothing is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Backend origin (scheme + host + port), without the `/api` prefix.
    pub api_url: String,
    /// CSRF token, from `PHARMACY_CSRF_TOKEN` or the `csrftoken` cookie in `PHARMACY_COOKIE`.
    pub csrf_token: Option<String>,
    /// Access token that overrides whatever is in the token store.
    pub access_token: Option<String>,
    /// Persist tokens in the OS keychain (otherwise in memory for this run only).
    pub use_keychain: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    ///
    /// API URL: PHARMACY_API_URL > API_URL > localhost default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = var("PHARMACY_API_URL")
            .or_else(|| var("API_URL"))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let csrf_token = var("PHARMACY_CSRF_TOKEN")
            .or_else(|| var("PHARMACY_COOKIE").and_then(|c| cookie_value(&c, CSRF_COOKIE_NAME)));

        let use_keychain = var("PHARMACY_NO_KEYCHAIN")
            .map(|v| !matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(true);

        Self {
            api_url,
            csrf_token,
            access_token: var("PHARMACY_ACCESS_TOKEN"),
            use_keychain,
        }
    }
}
