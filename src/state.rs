//! Application state shared by the CLI commands.
//!
//! Holds the API client, the auth context it decorates requests from, and
//! the persistent token store. Tokens move from the store into the context
//! only at startup and after an explicit login/refresh.

use std::sync::Arc;

use crate::api::auth::{
    AuthContext, KeychainStore, MemoryStore, TokenStore, TokenStoreError, ACCESS_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
};
use crate::api::client::ApiClient;
use crate::config::Config;

pub struct AppState {
    /// HTTP client for pharmacy API communication.
    pub api: Arc<ApiClient>,

    /// Credentials shared with `api`.
    pub auth: Arc<AuthContext>,

    /// Where tokens survive between runs.
    pub store: Box<dyn TokenStore>,
}

impl AppState {
    /// Build the state for `config`, loading any stored access token.
    ///
    /// A token in the config wins over the store. Store failures are logged
    /// and leave the session signed out.
    pub async fn initialize(config: &Config) -> Self {
        let store: Box<dyn TokenStore> = if config.use_keychain {
            Box::new(KeychainStore)
        } else {
            Box::new(MemoryStore::new())
        };
        Self::with_store(config, store).await
    }

    pub async fn with_store(config: &Config, store: Box<dyn TokenStore>) -> Self {
        let auth = Arc::new(AuthContext::with_tokens(None, config.csrf_token.clone()));

        match &config.access_token {
            Some(token) => {
                log::info!("Using access token from environment");
                auth.set_access_token(token.clone()).await;
            }
            None => match auth.refresh_from(store.as_ref()).await {
                Ok(true) => log::info!("Loaded stored access token"),
                Ok(false) => log::info!("No stored access token, continuing signed out"),
                Err(e) => log::warn!("Failed to read stored access token: {}", e),
            },
        }

        Self {
            api: Arc::new(ApiClient::new(&config.api_url, Arc::clone(&auth))),
            auth,
            store,
        }
    }

    /// Persist a freshly issued session and make it active.
    pub async fn store_session(
        &self,
        access: &str,
        refresh: Option<&str>,
    ) -> Result<(), TokenStoreError> {
        self.store.save(ACCESS_TOKEN_KEY, access)?;
        if let Some(refresh) = refresh {
            self.store.save(REFRESH_TOKEN_KEY, refresh)?;
        }
        self.auth.refresh_from(self.store.as_ref()).await?;
        Ok(())
    }

    /// Forget both tokens, in memory and in the store.
    pub async fn logout(&self) -> Result<(), TokenStoreError> {
        self.auth.clear().await;
        self.store.delete(ACCESS_TOKEN_KEY)?;
        self.store.delete(REFRESH_TOKEN_KEY)?;
        Ok(())
    }
}
