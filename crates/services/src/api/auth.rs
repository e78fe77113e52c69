//! Ambient bearer credential, injected rather than read from globals.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use storage::KeyValueStore;

/// Key the browser client used for the bearer token.
pub const TOKEN_KEY: &str = "token";

#[async_trait]
pub trait AuthTokenProvider: Send + Sync {
    /// Current bearer token, if signed in.
    async fn bearer_token(&self) -> Option<String>;

    /// Forget the token after the server rejected it.
    async fn clear_token(&self);
}

/// Token held in memory.
#[derive(Debug, Default)]
pub struct StaticToken {
    token: Mutex<Option<String>>,
}

impl StaticToken {
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Mutex::new(token.filter(|t| !t.trim().is_empty())),
        }
    }
}

#[async_trait]
impl AuthTokenProvider for StaticToken {
    async fn bearer_token(&self) -> Option<String> {
        self.token.lock().ok().and_then(|guard| guard.clone())
    }

    async fn clear_token(&self) {
        if let Ok(mut guard) = self.token.lock() {
            *guard = None;
        }
    }
}

/// Token persisted in the client key/value store under [`TOKEN_KEY`].
#[derive(Clone)]
pub struct StoredToken {
    kv: Arc<dyn KeyValueStore>,
}

impl StoredToken {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Persist a new token.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be written.
    pub async fn save(&self, token: &str) -> Result<(), storage::StorageError> {
        self.kv.set(TOKEN_KEY, token.trim()).await
    }
}

#[async_trait]
impl AuthTokenProvider for StoredToken {
    async fn bearer_token(&self) -> Option<String> {
        match self.kv.get(TOKEN_KEY).await {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(err) => {
                tracing::warn!(error = %err, "could not read stored token");
                None
            }
        }
    }

    async fn clear_token(&self) {
        if let Err(err) = self.kv.remove(TOKEN_KEY).await {
            tracing::warn!(error = %err, "could not clear stored token");
        }
    }
}
