//! Credential storage seam
//!
//! The core treats credential storage as an opaque key/value service scoped
//! by owner: the OS keychain, an encrypted file, whatever the embedding
//! application provides. Only the interface and an in-memory implementation
//! (used by the test suites) live here.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;

/// A username/token pair for the catalog API
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub token: String,
}

impl Credentials {
    /// Create a credentials pair
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
        }
    }

    /// Masked token suitable for display: first and last four characters.
    pub fn token_preview(&self) -> String {
        if self.token.len() > 8 {
            format!("{}...{}", &self.token[..4], &self.token[self.token.len() - 4..])
        } else {
            "***".to_string()
        }
    }
}

// The token never appears in logs or debug output.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &self.token_preview())
            .finish()
    }
}

/// Opaque credential store keyed by owner identity
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fetch credentials for an owner, if stored.
    async fn get(&self, owner: &str) -> Result<Option<Credentials>>;

    /// Store credentials under their owner's identity.
    async fn set(&self, credentials: Credentials) -> Result<()>;

    /// Remove an owner's credentials. Returns whether anything was removed.
    async fn delete(&self, owner: &str) -> Result<bool>;

    /// Whether credentials exist for an owner.
    async fn exists(&self, owner: &str) -> Result<bool> {
        Ok(self.get(owner).await?.is_some())
    }
}

/// In-memory credential store
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: RwLock<HashMap<String, Credentials>>,
}

impl MemoryCredentialStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, owner: &str) -> Result<Option<Credentials>> {
        Ok(self.entries.read().await.get(owner).cloned())
    }

    async fn set(&self, credentials: Credentials) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(credentials.username.clone(), credentials);
        Ok(())
    }

    async fn delete(&self, owner: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(owner).is_some())
    }
}
