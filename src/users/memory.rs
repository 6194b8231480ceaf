use super::{LocalUser, StoreError, UserStore};
use anyhow::Context;
use async_trait::async_trait;
use std::{collections::HashMap, fs, path::Path};
use tokio::sync::RwLock;
use tracing::debug;

/// In-process user store keyed by username.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, LocalUser>>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_users(users: impl IntoIterator<Item = LocalUser>) -> Self {
        let users = users
            .into_iter()
            .map(|user| (user.username.clone(), user))
            .collect();
        Self {
            users: RwLock::new(users),
        }
    }

    /// Seed a store from a JSON array of users with pre-hashed passwords.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read users file: {}", path.display()))?;
        let users: Vec<LocalUser> = serde_json::from_str(&raw).context("Invalid users JSON")?;
        debug!("Seeded {} users from {}", users.len(), path.display());
        Ok(Self::with_users(users))
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get(&self, _root: &str, username: &str) -> Result<LocalUser, StoreError> {
        self.users
            .read()
            .await
            .get(username)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn save(&self, user: &LocalUser) -> Result<(), StoreError> {
        self.users
            .write()
            .await
            .insert(user.username.clone(), user.clone());
        Ok(())
    }
}
