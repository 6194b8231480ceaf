//! Local user records and the store/allocator boundaries the core depends on.
//!
//! The storage engine itself is not part of this crate; [`MemoryUserStore`] is the
//! in-process implementation used by the bundled server and the tests.

mod memory;
mod scope;

pub use memory::MemoryUserStore;
pub use scope::{HomeDirAllocator, ScopeAllocator};

use crate::settings::{Permissions, Sorting, ViewMode};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalUser {
    pub username: String,
    /// PHC-formatted argon2 hash.
    pub password: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub view_mode: ViewMode,
    #[serde(default)]
    pub single_click: bool,
    #[serde(default)]
    pub sorting: Sorting,
    #[serde(default)]
    pub perm: Permissions,
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub hide_dotfiles: bool,
    #[serde(default)]
    pub date_format: bool,
}

impl LocalUser {
    #[must_use]
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password_hash.into(),
            scope: String::new(),
            locale: String::new(),
            view_mode: ViewMode::default(),
            single_click: false,
            sorting: Sorting::default(),
            perm: Permissions::default(),
            commands: Vec::new(),
            hide_dotfiles: false,
            date_format: false,
        }
    }

    /// Verify `plain` against the stored hash.
    ///
    /// Malformed stored hashes never match.
    #[must_use]
    pub fn check_password(&self, plain: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(&self.password) else {
            return false;
        };
        Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok()
    }
}

impl std::fmt::Debug for LocalUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalUser")
            .field("username", &self.username)
            .field("password", &"***")
            .field("scope", &self.scope)
            .field("locale", &self.locale)
            .field("view_mode", &self.view_mode)
            .field("perm", &self.perm)
            .finish_non_exhaustive()
    }
}

/// Hash a password with argon2 and a random salt.
///
/// # Errors
/// Returns an error if hashing fails.
pub fn hash_password(plain: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(plain.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user not found")]
    NotFound,
    #[error("user store failure: {0}")]
    Backend(#[source] anyhow::Error),
}

/// Persistent user store. Implementations make concurrent access per key safe.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch a user by name. `root` is the filesystem root the user's scope is relative to.
    async fn get(&self, root: &str, username: &str) -> Result<LocalUser, StoreError>;

    async fn save(&self, user: &LocalUser) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_password_matches_hash() -> Result<(), argon2::password_hash::Error> {
        let user = LocalUser::new("alice", hash_password("correct")?);
        assert!(user.check_password("correct"));
        assert!(!user.check_password("wrong"));
        assert!(!user.check_password(""));
        Ok(())
    }

    #[test]
    fn check_password_rejects_plaintext_storage() {
        let user = LocalUser::new("alice", "correct");
        assert!(!user.check_password("correct"));
    }

    #[test]
    fn hash_password_salts_each_call() -> Result<(), argon2::password_hash::Error> {
        let first = hash_password("same")?;
        let second = hash_password("same")?;
        assert_ne!(first, second);
        assert!(first.starts_with("$argon2"));
        Ok(())
    }

    #[test]
    fn debug_redacts_password() {
        let user = LocalUser::new("alice", "$argon2id$v=19$secret");
        assert!(!format!("{user:?}").contains("secret"));
    }
}
