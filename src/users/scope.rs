use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

/// Computes (and materializes) the filesystem scope of a newly provisioned user.
#[async_trait]
pub trait ScopeAllocator: Send + Sync {
    /// Return the scope the user should actually get, relative to `root`.
    async fn allocate_home(&self, username: &str, requested_scope: &str, root: &str)
    -> Result<String>;
}

/// Allocates scopes as directories under the server root.
///
/// With `create_user_dir` off the requested scope is returned untouched and the
/// filesystem is never touched. With it on, a user asking for the default scope
/// (`""`, `"."` or `"./"`) lands in `/users/<username>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HomeDirAllocator {
    create_user_dir: bool,
}

impl HomeDirAllocator {
    #[must_use]
    pub const fn new(create_user_dir: bool) -> Self {
        Self { create_user_dir }
    }
}

#[async_trait]
impl ScopeAllocator for HomeDirAllocator {
    async fn allocate_home(
        &self,
        username: &str,
        requested_scope: &str,
        root: &str,
    ) -> Result<String> {
        let requested_scope = requested_scope.trim();

        if !self.create_user_dir {
            return Ok(requested_scope.to_string());
        }

        let scope = if matches!(requested_scope, "" | "." | "./") {
            format!("/users/{}", clean_username(username)?)
        } else {
            normalize_scope(requested_scope)
        };

        let dir = Path::new(root).join(scope.trim_start_matches('/'));
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create user directory: {}", dir.display()))?;

        debug!("Allocated scope {} under {}", scope, root);

        Ok(scope)
    }
}

/// Turn a username into a single path component.
///
/// ASCII alphanumerics, `-` and `.` are kept; any other character becomes
/// `_<hex code point>_`, so distinct usernames never share a directory.
fn clean_username(username: &str) -> Result<String> {
    if username.is_empty() {
        return Err(anyhow!("empty username has no home directory"));
    }
    if username.starts_with('.') {
        return Err(anyhow!("username {username:?} starts with a dot"));
    }

    let mut cleaned = String::with_capacity(username.len());
    for c in username.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '-' | '.') {
            cleaned.push(c);
        } else {
            cleaned.push_str(&format!("_{:x}_", u32::from(c)));
        }
    }

    Ok(cleaned)
}

/// Collapse a scope into an absolute path that cannot climb above the root.
fn normalize_scope(scope: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in scope.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    format!("/{}", parts.join("/"))
}
