//! Bind / search / re-bind sequence against the directory service.
//!
//! The service account binds first so it may search; the user's password is only
//! checked by binding as the single matching entry. The session is closed on every
//! exit path once it was opened.

use super::ldap::LdapConnector;
use crate::settings::{DirectoryConfig, SearchScope};
use anyhow::anyhow;
use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::{collections::BTreeSet, collections::HashMap, fmt, sync::Arc};
use thiserror::Error;
use tracing::{debug, instrument};

/// One search result entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: String,
    pub attributes: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    /// Values of `name`, matched case-insensitively like directory attribute types.
    #[must_use]
    pub fn values(&self, name: &str) -> &[String] {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
            .unwrap_or_default()
    }
}

/// An open connection to the directory.
#[async_trait]
pub trait DirectorySession: Send {
    async fn bind(&mut self, dn: &str, password: &str) -> anyhow::Result<()>;

    async fn search(
        &mut self,
        base: &str,
        scope: SearchScope,
        filter: &str,
        attributes: &[&str],
    ) -> anyhow::Result<Vec<DirectoryEntry>>;

    /// Release the connection. Errors are swallowed; there is nothing left to do.
    async fn close(&mut self);
}

#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    async fn connect(&self, url: &str) -> anyhow::Result<Box<dyn DirectorySession>>;
}

/// Identity vouched for by the directory. All fields are lower-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryIdentity {
    pub dn: String,
    pub username: String,
    pub groups: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryFailure {
    Connection,
    Search,
    NotFound,
    Ambiguous,
    Rejected,
    MissingAttribute,
}

impl fmt::Display for DirectoryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connection => "connection",
            Self::Search => "search",
            Self::NotFound => "not_found",
            Self::Ambiguous => "ambiguous",
            Self::Rejected => "rejected",
            Self::MissingAttribute => "missing_attribute",
        })
    }
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory connection failed: {0:#}")]
    Connection(anyhow::Error),
    #[error("directory search failed: {0:#}")]
    Search(anyhow::Error),
    #[error("user not found")]
    NotFound,
    #[error("too many entries returned: {0}")]
    Ambiguous(usize),
    #[error("directory rejected the user credentials: {0:#}")]
    PermissionDenied(anyhow::Error),
    #[error("entry has no {0} attribute")]
    MissingAttribute(String),
}

impl DirectoryError {
    #[must_use]
    pub const fn kind(&self) -> DirectoryFailure {
        match self {
            Self::Connection(_) => DirectoryFailure::Connection,
            Self::Search(_) => DirectoryFailure::Search,
            Self::NotFound => DirectoryFailure::NotFound,
            Self::Ambiguous(_) => DirectoryFailure::Ambiguous,
            Self::PermissionDenied(_) => DirectoryFailure::Rejected,
            Self::MissingAttribute(_) => DirectoryFailure::MissingAttribute,
        }
    }
}

pub struct DirectoryClient {
    config: DirectoryConfig,
    connector: Arc<dyn DirectoryConnector>,
}

impl DirectoryClient {
    #[must_use]
    pub fn new(config: DirectoryConfig, connector: Arc<dyn DirectoryConnector>) -> Self {
        Self { config, connector }
    }

    /// Client speaking LDAP to `config.url`.
    #[must_use]
    pub fn ldap(config: DirectoryConfig) -> Self {
        Self::new(config, Arc::new(LdapConnector))
    }

    /// Validate `username`/`password` and fetch the entry's identity attributes.
    ///
    /// # Errors
    /// Each step fails with its own [`DirectoryError`] variant; zero or several matching
    /// entries are `NotFound` and `Ambiguous`.
    #[instrument(skip(self, password))]
    pub async fn resolve(
        &self,
        username: &str,
        password: &str,
    ) -> Result<DirectoryIdentity, DirectoryError> {
        let mut session = self
            .connector
            .connect(&self.config.url)
            .await
            .map_err(DirectoryError::Connection)?;

        let result = self.resolve_in(session.as_mut(), username, password).await;

        session.close().await;

        result
    }

    async fn resolve_in(
        &self,
        session: &mut dyn DirectorySession,
        username: &str,
        password: &str,
    ) -> Result<DirectoryIdentity, DirectoryError> {
        session
            .bind(&self.config.bind_dn, self.config.bind_password.expose_secret())
            .await
            .map_err(DirectoryError::Connection)?;

        let filter = self.config.search_filter_for(username);
        let attributes = [
            self.config.username_attribute.as_str(),
            self.config.group_attribute.as_str(),
        ];

        let mut entries = session
            .search(
                &self.config.search_base,
                self.config.search_scope,
                &filter,
                &attributes,
            )
            .await
            .map_err(DirectoryError::Search)?;

        debug!("Directory search returned {} entries", entries.len());

        let entry = match entries.len() {
            0 => return Err(DirectoryError::NotFound),
            1 => entries.remove(0),
            count => return Err(DirectoryError::Ambiguous(count)),
        };

        // An empty password turns a simple bind into an anonymous bind, which succeeds.
        if password.is_empty() {
            return Err(DirectoryError::PermissionDenied(anyhow!("empty password")));
        }

        session
            .bind(&entry.dn, password)
            .await
            .map_err(DirectoryError::PermissionDenied)?;

        let username = entry
            .values(&self.config.username_attribute)
            .first()
            .map(|value| value.to_lowercase())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                DirectoryError::MissingAttribute(self.config.username_attribute.clone())
            })?;

        let groups = entry
            .values(&self.config.group_attribute)
            .iter()
            .map(|group| group.to_lowercase())
            .collect();

        Ok(DirectoryIdentity {
            dn: entry.dn.to_lowercase(),
            username,
            groups,
        })
    }
}

impl fmt::Debug for DirectoryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
