//! LDAP transport for the directory client.

use super::client::{DirectoryConnector, DirectoryEntry, DirectorySession};
use crate::settings::SearchScope;
use anyhow::{Context, Result};
use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, Scope, SearchEntry};
use tracing::{debug, warn};

impl From<SearchScope> for Scope {
    fn from(scope: SearchScope) -> Self {
        match scope {
            SearchScope::Base => Self::Base,
            SearchScope::SingleLevel => Self::OneLevel,
            SearchScope::WholeSubtree => Self::Subtree,
        }
    }
}

/// Opens one LDAP connection per call, driven on its own task.
#[derive(Debug, Clone, Copy, Default)]
pub struct LdapConnector;

#[async_trait]
impl DirectoryConnector for LdapConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn DirectorySession>> {
        let (conn, ldap) = LdapConnAsync::new(url)
            .await
            .with_context(|| format!("Failed to connect to {url}"))?;

        tokio::spawn(async move {
            if let Err(err) = conn.drive().await {
                warn!("LDAP connection error: {err}");
            }
        });

        Ok(Box::new(LdapSession { ldap }))
    }
}

struct LdapSession {
    ldap: Ldap,
}

#[async_trait]
impl DirectorySession for LdapSession {
    async fn bind(&mut self, dn: &str, password: &str) -> Result<()> {
        self.ldap
            .simple_bind(dn, password)
            .await?
            .success()
            .with_context(|| format!("Bind rejected for {dn}"))?;
        Ok(())
    }

    async fn search(
        &mut self,
        base: &str,
        scope: SearchScope,
        filter: &str,
        attributes: &[&str],
    ) -> Result<Vec<DirectoryEntry>> {
        let (entries, _) = self
            .ldap
            .search(base, scope.into(), filter, attributes.to_vec())
            .await?
            .success()?;

        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(|entry| DirectoryEntry {
                dn: entry.dn,
                attributes: entry.attrs,
            })
            .collect())
    }

    async fn close(&mut self) {
        if let Err(err) = self.ldap.unbind().await {
            debug!("LDAP unbind failed: {err}");
        }
    }
}
