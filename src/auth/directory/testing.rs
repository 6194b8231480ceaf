//! In-memory directory used by the directory tests.

use super::client::{DirectoryConnector, DirectoryEntry, DirectorySession};
use crate::settings::{DirectoryConfig, SearchScope};
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::{Arc, Mutex};

const ADMIN_DN: &str = "cn=admin,dc=x";
const ADMIN_PASSWORD: &str = "admin-secret";

pub(crate) fn directory_config() -> DirectoryConfig {
    DirectoryConfig {
        url: "ldap://directory.test".to_string(),
        bind_dn: ADMIN_DN.to_string(),
        bind_password: SecretString::from(ADMIN_PASSWORD),
        search_base: "ou=people,dc=x".to_string(),
        search_scope: SearchScope::SingleLevel,
        search_filter: "(uid=%s)".to_string(),
        group_attribute: "memberOf".to_string(),
        username_attribute: "uid".to_string(),
    }
}

pub(crate) fn entry(dn: &str, attributes: Vec<(&str, Vec<&str>)>) -> DirectoryEntry {
    DirectoryEntry {
        dn: dn.to_string(),
        attributes: attributes
            .into_iter()
            .map(|(name, values)| {
                (
                    name.to_string(),
                    values.into_iter().map(str::to_string).collect(),
                )
            })
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedSearch {
    pub base: String,
    pub scope: SearchScope,
    pub filter: String,
    pub attributes: Vec<String>,
}

#[derive(Default)]
struct State {
    binds: Vec<String>,
    searches: Vec<RecordedSearch>,
    closed: bool,
}

/// Directory with fixed entries. Every search returns all entries.
#[derive(Clone)]
pub(crate) struct FakeDirectory {
    entries: Vec<(DirectoryEntry, String)>,
    admin_password: String,
    unreachable: bool,
    failing_search: bool,
    state: Arc<Mutex<State>>,
}

impl FakeDirectory {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            admin_password: ADMIN_PASSWORD.to_string(),
            unreachable: false,
            failing_search: false,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    pub(crate) fn with_entry(mut self, entry: DirectoryEntry, password: &str) -> Self {
        self.entries.push((entry, password.to_string()));
        self
    }

    pub(crate) fn with_admin_password(mut self, password: &str) -> Self {
        self.admin_password = password.to_string();
        self
    }

    pub(crate) fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub(crate) fn failing_search(mut self) -> Self {
        self.failing_search = true;
        self
    }

    pub(crate) fn connector(&self) -> Arc<dyn DirectoryConnector> {
        Arc::new(self.clone())
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub(crate) fn binds(&self) -> Vec<String> {
        self.state().binds.clone()
    }

    pub(crate) fn searches(&self) -> Vec<RecordedSearch> {
        self.state().searches.clone()
    }

    pub(crate) fn closed(&self) -> bool {
        self.state().closed
    }
}

#[async_trait]
impl DirectoryConnector for FakeDirectory {
    async fn connect(&self, _url: &str) -> Result<Box<dyn DirectorySession>> {
        if self.unreachable {
            bail!("connection refused");
        }
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl DirectorySession for FakeDirectory {
    async fn bind(&mut self, dn: &str, password: &str) -> Result<()> {
        self.state().binds.push(dn.to_string());

        let expected = if dn == ADMIN_DN {
            Some(self.admin_password.as_str())
        } else {
            self.entries
                .iter()
                .find(|(entry, _)| entry.dn == dn)
                .map(|(_, password)| password.as_str())
        };

        match expected {
            Some(expected) if expected == password => Ok(()),
            _ => Err(anyhow!("invalid credentials")),
        }
    }

    async fn search(
        &mut self,
        base: &str,
        scope: SearchScope,
        filter: &str,
        attributes: &[&str],
    ) -> Result<Vec<DirectoryEntry>> {
        self.state().searches.push(RecordedSearch {
            base: base.to_string(),
            scope,
            filter: filter.to_string(),
            attributes: attributes.iter().map(|name| (*name).to_string()).collect(),
        });

        if self.failing_search {
            bail!("size limit exceeded");
        }

        Ok(self.entries.iter().map(|(entry, _)| entry.clone()).collect())
    }

    async fn close(&mut self) {
        self.state().closed = true;
    }
}
