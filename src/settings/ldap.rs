use super::{deserialize_secret, ensure};
use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

const DEFAULT_SEARCH_FILTER: &str = "(uid=%s)";
const DEFAULT_MEMBEROF_ATTRIBUTE: &str = "memberOf";
const DEFAULT_USERNAME_ATTRIBUTE: &str = "uid";

/// Placeholder replaced by the escaped username in the search filter template.
pub const FILTER_PLACEHOLDER: &str = "%s";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SearchScope {
    #[serde(rename = "base")]
    Base,
    #[serde(rename = "single")]
    SingleLevel,
    #[default]
    #[serde(rename = "sub")]
    WholeSubtree,
}

/// Directory service connection and search settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub url: String,
    #[serde(rename = "bind-dn")]
    pub bind_dn: String,
    #[serde(rename = "bind-password", deserialize_with = "deserialize_secret")]
    pub bind_password: SecretString,
    #[serde(rename = "search-base")]
    pub search_base: String,
    #[serde(rename = "search-scope")]
    pub search_scope: SearchScope,
    #[serde(rename = "ldap.search-filter", alias = "search-filter")]
    pub search_filter: String,
    #[serde(rename = "ldap.property-memberof", alias = "property-memberof")]
    pub group_attribute: String,
    #[serde(rename = "ldap.property-username", alias = "property-username")]
    pub username_attribute: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            bind_dn: String::new(),
            bind_password: SecretString::default(),
            search_base: String::new(),
            search_scope: SearchScope::default(),
            search_filter: DEFAULT_SEARCH_FILTER.to_string(),
            group_attribute: DEFAULT_MEMBEROF_ATTRIBUTE.to_string(),
            username_attribute: DEFAULT_USERNAME_ATTRIBUTE.to_string(),
        }
    }
}

impl DirectoryConfig {
    pub(super) fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.url)
            .with_context(|| format!("Invalid directory URL: {}", self.url))?;
        ensure(
            matches!(url.scheme(), "ldap" | "ldaps" | "ldapi"),
            "Directory URL must use the ldap, ldaps or ldapi scheme",
        )?;
        ensure(
            self.search_filter.contains(FILTER_PLACEHOLDER),
            "Directory search filter must contain %s",
        )?;
        ensure(
            !self.username_attribute.trim().is_empty(),
            "Directory username property must not be empty",
        )?;
        Ok(())
    }

    /// Render the search filter for `username`, escaping filter metacharacters.
    #[must_use]
    pub fn search_filter_for(&self, username: &str) -> String {
        self.search_filter
            .replace(FILTER_PLACEHOLDER, &ldap3::ldap_escape(username))
    }
}

impl std::fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("url", &self.url)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &"***")
            .field("search_base", &self.search_base)
            .field("search_scope", &self.search_scope)
            .field("search_filter", &self.search_filter)
            .field("group_attribute", &self.group_attribute)
            .field("username_attribute", &self.username_attribute)
            .finish()
    }
}
