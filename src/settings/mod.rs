//! Process settings consumed by the authentication core.
//!
//! Settings are loaded once from a JSON document at startup and injected into the
//! strategy at construction; nothing here is mutated afterwards.

mod defaults;
mod ldap;

pub use defaults::{Permissions, Sorting, UserDefaults, ViewMode};
pub use ldap::{DirectoryConfig, SearchScope};

use crate::auth::challenge::ChallengeConfig;
use anyhow::{Context, Result, anyhow};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt, fs, path::Path};
use url::Url;

/// Authentication method identifier.
///
/// `json` and `ldap` are the canonical names; `local` and `directory` are accepted
/// as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AuthMethod {
    #[default]
    #[serde(rename = "json", alias = "local")]
    Local,
    #[serde(rename = "ldap", alias = "directory")]
    Directory,
}

impl AuthMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "json",
            Self::Directory => "ldap",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub auth_method: AuthMethod,
    pub create_user_dir: bool,
    pub defaults: UserDefaults,
    pub ldap: DirectoryConfig,
    pub recaptcha: Option<ChallengeConfig>,
}

impl Settings {
    /// Read and validate settings from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid JSON, or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        Self::from_json(&raw)
    }

    /// Parse and validate settings from a JSON string.
    ///
    /// # Errors
    /// Returns an error if the document is malformed or fails validation.
    pub fn from_json(raw: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(raw).context("Invalid settings JSON")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check the blocks the active method depends on.
    ///
    /// # Errors
    /// Returns an error describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.auth_method == AuthMethod::Directory {
            self.ldap.validate()?;
        }

        if let Some(recaptcha) = &self.recaptcha
            && recaptcha.enabled()
        {
            Url::parse(&recaptcha.host)
                .with_context(|| format!("Invalid recaptcha host: {}", recaptcha.host))?;
        }

        Ok(())
    }

    /// Challenge configuration, only when a secret is set.
    #[must_use]
    pub fn challenge(&self) -> Option<&ChallengeConfig> {
        self.recaptcha.as_ref().filter(|config| config.enabled())
    }
}

pub(crate) fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

fn ensure(condition: bool, message: &str) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(anyhow!(message.to_string()))
    }
}
