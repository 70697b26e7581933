//! Configuration stored in `.snapfeed/config.toml`.
//!
//! ```toml
//! [platform]
//! backend = "redis"
//! url = "${REDIS_URL}"
//! prefix = "snapfeed"
//!
//! [storage]
//! public_base_url = "http://localhost:54321"
//!
//! [feed]
//! page_size = 10
//! ```
//!
//! String values of the form `${VAR}` are read from the environment.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static ENV_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env reference pattern is valid"));

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("environment variable {0} not set")]
    MissingVariable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// In-process platform; state lasts for one process.
    Memory,
    #[default]
    Redis,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapfeedConfig {
    #[serde(default)]
    pub platform: PlatformSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub feed: FeedSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformSettings {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            url: default_url(),
            prefix: default_prefix(),
        }
    }
}

fn default_url() -> String {
    "${REDIS_URL}".to_string()
}

fn default_prefix() -> String {
    "snapfeed".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            public_base_url: default_public_base_url(),
        }
    }
}

fn default_public_base_url() -> String {
    "http://localhost:54321".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSettings {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> usize {
    10
}

impl SnapfeedConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Platform URL with environment references expanded. Falls back to
    /// `SNAPFEED_REDIS_URL` when the configured variable is unset.
    pub fn platform_url(&self) -> Result<String, ConfigError> {
        match expand_env(&self.platform.url) {
            Ok(url) => Ok(url),
            Err(err) => std::env::var("SNAPFEED_REDIS_URL").map_err(|_| err),
        }
    }

    pub fn public_base_url(&self) -> Result<String, ConfigError> {
        expand_env(&self.storage.public_base_url)
    }

    pub fn page_size(&self) -> usize {
        self.feed.page_size.max(1)
    }
}

/// Replace every `${VAR}` in `value` with the variable's value.
pub fn expand_env(value: &str) -> Result<String, ConfigError> {
    expand_with(value, |name| std::env::var(name).ok())
}

fn expand_with(value: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<String, ConfigError> {
    let mut expanded = String::with_capacity(value.len());
    let mut last = 0;
    for captures in ENV_REFERENCE.captures_iter(value) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let resolved = lookup(name.as_str()).ok_or_else(|| ConfigError::MissingVariable(name.as_str().to_string()))?;
        expanded.push_str(&value[last..whole.start()]);
        expanded.push_str(&resolved);
        last = whole.end();
    }
    expanded.push_str(&value[last..]);
    Ok(expanded)
}
