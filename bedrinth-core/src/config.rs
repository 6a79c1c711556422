//! Bedrinth configuration
//!
//! ## Configuration Sources (in precedence order)
//!
//! 1. An explicit path passed on the command line (`--config`)
//! 2. `config.yaml` in the platform config directory
//!    (e.g. `~/.config/bedrinth/config.yaml`)
//! 3. Built-in defaults
//!
//! Every field is optional in the file:
//!
//! ```yaml
//! index_url: https://lipr.levimc.org/index.json
//! timeout_seconds: 30
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default index document location
pub const DEFAULT_INDEX_URL: &str = "https://lipr.levimc.org/index.json";

/// Host serving per-version manifests
pub const DEFAULT_REGISTRY_HOST: &str = "lipr.levimc.org";

/// Raw-content mirror serving README files
pub const DEFAULT_README_BASE_URL: &str = "https://raw.githubusercontent.com";

/// Forge host a tooth must start with for README lookups
pub const DEFAULT_FORGE_HOST: &str = "github.com";

/// Number of packages revealed per page
pub const DEFAULT_PAGE_SIZE: usize = 12;

/// Runtime configuration for the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedrinthConfig {
    /// URL of the package index document
    #[serde(default = "default_index_url")]
    pub index_url: String,

    /// Host serving `{tooth}/@v/{version}/tooth.json`
    #[serde(default = "default_registry_host")]
    pub registry_host: String,

    /// Base URL for README downloads
    #[serde(default = "default_readme_base_url")]
    pub readme_base_url: String,

    /// Forge host prefix that enables README lookups
    #[serde(default = "default_forge_host")]
    pub forge_host: String,

    /// HTTP timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Total attempts for the index fetch (1 = no retry)
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Delay between index fetch attempts
    #[serde(default = "default_retry_delay")]
    pub retry_delay_seconds: u64,

    /// Packages revealed per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for BedrinthConfig {
    fn default() -> Self {
        Self {
            index_url: default_index_url(),
            registry_host: default_registry_host(),
            readme_base_url: default_readme_base_url(),
            forge_host: default_forge_host(),
            timeout_seconds: default_timeout(),
            retry_attempts: default_retry_attempts(),
            retry_delay_seconds: default_retry_delay(),
            page_size: default_page_size(),
        }
    }
}

fn default_index_url() -> String {
    DEFAULT_INDEX_URL.to_string()
}

fn default_registry_host() -> String {
    DEFAULT_REGISTRY_HOST.to_string()
}

fn default_readme_base_url() -> String {
    DEFAULT_README_BASE_URL.to_string()
}

fn default_forge_host() -> String {
    DEFAULT_FORGE_HOST.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    3
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl BedrinthConfig {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        match Self::default_config_path() {
            Some(path) => Self::load_from_path(&path),
            None => {
                tracing::debug!("No config directory available, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific path
    ///
    /// A missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Self = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;

        config.validate()?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Default config file path (`<config dir>/bedrinth/config.yaml`)
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "levimc", "bedrinth")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Reject values the fetchers cannot work with
    pub fn validate(&self) -> Result<()> {
        if !self.index_url.starts_with("http://") && !self.index_url.starts_with("https://") {
            anyhow::bail!("index_url must start with http:// or https://");
        }
        if self.registry_host.contains("://") || self.registry_host.contains('/') {
            anyhow::bail!("registry_host must be a bare host name, got '{}'", self.registry_host);
        }
        if self.page_size == 0 {
            anyhow::bail!("page_size must be at least 1");
        }
        Ok(())
    }

    /// Replace the index URL (e.g. from `--index-url`)
    pub fn with_index_url(mut self, url: impl Into<String>) -> Result<Self> {
        self.index_url = url.into();
        self.validate()?;
        Ok(self)
    }
}
