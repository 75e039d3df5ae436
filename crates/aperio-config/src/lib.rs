//! Configuration management for Aperio
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (highest precedence; `APERIO_<SECTION>__<KEY>`,
//!    e.g. `APERIO_REPOSITORY__CACHE_TTL_SECS`)
//! 2. aperio.local.toml (gitignored, local overrides)
//! 3. aperio.toml (git-tracked, deployment config)
//! 4. ~/.config/aperio/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;

/// Main Aperio configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AperioConfig {
    pub repository: RepositoryConfig,
    pub authority: AuthorityConfig,
}

/// Policy repository and cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Directory holding `site.arp.json` and `users/*.arp.json`.
    pub policy_dir: PathBuf,

    /// Cache TTL in seconds. 0 disables caching entirely.
    pub cache_ttl_secs: u64,

    /// Interval between background cache sweeps, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            policy_dir: PathBuf::from("policies"),
            cache_ttl_secs: 3600,
            sweep_interval_secs: 300,
        }
    }
}

impl RepositoryConfig {
    /// Returns the cache TTL, or `None` when caching is disabled.
    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache_ttl_secs > 0).then(|| Duration::from_secs(self.cache_ttl_secs))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Responder settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorityConfig {
    /// Attribute names whose values are binary and released base64-encoded.
    pub base64_attributes: Vec<String>,
}

impl AperioConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from a specific deployment directory
    pub fn load_from_dir(deployment_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_deployment_dir(deployment_dir).load()
    }

    /// Validates cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.repository.cache_ttl_secs > 0 && self.repository.sweep_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "sweep_interval_secs must be positive when caching is enabled".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve relative paths to absolute
    pub fn resolve_paths(&mut self, base_dir: impl AsRef<Path>) {
        let base = base_dir.as_ref();
        if self.repository.policy_dir.is_relative() {
            self.repository.policy_dir = base.join(&self.repository.policy_dir);
        }
    }
}
