//! Configuration loader with multi-source merging

use crate::{AperioConfig, ConfigError};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    deployment_dir: PathBuf,
    env_prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with the current directory as deployment
    /// directory
    pub fn new() -> Self {
        Self {
            deployment_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "APERIO".to_string(),
        }
    }

    /// Set the deployment directory
    pub fn with_deployment_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.deployment_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default: "APERIO")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load configuration from all sources with proper precedence
    pub fn load(self) -> Result<AperioConfig> {
        let mut builder = config::Config::builder();

        // 1. Start with built-in defaults
        let defaults = AperioConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2. User config (~/.config/aperio/config.toml)
        if let Ok(user_config_file) = user_config_file() {
            if user_config_file.exists() {
                builder = builder.add_source(
                    config::File::from(user_config_file)
                        .required(false)
                        .format(config::FileFormat::Toml),
                );
            }
        }

        // 3. Deployment config (aperio.toml)
        let deployment_file = self.deployment_dir.join("aperio.toml");
        if deployment_file.exists() {
            builder = builder.add_source(
                config::File::from(deployment_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 4. Local config (aperio.local.toml, gitignored)
        let local_file = self.deployment_dir.join("aperio.local.toml");
        if local_file.exists() {
            builder = builder.add_source(
                config::File::from(local_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 5. Environment variables. Keys nest on a double underscore so
        //    field names containing underscores survive the mapping:
        //    APERIO_REPOSITORY__CACHE_TTL_SECS -> repository.cache_ttl_secs
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        let mut aperio_config: AperioConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        aperio_config.validate()?;
        aperio_config.resolve_paths(&self.deployment_dir);

        Ok(aperio_config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default(self) -> AperioConfig {
        self.load().unwrap_or_default()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// The user-level config file (`~/.config/aperio/config.toml` on Linux).
fn user_config_file() -> Result<PathBuf, ConfigError> {
    ProjectDirs::from("org", "aperio", "aperio")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .ok_or_else(|| ConfigError::XdgError("no home directory available".to_string()))
}
