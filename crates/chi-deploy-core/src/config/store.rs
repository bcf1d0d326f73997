//! Config store for loading and saving deploy.toml.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::{DeployConfig, parser};

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "deploy.toml";

#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    pub fn from_current_dir() -> anyhow::Result<Self> {
        let cwd = std::env::current_dir().context("Could not determine working directory")?;
        Ok(Self::from_path(cwd.join(DEFAULT_CONFIG_FILE)))
    }

    pub fn from_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the config; a missing file yields the defaults.
    ///
    /// A relative registry path is resolved against the config file's directory.
    pub fn load(&self) -> anyhow::Result<DeployConfig> {
        let mut config = if self.config_path.exists() {
            parser::parse_deploy_toml(&self.config_path)?
        } else {
            DeployConfig::new()
        };

        if config.registry.path.is_relative()
            && let Some(parent) = self.config_path.parent()
        {
            config.registry.path = parent.join(&config.registry.path);
        }
        Ok(config)
    }

    pub fn save(&self, config: &DeployConfig) -> anyhow::Result<()> {
        let content = parser::to_toml(config).context("Failed to serialize config to TOML")?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(&self.config_path, content).with_context(|| {
            format!(
                "Failed to write config file: {}",
                self.config_path.display()
            )
        })?;
        Ok(())
    }
}
