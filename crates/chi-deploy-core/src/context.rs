//! Application context shared by the CLI commands.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::{ConfigStore, DeployConfig};
use crate::plan::DeploymentPlan;
use crate::registry::JsonFileRegistry;
use crate::stages::build_plan;

/// Loaded configuration plus the paths derived from it.
///
/// Frontends create this once per invocation and hand out registries and
/// plans from it.
#[derive(Debug, Clone)]
pub struct DeployContext {
    config_path: PathBuf,
    config: DeployConfig,
    registry_path: PathBuf,
}

impl DeployContext {
    /// Load `config_path` (missing file means defaults) and validate it.
    ///
    /// `registry_override` replaces `[registry].path` from the config.
    pub fn load(config_path: &Path, registry_override: Option<PathBuf>) -> anyhow::Result<Self> {
        let store = ConfigStore::from_path(config_path.to_path_buf());
        let config = store.load()?;
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", config_path.display()))?;
        let registry_path = registry_override.unwrap_or_else(|| config.registry.path.clone());
        Ok(Self {
            config_path: config_path.to_path_buf(),
            config,
            registry_path,
        })
    }

    pub fn from_config(config: DeployConfig, registry_path: PathBuf) -> Self {
        Self {
            config_path: PathBuf::new(),
            config,
            registry_path,
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    pub fn registry_path(&self) -> &Path {
        &self.registry_path
    }

    pub fn registry(&self) -> JsonFileRegistry {
        JsonFileRegistry::new(&self.registry_path)
    }

    pub fn plan(&self) -> DeploymentPlan {
        build_plan(&self.config)
    }

    /// Where a rehearsal keeps its simulated chain between invocations:
    /// `deployed-contracts.json` -> `deployed-contracts.chain.json`.
    pub fn rehearsal_chain_path(&self) -> PathBuf {
        let stem = self
            .registry_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "registry".to_string());
        self.registry_path.with_file_name(format!("{stem}.chain.json"))
    }
}
