#![allow(dead_code)]

use std::path::PathBuf;

use tempfile::TempDir;

use chi_deploy_core::chain::{Fault, SimulatedChain, TxKind};
use chi_deploy_core::config::DeployConfig;
use chi_deploy_core::orchestration::{DeploymentReport, Orchestrator};
use chi_deploy_core::plan::Component;
use chi_deploy_core::registry::{ComponentRecord, JsonFileRegistry, Registry};
use chi_deploy_core::stages::build_plan;
use chi_deploy_core::types::{Address, NetworkId};

/// A file-backed registry and a simulated chain for one test network.
pub struct Rehearsal {
    pub temp: TempDir,
    pub config: DeployConfig,
    pub chain: SimulatedChain,
    pub network: NetworkId,
}

impl Rehearsal {
    pub fn new() -> Self {
        Self::with_config(DeployConfig::default())
    }

    pub fn with_config(config: DeployConfig) -> Self {
        let temp = TempDir::new().expect("tempdir should succeed");
        let chain = SimulatedChain::with_externals(&config.external);
        Self {
            temp,
            config,
            chain,
            network: NetworkId::from("test"),
        }
    }

    pub fn registry_path(&self) -> PathBuf {
        self.temp.path().join("deployed-contracts.json")
    }

    pub fn registry(&self) -> JsonFileRegistry {
        JsonFileRegistry::new(self.registry_path())
    }

    pub fn inject(&mut self, fault: Fault) {
        self.chain.inject(fault);
    }

    pub fn run(&mut self) -> anyhow::Result<DeploymentReport> {
        let plan = build_plan(&self.config);
        let mut registry = self.registry();
        Orchestrator::new(
            self.network.clone(),
            &mut registry,
            &mut self.chain,
            &self.config.external,
        )
        .run(&plan)
    }

    pub fn record(&self, component: Component) -> Option<ComponentRecord> {
        self.registry()
            .lookup(&self.network, component.id())
            .expect("lookup should succeed")
    }

    pub fn address(&self, component: Component) -> Address {
        self.record(component)
            .and_then(|record| record.address().cloned())
            .unwrap_or_else(|| panic!("{component} should have an address"))
    }

    /// Deployment transactions sent for a contract name.
    pub fn deploy_count(&self, contract: &str) -> usize {
        self.chain
            .transactions()
            .iter()
            .filter(|tx| matches!(&tx.kind, TxKind::Deploy { contract: c, .. } if c == contract))
            .count()
    }

    /// Address of the last deployment of a contract name seen on chain.
    pub fn last_deployed(&self, contract: &str) -> Option<Address> {
        self.chain
            .transactions()
            .iter()
            .rev()
            .find_map(|tx| match &tx.kind {
                TxKind::Deploy {
                    contract: c,
                    address,
                    ..
                } if c == contract => Some(address.clone()),
                _ => None,
            })
    }

    pub fn registry_bytes(&self) -> (Vec<u8>, Vec<u8>) {
        let registry = self.registry();
        (
            std::fs::read(registry.path()).expect("registry should exist"),
            std::fs::read(registry.steps_path()).expect("journal should exist"),
        )
    }
}
