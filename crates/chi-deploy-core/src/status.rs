//! Deployment status of a network.
//!
//! Combines the plan (what should exist) with the registry (what does):
//! - lifecycle and address of every planned component
//! - journal steps left unconfirmed by an interrupted run
//! - registry entries the plan does not know about

use serde::{Deserialize, Serialize};

use crate::plan::DeploymentPlan;
use crate::registry::{Lifecycle, Registry, RegistryError, StepState};
use crate::types::{Address, NetworkId};

// =============================================================================
// Data Structures
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub network: NetworkId,
    pub components: Vec<ComponentStatus>,
    /// Steps marked started but never confirmed.
    pub pending_steps: Vec<String>,
    /// Registry entries for ids that are not part of the plan.
    pub unplanned: Vec<String>,
    pub summary: StatusSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentStatus {
    pub id: String,
    pub contract: String,
    pub lifecycle: Lifecycle,
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub total: usize,
    pub ready: usize,
    pub deployed: usize,
    pub deploying: usize,
    pub missing: usize,
}

impl StatusSummary {
    /// Every planned component is ready and nothing is in flight.
    pub fn is_complete(&self) -> bool {
        self.ready == self.total
    }

    fn count(&mut self, lifecycle: Lifecycle) {
        self.total += 1;
        match lifecycle {
            Lifecycle::Ready => self.ready += 1,
            Lifecycle::Deployed => self.deployed += 1,
            Lifecycle::Deploying => self.deploying += 1,
            Lifecycle::Unplanned => self.missing += 1,
        }
    }
}

impl StatusReport {
    /// Whether a run would need operator action before it can continue.
    pub fn needs_resolution(&self) -> bool {
        self.summary.deploying > 0 || !self.pending_steps.is_empty()
    }
}

// =============================================================================
// Collection
// =============================================================================

/// Collect the status of every planned component on `network`.
pub fn collect_status(
    registry: &dyn Registry,
    network: &NetworkId,
    plan: &DeploymentPlan,
) -> Result<StatusReport, RegistryError> {
    let mut records = registry.components(network)?;
    let mut summary = StatusSummary::default();

    let components = plan
        .components()
        .map(|component| {
            let record = records.remove(component.id());
            let lifecycle = record
                .as_ref()
                .map(|r| r.lifecycle())
                .unwrap_or(Lifecycle::Unplanned);
            summary.count(lifecycle);
            ComponentStatus {
                id: component.id().to_string(),
                contract: component.contract().to_string(),
                lifecycle,
                address: record.as_ref().and_then(|r| r.address()).cloned(),
            }
        })
        .collect();

    let pending_steps = registry
        .steps(network)?
        .into_iter()
        .filter(|(_, state)| *state == StepState::Started)
        .map(|(step, _)| step)
        .collect();

    Ok(StatusReport {
        network: network.clone(),
        components,
        pending_steps,
        unplanned: records.into_keys().collect(),
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeployConfig;
    use crate::registry::MemoryRegistry;
    use crate::stages::build_plan;

    #[test]
    fn empty_registry_reports_everything_missing() {
        let registry = MemoryRegistry::new();
        let plan = build_plan(&DeployConfig::default());
        let report = collect_status(&registry, &NetworkId::from("test"), &plan).unwrap();

        assert_eq!(report.summary.total, 27);
        assert_eq!(report.summary.missing, 27);
        assert!(!report.summary.is_complete());
        assert!(!report.needs_resolution());
    }

    #[test]
    fn mixed_lifecycles_are_counted() {
        let network = NetworkId::from("test");
        let mut registry = MemoryRegistry::new();
        registry
            .record(&network, "USC", &Address::from_bytes([1; 20]))
            .unwrap();
        registry.mark_ready(&network, "USC").unwrap();
        registry
            .record(&network, "CHI", &Address::from_bytes([2; 20]))
            .unwrap();
        registry.begin(&network, "USC_ETH_LP").unwrap();
        registry
            .record(&network, "Legacy", &Address::from_bytes([3; 20]))
            .unwrap();
        registry.begin_step(&network, "IDO/mint:IDO").unwrap();

        let plan = build_plan(&DeployConfig::default());
        let report = collect_status(&registry, &network, &plan).unwrap();

        assert_eq!(report.summary.ready, 1);
        assert_eq!(report.summary.deployed, 1);
        assert_eq!(report.summary.deploying, 1);
        assert_eq!(report.summary.missing, 24);
        assert_eq!(report.unplanned, vec!["Legacy".to_string()]);
        assert_eq!(report.pending_steps, vec!["IDO/mint:IDO".to_string()]);
        assert!(report.needs_resolution());

        let usc = &report.components[0];
        assert_eq!(usc.id, "USC");
        assert_eq!(usc.lifecycle, Lifecycle::Ready);
        assert_eq!(usc.address, Some(Address::from_bytes([1; 20])));
    }
}
