//! Operator recovery for runs that stopped between sending a transaction
//! and observing its confirmation.

use crate::plan::Component;
use crate::registry::{ComponentRecord, RecordOutcome, Registry, StepState};
use crate::types::{Address, NetworkId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The deployment landed at this address; wiring continues next run.
    Landed(Address),
    /// Nothing landed; the next run deploys again.
    NeverLanded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResolution {
    /// The call landed; never send it again.
    Done,
    /// The call did not land; send it on the next run.
    Retry,
}

/// Settle a dangling deployment intent.
pub fn resolve_component(
    registry: &mut dyn Registry,
    network: &NetworkId,
    component: Component,
    resolution: Resolution,
) -> anyhow::Result<RecordOutcome> {
    let id = component.id();
    match registry.lookup(network, id)? {
        Some(ComponentRecord::Deploying) => {}
        Some(record) => anyhow::bail!(
            "{id} on {network} is not waiting for resolution (lifecycle: {:?})",
            record.lifecycle()
        ),
        None => anyhow::bail!("{id} on {network} has no deployment in flight"),
    }

    let outcome = match resolution {
        Resolution::Landed(address) => {
            tracing::info!(%network, component = id, %address, "recording resolved deployment");
            registry.record(network, id, &address)?
        }
        Resolution::NeverLanded => {
            tracing::info!(%network, component = id, "clearing deployment intent");
            registry.clear_intent(network, id)?
        }
    };
    Ok(outcome)
}

/// Settle a journaled step whose confirmation was never observed.
pub fn resolve_step(
    registry: &mut dyn Registry,
    network: &NetworkId,
    step: &str,
    resolution: StepResolution,
) -> anyhow::Result<()> {
    match registry.step_state(network, step)? {
        Some(StepState::Started) => {}
        Some(StepState::Done) => anyhow::bail!("step {step} on {network} is already confirmed"),
        None => anyhow::bail!("step {step} on {network} was never started"),
    }

    match resolution {
        StepResolution::Done => {
            tracing::info!(%network, step, "marking step as confirmed");
            registry.complete_step(network, step)?;
        }
        StepResolution::Retry => {
            tracing::info!(%network, step, "clearing step for retry");
            registry.clear_step(network, step)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MemoryRegistry;

    fn network() -> NetworkId {
        NetworkId::from("test")
    }

    #[test]
    fn landed_deployment_is_recorded_but_not_ready() {
        let mut registry = MemoryRegistry::new();
        registry.begin(&network(), "USC").unwrap();
        let address = Address::from_bytes([4; 20]);

        resolve_component(
            &mut registry,
            &network(),
            Component::Usc,
            Resolution::Landed(address.clone()),
        )
        .expect("resolve should succeed");

        assert_eq!(
            registry.lookup(&network(), "USC").unwrap(),
            Some(ComponentRecord::Deployed(address))
        );
    }

    #[test]
    fn never_landed_clears_intent() {
        let mut registry = MemoryRegistry::new();
        registry.begin(&network(), "USC").unwrap();

        let outcome =
            resolve_component(&mut registry, &network(), Component::Usc, Resolution::NeverLanded)
                .expect("resolve should succeed");

        assert_eq!(outcome, RecordOutcome::Changed);
        assert!(registry.lookup(&network(), "USC").unwrap().is_none());
    }

    #[test]
    fn only_dangling_intents_can_be_resolved() {
        let mut registry = MemoryRegistry::new();
        assert!(
            resolve_component(&mut registry, &network(), Component::Usc, Resolution::NeverLanded)
                .is_err()
        );

        registry
            .record(&network(), "USC", &Address::from_bytes([1; 20]))
            .unwrap();
        assert!(
            resolve_component(
                &mut registry,
                &network(),
                Component::Usc,
                Resolution::Landed(Address::from_bytes([2; 20]))
            )
            .is_err()
        );
    }

    #[test]
    fn steps_resolve_to_done_or_retry() {
        let mut registry = MemoryRegistry::new();
        registry.begin_step(&network(), "IDO/mint:IDO").unwrap();
        registry.begin_step(&network(), "FinalDistribution/mint:OCHI").unwrap();

        resolve_step(&mut registry, &network(), "IDO/mint:IDO", StepResolution::Done)
            .expect("resolve should succeed");
        resolve_step(
            &mut registry,
            &network(),
            "FinalDistribution/mint:OCHI",
            StepResolution::Retry,
        )
        .expect("resolve should succeed");

        let steps = registry.steps(&network()).unwrap();
        assert_eq!(steps.get("IDO/mint:IDO"), Some(&StepState::Done));
        assert!(!steps.contains_key("FinalDistribution/mint:OCHI"));
        assert!(
            resolve_step(&mut registry, &network(), "IDO/mint:IDO", StepResolution::Retry).is_err()
        );
    }
}
