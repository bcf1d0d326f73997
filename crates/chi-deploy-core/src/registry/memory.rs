//! In-memory registry for tests and rehearsals that should leave no trace.

use std::collections::BTreeMap;

use super::document::{ComponentRecord, RegistryDocument, StepJournal, StepState};
use super::{RecordOutcome, Registry, RegistryError};
use crate::types::{Address, NetworkId};

#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    document: RegistryDocument,
    journal: StepJournal,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Registry for MemoryRegistry {
    fn lookup(
        &self,
        network: &NetworkId,
        component: &str,
    ) -> Result<Option<ComponentRecord>, RegistryError> {
        Ok(self.document.get(network, component).cloned())
    }

    fn begin(
        &mut self,
        network: &NetworkId,
        component: &str,
    ) -> Result<RecordOutcome, RegistryError> {
        self.document.begin(network, component)
    }

    fn record(
        &mut self,
        network: &NetworkId,
        component: &str,
        address: &Address,
    ) -> Result<RecordOutcome, RegistryError> {
        self.document.record(network, component, address)
    }

    fn mark_ready(
        &mut self,
        network: &NetworkId,
        component: &str,
    ) -> Result<RecordOutcome, RegistryError> {
        self.document.mark_ready(network, component)
    }

    fn clear_intent(
        &mut self,
        network: &NetworkId,
        component: &str,
    ) -> Result<RecordOutcome, RegistryError> {
        self.document.clear_intent(network, component)
    }

    fn step_state(
        &self,
        network: &NetworkId,
        step: &str,
    ) -> Result<Option<StepState>, RegistryError> {
        Ok(self.journal.state(network, step))
    }

    fn begin_step(&mut self, network: &NetworkId, step: &str) -> Result<(), RegistryError> {
        self.journal.set(network, step, StepState::Started);
        Ok(())
    }

    fn complete_step(&mut self, network: &NetworkId, step: &str) -> Result<(), RegistryError> {
        self.journal.set(network, step, StepState::Done);
        Ok(())
    }

    fn clear_step(&mut self, network: &NetworkId, step: &str) -> Result<(), RegistryError> {
        self.journal.clear(network, step);
        Ok(())
    }

    fn components(
        &self,
        network: &NetworkId,
    ) -> Result<BTreeMap<String, ComponentRecord>, RegistryError> {
        Ok(self.document.network(network))
    }

    fn steps(&self, network: &NetworkId) -> Result<BTreeMap<String, StepState>, RegistryError> {
        Ok(self.journal.network(network))
    }
}
