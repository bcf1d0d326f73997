//! In-memory shape of the registry and step journal documents.
//!
//! Registry: `{ network: { componentId: entry } }`, where a plain address
//! string means the component is ready and an object carries an
//! intermediate status. A finished deployment therefore leaves only plain
//! strings behind.
//!
//! Journal: `{ network: { stepId: "started" | "done" } }`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Lifecycle, RecordOutcome, RegistryError};
use crate::types::{Address, NetworkId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEntry", into = "RawEntry")]
pub enum ComponentRecord {
    Deploying,
    Deployed(Address),
    Ready(Address),
}

impl ComponentRecord {
    pub fn lifecycle(&self) -> Lifecycle {
        match self {
            ComponentRecord::Deploying => Lifecycle::Deploying,
            ComponentRecord::Deployed(_) => Lifecycle::Deployed,
            ComponentRecord::Ready(_) => Lifecycle::Ready,
        }
    }

    pub fn address(&self) -> Option<&Address> {
        match self {
            ComponentRecord::Deploying => None,
            ComponentRecord::Deployed(address) | ComponentRecord::Ready(address) => Some(address),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum PendingStatus {
    Deploying,
    Deployed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Ready(Address),
    Pending {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        address: Option<Address>,
        status: PendingStatus,
    },
}

impl TryFrom<RawEntry> for ComponentRecord {
    type Error = String;

    fn try_from(raw: RawEntry) -> Result<Self, Self::Error> {
        match raw {
            RawEntry::Ready(address) => Ok(ComponentRecord::Ready(address)),
            RawEntry::Pending {
                address: None,
                status: PendingStatus::Deploying,
            } => Ok(ComponentRecord::Deploying),
            RawEntry::Pending {
                address: Some(address),
                status: PendingStatus::Deployed,
            } => Ok(ComponentRecord::Deployed(address)),
            RawEntry::Pending {
                address: Some(address),
                status: PendingStatus::Deploying,
            } => Err(format!(
                "entry at {address} has status \"deploying\"; use \"deployed\" or a plain address"
            )),
            RawEntry::Pending {
                address: None,
                status: PendingStatus::Deployed,
            } => Err("entry with status \"deployed\" is missing its address".to_string()),
        }
    }
}

impl From<ComponentRecord> for RawEntry {
    fn from(record: ComponentRecord) -> Self {
        match record {
            ComponentRecord::Ready(address) => RawEntry::Ready(address),
            ComponentRecord::Deploying => RawEntry::Pending {
                address: None,
                status: PendingStatus::Deploying,
            },
            ComponentRecord::Deployed(address) => RawEntry::Pending {
                address: Some(address),
                status: PendingStatus::Deployed,
            },
        }
    }
}

/// Component records for every network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistryDocument {
    networks: BTreeMap<String, BTreeMap<String, ComponentRecord>>,
}

impl RegistryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, network: &NetworkId, component: &str) -> Option<&ComponentRecord> {
        self.networks
            .get(network.as_str())
            .and_then(|entries| entries.get(component))
    }

    pub fn network(&self, network: &NetworkId) -> BTreeMap<String, ComponentRecord> {
        self.networks
            .get(network.as_str())
            .cloned()
            .unwrap_or_default()
    }

    pub fn networks(&self) -> impl Iterator<Item = &str> {
        self.networks.keys().map(String::as_str)
    }

    pub fn begin(
        &mut self,
        network: &NetworkId,
        component: &str,
    ) -> Result<RecordOutcome, RegistryError> {
        match self.get(network, component) {
            None => {
                self.put(network, component, ComponentRecord::Deploying);
                Ok(RecordOutcome::Changed)
            }
            Some(ComponentRecord::Deploying) => Ok(RecordOutcome::NoOp),
            Some(ComponentRecord::Deployed(address)) | Some(ComponentRecord::Ready(address)) => {
                Err(RegistryError::AlreadyDeployed {
                    network: network.clone(),
                    component: component.to_string(),
                    address: address.clone(),
                })
            }
        }
    }

    pub fn record(
        &mut self,
        network: &NetworkId,
        component: &str,
        address: &Address,
    ) -> Result<RecordOutcome, RegistryError> {
        match self.get(network, component) {
            None | Some(ComponentRecord::Deploying) => {
                self.put(
                    network,
                    component,
                    ComponentRecord::Deployed(address.clone()),
                );
                Ok(RecordOutcome::Changed)
            }
            Some(ComponentRecord::Deployed(existing)) | Some(ComponentRecord::Ready(existing)) => {
                if existing == address {
                    return Ok(RecordOutcome::NoOp);
                }
                Err(RegistryError::Conflict {
                    network: network.clone(),
                    component: component.to_string(),
                    existing: existing.clone(),
                    attempted: address.clone(),
                })
            }
        }
    }

    pub fn mark_ready(
        &mut self,
        network: &NetworkId,
        component: &str,
    ) -> Result<RecordOutcome, RegistryError> {
        match self.get(network, component) {
            Some(ComponentRecord::Ready(_)) => Ok(RecordOutcome::NoOp),
            Some(ComponentRecord::Deployed(address)) => {
                let record = ComponentRecord::Ready(address.clone());
                self.put(network, component, record);
                Ok(RecordOutcome::Changed)
            }
            None | Some(ComponentRecord::Deploying) => Err(RegistryError::NotDeployed {
                network: network.clone(),
                component: component.to_string(),
            }),
        }
    }

    pub fn clear_intent(
        &mut self,
        network: &NetworkId,
        component: &str,
    ) -> Result<RecordOutcome, RegistryError> {
        match self.get(network, component) {
            None => Ok(RecordOutcome::NoOp),
            Some(ComponentRecord::Deploying) => {
                if let Some(entries) = self.networks.get_mut(network.as_str()) {
                    entries.remove(component);
                    if entries.is_empty() {
                        self.networks.remove(network.as_str());
                    }
                }
                Ok(RecordOutcome::Changed)
            }
            Some(ComponentRecord::Deployed(address)) | Some(ComponentRecord::Ready(address)) => {
                Err(RegistryError::AlreadyDeployed {
                    network: network.clone(),
                    component: component.to_string(),
                    address: address.clone(),
                })
            }
        }
    }

    fn put(&mut self, network: &NetworkId, component: &str, record: ComponentRecord) {
        self.networks
            .entry(network.as_str().to_string())
            .or_default()
            .insert(component.to_string(), record);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepState {
    /// Submitted, confirmation not yet observed.
    Started,
    Done,
}

/// Journal of individual wiring and task calls for every network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepJournal {
    networks: BTreeMap<String, BTreeMap<String, StepState>>,
}

impl StepJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, network: &NetworkId, step: &str) -> Option<StepState> {
        self.networks
            .get(network.as_str())
            .and_then(|steps| steps.get(step))
            .copied()
    }

    pub fn network(&self, network: &NetworkId) -> BTreeMap<String, StepState> {
        self.networks
            .get(network.as_str())
            .cloned()
            .unwrap_or_default()
    }

    /// Returns `false` when nothing changed.
    pub fn set(&mut self, network: &NetworkId, step: &str, state: StepState) -> bool {
        let steps = self
            .networks
            .entry(network.as_str().to_string())
            .or_default();
        steps.insert(step.to_string(), state) != Some(state)
    }

    /// Forget a step so it runs again. Returns `false` when it was not journaled.
    pub fn clear(&mut self, network: &NetworkId, step: &str) -> bool {
        let Some(steps) = self.networks.get_mut(network.as_str()) else {
            return false;
        };
        let removed = steps.remove(step).is_some();
        if steps.is_empty() {
            self.networks.remove(network.as_str());
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    #[test]
    fn record_then_ready_serializes_as_plain_address() {
        let network = NetworkId::from("test");
        let mut doc = RegistryDocument::new();
        doc.begin(&network, "USC").unwrap();
        doc.record(&network, "USC", &addr(1)).unwrap();
        doc.mark_ready(&network, "USC").unwrap();

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json, serde_json::json!({ "test": { "USC": addr(1).as_str() } }));
    }

    #[test]
    fn intermediate_states_serialize_as_objects() {
        let network = NetworkId::from("test");
        let mut doc = RegistryDocument::new();
        doc.begin(&network, "USC").unwrap();
        doc.record(&network, "CHI", &addr(2)).unwrap();

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "test": {
                    "CHI": { "address": addr(2).as_str(), "status": "deployed" },
                    "USC": { "status": "deploying" }
                }
            })
        );

        let parsed: RegistryDocument = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn record_same_address_is_noop_and_different_address_conflicts() {
        let network = NetworkId::from("test");
        let mut doc = RegistryDocument::new();
        assert_eq!(
            doc.record(&network, "USC", &addr(1)).unwrap(),
            RecordOutcome::Changed
        );
        assert_eq!(
            doc.record(&network, "USC", &addr(1)).unwrap(),
            RecordOutcome::NoOp
        );

        let err = doc.record(&network, "USC", &addr(9)).unwrap_err();
        assert!(matches!(err, RegistryError::Conflict { .. }));
        assert_eq!(
            doc.get(&network, "USC"),
            Some(&ComponentRecord::Deployed(addr(1)))
        );
    }

    #[test]
    fn networks_are_isolated() {
        let mut doc = RegistryDocument::new();
        doc.record(&NetworkId::from("a"), "USC", &addr(1)).unwrap();
        doc.record(&NetworkId::from("b"), "USC", &addr(2)).unwrap();

        assert_eq!(
            doc.get(&NetworkId::from("a"), "USC").and_then(|r| r.address()),
            Some(&addr(1))
        );
        assert_eq!(
            doc.get(&NetworkId::from("b"), "USC").and_then(|r| r.address()),
            Some(&addr(2))
        );
    }

    #[test]
    fn mark_ready_requires_address() {
        let network = NetworkId::from("test");
        let mut doc = RegistryDocument::new();
        assert!(doc.mark_ready(&network, "USC").is_err());
        doc.begin(&network, "USC").unwrap();
        assert!(doc.mark_ready(&network, "USC").is_err());
    }

    #[test]
    fn begin_refuses_deployed_component() {
        let network = NetworkId::from("test");
        let mut doc = RegistryDocument::new();
        doc.record(&network, "USC", &addr(1)).unwrap();
        assert!(matches!(
            doc.begin(&network, "USC"),
            Err(RegistryError::AlreadyDeployed { .. })
        ));
    }

    #[test]
    fn clear_intent_only_removes_deploying() {
        let network = NetworkId::from("test");
        let mut doc = RegistryDocument::new();
        doc.begin(&network, "USC").unwrap();
        assert_eq!(
            doc.clear_intent(&network, "USC").unwrap(),
            RecordOutcome::Changed
        );
        assert!(doc.get(&network, "USC").is_none());
        assert_eq!(doc.networks().count(), 0);

        doc.record(&network, "USC", &addr(1)).unwrap();
        assert!(doc.clear_intent(&network, "USC").is_err());
    }

    #[test]
    fn malformed_entries_are_rejected() {
        let missing_address = serde_json::json!({ "test": { "USC": { "status": "deployed" } } });
        assert!(serde_json::from_value::<RegistryDocument>(missing_address).is_err());

        let bad_address = serde_json::json!({ "test": { "USC": "0x12" } });
        assert!(serde_json::from_value::<RegistryDocument>(bad_address).is_err());
    }

    #[test]
    fn journal_set_reports_changes() {
        let network = NetworkId::from("test");
        let mut journal = StepJournal::new();
        assert!(journal.set(&network, "CHI/mint:IDO", StepState::Started));
        assert!(!journal.set(&network, "CHI/mint:IDO", StepState::Started));
        assert!(journal.set(&network, "CHI/mint:IDO", StepState::Done));
        assert_eq!(
            journal.state(&network, "CHI/mint:IDO"),
            Some(StepState::Done)
        );
        assert!(journal.clear(&network, "CHI/mint:IDO"));
        assert!(!journal.clear(&network, "CHI/mint:IDO"));
        assert_eq!(journal, StepJournal::new());
    }
}
