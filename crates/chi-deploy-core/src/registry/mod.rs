//! Deployment registry.
//!
//! The registry is the single source of truth for what has already happened
//! on a network: which components exist (and at which address), how far each
//! one got through its lifecycle, and which individual wiring calls have been
//! confirmed. Everything the orchestrator skips on a re-run, it skips because
//! the registry says so.

pub mod document;
pub mod file;
pub mod memory;

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::types::{Address, NetworkId};

pub use document::{ComponentRecord, RegistryDocument, StepJournal, StepState};
pub use file::JsonFileRegistry;
pub use memory::MemoryRegistry;

/// Lifecycle of a single component on a single network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// No record at all.
    Unplanned,
    /// Intent written, deployment transaction may or may not have landed.
    Deploying,
    /// Address recorded, wiring not yet confirmed.
    Deployed,
    /// Deployed and fully wired.
    Ready,
}

/// Whether a registry mutation changed the stored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Changed,
    NoOp,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to access registry file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("registry file {} is not valid", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(
        "refusing to overwrite {component} on {network}: recorded at {existing}, attempted {attempted}"
    )]
    Conflict {
        network: NetworkId,
        component: String,
        existing: Address,
        attempted: Address,
    },
    #[error("{component} on {network} has no recorded address")]
    NotDeployed {
        network: NetworkId,
        component: String,
    },
    #[error("{component} on {network} is already deployed at {address}")]
    AlreadyDeployed {
        network: NetworkId,
        component: String,
        address: Address,
    },
}

/// Persistent store behind the orchestrator.
///
/// Implementations must make every mutation durable before returning: the
/// orchestrator issues the next chain transaction as soon as a call returns.
pub trait Registry {
    /// Current record of a component; `None` means not yet deployed.
    fn lookup(
        &self,
        network: &NetworkId,
        component: &str,
    ) -> Result<Option<ComponentRecord>, RegistryError>;

    /// Write the deployment intent ahead of submitting the transaction.
    fn begin(&mut self, network: &NetworkId, component: &str)
    -> Result<RecordOutcome, RegistryError>;

    /// Record the deployed address. Repeating the same address is a no-op;
    /// a different address for an existing record is a [`RegistryError::Conflict`].
    fn record(
        &mut self,
        network: &NetworkId,
        component: &str,
        address: &Address,
    ) -> Result<RecordOutcome, RegistryError>;

    /// Mark a deployed component as fully wired.
    fn mark_ready(
        &mut self,
        network: &NetworkId,
        component: &str,
    ) -> Result<RecordOutcome, RegistryError>;

    /// Drop a deployment intent whose transaction never landed.
    fn clear_intent(
        &mut self,
        network: &NetworkId,
        component: &str,
    ) -> Result<RecordOutcome, RegistryError>;

    fn step_state(&self, network: &NetworkId, step: &str)
    -> Result<Option<StepState>, RegistryError>;

    fn begin_step(&mut self, network: &NetworkId, step: &str) -> Result<(), RegistryError>;

    fn complete_step(&mut self, network: &NetworkId, step: &str) -> Result<(), RegistryError>;

    /// Drop a journaled step so the next run sends it again.
    fn clear_step(&mut self, network: &NetworkId, step: &str) -> Result<(), RegistryError>;

    /// All component records of a network.
    fn components(
        &self,
        network: &NetworkId,
    ) -> Result<BTreeMap<String, ComponentRecord>, RegistryError>;

    /// All journaled steps of a network.
    fn steps(&self, network: &NetworkId) -> Result<BTreeMap<String, StepState>, RegistryError>;
}
