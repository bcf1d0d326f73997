//! chi-deploy core library
//!
//! Resumable, idempotent deployment of the CHI/USC protocol: a declarative
//! plan of components and their wiring, a persistent registry of what has
//! already happened on each network, and an orchestrator that only ever
//! does the work the registry says is missing.

pub mod chain;
pub mod config;
pub mod context;
pub mod orchestration;
pub mod plan;
pub mod registry;
pub mod stages;
pub mod status;
pub mod types;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{ConfigStore, DeployConfig, ExternalAddresses};
    pub use crate::context::DeployContext;

    // Chain
    pub use crate::chain::{ChainClient, ChainError, Fault, SimulatedChain};

    // Plan
    pub use crate::plan::{Component, DeploymentPlan, NodeId, PlanError, Task};
    pub use crate::stages::build_plan;

    // Registry
    pub use crate::registry::{
        ComponentRecord, JsonFileRegistry, Lifecycle, MemoryRegistry, Registry, RegistryError,
        StepState,
    };

    // Orchestration
    pub use crate::orchestration::{DeployError, DeploymentReport, NodeOutcome, Orchestrator};
    pub use crate::status::{StatusReport, collect_status};

    // Types
    pub use crate::types::{Address, NetworkId, TokenAmount, Value};
}
