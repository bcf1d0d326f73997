//! Plan execution and operator recovery.

pub mod deploy;
pub mod recovery;
pub mod report;

pub use deploy::{DeployError, Orchestrator};
pub use recovery::{Resolution, StepResolution, resolve_component, resolve_step};
pub use report::{DeploymentReport, NodeOutcome, NodeReport};
