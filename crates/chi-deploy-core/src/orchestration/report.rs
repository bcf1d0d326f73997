//! What a run did, node by node.

use serde::Serialize;

use crate::types::NetworkId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeOutcome {
    /// Deployed in this run.
    Deployed,
    /// Found deployed but not wired; wiring finished in this run.
    Resumed,
    /// Already ready; attached and skipped.
    Reused,
    /// Task with at least one call sent in this run.
    Executed,
    /// Task whose calls were all confirmed before.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeReport {
    pub node: String,
    pub outcome: NodeOutcome,
    pub steps_sent: usize,
    pub steps_skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentReport {
    pub network: NetworkId,
    pub nodes: Vec<NodeReport>,
    /// Transactions submitted in this run, deployments included.
    pub transactions: usize,
}

impl DeploymentReport {
    pub fn new(network: NetworkId) -> Self {
        Self {
            network,
            nodes: Vec::new(),
            transactions: 0,
        }
    }

    pub fn outcome_of(&self, node: &str) -> Option<NodeOutcome> {
        self.nodes
            .iter()
            .find(|report| report.node == node)
            .map(|report| report.outcome)
    }

    /// Nodes with the given outcome, in execution order.
    pub fn with_outcome(&self, outcome: NodeOutcome) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|report| report.outcome == outcome)
            .map(|report| report.node.as_str())
            .collect()
    }

    /// True when the run changed nothing on chain.
    pub fn is_noop(&self) -> bool {
        self.transactions == 0
    }
}
