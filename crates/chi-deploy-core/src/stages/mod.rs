//! The protocol deployment plan, stage by stage.

mod arbitrage;
mod distribution;
mod incentives;
mod oracles;
mod periphery;
mod sale;
mod staking;
mod tokens;

use crate::config::DeployConfig;
use crate::plan::DeploymentPlan;

/// Build the full plan for a configuration.
///
/// Nodes are declared in the order a fresh deployment runs them.
pub fn build_plan(config: &DeployConfig) -> DeploymentPlan {
    let mut plan = DeploymentPlan::new();
    plan.extend(tokens::nodes(config));
    plan.extend(oracles::nodes(config));
    plan.extend(staking::nodes(config));
    plan.extend(incentives::nodes(config));
    plan.extend(sale::nodes(config));
    plan.extend(arbitrage::nodes(config));
    plan.extend(periphery::nodes());
    plan.extend(distribution::nodes(config));
    plan
}
