//! Governance escrow and the contracts that only serve frontends and funds.

use crate::chain::DeployStrategy;
use crate::plan::{Component, ComponentSpec, PlanNode, args, no_args};

pub(crate) fn nodes() -> Vec<PlanNode> {
    vec![
        ComponentSpec::deploy(
            Component::VeChi,
            DeployStrategy::Direct,
            args(|i| {
                Ok(vec![
                    i.address(Component::ChiLocking)?.into(),
                    i.address(Component::ChiVesting)?.into(),
                ])
            }),
        )
        .after([Component::ChiLocking, Component::ChiVesting])
        .into(),
        ComponentSpec::deploy(Component::DataProvider, DeployStrategy::Direct, no_args()).into(),
        ComponentSpec::deploy(Component::TestpageHelper, DeployStrategy::Direct, no_args()).into(),
        ComponentSpec::deploy(Component::Treasury, DeployStrategy::Direct, no_args()).into(),
    ]
}
