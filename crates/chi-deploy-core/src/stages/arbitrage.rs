//! Arbitrage module and the roles it needs elsewhere.

use crate::chain::DeployStrategy;
use crate::config::DeployConfig;
use crate::plan::{Component, ComponentSpec, PlanNode, StepSpec, Task, TaskSpec, args};

pub(crate) fn nodes(config: &DeployConfig) -> Vec<PlanNode> {
    let tolerance = config.arbitrage.usc_price_tolerance;
    let max_diff = config.arbitrage.max_mint_price_diff;

    let arbitrage = ComponentSpec::deploy(
        Component::Arbitrage,
        DeployStrategy::Direct,
        args(|i| {
            Ok(vec![
                i.address(Component::Usc)?.into(),
                i.address(Component::Chi)?.into(),
                i.address(Component::RewardController)?.into(),
                i.address(Component::PriceFeedAggregator)?.into(),
                i.address(Component::ReserveHolder)?.into(),
            ])
        }),
    )
    .after([
        Component::Usc,
        Component::Chi,
        Component::RewardController,
        Component::PriceFeedAggregator,
        Component::ReserveHolder,
    ])
    .wire(StepSpec::call(
        Component::Arbitrage,
        "setPriceTolerance",
        args(move |_| Ok(vec![tolerance.into()])),
    ))
    .wire(StepSpec::call(
        Component::Arbitrage,
        "setMaxMintPriceDiff",
        args(move |_| Ok(vec![max_diff.into()])),
    ))
    .wire(StepSpec::call(
        Component::RewardController,
        "setArbitrager",
        args(|i| Ok(vec![i.address(Component::Arbitrage)?.into()])),
    ));

    let grant_minter = |token: Component| {
        StepSpec::call(
            token,
            "updateMinter",
            args(|i| Ok(vec![i.address(Component::Arbitrage)?.into(), true.into()])),
        )
        .labeled(format!("grantMinter:{token}"))
    };

    let roles = TaskSpec::new(Task::GrantArbitrageRoles)
        .after([
            Component::Arbitrage,
            Component::ReserveHolder,
            Component::Chi,
            Component::Usc,
        ])
        .step(StepSpec::call(
            Component::ReserveHolder,
            "setArbitrager",
            args(|i| Ok(vec![i.address(Component::Arbitrage)?.into(), true.into()])),
        ))
        .step(grant_minter(Component::Chi))
        .step(grant_minter(Component::Usc));

    vec![arbitrage.into(), roles.into()]
}
