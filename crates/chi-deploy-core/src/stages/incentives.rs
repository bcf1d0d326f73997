//! Option-based distribution (LP rewards and OCHI) and time-weighted bonding.

use anyhow::Context;

use crate::chain::DeployStrategy;
use crate::config::DeployConfig;
use crate::plan::{Component, ComponentSpec, PlanNode, StepSpec, args};
use crate::types::Value;

pub(crate) fn nodes(config: &DeployConfig) -> Vec<PlanNode> {
    let cliff = config.bonding.cliff_duration_secs;

    vec![
        lp_rewards(Component::UscEthLpRewards, Component::UscEthLp).into(),
        lp_rewards(Component::ChiEthLpRewards, Component::ChiEthLp).into(),
        ochi().into(),
        ComponentSpec::deploy(
            Component::TimeWeightedBonding,
            DeployStrategy::Direct,
            args(move |i| {
                let cliff_end = i
                    .now()
                    .checked_add(cliff)
                    .context("bonding cliff overflows u64 timestamps")?;
                Ok(vec![
                    i.address(Component::Chi)?.into(),
                    i.address(Component::PriceFeedAggregator)?.into(),
                    i.address(Component::ChiVesting)?.into(),
                    cliff_end.into(),
                    i.external().treasury.clone().into(),
                ])
            }),
        )
        .after([
            Component::Chi,
            Component::PriceFeedAggregator,
            Component::ChiVesting,
        ])
        .wire(StepSpec::call(
            Component::ChiVesting,
            "setChiVester",
            args(|i| {
                Ok(vec![
                    i.address(Component::TimeWeightedBonding)?.into(),
                    true.into(),
                ])
            }),
        ))
        .into(),
    ]
}

fn lp_rewards(component: Component, pool: Component) -> ComponentSpec {
    ComponentSpec::deploy(
        component,
        DeployStrategy::Direct,
        args(move |i| {
            Ok(vec![
                i.address(pool)?.into(),
                i.address(Component::PriceFeedAggregator)?.into(),
            ])
        }),
    )
    .after([pool, Component::PriceFeedAggregator])
}

fn ochi() -> ComponentSpec {
    const INPUTS: [Component; 7] = [
        Component::Usc,
        Component::Chi,
        Component::PriceFeedAggregator,
        Component::UscEthLp,
        Component::ChiEthLp,
        Component::UscEthLpRewards,
        Component::ChiEthLpRewards,
    ];

    let set_ochi = |rewards: Component| {
        StepSpec::call(
            rewards,
            "setOCHI",
            args(|i| Ok(vec![i.address(Component::Ochi)?.into()])),
        )
        .labeled(format!("setOCHI:{rewards}"))
    };

    ComponentSpec::deploy(
        Component::Ochi,
        DeployStrategy::Proxy,
        args(|i| {
            let mut values = INPUTS
                .iter()
                .map(|component| i.address(*component).map(Value::from))
                .collect::<Result<Vec<_>, _>>()?;
            values.push(i.now().into());
            Ok(values)
        }),
    )
    .after(INPUTS)
    .wire(set_ochi(Component::UscEthLpRewards))
    .wire(set_ochi(Component::ChiEthLpRewards))
    .wire(
        StepSpec::call(
            Component::Chi,
            "updateMinter",
            args(|i| Ok(vec![i.address(Component::Ochi)?.into(), true.into()])),
        )
        .labeled("grantMinter:OCHI"),
    )
}
