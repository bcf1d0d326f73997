//! Staking, locking and vesting modules, the reserve holder and the reward
//! controller that funds them.

use crate::chain::DeployStrategy;
use crate::config::DeployConfig;
use crate::plan::{Component, ComponentSpec, PlanNode, StepSpec, args};
use crate::types::Value;

pub(crate) fn nodes(config: &DeployConfig) -> Vec<PlanNode> {
    let staking = config.staking.clone();
    let (cliff, duration) = (staking.vesting_cliff_duration, staking.vesting_duration);
    let (threshold, safeguard) = (
        staking.reserve_holder_eth_threshold,
        staking.curve_safe_guard_percentage,
    );

    vec![
        ComponentSpec::deploy(
            Component::ChiStaking,
            DeployStrategy::Proxy,
            args(|i| Ok(vec![i.address(Component::Chi)?.into()])),
        )
        .after([Component::Chi])
        .into(),
        ComponentSpec::deploy(
            Component::ChiLocking,
            DeployStrategy::Proxy,
            args(|i| {
                Ok(vec![
                    i.address(Component::Chi)?.into(),
                    i.address(Component::ChiStaking)?.into(),
                ])
            }),
        )
        .after([Component::Chi, Component::ChiStaking])
        .wire(StepSpec::call(
            Component::ChiLocking,
            "setChiLocker",
            args(|i| Ok(vec![i.address(Component::ChiStaking)?.into(), true.into()])),
        ))
        .wire(StepSpec::call(
            Component::ChiStaking,
            "setChiLocking",
            args(|i| Ok(vec![i.address(Component::ChiLocking)?.into()])),
        ))
        .into(),
        lp_staking(Component::UscEthLpStaking, Component::UscEthLp, "Staked USC-ETH LP").into(),
        lp_staking(Component::ChiEthLpStaking, Component::ChiEthLp, "Staked CHI-ETH LP").into(),
        ComponentSpec::deploy(
            Component::ChiVesting,
            DeployStrategy::Proxy,
            args(move |i| {
                Ok(vec![
                    i.address(Component::Chi)?.into(),
                    cliff.into(),
                    duration.into(),
                ])
            }),
        )
        .after([Component::Chi])
        .into(),
        ComponentSpec::deploy(
            Component::UscStaking,
            DeployStrategy::Proxy,
            args(|i| {
                Ok(vec![
                    i.address(Component::Usc)?.into(),
                    i.address(Component::Chi)?.into(),
                    i.address(Component::ChiLocking)?.into(),
                ])
            }),
        )
        .after([Component::Usc, Component::Chi, Component::ChiLocking])
        .wire(StepSpec::call(
            Component::ChiLocking,
            "setUscStaking",
            args(|i| Ok(vec![i.address(Component::UscStaking)?.into()])),
        ))
        .into(),
        // USCStaking is the initial claimer; the reward controller takes over
        // once it exists.
        ComponentSpec::deploy(
            Component::ReserveHolder,
            DeployStrategy::Proxy,
            args(move |i| {
                Ok(vec![
                    i.address(Component::PriceFeedAggregator)?.into(),
                    i.address(Component::UscStaking)?.into(),
                    threshold.into(),
                    safeguard.into(),
                ])
            }),
        )
        .after([Component::PriceFeedAggregator, Component::UscStaking])
        .into(),
        reward_controller(config).into(),
    ]
}

fn lp_staking(component: Component, pool: Component, name: &'static str) -> ComponentSpec {
    ComponentSpec::deploy(
        component,
        DeployStrategy::Proxy,
        args(move |i| {
            Ok(vec![
                i.address(Component::Chi)?.into(),
                i.address(Component::ChiLocking)?.into(),
                i.address(pool)?.into(),
                name.into(),
                name.into(),
            ])
        }),
    )
    .after([Component::Chi, Component::ChiLocking, pool])
}

const REWARDED_MODULES: [Component; 6] = [
    Component::UscStaking,
    Component::ChiStaking,
    Component::ChiLocking,
    Component::ChiVesting,
    Component::UscEthLpStaking,
    Component::ChiEthLpStaking,
];

fn reward_controller(config: &DeployConfig) -> ComponentSpec {
    let incentives = config.staking.incentives.clone();

    let mut spec = ComponentSpec::deploy(
        Component::RewardController,
        DeployStrategy::Proxy,
        args(|i| {
            let mut values: Vec<Value> = vec![
                i.address(Component::Chi)?.into(),
                i.address(Component::Usc)?.into(),
                i.address(Component::ReserveHolder)?.into(),
            ];
            for module in REWARDED_MODULES {
                values.push(i.address(module)?.into());
            }
            values.push(i.now().into());
            Ok(values)
        }),
    )
    .after([Component::Chi, Component::Usc, Component::ReserveHolder])
    .after(REWARDED_MODULES);

    for module in REWARDED_MODULES {
        spec = spec.wire(
            StepSpec::call(
                module,
                "setRewardController",
                args(|i| Ok(vec![i.address(Component::RewardController)?.into()])),
            )
            .labeled(format!("setRewardController:{module}")),
        );
    }

    for (method, amount) in [
        ("setChiIncentivesForUscStaking", incentives.usc_staking),
        ("setChiIncentivesForChiLocking", incentives.chi_locking),
        ("setChiIncentivesForUscEthLPStaking", incentives.usc_eth_lp_staking),
        ("setChiIncentivesForChiEthLPStaking", incentives.chi_eth_lp_staking),
    ] {
        spec = spec.wire(StepSpec::call(
            Component::RewardController,
            method,
            args(move |_| Ok(vec![amount.into()])),
        ));
    }

    spec.wire(StepSpec::call(
        Component::ReserveHolder,
        "setClaimer",
        args(|i| Ok(vec![i.address(Component::RewardController)?.into()])),
    ))
}
