//! Protocol tokens, their ETH pools and the initial pool liquidity.

use crate::chain::DeployStrategy;
use crate::config::DeployConfig;
use crate::plan::{
    CallTarget, Component, ComponentSpec, PlanNode, StepSpec, Task, TaskSpec, args, no_args,
};
use crate::types::TokenAmount;

pub(crate) fn nodes(config: &DeployConfig) -> Vec<PlanNode> {
    let supply = config.tokens.chi_initial_supply;

    vec![
        ComponentSpec::deploy(Component::Usc, DeployStrategy::Direct, no_args()).into(),
        ComponentSpec::deploy(
            Component::Chi,
            DeployStrategy::Direct,
            args(move |_| Ok(vec![supply.into()])),
        )
        .into(),
        ComponentSpec::factory_pair(Component::UscEthLp, Component::Usc).into(),
        ComponentSpec::factory_pair(Component::ChiEthLp, Component::Chi).into(),
        seed_liquidity(config).into(),
    ]
}

/// Mint the USC side under a temporary minter grant, then pair both tokens
/// with ETH through the router.
fn seed_liquidity(config: &DeployConfig) -> TaskSpec {
    let liquidity = config.liquidity.clone();
    let (usc_amount, chi_amount) = (liquidity.usc_amount, liquidity.chi_amount);
    let deadline = liquidity.deadline;

    let add_liquidity = move |token: Component, amount: TokenAmount| {
        args(move |i| {
            Ok(vec![
                i.address(token)?.into(),
                amount.into(),
                0u64.into(),
                0u64.into(),
                i.deployer().into(),
                deadline.into(),
            ])
        })
    };
    let approve_router = |token: Component, amount: TokenAmount| {
        StepSpec::call(
            token,
            "approve",
            args(move |i| {
                Ok(vec![
                    i.external().uniswap_v2_router.clone().into(),
                    amount.into(),
                ])
            }),
        )
        .labeled(format!("approve:{token}"))
    };

    TaskSpec::new(Task::SeedLiquidity)
        .after([
            Component::Usc,
            Component::Chi,
            Component::UscEthLp,
            Component::ChiEthLp,
        ])
        .step(
            StepSpec::call(
                Component::Usc,
                "updateMinter",
                args(|i| Ok(vec![i.deployer().into(), true.into()])),
            )
            .labeled("grantMinter:deployer"),
        )
        .step(
            StepSpec::call(
                Component::Usc,
                "mint",
                args(move |i| Ok(vec![i.deployer().into(), usc_amount.into()])),
            )
            .once(),
        )
        .step(
            StepSpec::call(
                Component::Usc,
                "updateMinter",
                args(|i| Ok(vec![i.deployer().into(), false.into()])),
            )
            .labeled("revokeMinter:deployer"),
        )
        .step(approve_router(Component::Usc, usc_amount))
        .step(
            StepSpec::call(
                CallTarget::UniswapRouter,
                "addLiquidityETH",
                add_liquidity(Component::Usc, usc_amount),
            )
            .labeled("addLiquidityETH:USC")
            .with_value(liquidity.usc_pool_eth)
            .once(),
        )
        .step(approve_router(Component::Chi, chi_amount))
        .step(
            StepSpec::call(
                CallTarget::UniswapRouter,
                "addLiquidityETH",
                add_liquidity(Component::Chi, chi_amount),
            )
            .labeled("addLiquidityETH:CHI")
            .with_value(liquidity.chi_pool_eth)
            .once(),
        )
}
