//! Price oracles and the aggregator that routes asset prices to them.

use crate::chain::DeployStrategy;
use crate::config::DeployConfig;
use crate::plan::{Component, ComponentSpec, PlanNode, StepSpec, args, no_args};

pub(crate) fn nodes(config: &DeployConfig) -> Vec<PlanNode> {
    let oracles = config.oracles.clone();

    // Uniswap V2 TWAP over the token/WETH pool, quoted in USD via Chainlink.
    let twap = |oracle: Component, token: Component, pool: Component| {
        let oracles = oracles.clone();
        ComponentSpec::deploy(
            oracle,
            DeployStrategy::Direct,
            args(move |i| {
                let external = i.external();
                Ok(vec![
                    external.uniswap_v2_factory.clone().into(),
                    i.address(token)?.into(),
                    external.weth.clone().into(),
                    oracles.twap_update_period.into(),
                    oracles.twap_min_period_from_snapshot.into(),
                    external.eth_usd_price_feed.clone().into(),
                ])
            }),
        )
        .after([token, pool])
    };

    vec![
        ComponentSpec::deploy(
            Component::EthUsdOracle,
            DeployStrategy::Direct,
            args(|i| {
                let external = i.external();
                Ok(vec![
                    external.weth.clone().into(),
                    external.eth_usd_price_feed.clone().into(),
                ])
            }),
        )
        .into(),
        ComponentSpec::deploy(
            Component::StEthUsdOracle,
            DeployStrategy::Direct,
            args(|i| {
                let external = i.external();
                Ok(vec![
                    external.steth.clone().into(),
                    external.steth_usd_price_feed.clone().into(),
                ])
            }),
        )
        .into(),
        twap(Component::UscUsdOracle, Component::Usc, Component::UscEthLp).into(),
        twap(Component::ChiUsdOracle, Component::Chi, Component::ChiEthLp).into(),
        price_feed_aggregator().into(),
    ]
}

fn price_feed_aggregator() -> ComponentSpec {
    ComponentSpec::deploy(
        Component::PriceFeedAggregator,
        DeployStrategy::Direct,
        no_args(),
    )
    .after([
        Component::Usc,
        Component::Chi,
        Component::EthUsdOracle,
        Component::StEthUsdOracle,
        Component::UscUsdOracle,
        Component::ChiUsdOracle,
    ])
    .wire(
        StepSpec::call(
            Component::PriceFeedAggregator,
            "setPriceFeed",
            args(|i| {
                Ok(vec![
                    i.external().weth.clone().into(),
                    i.address(Component::EthUsdOracle)?.into(),
                ])
            }),
        )
        .labeled("setPriceFeed:WETH"),
    )
    .wire(
        StepSpec::call(
            Component::PriceFeedAggregator,
            "setPriceFeed",
            args(|i| {
                Ok(vec![
                    i.external().steth.clone().into(),
                    i.address(Component::StEthUsdOracle)?.into(),
                ])
            }),
        )
        .labeled("setPriceFeed:stETH"),
    )
    .wire(feed_for_token(Component::Usc, Component::UscUsdOracle))
    .wire(feed_for_token(Component::Chi, Component::ChiUsdOracle))
}

fn feed_for_token(token: Component, oracle: Component) -> StepSpec {
    StepSpec::call(
        Component::PriceFeedAggregator,
        "setPriceFeed",
        args(move |i| Ok(vec![i.address(token)?.into(), i.address(oracle)?.into()])),
    )
    .labeled(format!("setPriceFeed:{token}"))
}
