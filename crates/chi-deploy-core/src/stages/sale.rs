//! Initial distribution sale.
//!
//! The sale contract receives its whole allocation up front
//! (`hard_cap * price / 1e18` CHI), which needs the deployer to hold the
//! CHI minter right. That grant is its own task so the distribution at the
//! end of the run can rely on it as well.

use anyhow::Context;

use crate::chain::DeployStrategy;
use crate::config::DeployConfig;
use crate::plan::{Component, ComponentSpec, PlanNode, StepSpec, Task, TaskSpec, args};
use crate::types::TOKEN_DECIMALS;

pub(crate) fn nodes(config: &DeployConfig) -> Vec<PlanNode> {
    let sale = config.sale.clone();
    let allocation = sale.clone();

    vec![
        TaskSpec::new(Task::GrantDeployerMinter)
            .after([Component::Chi])
            .step(
                StepSpec::call(
                    Component::Chi,
                    "updateMinter",
                    args(|i| Ok(vec![i.deployer().into(), true.into()])),
                )
                .labeled("grantMinter:deployer"),
            )
            .into(),
        ComponentSpec::deploy(
            Component::Ido,
            DeployStrategy::Direct,
            args(move |i| {
                let start = i
                    .now()
                    .checked_add(sale.start_delay_secs)
                    .context("sale start overflows u64 timestamps")?;
                let end = start
                    .checked_add(sale.duration_secs)
                    .context("sale end overflows u64 timestamps")?;
                let tax_fall_per_sec = sale.tax_fall_percent / sale.tax_fall_window_secs.max(1);
                Ok(vec![
                    i.address(Component::Chi)?.into(),
                    i.address(Component::ChiVesting)?.into(),
                    start.into(),
                    end.into(),
                    sale.min_contribution.into(),
                    sale.max_contribution.into(),
                    sale.soft_cap.into(),
                    sale.hard_cap.into(),
                    sale.price.into(),
                    i.external().multisig.clone().into(),
                    sale.start_tax_percent.into(),
                    tax_fall_per_sec.into(),
                ])
            }),
        )
        .after([Component::Chi, Component::ChiVesting])
        .after([Task::GrantDeployerMinter])
        .wire(
            StepSpec::call(
                Component::Chi,
                "mint",
                args(move |i| {
                    let amount = allocation
                        .hard_cap
                        .mul_div(allocation.price.base_units(), 10u128.pow(TOKEN_DECIMALS))
                        .context("sale allocation overflows")?;
                    Ok(vec![i.address(Component::Ido)?.into(), amount.into()])
                }),
            )
            .labeled("mint:IDO")
            .once(),
        )
        .into(),
    ]
}
