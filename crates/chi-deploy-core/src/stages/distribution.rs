//! Final CHI allocations.

use crate::config::DeployConfig;
use crate::plan::{Component, PlanNode, StepSpec, Task, TaskSpec, args};
use crate::types::TokenAmount;

pub(crate) fn nodes(config: &DeployConfig) -> Vec<PlanNode> {
    let distribution = &config.distribution;

    let mint_to = |recipient: Component, amount: TokenAmount| {
        StepSpec::call(
            Component::Chi,
            "mint",
            args(move |i| Ok(vec![i.address(recipient)?.into(), amount.into()])),
        )
        .labeled(format!("mint:{recipient}"))
        .once()
    };

    let mut task = TaskSpec::new(Task::FinalDistribution)
        .after([
            Component::Chi,
            Component::Treasury,
            Component::Ochi,
            Component::RewardController,
        ])
        .after([Task::GrantDeployerMinter])
        .step(mint_to(Component::Treasury, distribution.treasury))
        .step(mint_to(Component::Ochi, distribution.ochi))
        .step(mint_to(
            Component::RewardController,
            distribution.reward_controller,
        ));

    if distribution.revoke_deployer_minter {
        task = task.step(
            StepSpec::call(
                Component::Chi,
                "updateMinter",
                args(|i| Ok(vec![i.deployer().into(), false.into()])),
            )
            .labeled("revokeMinter:deployer"),
        );
    }

    vec![task.into()]
}
