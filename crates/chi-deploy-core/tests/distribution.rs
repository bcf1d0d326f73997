mod support;

use std::collections::BTreeSet;

use chi_deploy_core::chain::ChainClient;
use chi_deploy_core::config::DeployConfig;
use chi_deploy_core::plan::Component;
use chi_deploy_core::types::TokenAmount;

use support::Rehearsal;

#[test]
fn final_allocations_are_minted_once() {
    let mut rehearsal = Rehearsal::new();
    rehearsal.run().expect("deployment should succeed");
    rehearsal.run().expect("rerun should succeed");

    let chi = rehearsal.address(Component::Chi);
    for recipient in [
        Component::Treasury,
        Component::Ochi,
        Component::RewardController,
    ] {
        assert_eq!(
            rehearsal
                .chain
                .balance_of(&chi, &rehearsal.address(recipient)),
            TokenAmount::tokens(1_000_000),
            "{recipient} allocation"
        );
    }
}

#[test]
fn deployer_keeps_supply_not_paired() {
    let mut rehearsal = Rehearsal::new();
    rehearsal.run().expect("deployment should succeed");

    let chi = rehearsal.address(Component::Chi);
    let deployer = rehearsal.chain.deployer();
    assert_eq!(
        rehearsal.chain.balance_of(&chi, &deployer),
        TokenAmount::tokens(40_000_000)
    );
    // Initial supply, IDO allocation and the three final allocations.
    assert_eq!(
        rehearsal.chain.total_supply(&chi),
        TokenAmount::tokens(106_000_000)
    );
}

#[test]
fn minters_after_full_run() {
    let mut rehearsal = Rehearsal::new();
    rehearsal.run().expect("deployment should succeed");
    let deployer = rehearsal.chain.deployer();

    let chi = rehearsal.address(Component::Chi);
    let usc = rehearsal.address(Component::Usc);
    let ochi = rehearsal.address(Component::Ochi);
    let arbitrage = rehearsal.address(Component::Arbitrage);

    assert_eq!(
        rehearsal.chain.minters(&chi),
        BTreeSet::from([deployer, ochi, arbitrage.clone()])
    );
    assert_eq!(rehearsal.chain.minters(&usc), BTreeSet::from([arbitrage]));
}

#[test]
fn deployer_minter_can_be_revoked_at_the_end() {
    let mut config = DeployConfig::default();
    config.distribution.revoke_deployer_minter = true;
    let mut rehearsal = Rehearsal::with_config(config);
    rehearsal.run().expect("deployment should succeed");
    let deployer = rehearsal.chain.deployer();

    let chi = rehearsal.address(Component::Chi);
    assert!(!rehearsal.chain.minters(&chi).contains(&deployer));
    assert_eq!(
        rehearsal
            .chain
            .balance_of(&chi, &rehearsal.address(Component::Treasury)),
        TokenAmount::tokens(1_000_000)
    );
}
