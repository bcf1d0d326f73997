use tempfile::TempDir;

use chi_deploy_core::config::store::ConfigStore;
use chi_deploy_core::config::{DeployConfig, parse_deploy_toml_str};
use chi_deploy_core::types::{Address, TokenAmount};

#[test]
fn load_missing_returns_defaults() {
    let temp = TempDir::new().unwrap();
    let store = ConfigStore::from_path(temp.path().join("deploy.toml"));

    let config = store.load().unwrap();

    assert_eq!(config.sale, DeployConfig::default().sale);
    assert_eq!(
        config.registry.path,
        temp.path().join("deployed-contracts.json")
    );
}

#[test]
fn save_then_load_roundtrip() {
    let temp = TempDir::new().unwrap();
    let store = ConfigStore::from_path(temp.path().join("nested").join("deploy.toml"));

    let mut config = DeployConfig::new();
    config.registry.path = temp.path().join("registry.json");
    config.sale.hard_cap = TokenAmount::tokens(500);
    config.distribution.revoke_deployer_minter = true;
    config.external.treasury = Address::from_bytes([7; 20]);

    store.save(&config).unwrap();
    let loaded = store.load().unwrap();

    assert_eq!(loaded, config);
}

#[test]
fn partial_file_keeps_other_defaults() {
    let config = parse_deploy_toml_str(
        r#"
[liquidity]
usc_amount = "1_000"
deadline = "1700000000"

[external]
weth = "0x0000000000000000000000000000000000000042"
"#,
    )
    .unwrap();

    assert_eq!(config.liquidity.usc_amount, TokenAmount::tokens(1_000));
    assert_eq!(config.liquidity.deadline, 1_700_000_000);
    assert_eq!(
        config.external.weth,
        Address::parse("0x0000000000000000000000000000000000000042").unwrap()
    );
    assert_eq!(
        config.liquidity.chi_amount,
        DeployConfig::default().liquidity.chi_amount
    );
    assert_eq!(config.oracles, DeployConfig::default().oracles);
}

#[test]
fn fractional_amounts_are_exact() {
    let config = parse_deploy_toml_str("[sale]\nmin_contribution = \"0.25\"\n").unwrap();
    assert_eq!(
        config.sale.min_contribution,
        TokenAmount::from_base_units(250_000_000_000_000_000)
    );
}

#[test]
fn malformed_address_is_rejected() {
    let err = parse_deploy_toml_str("[external]\nweth = \"0x1234\"\n").unwrap_err();
    assert!(format!("{err:#}").contains("0x1234"));
}

#[test]
fn inconsistent_sale_fails_validation() {
    let mut config = DeployConfig::default();
    config.sale.min_contribution = TokenAmount::tokens(20);
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("min_contribution"));
}
