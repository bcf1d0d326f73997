use serde_json::json;
use tempfile::TempDir;

use chi_deploy_core::registry::{
    ComponentRecord, JsonFileRegistry, RecordOutcome, Registry, RegistryError, StepState,
};
use chi_deploy_core::types::{Address, NetworkId};

fn read_json(path: &std::path::Path) -> serde_json::Value {
    let content = std::fs::read_to_string(path).expect("file should exist");
    serde_json::from_str(&content).expect("file should be JSON")
}

fn address(byte: u8) -> Address {
    Address::from_bytes([byte; 20])
}

#[test]
fn lifecycle_is_visible_in_the_document() {
    let temp = TempDir::new().unwrap();
    let mut registry = JsonFileRegistry::new(temp.path().join("deployed-contracts.json"));
    let network = NetworkId::from("mainnet");

    registry.begin(&network, "USC").unwrap();
    assert_eq!(
        read_json(registry.path()),
        json!({"mainnet": {"USC": {"status": "deploying"}}})
    );

    registry.record(&network, "USC", &address(0xab)).unwrap();
    assert_eq!(
        read_json(registry.path()),
        json!({"mainnet": {"USC": {"address": address(0xab).as_str(), "status": "deployed"}}})
    );

    registry.mark_ready(&network, "USC").unwrap();
    assert_eq!(
        read_json(registry.path()),
        json!({"mainnet": {"USC": address(0xab).as_str()}})
    );
}

#[test]
fn networks_are_independent() {
    let temp = TempDir::new().unwrap();
    let mut registry = JsonFileRegistry::new(temp.path().join("registry.json"));

    registry
        .record(&NetworkId::from("mainnet"), "USC", &address(1))
        .unwrap();
    registry
        .record(&NetworkId::from("test"), "USC", &address(2))
        .unwrap();

    assert_eq!(
        registry.lookup(&NetworkId::from("mainnet"), "USC").unwrap(),
        Some(ComponentRecord::Deployed(address(1)))
    );
    assert_eq!(
        registry.lookup(&NetworkId::from("test"), "USC").unwrap(),
        Some(ComponentRecord::Deployed(address(2)))
    );
    assert!(
        registry
            .lookup(&NetworkId::from("sepolia"), "USC")
            .unwrap()
            .is_none()
    );
}

#[test]
fn recording_a_different_address_is_a_conflict() {
    let temp = TempDir::new().unwrap();
    let mut registry = JsonFileRegistry::new(temp.path().join("registry.json"));
    let network = NetworkId::from("test");

    registry.record(&network, "CHI", &address(1)).unwrap();
    assert_eq!(
        registry.record(&network, "CHI", &address(1)).unwrap(),
        RecordOutcome::NoOp
    );

    let err = registry.record(&network, "CHI", &address(2)).unwrap_err();
    assert!(matches!(err, RegistryError::Conflict { .. }));
    assert_eq!(
        registry.lookup(&network, "CHI").unwrap(),
        Some(ComponentRecord::Deployed(address(1)))
    );
}

#[test]
fn operator_written_plain_address_is_ready() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("registry.json");
    std::fs::write(
        &path,
        r#"{"mainnet": {"USC": "0xAB00000000000000000000000000000000000001"}}"#,
    )
    .unwrap();
    let registry = JsonFileRegistry::new(&path);

    assert_eq!(
        registry.lookup(&NetworkId::from("mainnet"), "USC").unwrap(),
        Some(ComponentRecord::Ready(
            Address::parse("0xab00000000000000000000000000000000000001").unwrap()
        ))
    );
}

#[test]
fn corrupt_document_is_reported_not_overwritten() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("registry.json");
    std::fs::write(&path, "{ not json").unwrap();
    let mut registry = JsonFileRegistry::new(&path);

    let err = registry.begin(&NetworkId::from("test"), "USC").unwrap_err();
    assert!(matches!(err, RegistryError::Corrupt { .. }));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
}

#[test]
fn journal_lives_next_to_the_registry() {
    let temp = TempDir::new().unwrap();
    let mut registry = JsonFileRegistry::new(temp.path().join("deployed-contracts.json"));
    let network = NetworkId::from("test");

    registry.begin_step(&network, "IDO/mint:IDO").unwrap();
    registry.complete_step(&network, "SeedLiquidity/mint").unwrap();

    assert_eq!(
        registry.steps_path(),
        temp.path().join("deployed-contracts.steps.json")
    );
    assert_eq!(
        read_json(registry.steps_path()),
        json!({"test": {"IDO/mint:IDO": "started", "SeedLiquidity/mint": "done"}})
    );
    assert_eq!(
        registry.step_state(&network, "IDO/mint:IDO").unwrap(),
        Some(StepState::Started)
    );

    registry.clear_step(&network, "IDO/mint:IDO").unwrap();
    registry.clear_step(&network, "SeedLiquidity/mint").unwrap();
    assert_eq!(read_json(registry.steps_path()), json!({}));
}
