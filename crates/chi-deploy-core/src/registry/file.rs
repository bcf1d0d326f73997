//! JSON file persistence for the registry and step journal.
//!
//! Every operation re-reads the document from disk, so an operator can
//! correct or pre-seed entries between runs. Every mutation rewrites the
//! whole document atomically (tmp + rename).
//!
//! The step journal lives next to the registry:
//! `deployed-contracts.json` -> `deployed-contracts.steps.json`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::document::{ComponentRecord, RegistryDocument, StepJournal, StepState};
use super::{RecordOutcome, Registry, RegistryError};
use crate::types::{Address, NetworkId};

/// File-backed registry.
///
/// Single writer only: two processes running against the same file can both
/// observe a component as missing and both deploy it.
#[derive(Debug, Clone)]
pub struct JsonFileRegistry {
    path: PathBuf,
    steps_path: PathBuf,
}

impl JsonFileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let steps_path = steps_path_for(&path);
        Self { path, steps_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn steps_path(&self) -> &Path {
        &self.steps_path
    }

    /// Load the registry document; a missing file is an empty registry.
    pub fn load(&self) -> Result<RegistryDocument, RegistryError> {
        load_json(&self.path)
    }

    pub fn load_journal(&self) -> Result<StepJournal, RegistryError> {
        load_json(&self.steps_path)
    }

    fn modify<F>(&self, f: F) -> Result<RecordOutcome, RegistryError>
    where
        F: FnOnce(&mut RegistryDocument) -> Result<RecordOutcome, RegistryError>,
    {
        let mut document = self.load()?;
        let outcome = f(&mut document)?;
        if outcome == RecordOutcome::Changed {
            save_json(&self.path, &document)?;
        }
        Ok(outcome)
    }

    fn set_step(&self, network: &NetworkId, step: &str, state: StepState) -> Result<(), RegistryError> {
        let mut journal = self.load_journal()?;
        if journal.set(network, step, state) {
            save_json(&self.steps_path, &journal)?;
        }
        Ok(())
    }
}

impl Registry for JsonFileRegistry {
    fn lookup(
        &self,
        network: &NetworkId,
        component: &str,
    ) -> Result<Option<ComponentRecord>, RegistryError> {
        Ok(self.load()?.get(network, component).cloned())
    }

    fn begin(
        &mut self,
        network: &NetworkId,
        component: &str,
    ) -> Result<RecordOutcome, RegistryError> {
        self.modify(|doc| doc.begin(network, component))
    }

    fn record(
        &mut self,
        network: &NetworkId,
        component: &str,
        address: &Address,
    ) -> Result<RecordOutcome, RegistryError> {
        let outcome = self.modify(|doc| doc.record(network, component, address))?;
        if outcome == RecordOutcome::Changed {
            tracing::info!(%network, component, %address, "registered contract");
        }
        Ok(outcome)
    }

    fn mark_ready(
        &mut self,
        network: &NetworkId,
        component: &str,
    ) -> Result<RecordOutcome, RegistryError> {
        self.modify(|doc| doc.mark_ready(network, component))
    }

    fn clear_intent(
        &mut self,
        network: &NetworkId,
        component: &str,
    ) -> Result<RecordOutcome, RegistryError> {
        self.modify(|doc| doc.clear_intent(network, component))
    }

    fn step_state(
        &self,
        network: &NetworkId,
        step: &str,
    ) -> Result<Option<StepState>, RegistryError> {
        Ok(self.load_journal()?.state(network, step))
    }

    fn begin_step(&mut self, network: &NetworkId, step: &str) -> Result<(), RegistryError> {
        self.set_step(network, step, StepState::Started)
    }

    fn complete_step(&mut self, network: &NetworkId, step: &str) -> Result<(), RegistryError> {
        self.set_step(network, step, StepState::Done)
    }

    fn clear_step(&mut self, network: &NetworkId, step: &str) -> Result<(), RegistryError> {
        let mut journal = self.load_journal()?;
        if journal.clear(network, step) {
            save_json(&self.steps_path, &journal)?;
        }
        Ok(())
    }

    fn components(
        &self,
        network: &NetworkId,
    ) -> Result<BTreeMap<String, ComponentRecord>, RegistryError> {
        Ok(self.load()?.network(network))
    }

    fn steps(&self, network: &NetworkId) -> Result<BTreeMap<String, StepState>, RegistryError> {
        Ok(self.load_journal()?.network(network))
    }
}

fn steps_path_for(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "registry".to_string());
    path.with_file_name(format!("{stem}.steps.json"))
}

fn load_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T, RegistryError> {
    if !path.exists() {
        return Ok(T::default());
    }
    let bytes = fs::read(path).map_err(|source| RegistryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(&bytes).map_err(|source| RegistryError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Save a document atomically (tmp + rename).
fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), RegistryError> {
    let io_err = |source| RegistryError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    // Serialize first so a serialization failure never touches the file.
    let mut bytes = serde_json::to_vec_pretty(value).map_err(|source| RegistryError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;
    bytes.push(b'\n');

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "registry.json".to_string());
    let tmp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()));

    fs::write(&tmp_path, bytes).map_err(io_err)?;
    fs::rename(&tmp_path, path).map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    #[test]
    fn test_steps_path_sits_next_to_registry() {
        let registry = JsonFileRegistry::new("/tmp/state/deployed-contracts.json");
        assert_eq!(
            registry.steps_path(),
            Path::new("/tmp/state/deployed-contracts.steps.json")
        );
    }

    #[test]
    fn test_missing_file_is_empty_registry() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        let registry = JsonFileRegistry::new(tmp.path().join("deployed-contracts.json"));

        let record = registry
            .lookup(&NetworkId::from("test"), "USC")
            .expect("lookup should succeed");
        assert!(record.is_none());
        assert!(!registry.path().exists());
    }

    #[test]
    fn test_record_persists_and_survives_reopen() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        let path = tmp.path().join("nested").join("deployed-contracts.json");
        let network = NetworkId::from("test");

        let mut registry = JsonFileRegistry::new(&path);
        registry
            .record(&network, "USC", &addr(1))
            .expect("record should succeed");

        let reopened = JsonFileRegistry::new(&path);
        assert_eq!(
            reopened.lookup(&network, "USC").expect("lookup should succeed"),
            Some(ComponentRecord::Deployed(addr(1)))
        );
    }

    #[test]
    fn test_save_leaves_no_tmp_files() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        let network = NetworkId::from("test");
        let mut registry = JsonFileRegistry::new(tmp.path().join("deployed-contracts.json"));

        for byte in 1..4u8 {
            let component = format!("C{byte}");
            registry
                .record(&network, &component, &addr(byte))
                .expect("record should succeed");
        }

        let leftovers: Vec<_> = fs::read_dir(tmp.path())
            .expect("read_dir should succeed")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "tmp files should be renamed away");
    }

    #[test]
    fn test_hand_edited_entries_are_read_on_next_lookup() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        let path = tmp.path().join("deployed-contracts.json");
        let network = NetworkId::from("mainnet");
        let registry = JsonFileRegistry::new(&path);

        fs::write(
            &path,
            format!("{{ \"mainnet\": {{ \"USC\": \"{}\" }} }}", addr(7)),
        )
        .expect("write should succeed");

        assert_eq!(
            registry.lookup(&network, "USC").expect("lookup should succeed"),
            Some(ComponentRecord::Ready(addr(7)))
        );
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        let path = tmp.path().join("deployed-contracts.json");
        fs::write(&path, "{ not json").expect("write should succeed");

        let registry = JsonFileRegistry::new(&path);
        let err = registry
            .lookup(&NetworkId::from("test"), "USC")
            .unwrap_err();
        assert!(matches!(err, RegistryError::Corrupt { .. }));
    }

    #[test]
    fn test_conflict_leaves_file_untouched() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        let path = tmp.path().join("deployed-contracts.json");
        let network = NetworkId::from("test");
        let mut registry = JsonFileRegistry::new(&path);

        registry
            .record(&network, "USC", &addr(1))
            .expect("record should succeed");
        let before = fs::read(&path).expect("read should succeed");

        assert!(registry.record(&network, "USC", &addr(2)).is_err());
        assert_eq!(fs::read(&path).expect("read should succeed"), before);
    }

    #[test]
    fn test_unknown_networks_are_preserved() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        let path = tmp.path().join("deployed-contracts.json");
        fs::write(
            &path,
            format!("{{ \"tenderly\": {{ \"Legacy\": \"{}\" }} }}", addr(3)),
        )
        .expect("write should succeed");

        let mut registry = JsonFileRegistry::new(&path);
        registry
            .record(&NetworkId::from("test"), "USC", &addr(1))
            .expect("record should succeed");

        let legacy = registry
            .lookup(&NetworkId::from("tenderly"), "Legacy")
            .expect("lookup should succeed");
        assert_eq!(legacy, Some(ComponentRecord::Ready(addr(3))));
    }

    #[test]
    fn test_step_journal_round_trip() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        let network = NetworkId::from("test");
        let mut registry = JsonFileRegistry::new(tmp.path().join("deployed-contracts.json"));

        registry
            .begin_step(&network, "IDO/mint:IDO")
            .expect("begin_step should succeed");
        assert_eq!(
            registry.step_state(&network, "IDO/mint:IDO").unwrap(),
            Some(StepState::Started)
        );
        registry
            .complete_step(&network, "IDO/mint:IDO")
            .expect("complete_step should succeed");

        let reopened = JsonFileRegistry::new(registry.path());
        assert_eq!(
            reopened.steps(&network).unwrap().get("IDO/mint:IDO"),
            Some(&StepState::Done)
        );
        assert!(reopened.steps_path().exists());
    }
}
