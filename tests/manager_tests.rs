//! Integration tests for the shared `VaultManager` handle.

use std::sync::Arc;
use std::thread;

use credvault::config::Settings;
use credvault::errors::{ErrorKind, VaultError};
use credvault::vault::{EntryData, Lookup, VaultManager, VaultState};
use serde_json::json;
use tempfile::TempDir;

const PASSWORD: &str = "manager-test-password";

fn data(value: serde_json::Value) -> EntryData {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

fn ready_manager() -> (TempDir, VaultManager) {
    let dir = TempDir::new().unwrap();
    let manager = VaultManager::new(dir.path().join("vault.enc"));
    manager.initialize(Some(PASSWORD)).unwrap();
    (dir, manager)
}

#[test]
fn initialize_creates_then_unlocks() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("vault.enc");

    let manager = VaultManager::new(&path);
    assert_eq!(manager.state(), VaultState::Uninitialized);
    assert!(!manager.exists());

    manager.initialize(Some(PASSWORD)).unwrap();
    assert!(path.exists());
    assert!(!manager.is_locked());
    manager.add(&data(json!({"service": "GitHub"}))).unwrap();

    // A second manager on the same file unlocks instead of recreating.
    let again = VaultManager::new(&path);
    again.initialize(Some(PASSWORD)).unwrap();
    assert_eq!(again.list().unwrap(), vec!["GitHub".to_string()]);
}

#[test]
fn initialize_is_a_no_op_when_unlocked() {
    let (_dir, manager) = ready_manager();
    manager.add(&data(json!({"service": "GitHub"}))).unwrap();

    // Even a wrong password is ignored: the vault is already open.
    manager.initialize(Some("something else")).unwrap();
    assert_eq!(manager.list().unwrap().len(), 1);
}

#[test]
fn initialize_after_lock_unlocks_again() {
    let (_dir, manager) = ready_manager();
    manager.add(&data(json!({"service": "GitHub"}))).unwrap();

    manager.lock();
    assert!(manager.is_locked());
    assert_eq!(manager.state(), VaultState::Locked);

    let err = manager.initialize(Some("wrong password")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthenticationFailure);
    assert!(manager.is_locked());

    manager.initialize(Some(PASSWORD)).unwrap();
    assert_eq!(manager.list().unwrap(), vec!["GitHub".to_string()]);
}

#[test]
fn initialize_with_empty_password_on_existing_vault_fails_authentication() {
    let (dir, manager) = ready_manager();
    manager.lock();

    let err = manager.initialize(Some("")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthenticationFailure);

    let fresh = VaultManager::new(dir.path().join("vault.enc"));
    let err = fresh.initialize(Some("")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthenticationFailure);
    assert!(fresh.is_locked());
}

#[test]
fn initialize_after_lock_recreates_a_removed_file() {
    let (dir, manager) = ready_manager();
    manager.add(&data(json!({"service": "GitHub"}))).unwrap();
    manager.lock();

    let path = dir.path().join("vault.enc");
    std::fs::remove_file(&path).unwrap();

    manager.initialize(Some("replacement-password")).unwrap();
    assert!(path.exists());
    assert_eq!(manager.state(), VaultState::Unlocked);
    assert!(manager.list_all().unwrap().is_empty());
}

#[test]
fn from_settings_uses_configured_file_and_password_variable() {
    if std::env::var_os("VAULT_FILE").is_some() {
        // The override would win over the configured file.
        return;
    }

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("configured.enc");
    let settings = Settings {
        vault_file: Some(path.clone()),
        password_env: "CREDVAULT_TEST_FROM_SETTINGS_PASSWORD".into(),
        ..Settings::default()
    };
    std::env::set_var("CREDVAULT_TEST_FROM_SETTINGS_PASSWORD", PASSWORD);

    let manager = VaultManager::from_settings(&settings).unwrap();
    assert_eq!(manager.path(), path);

    manager.initialize(None).unwrap();
    assert!(path.exists());
    assert!(!manager.is_locked());
}

#[test]
fn operations_before_initialize_fail_but_list_is_empty() {
    let dir = TempDir::new().unwrap();
    let manager = VaultManager::new(dir.path().join("vault.enc"));

    let err = manager.get("GitHub").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Locked);
    assert!(manager.list().unwrap().is_empty());
    assert!(manager.list_all().unwrap().is_empty());
}

#[test]
fn locked_manager_guards_reads() {
    let (_dir, manager) = ready_manager();
    manager
        .add(&data(json!({"service": "GitHub", "token": "abc"})))
        .unwrap();
    manager.lock();

    assert!(matches!(manager.get("GitHub"), Err(VaultError::Locked)));
    assert!(matches!(manager.get_fields("GitHub"), Err(VaultError::Locked)));
    assert!(manager.list().unwrap().is_empty());
}

#[test]
fn get_purges_expired_entries() {
    let (_dir, manager) = ready_manager();
    manager
        .add(&data(json!({"service": "otp", "code": "123456", "ttl_seconds": -1})))
        .unwrap();

    assert_eq!(manager.list().unwrap(), Vec::<String>::new());
    assert_eq!(manager.list_all().unwrap(), vec!["otp".to_string()]);

    assert_eq!(
        manager.get("otp").unwrap(),
        Lookup::Expired { purged: true }
    );
    assert_eq!(manager.get("otp").unwrap(), Lookup::NotFound);
    assert!(manager.list_all().unwrap().is_empty());
}

#[test]
fn shared_across_threads() {
    let (_dir, manager) = ready_manager();
    let manager = Arc::new(manager);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                let service = format!("service-{i}");
                manager
                    .add(&data(json!({"service": service.as_str(), "n": i})))
                    .unwrap();
                manager
                    .update(&service, &data(json!({"n": i * 10})))
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut names = manager.list().unwrap();
    names.sort();
    assert_eq!(names.len(), 8);

    for i in 0..8 {
        let entry = manager
            .get(&format!("service-{i}"))
            .unwrap()
            .found()
            .unwrap();
        assert_eq!(entry.field("n"), Some(&json!(i * 10)));
    }

    // Ids are unique even though the adds raced.
    let mut ids: Vec<u64> = manager
        .entries(true)
        .unwrap()
        .iter()
        .map(|e| e.id)
        .collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 8);
}

#[test]
fn delete_through_manager() {
    let (_dir, manager) = ready_manager();
    assert!(!manager.delete("GitHub").unwrap());
    manager.add(&data(json!({"service": "GitHub"}))).unwrap();
    assert!(manager.delete("github").unwrap());
    assert_eq!(manager.purge_expired().unwrap(), 0);
}
