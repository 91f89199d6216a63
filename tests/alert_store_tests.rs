use std::fs;
use std::path::PathBuf;

use cryptoping::error::StoreError;
use cryptoping::models::{Alert, Direction};
use cryptoping::services::alert_store::AlertStore;

fn temp_path(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "cryptoping-alerts-{name}-{}.json",
        std::process::id()
    ));
    let _ = fs::remove_file(&path);
    path
}

#[test]
fn missing_file_loads_as_empty_store() {
    let store = AlertStore::load(temp_path("missing")).unwrap();
    assert!(store.is_empty());
    assert!(store.list_all().is_empty());
}

#[test]
fn empty_file_loads_as_empty_store() {
    let path = temp_path("emptyfile");
    fs::write(&path, "").unwrap();

    let store = AlertStore::load(&path).unwrap();
    assert!(store.is_empty());

    // Whitespace-only counts as empty too.
    fs::write(&path, "  \n").unwrap();
    assert!(AlertStore::load(&path).unwrap().is_empty());
}

#[test]
fn corrupt_file_is_a_corrupt_state_error() {
    let path = temp_path("corrupt");
    fs::write(&path, "{ this is not json").unwrap();

    let err = AlertStore::load(&path).unwrap_err();
    assert!(matches!(err, StoreError::CorruptState { .. }));
}

#[test]
fn add_then_reload_round_trips() {
    let path = temp_path("roundtrip");

    let mut store = AlertStore::load(&path).unwrap();
    store
        .add("111", Alert::new("bitcoin", Direction::Above, 90_000.0))
        .unwrap();
    store
        .add("111", Alert::new("sui", Direction::Below, 2.5))
        .unwrap();
    store
        .add("222", Alert::new("the-open-network", Direction::Above, 10.0))
        .unwrap();

    let reloaded = AlertStore::load(&path).unwrap();
    assert_eq!(reloaded.list_all(), store.list_all());

    // Insertion order within a user survives the round trip.
    let alerts = reloaded.alerts_for("111");
    assert_eq!(alerts[0].coin, "bitcoin");
    assert_eq!(alerts[1].coin, "sui");
}

#[test]
fn remove_is_idempotent() {
    let path = temp_path("idempotent");
    let mut store = AlertStore::load(&path).unwrap();

    let alert = Alert::new("bitcoin", Direction::Above, 90_000.0);
    store.add("111", alert.clone()).unwrap();

    assert!(store.remove("111", &alert).unwrap());
    // Second removal of the same threshold is a no-op, never an error.
    assert!(!store.remove("111", &alert).unwrap());
    // Unknown user too.
    assert!(!store.remove("999", &alert).unwrap());
}

#[test]
fn remove_takes_only_one_duplicate_instance() {
    let path = temp_path("duplicates");
    let mut store = AlertStore::load(&path).unwrap();

    let alert = Alert::new("sui", Direction::Below, 3.0);
    store.add("111", alert.clone()).unwrap();
    store.add("111", alert.clone()).unwrap();

    assert!(store.remove("111", &alert).unwrap());
    assert_eq!(store.alerts_for("111").len(), 1);
}

#[test]
fn snapshot_mutation_does_not_touch_stored_state() {
    let path = temp_path("snapshot");
    let mut store = AlertStore::load(&path).unwrap();
    store
        .add("111", Alert::new("bitcoin", Direction::Above, 90_000.0))
        .unwrap();

    let mut snapshot = store.list_all();
    snapshot.clear();

    assert_eq!(store.alerts_for("111").len(), 1);
}

#[test]
fn persist_leaves_no_temp_file_behind() {
    let path = temp_path("atomic");
    let mut store = AlertStore::load(&path).unwrap();
    store
        .add("111", Alert::new("bitcoin", Direction::Above, 90_000.0))
        .unwrap();

    assert!(path.exists());
    assert!(!path.with_extension("tmp").exists());
}

#[test]
fn removing_last_alert_prunes_the_user_entry() {
    let path = temp_path("prune");
    let mut store = AlertStore::load(&path).unwrap();

    let alert = Alert::new("bitcoin", Direction::Above, 90_000.0);
    store.add("111", alert.clone()).unwrap();
    store.remove("111", &alert).unwrap();

    assert!(store.is_empty());

    // And the persisted file agrees.
    let raw = fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed, serde_json::json!({}));
}
