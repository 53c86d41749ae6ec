//! SQLite store: the state blob and the change log.

mod common;

use capacity_core::{
    error::PlannerError,
    event::PlanEvent,
    store::{PlannerStore, STATE_KEY},
};
use common::*;

fn store() -> PlannerStore {
    let store = PlannerStore::in_memory().unwrap();
    store.migrate().unwrap();
    store
}

fn temp_db(name: &str) -> String {
    let path = std::env::temp_dir().join(format!("capacity-core-{name}-{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);
    path.to_string_lossy().into_owned()
}

#[test]
fn empty_store_has_no_state() {
    let store = store();
    store.check_health().unwrap();
    assert!(store.load_state().unwrap().is_none());
}

#[test]
fn migrations_can_run_twice() {
    let store = store();
    store.migrate().unwrap();
    assert_eq!(store.change_count().unwrap(), 0);
}

/// The blob round-trips, including keys the model does not know about.
#[test]
fn state_round_trips_with_unknown_keys() {
    let store = store();
    let mut s = state(
        vec![squad("checkout", "web")],
        vec![split_person("p1", "Software Engineer", "checkout", "payments")],
        vec![initiative("search", "submitted")],
    );
    s.extra.insert("squadOrder".into(), serde_json::json!({ "web": ["checkout"] }));
    set_dates(&mut s, "search", "2026-10-01", "2027-03-31");

    store.save_state(&s).unwrap();
    let loaded = store.load_state().unwrap().unwrap();
    assert_eq!(loaded, s);

    // Saved wholesale: a second save replaces the first.
    s.squads.clear();
    store.save_state(&s).unwrap();
    assert!(store.load_state().unwrap().unwrap().squads.is_empty());
}

#[test]
fn change_log_is_append_only_and_ordered() {
    let store = store();
    let first = store
        .append_change(&PlanEvent::PersonRemoved { person_id: "p1".into() }, "2026-10-18T09:00:00Z")
        .unwrap();
    let second = store
        .append_change(
            &PlanEvent::SquadRenamed { squad_id: "checkout".into(), name: "Pay".into() },
            "2026-10-18T09:01:00Z",
        )
        .unwrap();
    assert!(second > first);
    assert_eq!(store.change_count().unwrap(), 2);

    let all = store.changes_since(0).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].event_type, "person_removed");
    assert_eq!(all[1].event().unwrap(), PlanEvent::SquadRenamed {
        squad_id: "checkout".into(),
        name: "Pay".into(),
    });
    assert_eq!(store.changes_since(first).unwrap().len(), 1);
}

/// A blob that does not parse is reported, not replaced with defaults.
#[test]
fn corrupt_blob_is_an_error() {
    let path = temp_db("corrupt");
    let store = PlannerStore::open(&path).unwrap();
    store.migrate().unwrap();

    let raw = rusqlite::Connection::open(&path).unwrap();
    raw.execute(
        "INSERT OR REPLACE INTO store (key, value) VALUES (?1, ?2)",
        rusqlite::params![STATE_KEY, "{ not json"],
    )
    .unwrap();
    drop(raw);

    let err = store.load_state().unwrap_err();
    assert!(matches!(err, PlannerError::Serialization(_)), "got {err}");
    let _ = std::fs::remove_file(&path);
}

/// A file database keeps its state across connections.
#[test]
fn file_store_survives_reopen() {
    let path = temp_db("reopen");
    let store = PlannerStore::open(&path).unwrap();
    store.migrate().unwrap();
    store.save_state(&state(vec![squad("checkout", "web")], vec![], vec![])).unwrap();

    let again = store.reopen().unwrap();
    assert_eq!(again.path(), Some(path.as_str()));
    assert_eq!(again.load_state().unwrap().unwrap().squads.len(), 1);
    let _ = std::fs::remove_file(&path);
}
