//! On-disk snapshot store tests
//!
//! These tests verify the persistence contract against a real database file:
//! - full snapshot replace with rollup on both load and save
//! - optimistic concurrency between two sessions on the same file
//! - failed saves leave the previous snapshot intact

use chrono::NaiveDate;
use gatetrack_core::{
    GatewayId, MasterChecklist, NewProject, Portfolio, ProjectType, SnapshotStore, SqliteStore,
    TrackerError, backup_database, is_consistent,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn new_project(name: &str) -> NewProject {
    NewProject {
        name: name.to_string(),
        project_type: ProjectType::Major,
        d0_plan: date("2024-01-01"),
        initial_modules: 2,
    }
}

#[test]
fn snapshot_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("nested").join("gatetrack.db");
    let checklist = MasterChecklist::builtin().unwrap();

    let mut store = SqliteStore::open(&db).unwrap();
    let portfolio = store
        .load()
        .unwrap()
        .create_project(new_project("Falcon"), &checklist)
        .unwrap();
    let project = &portfolio.projects()[0];
    let portfolio = portfolio
        .set_module_actual(
            project.id,
            project.modules[1].id,
            GatewayId::D0,
            Some(date("2024-01-03")),
        )
        .unwrap();
    assert_eq!(store.save(&portfolio).unwrap(), 1);
    drop(store);

    let reopened = SqliteStore::open(&db).unwrap();
    let loaded = reopened.load().unwrap();
    assert_eq!(loaded.revision(), 1);
    assert_eq!(loaded.projects(), portfolio.projects());
    assert!(loaded.projects().iter().all(is_consistent));
    assert_eq!(
        loaded.projects()[0].gateways[GatewayId::D0].actual,
        Some(date("2024-01-03"))
    );
}

#[test]
fn concurrent_sessions_detect_stale_snapshots() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("gatetrack.db");
    let checklist = MasterChecklist::builtin().unwrap();

    let mut alice = SqliteStore::open(&db).unwrap();
    let mut bob = SqliteStore::open(&db).unwrap();
    let alice_view = alice.load().unwrap();
    let bob_view = bob.load().unwrap();

    let alice_edit = alice_view
        .create_project(new_project("Falcon"), &checklist)
        .unwrap();
    assert_eq!(alice.save(&alice_edit).unwrap(), 1);

    let bob_edit = bob_view
        .create_project(new_project("Kestrel"), &checklist)
        .unwrap();
    let err = bob.save(&bob_edit).unwrap_err();
    assert!(matches!(
        err,
        TrackerError::StaleSnapshot {
            expected: 0,
            found: 1
        }
    ));

    // Bob reloads and retries on top of Alice's change.
    let retried = bob
        .load()
        .unwrap()
        .create_project(new_project("Kestrel"), &checklist)
        .unwrap();
    assert_eq!(bob.save(&retried).unwrap(), 2);

    let names: Vec<String> = alice
        .load()
        .unwrap()
        .projects()
        .iter()
        .map(|p| p.name.clone())
        .collect();
    assert_eq!(names, ["Falcon", "Kestrel"]);
}

#[test]
fn rejected_save_keeps_previous_state() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("gatetrack.db");
    let checklist = MasterChecklist::builtin().unwrap();

    let mut store = SqliteStore::open(&db).unwrap();
    let saved = store
        .load()
        .unwrap()
        .create_project(new_project("Falcon"), &checklist)
        .unwrap();
    store.save(&saved).unwrap();

    let duplicate = saved.projects()[0].clone();
    let broken = Portfolio::new(1, vec![saved.projects()[0].clone(), duplicate]);
    assert!(store.save(&broken).is_err());

    let loaded = store.load().unwrap();
    assert_eq!(loaded.revision(), 1);
    assert_eq!(loaded.projects(), saved.projects());
}

#[test]
fn backup_of_live_store_restores() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("gatetrack.db");
    let checklist = MasterChecklist::builtin().unwrap();

    let mut store = SqliteStore::open(&db).unwrap();
    let saved = store
        .load()
        .unwrap()
        .create_project(new_project("Falcon"), &checklist)
        .unwrap();
    store.save(&saved).unwrap();

    let backup = backup_database(&db, &dir.path().join("backups"), 3)
        .unwrap()
        .unwrap();
    let restored = SqliteStore::open(&backup).unwrap().load().unwrap();
    assert_eq!(restored.projects(), saved.projects());
}
