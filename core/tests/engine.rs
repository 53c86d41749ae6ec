//! Engine wiring: commands are applied, logged and persisted; reads are
//! derived from the current state.

mod common;

use capacity_core::{
    command::PlannerCommand,
    config::PlannerConfig,
    engine::PlannerEngine,
    forecast::{ForecastMode, Rag},
    model::PipelineStatus,
    store::PlannerStore,
};
use common::*;
use serde_json::json;

fn seeded() -> PlannerEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut engine = PlannerEngine::in_memory(PlannerConfig::default()).unwrap();
    let mut s = state(vec![squad("checkout", "web")], engineers("checkout", 10), vec![]);
    s.tribes.push(tribe("web"));
    engine.replace_state(s).unwrap();
    engine
}

#[test]
fn commands_are_logged_and_persisted() {
    let mut engine = seeded();
    let before = engine.store().change_count().unwrap();

    engine
        .submit_command(PlannerCommand::AddInitiative { initiative: initiative("stripe", "approved") })
        .unwrap();
    engine
        .submit_command(PlannerCommand::AddAssignment {
            initiative_id: "stripe".into(),
            assignment: assignment("a1", "checkout", 50.0, None),
        })
        .unwrap();

    assert_eq!(engine.store().change_count().unwrap(), before + 2);
    let saved = engine.store().load_state().unwrap().unwrap();
    assert_eq!(&saved, engine.state());

    let f = engine.forecast(today(), ForecastMode::Delivery);
    let cell = f.cell("checkout", 0).unwrap();
    assert!(approx(cell.used_percent, 5.0));
    assert_eq!(cell.rag, Rag::Green);
}

#[test]
fn rejected_command_is_not_logged() {
    let mut engine = seeded();
    let before = engine.store().change_count().unwrap();
    let result = engine.submit_command(PlannerCommand::DeleteSquad { squad_id: "checkout".into() });
    assert!(result.is_err());
    assert_eq!(engine.store().change_count().unwrap(), before);
    assert!(engine.repository().squad("checkout").is_some());
}

#[test]
fn drilldown_goes_through_the_engine() {
    let mut engine = seeded();
    let cmd: PlannerCommand = serde_json::from_value(json!({
        "cmd": "add_initiative",
        "initiative": { "id": "ledger", "name": "Ledger", "tier": 2, "pipelineStatus": "approved" }
    }))
    .unwrap();
    engine.submit_command(cmd).unwrap();
    engine
        .submit_command(PlannerCommand::SetAllocation {
            initiative_id: "ledger".into(),
            squad_id: "checkout".into(),
            percent: 80.0,
        })
        .unwrap();

    let detail = engine.drilldown(today(), ForecastMode::Delivery, "checkout", 0).unwrap();
    assert_eq!(detail.rag, Rag::Amber);
    assert_eq!(detail.tiers[0].label, "T2 Project");
    assert!(approx(detail.available, 2.0));
}

/// A stored legacy-shaped state is migrated and written back on open.
#[test]
fn opening_migrates_stored_state() {
    let path = std::env::temp_dir().join(format!("capacity-core-engine-{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let path = path.to_string_lossy().into_owned();

    let store = PlannerStore::open(&path).unwrap();
    store.migrate().unwrap();
    let legacy = serde_json::from_value(json!({
        "initiatives": [{
            "id": "search", "name": "Search", "pipelineStatus": "submitted",
            "estimatedRoles": [{ "role": "Engineer", "days": 20 }]
        }]
    }))
    .unwrap();
    store.save_state(&legacy).unwrap();
    drop(store);

    let mut engine = PlannerEngine::open(&path, PlannerConfig::default()).unwrap();
    assert_eq!(engine.state().initiatives[0].estimates.len(), 1);
    let stored = engine.store().load_state().unwrap().unwrap();
    assert!(stored.initiatives[0].estimated_roles.is_none());

    engine
        .submit_command(PlannerCommand::SetPipelineStatus {
            initiative_id: "search".into(),
            status: PipelineStatus::Approved,
        })
        .unwrap();
    drop(engine);

    let engine = PlannerEngine::open(&path, PlannerConfig::default()).unwrap();
    assert_eq!(engine.state().initiatives[0].pipeline_status, PipelineStatus::Approved);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn quarters_follow_the_configured_fiscal_year() {
    let config = PlannerConfig { fiscal_year_start_month: 1, ..Default::default() };
    let engine = PlannerEngine::in_memory(config).unwrap();
    let labels: Vec<String> = engine.quarters(today()).into_iter().map(|q| q.label).collect();
    assert_eq!(labels, ["Q4 FY26", "Q1 FY27", "Q2 FY27", "Q3 FY27"]);
}

/// When the change log cannot be written, neither memory nor the stored
/// state moves.
#[test]
fn failed_write_leaves_state_untouched() {
    let path = std::env::temp_dir().join(format!("capacity-core-engine-fail-{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let path = path.to_string_lossy().into_owned();

    let mut engine = PlannerEngine::open(&path, PlannerConfig::default()).unwrap();
    engine
        .replace_state(state(vec![squad("checkout", "web")], engineers("checkout", 2), vec![]))
        .unwrap();

    let raw = rusqlite::Connection::open(&path).unwrap();
    raw.execute_batch("DROP TABLE change_log;").unwrap();
    drop(raw);

    let result = engine.submit_command(PlannerCommand::RenameSquad {
        squad_id: "checkout".into(),
        name: "Payments".into(),
    });
    assert!(result.is_err(), "the change log is gone");
    assert_eq!(engine.repository().squad("checkout").unwrap().name, "checkout");
    let stored = engine.store().load_state().unwrap().unwrap();
    assert_eq!(stored.squads[0].name, "checkout");
    assert_eq!(&stored, engine.state());

    drop(engine);
    let _ = std::fs::remove_file(&path);
}
