//! State repository: validation, cascades, link exclusivity and events.

mod common;

use capacity_core::{
    command::PlannerCommand,
    error::PlannerError,
    event::PlanEvent,
    model::PipelineStatus,
    repository::StateRepository,
};
use common::*;
use serde_json::json;

fn repo() -> StateRepository {
    let mut init = initiative("search", "approved");
    init.allocations.insert("checkout".into(), 30.0);
    init.estimates.push(estimate("e1", "checkout", 20.0));
    init.estimates.push(estimate("e2", "checkout", 10.0));
    init.assignments.push(assignment("a1", "checkout", 50.0, Some("e1")));
    init.assignments.push(assignment("a2", "checkout", 50.0, None));
    let s = state(
        vec![squad("checkout", "web"), squad("payments", "web"), squad("spare", "web")],
        vec![person("p1", "Software Engineer", "checkout")],
        vec![init],
    );
    StateRepository::new(s)
}

#[test]
fn create_squad_generates_id_and_rejects_duplicates() {
    let mut repo = repo();
    let events = repo.create_squad(None, "Growth".into(), "web".into(), Some(5.0)).unwrap();
    let PlanEvent::SquadCreated { squad_id, .. } = &events[0] else {
        panic!("unexpected event {events:?}");
    };
    assert!(squad_id.starts_with("sq_"));
    assert_eq!(repo.squad(squad_id).unwrap().size, 5.0);

    let err = repo
        .create_squad(Some("checkout".into()), "Checkout".into(), "web".into(), None)
        .unwrap_err();
    assert!(matches!(err, PlannerError::DuplicateId { kind: "squad", .. }), "got {err}");
}

#[test]
fn squad_with_people_cannot_be_deleted() {
    let mut repo = repo();
    let err = repo.delete_squad("checkout").unwrap_err();
    assert!(matches!(err, PlannerError::SquadNotEmpty { people: 1, .. }), "got {err}");
    assert!(repo.squad("checkout").is_some());
}

#[test]
fn deleting_a_squad_cascades_out_of_legacy_maps() {
    let mut repo = repo();
    repo.set_allocation("search", "spare", 15.0).unwrap();
    let events = repo.delete_squad("spare").unwrap();
    assert_eq!(
        events,
        vec![PlanEvent::SquadDeleted { squad_id: "spare".into(), cascaded: vec!["search".into()] }]
    );
    let init = repo.initiative("search").unwrap();
    assert!(!init.allocations.contains_key("spare"));
    assert_eq!(init.allocations.get("checkout"), Some(&30.0));
}

#[test]
fn moving_to_in_delivery_promotes_estimated_capacity() {
    let mut repo = repo();
    repo.add_initiative(initiative("pitch", "submitted")).unwrap();
    repo.set_allocation("pitch", "payments", 25.0).unwrap();
    assert_eq!(
        repo.initiative("pitch").unwrap().estimated_capacity.get("payments"),
        Some(&25.0),
        "submitted initiatives record into estimatedCapacity"
    );

    let events = repo.set_pipeline_status("pitch", PipelineStatus::InDelivery).unwrap();
    assert_eq!(events.len(), 2);
    let init = repo.initiative("pitch").unwrap();
    assert_eq!(init.pipeline_status, PipelineStatus::InDelivery);
    assert_eq!(init.allocations.get("payments"), Some(&25.0));
}

#[test]
fn an_estimate_can_be_filled_only_once() {
    let mut repo = repo();
    let err = repo.link_assignment("search", "a2", "e1").unwrap_err();
    match err {
        PlannerError::EstimateAlreadyLinked { estimate_id, assignment_id } => {
            assert_eq!((estimate_id.as_str(), assignment_id.as_str()), ("e1", "a1"));
        }
        other => panic!("unexpected error {other}"),
    }
    // Relinking the holder is a no-op, not an error.
    repo.link_assignment("search", "a1", "e1").unwrap();
    repo.link_assignment("search", "a2", "e2").unwrap();

    let err = repo
        .add_assignment("search", assignment("a3", "checkout", 10.0, Some("e2")))
        .unwrap_err();
    assert!(matches!(err, PlannerError::EstimateAlreadyLinked { .. }));
}

#[test]
fn removing_an_estimate_clears_links_to_it() {
    let mut repo = repo();
    let events = repo.remove_estimate("search", "e1").unwrap();
    assert_eq!(
        events,
        vec![PlanEvent::EstimateRemoved {
            initiative_id: "search".into(),
            estimate_id: "e1".into(),
            unlinked: vec!["a1".into()],
        }]
    );
    assert_eq!(repo.initiative("search").unwrap().assignment("a1").unwrap().estimate_id, None);
}

#[test]
fn failed_mutations_leave_state_untouched() {
    let mut repo = repo();
    let before = repo.state().clone();

    assert!(repo.set_allocation("search", "nowhere", 10.0).is_err());
    assert!(repo.set_allocation("search", "checkout", -5.0).is_err());
    assert!(repo.add_estimate("search", estimate("e9", "nowhere", 5.0)).is_err());
    assert!(repo.add_assignment("ghost", assignment("a9", "checkout", 10.0, None)).is_err());
    assert!(repo.set_initiative_dates("search", Some(d(2027, 1, 1)), Some(d(2026, 1, 1))).is_err());
    assert!(repo.set_work_profile("search", vec![50.0, 120.0]).is_err());
    assert!(repo.remove_person("ghost").is_err());
    let mut twin = person("p2", "Software Engineer", "checkout");
    twin.secondary_squad = Some("checkout".into());
    assert!(repo.add_person(twin).is_err());

    assert_eq!(repo.state(), &before);
}

#[test]
fn assignments_must_name_a_known_person() {
    let mut repo = repo();
    let mut a = assignment("a9", "checkout", 40.0, None);
    a.person_id = Some("ghost".into());
    let err = repo.add_assignment("search", a).unwrap_err();
    assert!(matches!(err, PlannerError::PersonNotFound { .. }));

    let mut a = assignment("", "checkout", 40.0, None);
    a.person_id = Some("p1".into());
    let events = repo.add_assignment("search", a).unwrap();
    let PlanEvent::AssignmentAdded { assignment_id, .. } = &events[0] else {
        panic!("unexpected event {events:?}");
    };
    assert!(assignment_id.starts_with("asg-"));
}

#[test]
fn dates_and_profiles_can_be_cleared() {
    let mut repo = repo();
    repo.set_initiative_dates("search", Some(d(2026, 10, 1)), Some(d(2027, 3, 31))).unwrap();
    assert!(repo.state().date_range(repo.initiative("search").unwrap()).is_some());
    repo.set_initiative_dates("search", None, None).unwrap();
    assert!(repo.state().initiative_dates.is_empty());

    repo.set_work_profile("search", vec![10.0, 50.0]).unwrap();
    assert_eq!(repo.state().work_profiles["search"], vec![10.0, 50.0]);
    repo.set_work_profile("search", vec![]).unwrap();
    assert!(repo.state().work_profiles.is_empty());
}

/// Commands arrive as JSON tagged by `cmd`.
#[test]
fn commands_apply_from_json() {
    let mut repo = repo();
    let cmd: PlannerCommand = serde_json::from_value(json!({
        "cmd": "add_person",
        "person": { "name": "Ada", "role": "QE/Automation", "type": "contractor", "squad": "payments" }
    }))
    .unwrap();
    let events = repo.apply(cmd).unwrap();
    let PlanEvent::PersonAdded { person_id, squad } = &events[0] else {
        panic!("unexpected event {events:?}");
    };
    assert!(person_id.starts_with("p_"));
    assert_eq!(squad.as_deref(), Some("payments"));

    let cmd: PlannerCommand = serde_json::from_value(json!({
        "cmd": "set_pipeline_status", "initiative_id": "search", "status": "complete"
    }))
    .unwrap();
    repo.apply(cmd).unwrap();
    assert!(repo.initiative("search").unwrap().pipeline_status.is_complete());

    let cmd: PlannerCommand = serde_json::from_value(json!({
        "cmd": "rename_squad", "squad_id": "missing", "name": "X"
    }))
    .unwrap();
    assert!(matches!(repo.apply(cmd), Err(PlannerError::SquadNotFound { .. })));
}

#[test]
fn update_person_replaces_the_record() {
    let mut repo = repo();
    let mut moved = person("p1", "Software Engineer", "payments");
    moved.secondary_squad = Some("checkout".into());
    repo.update_person(moved).unwrap();
    let p = repo.person("p1").unwrap();
    assert_eq!(p.squad.as_deref(), Some("payments"));
    assert_eq!(p.squad_weight("checkout"), 0.5);

    let err = repo.update_person(person("nobody", "Dev", "checkout")).unwrap_err();
    assert!(matches!(err, PlannerError::PersonNotFound { .. }));
}

/// A tribe known only through its squads gets a display name on rename;
/// the forecast then shows that name instead of the raw id.
#[test]
fn renaming_an_implied_tribe_declares_it() {
    let mut repo = repo();
    assert!(repo.state().tribes.is_empty());
    assert_eq!(repo.tribes()[0].name, "web", "undeclared tribes fall back to the id");

    let cmd: PlannerCommand =
        serde_json::from_value(json!({ "cmd": "rename_tribe", "tribe_id": "web", "name": "Web" })).unwrap();
    let events = repo.apply(cmd).unwrap();
    assert_eq!(events, [PlanEvent::TribeRenamed { tribe_id: "web".into(), name: "Web".into() }]);
    assert_eq!(repo.state().tribes.len(), 1);
    assert_eq!(repo.tribes()[0].name, "Web");

    repo.rename_tribe("web", "Web & Mobile".into()).unwrap();
    assert_eq!(repo.state().tribes.len(), 1, "second rename updates in place");
    assert_eq!(repo.tribes()[0].name, "Web & Mobile");

    let forecast = capacity_core::forecast::build_forecast(
        repo.state(),
        &capacity_core::config::PlannerConfig::default(),
        &quarters(),
        capacity_core::forecast::ForecastMode::Delivery,
    );
    assert_eq!(forecast.tribe("web").unwrap().name, "Web & Mobile");

    let err = repo.rename_tribe("nowhere", "Nowhere".into()).unwrap_err();
    assert!(matches!(err, PlannerError::TribeNotFound { .. }), "got {err:?}");
}

#[test]
fn create_tribe_rejects_second_declaration() {
    let mut repo = repo();
    let events = repo
        .apply(PlannerCommand::CreateTribe { tribe_id: Some("web".into()), name: "Web".into(), color: None })
        .unwrap();
    assert_eq!(events, [PlanEvent::TribeCreated { tribe_id: "web".into(), name: "Web".into() }]);

    let err = repo.create_tribe(Some("web".into()), "Again".into(), None).unwrap_err();
    assert!(matches!(err, PlannerError::DuplicateId { kind: "tribe", .. }), "got {err:?}");

    let events = repo.create_tribe(None, "Platform".into(), Some("#336699".into())).unwrap();
    let PlanEvent::TribeCreated { tribe_id, .. } = &events[0] else {
        panic!("unexpected event {events:?}");
    };
    assert!(tribe_id.starts_with("tr_"));
    assert!(repo.create_tribe(None, "  ".into(), None).is_err());
}
