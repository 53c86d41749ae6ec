//! Fixture builders shared by the integration tests.
//!
//! Records are built from JSON so the fixtures go through the same
//! deserialisation path as a stored state.
#![allow(dead_code)]

use capacity_core::{
    calendar::{FiscalCalendar, FiscalQuarter},
    model::{Assignment, Estimate, Initiative, Person, PlannerState, Squad, Tribe},
};
use chrono::NaiveDate;
use serde_json::json;

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// 2026-10-18 — inside Q2 FY27 (Oct–Dec 2026) on a July fiscal calendar.
pub fn today() -> NaiveDate {
    d(2026, 10, 18)
}

pub fn quarters() -> Vec<FiscalQuarter> {
    FiscalCalendar::new(7).next_four_quarters(today())
}

pub fn current_quarter() -> FiscalQuarter {
    FiscalCalendar::new(7).quarter_containing(today())
}

pub fn tribe(id: &str) -> Tribe {
    serde_json::from_value(json!({ "id": id, "name": id.to_uppercase() })).unwrap()
}

pub fn squad(id: &str, tribe: &str) -> Squad {
    serde_json::from_value(json!({ "id": id, "name": id, "tribe": tribe })).unwrap()
}

pub fn person(id: &str, role: &str, squad: &str) -> Person {
    serde_json::from_value(json!({
        "id": id, "name": id, "role": role, "type": "perm", "squad": squad
    }))
    .unwrap()
}

pub fn split_person(id: &str, role: &str, primary: &str, secondary: &str) -> Person {
    serde_json::from_value(json!({
        "id": id, "name": id, "role": role, "type": "perm",
        "squad": primary, "secondarySquad": secondary
    }))
    .unwrap()
}

pub fn contractor(id: &str, role: &str, squad: &str, end_date: &str) -> Person {
    serde_json::from_value(json!({
        "id": id, "name": id, "role": role, "type": "contractor",
        "squad": squad, "endDate": end_date
    }))
    .unwrap()
}

/// `n` permanent software engineers on `squad`.
pub fn engineers(squad: &str, n: usize) -> Vec<Person> {
    (0..n)
        .map(|i| person(&format!("{squad}-dev-{i}"), "Software Engineer", squad))
        .collect()
}

pub fn initiative(id: &str, status: &str) -> Initiative {
    serde_json::from_value(json!({ "id": id, "name": id, "pipelineStatus": status })).unwrap()
}

pub fn estimate(id: &str, squad: &str, days: f64) -> Estimate {
    serde_json::from_value(json!({
        "id": id, "role": "Software Engineer", "days": days, "squad": squad
    }))
    .unwrap()
}

pub fn assignment(id: &str, squad: &str, allocation: f64, estimate_id: Option<&str>) -> Assignment {
    serde_json::from_value(json!({
        "id": id, "role": "Software Engineer", "squad": squad,
        "allocation": allocation, "estimateId": estimate_id
    }))
    .unwrap()
}

pub fn state(squads: Vec<Squad>, people: Vec<Person>, initiatives: Vec<Initiative>) -> PlannerState {
    PlannerState { squads, people, initiatives, ..Default::default() }
}

pub fn set_dates(state: &mut PlannerState, initiative_id: &str, start: &str, end: &str) {
    state.initiative_dates.insert(
        initiative_id.to_string(),
        serde_json::from_value(json!({ "start": start, "end": end })).unwrap(),
    );
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
