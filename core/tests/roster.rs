//! Contractor watch and spend projections.

mod common;

use capacity_core::{
    config::PlannerConfig,
    roster::{contract_watch, contractors_expiring_within, spend_summary, ContractBucket},
};
use common::*;

fn billable(id: &str, role: &str, squad: &str, end: &str, rate: f64, agency: Option<&str>) -> capacity_core::model::Person {
    let mut p = contractor(id, role, squad, end);
    p.day_rate = Some(rate);
    p.agency = agency.map(str::to_string);
    p
}

#[test]
fn expiring_window_is_inclusive_and_sorted() {
    let s = state(
        vec![squad("checkout", "web")],
        vec![
            billable("late", "Software Engineer", "checkout", "2026-11-17", 800.0, None),
            billable("edge", "Software Engineer", "checkout", "2026-11-17", 800.0, None),
            billable("soon", "Software Engineer", "checkout", "2026-10-18", 800.0, None),
            billable("past", "Software Engineer", "checkout", "2026-10-17", 800.0, None),
            billable("later", "Software Engineer", "checkout", "2026-11-18", 800.0, None),
            person("perm", "Software Engineer", "checkout"),
        ],
        vec![],
    );
    let expiring = contractors_expiring_within(&s, 30, today());
    let names: Vec<_> = expiring.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["soon", "edge", "late"]);
    assert_eq!(expiring[0].days_remaining, 0);
    assert_eq!(expiring[2].days_remaining, 30);
}

#[test]
fn spend_is_projected_and_grouped() {
    let mut s = state(
        vec![squad("checkout", "web"), squad("ledger", "core")],
        vec![
            billable("c1", "Software Engineer", "checkout", "2027-06-30", 1000.0, Some("Acme")),
            billable("c2", "Quality Engineer", "ledger", "2027-06-30", 500.0, None),
            billable("c3", "Software Engineer", "", "2027-06-30", 250.0, Some("Acme")),
            person("perm", "Software Engineer", "checkout"),
        ],
        vec![],
    );
    s.people[2].squad = None;
    let mut vacancy = billable("v1", "Software Engineer", "checkout", "2027-06-30", 9000.0, None);
    vacancy.is_vacant = true;
    s.people.push(vacancy);

    let spend = spend_summary(&s, &PlannerConfig::default());
    assert_eq!(spend.people, 3);
    assert_eq!(spend.daily, 1750.0);
    assert_eq!(spend.monthly, 1750.0 * 21.0);
    assert_eq!(spend.annual, 1750.0 * 252.0);
    assert_eq!(spend.by_role["Software Engineer"].people, 2);
    assert_eq!(spend.by_tribe["web"].daily, 1000.0);
    assert_eq!(spend.by_tribe["Unassigned"].daily, 250.0);
    assert_eq!(spend.by_agency["Acme"].daily, 1250.0);
    assert_eq!(spend.by_agency["Direct"].people, 1);
}

/// Contracts fall into expired / 14 / 30 / 90 / 90+ day buckets; an
/// open-ended contract is healthy.
#[test]
fn contract_watch_buckets_by_days_remaining() {
    let mut open_ended = contractor("open", "Software Engineer", "checkout", "");
    open_ended.end_date = None;
    let s = state(
        vec![squad("checkout", "web")],
        vec![
            billable("gone", "Software Engineer", "checkout", "2026-10-17", 800.0, None),
            billable("today", "Software Engineer", "checkout", "2026-10-18", 800.0, None),
            billable("d14", "Software Engineer", "checkout", "2026-11-01", 800.0, None),
            billable("d15", "Software Engineer", "checkout", "2026-11-02", 800.0, None),
            billable("d30", "Software Engineer", "checkout", "2026-11-17", 800.0, None),
            billable("d31", "Software Engineer", "checkout", "2026-11-18", 800.0, None),
            billable("d90", "Software Engineer", "checkout", "2027-01-16", 800.0, None),
            billable("d91", "Software Engineer", "checkout", "2027-01-17", 800.0, Some("Acme")),
            open_ended,
            person("perm", "Software Engineer", "checkout"),
        ],
        vec![],
    );
    let watch = contract_watch(&s, today());
    let names = |b: ContractBucket| watch.bucket(b).iter().map(|c| c.name.clone()).collect::<Vec<_>>();
    assert_eq!(names(ContractBucket::Expired), ["gone"]);
    assert_eq!(names(ContractBucket::Within14), ["today", "d14"]);
    assert_eq!(names(ContractBucket::Within30), ["d15", "d30"]);
    assert_eq!(names(ContractBucket::Within90), ["d31", "d90"]);
    assert_eq!(names(ContractBucket::Healthy), ["d91", "open"], "undated contracts sort last");
    assert_eq!(watch.expired[0].days_remaining, Some(-1));
    assert_eq!(watch.healthy[1].days_remaining, None);
    assert_eq!(watch.healthy[0].agency.as_deref(), Some("Acme"));
    assert_eq!(ContractBucket::from_days(None), ContractBucket::Healthy);
}
