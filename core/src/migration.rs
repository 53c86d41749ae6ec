//! Brings a stored state up to the current shape.
//!
//! Pure and idempotent: running it on its own output changes nothing and
//! reports nothing. Generated ids are derived from the initiative id and
//! row position, never from the clock, and never repeat an id already
//! on the initiative.

use crate::model::{Assignment, Estimate, Initiative, LegacyRole, PlannerState, FULL_TIME};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    /// Initiatives whose `estimatedRoles` were split into estimates and assignments.
    pub roles_converted:         usize,
    pub estimates_created:       usize,
    pub assignments_created:     usize,
    pub ids_assigned:            usize,
    pub dangling_links_cleared:  usize,
    pub duplicate_links_cleared: usize,
}

impl MigrationReport {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

pub fn migrate_state(state: PlannerState) -> (PlannerState, MigrationReport) {
    let mut state = state;
    let mut report = MigrationReport::default();
    for initiative in &mut state.initiatives {
        migrate_initiative(initiative, &mut report);
    }
    if !report.is_clean() {
        log::info!("state migrated: {report:?}");
    }
    (state, report)
}

fn migrate_initiative(initiative: &mut Initiative, report: &mut MigrationReport) {
    let mut taken: HashSet<String> = initiative
        .estimates
        .iter()
        .map(|e| e.id.clone())
        .chain(initiative.assignments.iter().map(|a| a.id.clone()))
        .filter(|id| !id.trim().is_empty())
        .collect();

    if initiative.estimates.is_empty() && initiative.assignments.is_empty() {
        if let Some(roles) = initiative.estimated_roles.take() {
            split_legacy_roles(initiative, roles, &mut taken, report);
            report.roles_converted += 1;
        }
    }

    for (idx, estimate) in initiative.estimates.iter_mut().enumerate() {
        if estimate.id.trim().is_empty() {
            estimate.id = unused_id(&mut taken, "est", &initiative.id, idx);
            report.ids_assigned += 1;
        }
    }
    for (idx, assignment) in initiative.assignments.iter_mut().enumerate() {
        if assignment.id.trim().is_empty() {
            assignment.id = unused_id(&mut taken, "asg", &initiative.id, idx);
            report.ids_assigned += 1;
        }
    }

    let known: HashSet<String> = initiative.estimates.iter().map(|e| e.id.clone()).collect();
    let mut linked: HashSet<String> = HashSet::new();
    for assignment in &mut initiative.assignments {
        let Some(estimate_id) = assignment.estimate_id.clone() else {
            continue;
        };
        if !known.contains(&estimate_id) {
            log::warn!(
                "initiative {}: assignment {} links missing estimate {estimate_id}",
                initiative.id,
                assignment.id
            );
            assignment.estimate_id = None;
            report.dangling_links_cleared += 1;
        } else if !linked.insert(estimate_id) {
            assignment.estimate_id = None;
            report.duplicate_links_cleared += 1;
        }
    }
}

/// `{prefix}-{owner}-{idx}`, suffixed until no row of the initiative
/// already uses it. The result is reserved in `taken`.
fn unused_id(taken: &mut HashSet<String>, prefix: &str, owner: &str, idx: usize) -> String {
    let base = format!("{prefix}-{owner}-{idx}");
    let mut candidate = base.clone();
    let mut n = 1;
    while taken.contains(&candidate) {
        candidate = format!("{base}-{n}");
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

/// A row's own id when it is set and free, otherwise a generated one.
fn row_id(own: Option<String>, taken: &mut HashSet<String>, prefix: &str, owner: &str, idx: usize) -> String {
    match own.filter(|id| !id.trim().is_empty()) {
        Some(id) if taken.insert(id.clone()) => id,
        _ => unused_id(taken, prefix, owner, idx),
    }
}

/// Rows naming a person become assignments; the rest become estimates.
fn split_legacy_roles(
    initiative: &mut Initiative,
    roles: Vec<LegacyRole>,
    taken: &mut HashSet<String>,
    report: &mut MigrationReport,
) {
    let owner = initiative.id.clone();
    for (idx, row) in roles.into_iter().enumerate() {
        let squad = row.squad.filter(|s| !s.is_empty());
        if row.person_id.is_some() {
            initiative.assignments.push(Assignment {
                id: row_id(row.id, taken, "asg", &owner, idx),
                estimate_id: None,
                person_id: row.person_id,
                role: row.role.unwrap_or_default(),
                employment: row.employment.unwrap_or_default(),
                allocation: row.allocation.unwrap_or(FULL_TIME),
                day_rate: row.day_rate.unwrap_or(0.0),
                days: row.days.unwrap_or(0.0),
                squad,
                home_squad: row.home_squad.filter(|s| !s.is_empty()),
                in_budget: row.in_budget.unwrap_or(true),
            });
            report.assignments_created += 1;
        } else {
            initiative.estimates.push(Estimate {
                id: row_id(row.id, taken, "est", &owner, idx),
                role: row.role.unwrap_or_default(),
                employment: row.employment.unwrap_or_default(),
                days: row.days.unwrap_or(0.0),
                day_rate: row.day_rate.unwrap_or(0.0),
                budget: row.budget.unwrap_or(0.0),
                squad,
            });
            report.estimates_created += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_link_keeps_the_first_assignment() {
        let mut init = Initiative::new("i1", "Search");
        init.estimates.push(serde_json::from_value(serde_json::json!({"id": "e1", "days": 10})).unwrap());
        for id in ["a1", "a2"] {
            init.assignments
                .push(serde_json::from_value(serde_json::json!({"id": id, "estimateId": "e1"})).unwrap());
        }
        let state = PlannerState { initiatives: vec![init], ..Default::default() };
        let (state, report) = migrate_state(state);
        assert_eq!(report.duplicate_links_cleared, 1);
        assert_eq!(state.initiatives[0].assignments[0].estimate_id.as_deref(), Some("e1"));
        assert_eq!(state.initiatives[0].assignments[1].estimate_id, None);
    }
}
