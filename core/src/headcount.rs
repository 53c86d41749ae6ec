//! Headcount aggregation — how many people a squad actually has.
//!
//! RULES:
//!   - Only active, non-vacant people count.
//!   - A split member counts 0.5 in each of their two squads.
//!   - Delivery headcount (the capacity denominator) is Dev + QE only.
//!   - The windowed variant drops contractors and consultants whose
//!     contract has ended before the window starts. The person record
//!     is never touched.

use crate::{
    discipline::{classify, DisciplineCounts},
    model::{Person, PlannerState},
    types::Headcount,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Live roster headcount for a squad, with no fallback.
pub fn squad_headcount(state: &PlannerState, squad_id: &str) -> Headcount {
    state
        .people
        .iter()
        .filter(|p| p.counts_toward_headcount())
        .map(|p| p.squad_weight(squad_id))
        .fold(0.0, |acc, w| acc + w)
}

/// Roster headcount, or the squad's nominal `size` while nobody has been
/// registered against it yet.
pub fn effective_headcount(state: &PlannerState, squad_id: &str) -> Headcount {
    let from_people = squad_headcount(state, squad_id);
    if from_people > 0.0 {
        return from_people;
    }
    state.squad(squad_id).map(|s| s.size).unwrap_or(0.0)
}

/// Dev + QE headcount available in a window starting on `window_start`.
pub fn delivery_headcount(state: &PlannerState, squad_id: &str, window_start: NaiveDate) -> Headcount {
    state
        .people
        .iter()
        .filter(|p| p.counts_toward_headcount())
        .filter(|p| classify(&p.role).is_delivery_capacity())
        .filter(|p| !rolled_off(p, window_start))
        .map(|p| p.squad_weight(squad_id))
        .fold(0.0, |acc, w| acc + w)
}

/// Contractors and consultants whose end date precedes the window.
fn rolled_off(person: &Person, window_start: NaiveDate) -> bool {
    !person.employment.is_permanent() && person.ends_before(window_start)
}

pub fn discipline_counts(state: &PlannerState, squad_id: &str) -> DisciplineCounts {
    let mut counts = DisciplineCounts::default();
    for person in state.people.iter().filter(|p| p.counts_toward_headcount()) {
        let weight = person.squad_weight(squad_id);
        if weight > 0.0 {
            counts.add(classify(&person.role), weight);
        }
    }
    counts
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacancySummary {
    pub total:    u32,
    pub approved: u32,
    pub pending:  u32,
}

/// Open requisitions on a squad (primary or secondary).
pub fn squad_vacancies(state: &PlannerState, squad_id: &str) -> VacancySummary {
    let mut summary = VacancySummary::default();
    for person in &state.people {
        if !person.is_vacant || !person.belongs_to(squad_id) {
            continue;
        }
        if person.status != crate::model::PersonStatus::Active {
            continue;
        }
        summary.total += 1;
        if person.vacancy_approved() {
            summary.approved += 1;
        } else {
            summary.pending += 1;
        }
    }
    summary
}

/// Number of person records (of any status) whose primary or secondary
/// squad is `squad_id`. Used to guard squad deletion.
pub fn attached_people(state: &PlannerState, squad_id: &str) -> usize {
    state.people.iter().filter(|p| p.belongs_to(squad_id)).count()
}
