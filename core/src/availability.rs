//! Assignment-based availability: how much of each person, and of each
//! squad's Dev+QE pool, is already spoken for by funded work.
//!
//! Only approved and in-delivery initiatives count here. An assignment
//! reduces its home squad when it has one, otherwise its target squad.

use crate::{
    discipline::classify,
    model::{EmploymentType, Person, PlannerState},
    types::{EntityId, Headcount, Percent, SquadId},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonAssignment {
    pub initiative_id:   EntityId,
    pub initiative_name: String,
    pub assignment_id:   EntityId,
    pub role:            String,
    pub allocation:      Percent,
    pub squad:           Option<SquadId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonAssignments {
    pub person_id:       EntityId,
    pub total_allocated: Percent,
    pub remaining:       Percent,
    pub assignments:     Vec<PersonAssignment>,
}

pub fn person_assignments(state: &PlannerState, person_id: &str) -> PersonAssignments {
    let assignments: Vec<PersonAssignment> = state
        .initiatives
        .iter()
        .filter(|i| i.pipeline_status.is_committed())
        .flat_map(|i| {
            i.assignments
                .iter()
                .filter(|a| a.person_id.as_deref() == Some(person_id))
                .map(move |a| PersonAssignment {
                    initiative_id: i.id.clone(),
                    initiative_name: i.name.clone(),
                    assignment_id: a.id.clone(),
                    role: a.role.clone(),
                    allocation: a.allocation,
                    squad: a.squad.clone(),
                })
        })
        .collect();
    let total_allocated: Percent = assignments.iter().fold(0.0, |acc, a| acc + a.allocation);
    PersonAssignments {
        person_id: person_id.to_string(),
        total_allocated,
        remaining: (100.0 - total_allocated).max(0.0),
        assignments,
    }
}

/// One Dev/QE member's standing in the squad.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberAvailability {
    pub person_id:  EntityId,
    pub name:       String,
    pub role:       String,
    pub employment: EmploymentType,
    pub weight:     f64,
    /// Percent of this person committed against this squad's capacity.
    pub allocated:  Percent,
    pub available:  Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquadAvailability {
    pub squad_id:            SquadId,
    pub delivery_headcount:  Headcount,
    pub allocated_headcount: Headcount,
    pub available_headcount: Headcount,
    pub utilisation_percent: Percent,
    pub members:             Vec<MemberAvailability>,
}

/// Allocation committed by `person` that lands on `squad_id`.
fn allocation_against(state: &PlannerState, person: &Person, squad_id: &str) -> Percent {
    state
        .initiatives
        .iter()
        .filter(|i| i.pipeline_status.is_committed())
        .flat_map(|i| i.assignments.iter())
        .filter(|a| a.person_id.as_deref() == Some(person.id.as_str()))
        .filter(|a| a.affected_squad() == Some(squad_id))
        .fold(0.0, |acc, a| acc + a.allocation)
}

pub fn squad_available_capacity(state: &PlannerState, squad_id: &str, today: NaiveDate) -> SquadAvailability {
    let members: Vec<MemberAvailability> = state
        .people
        .iter()
        .filter(|p| p.counts_toward_headcount() && p.belongs_to(squad_id))
        .filter(|p| classify(&p.role).is_delivery_capacity())
        .filter(|p| !p.ends_before(today))
        .map(|p| {
            let allocated = allocation_against(state, p, squad_id);
            MemberAvailability {
                person_id: p.id.clone(),
                name: p.name.clone(),
                role: p.role.clone(),
                employment: p.employment,
                weight: p.squad_weight(squad_id),
                allocated,
                available: (100.0 - allocated).max(0.0),
            }
        })
        .collect();

    let delivery_headcount: Headcount = members.iter().fold(0.0, |acc, m| acc + m.weight);
    let allocated_headcount: Headcount = members
        .iter()
        .fold(0.0, |acc, m| acc + m.allocated / 100.0 * m.weight);
    let utilisation_percent = if delivery_headcount > 0.0 {
        allocated_headcount / delivery_headcount * 100.0
    } else {
        0.0
    };

    SquadAvailability {
        squad_id: squad_id.to_string(),
        delivery_headcount,
        allocated_headcount,
        available_headcount: (delivery_headcount - allocated_headcount).max(0.0),
        utilisation_percent,
        members,
    }
}
