//! The state repository — the single owner of the planner state.
//!
//! RULES:
//!   - Every mutation goes through a method here and returns the events
//!     it produced. Nothing else holds a `&mut PlannerState`.
//!   - A failed mutation leaves the state untouched: all validation
//!     happens before the first write.
//!   - At most one assignment links any estimate.

use crate::{
    command::PlannerCommand,
    error::{PlannerError, PlannerResult},
    event::PlanEvent,
    headcount::attached_people,
    migration::migrate_state,
    model::{
        Assignment, DateRangeRecord, Estimate, Initiative, Person, PipelineStatus, PlannerState,
        Squad, Tribe,
    },
    types::Percent,
};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use uuid::Uuid;

fn new_id(prefix: &str) -> String {
    format!("{prefix}{}", Uuid::new_v4())
}

fn check_percent(what: &str, value: Percent) -> PlannerResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(PlannerError::InvalidInput(format!("{what} must be a non-negative number, got {value}")));
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct StateRepository {
    state: PlannerState,
}

impl StateRepository {
    /// Wraps `state`, migrating it to the current shape first.
    pub fn new(state: PlannerState) -> Self {
        let (state, _) = migrate_state(state);
        Self { state }
    }

    pub fn state(&self) -> &PlannerState {
        &self.state
    }

    pub fn into_state(self) -> PlannerState {
        self.state
    }

    pub fn tribes(&self) -> Vec<Tribe> {
        self.state.tribes_in_order()
    }

    pub fn squads(&self) -> &[Squad] {
        &self.state.squads
    }

    pub fn squad(&self, squad_id: &str) -> Option<&Squad> {
        self.state.squad(squad_id)
    }

    pub fn people(&self) -> &[Person] {
        &self.state.people
    }

    pub fn person(&self, person_id: &str) -> Option<&Person> {
        self.state.person(person_id)
    }

    pub fn initiatives(&self) -> &[Initiative] {
        &self.state.initiatives
    }

    pub fn initiative(&self, initiative_id: &str) -> Option<&Initiative> {
        self.state.initiative(initiative_id)
    }

    /// Swaps in a whole new state (an import or a reload).
    pub fn replace(&mut self, state: PlannerState) -> Vec<PlanEvent> {
        let (state, report) = migrate_state(state);
        if !report.is_clean() {
            log::warn!("replacement state needed migration: {report:?}");
        }
        self.state = state;
        vec![PlanEvent::StateReplaced {
            squads: self.state.squads.len(),
            people: self.state.people.len(),
            initiatives: self.state.initiatives.len(),
        }]
    }

    pub fn apply(&mut self, command: PlannerCommand) -> PlannerResult<Vec<PlanEvent>> {
        use PlannerCommand::*;
        match command {
            CreateTribe { tribe_id, name, color } => self.create_tribe(tribe_id, name, color),
            RenameTribe { tribe_id, name } => self.rename_tribe(&tribe_id, name),
            CreateSquad { squad_id, name, tribe, size } => self.create_squad(squad_id, name, tribe, size),
            RenameSquad { squad_id, name } => self.rename_squad(&squad_id, name),
            DeleteSquad { squad_id } => self.delete_squad(&squad_id),
            AddPerson { person } => self.add_person(person),
            UpdatePerson { person } => self.update_person(person),
            RemovePerson { person_id } => self.remove_person(&person_id),
            AddInitiative { initiative } => self.add_initiative(initiative),
            SetPipelineStatus { initiative_id, status } => self.set_pipeline_status(&initiative_id, status),
            SetAllocation { initiative_id, squad_id, percent } => {
                self.set_allocation(&initiative_id, &squad_id, percent)
            }
            RemoveAllocation { initiative_id, squad_id } => self.remove_allocation(&initiative_id, &squad_id),
            SetInitiativeDates { initiative_id, start, end } => {
                self.set_initiative_dates(&initiative_id, start, end)
            }
            SetWorkProfile { initiative_id, profile } => self.set_work_profile(&initiative_id, profile),
            AddEstimate { initiative_id, estimate } => self.add_estimate(&initiative_id, estimate),
            RemoveEstimate { initiative_id, estimate_id } => self.remove_estimate(&initiative_id, &estimate_id),
            AddAssignment { initiative_id, assignment } => self.add_assignment(&initiative_id, assignment),
            RemoveAssignment { initiative_id, assignment_id } => {
                self.remove_assignment(&initiative_id, &assignment_id)
            }
            LinkAssignment { initiative_id, assignment_id, estimate_id } => {
                self.link_assignment(&initiative_id, &assignment_id, &estimate_id)
            }
            UnlinkAssignment { initiative_id, assignment_id } => {
                self.unlink_assignment(&initiative_id, &assignment_id)
            }
        }
    }

    // ── Lookups ────────────────────────────────────────────────

    fn require_squad(&self, squad_id: &str) -> PlannerResult<()> {
        match self.state.squad(squad_id) {
            Some(_) => Ok(()),
            None => Err(PlannerError::SquadNotFound { squad_id: squad_id.to_string() }),
        }
    }

    fn require_optional_squad(&self, squad_id: Option<&str>) -> PlannerResult<()> {
        squad_id.map_or(Ok(()), |id| self.require_squad(id))
    }

    fn initiative_ref(&self, initiative_id: &str) -> PlannerResult<&Initiative> {
        self.state
            .initiative(initiative_id)
            .ok_or_else(|| PlannerError::InitiativeNotFound { initiative_id: initiative_id.to_string() })
    }

    fn initiative_mut(&mut self, initiative_id: &str) -> PlannerResult<&mut Initiative> {
        self.state
            .initiatives
            .iter_mut()
            .find(|i| i.id == initiative_id)
            .ok_or_else(|| PlannerError::InitiativeNotFound { initiative_id: initiative_id.to_string() })
    }

    // ── Tribes ─────────────────────────────────────────────────

    /// Declares a tribe. Squads may already reference the id; only a
    /// second declaration is a duplicate.
    pub fn create_tribe(
        &mut self,
        tribe_id: Option<String>,
        name: String,
        color: Option<String>,
    ) -> PlannerResult<Vec<PlanEvent>> {
        if name.trim().is_empty() {
            return Err(PlannerError::InvalidInput("tribe name must not be empty".into()));
        }
        let id = tribe_id.filter(|s| !s.trim().is_empty()).unwrap_or_else(|| new_id("tr_"));
        if self.state.tribes.iter().any(|t| t.id == id) {
            return Err(PlannerError::DuplicateId { kind: "tribe", id });
        }
        log::info!("creating tribe {id} ({name})");
        self.state.tribes.push(Tribe { id: id.clone(), name: name.clone(), color });
        Ok(vec![PlanEvent::TribeCreated { tribe_id: id, name }])
    }

    /// Renames a declared tribe, or declares one that squads only
    /// reference by id.
    pub fn rename_tribe(&mut self, tribe_id: &str, name: String) -> PlannerResult<Vec<PlanEvent>> {
        if name.trim().is_empty() {
            return Err(PlannerError::InvalidInput("tribe name must not be empty".into()));
        }
        if let Some(tribe) = self.state.tribes.iter_mut().find(|t| t.id == tribe_id) {
            tribe.name = name.clone();
        } else if self.state.squads.iter().any(|s| s.tribe == tribe_id) {
            self.state.tribes.push(Tribe { id: tribe_id.to_string(), name: name.clone(), color: None });
        } else {
            return Err(PlannerError::TribeNotFound { tribe_id: tribe_id.to_string() });
        }
        Ok(vec![PlanEvent::TribeRenamed { tribe_id: tribe_id.to_string(), name }])
    }

    // ── Squads ─────────────────────────────────────────────────

    pub fn create_squad(
        &mut self,
        squad_id: Option<String>,
        name: String,
        tribe: String,
        size: Option<f64>,
    ) -> PlannerResult<Vec<PlanEvent>> {
        if name.trim().is_empty() {
            return Err(PlannerError::InvalidInput("squad name must not be empty".into()));
        }
        let size = size.unwrap_or(0.0);
        check_percent("squad size", size)?;
        let id = squad_id.filter(|s| !s.trim().is_empty()).unwrap_or_else(|| new_id("sq_"));
        if self.state.squad(&id).is_some() {
            return Err(PlannerError::DuplicateId { kind: "squad", id });
        }
        log::info!("creating squad {id} ({name}) in tribe {tribe}");
        self.state.squads.push(Squad {
            id: id.clone(),
            name: name.clone(),
            tribe: tribe.clone(),
            size,
            extra: BTreeMap::new(),
        });
        Ok(vec![PlanEvent::SquadCreated { squad_id: id, name, tribe }])
    }

    pub fn rename_squad(&mut self, squad_id: &str, name: String) -> PlannerResult<Vec<PlanEvent>> {
        if name.trim().is_empty() {
            return Err(PlannerError::InvalidInput("squad name must not be empty".into()));
        }
        let squad = self
            .state
            .squads
            .iter_mut()
            .find(|s| s.id == squad_id)
            .ok_or_else(|| PlannerError::SquadNotFound { squad_id: squad_id.to_string() })?;
        squad.name = name.clone();
        Ok(vec![PlanEvent::SquadRenamed { squad_id: squad_id.to_string(), name }])
    }

    /// Refuses while anyone is attached; otherwise removes the squad and
    /// drops it from every initiative's legacy percentage maps.
    pub fn delete_squad(&mut self, squad_id: &str) -> PlannerResult<Vec<PlanEvent>> {
        self.require_squad(squad_id)?;
        let people = attached_people(&self.state, squad_id);
        if people > 0 {
            return Err(PlannerError::SquadNotEmpty { squad_id: squad_id.to_string(), people });
        }

        self.state.squads.retain(|s| s.id != squad_id);
        let mut cascaded = Vec::new();
        for initiative in &mut self.state.initiatives {
            let had_allocation = initiative.allocations.remove(squad_id).is_some();
            let had_estimate = initiative.estimated_capacity.remove(squad_id).is_some();
            if had_allocation || had_estimate {
                cascaded.push(initiative.id.clone());
            }
        }
        log::info!("deleted squad {squad_id}, cascaded through {} initiatives", cascaded.len());
        Ok(vec![PlanEvent::SquadDeleted { squad_id: squad_id.to_string(), cascaded }])
    }

    // ── People ─────────────────────────────────────────────────

    fn validate_person(&self, person: &Person) -> PlannerResult<()> {
        if person.name.trim().is_empty() {
            return Err(PlannerError::InvalidInput("person name must not be empty".into()));
        }
        self.require_optional_squad(person.squad.as_deref())?;
        self.require_optional_squad(person.secondary_squad.as_deref())?;
        if person.secondary_squad.is_some() && person.secondary_squad == person.squad {
            return Err(PlannerError::InvalidInput(format!(
                "person {} has the same primary and secondary squad",
                person.id
            )));
        }
        Ok(())
    }

    pub fn add_person(&mut self, mut person: Person) -> PlannerResult<Vec<PlanEvent>> {
        if person.id.trim().is_empty() {
            person.id = new_id("p_");
        }
        if self.state.person(&person.id).is_some() {
            return Err(PlannerError::DuplicateId { kind: "person", id: person.id });
        }
        self.validate_person(&person)?;
        let event = PlanEvent::PersonAdded { person_id: person.id.clone(), squad: person.squad.clone() };
        self.state.people.push(person);
        Ok(vec![event])
    }

    /// Replaces the stored record with the same id.
    pub fn update_person(&mut self, person: Person) -> PlannerResult<Vec<PlanEvent>> {
        self.validate_person(&person)?;
        let slot = self
            .state
            .people
            .iter_mut()
            .find(|p| p.id == person.id)
            .ok_or_else(|| PlannerError::PersonNotFound { person_id: person.id.clone() })?;
        let person_id = person.id.clone();
        *slot = person;
        Ok(vec![PlanEvent::PersonUpdated { person_id }])
    }

    pub fn remove_person(&mut self, person_id: &str) -> PlannerResult<Vec<PlanEvent>> {
        let before = self.state.people.len();
        self.state.people.retain(|p| p.id != person_id);
        if self.state.people.len() == before {
            return Err(PlannerError::PersonNotFound { person_id: person_id.to_string() });
        }
        Ok(vec![PlanEvent::PersonRemoved { person_id: person_id.to_string() }])
    }

    // ── Initiatives ────────────────────────────────────────────

    pub fn add_initiative(&mut self, mut initiative: Initiative) -> PlannerResult<Vec<PlanEvent>> {
        if initiative.name.trim().is_empty() {
            return Err(PlannerError::InvalidInput("initiative name must not be empty".into()));
        }
        if initiative.id.trim().is_empty() {
            initiative.id = new_id("init_");
        }
        if self.state.initiative(&initiative.id).is_some() {
            return Err(PlannerError::DuplicateId { kind: "initiative", id: initiative.id });
        }
        let event = PlanEvent::InitiativeAdded {
            initiative_id: initiative.id.clone(),
            name: initiative.name.clone(),
        };
        // Normalise ids and links on the incoming record.
        let (mut migrated, _) = migrate_state(PlannerState { initiatives: vec![initiative], ..Default::default() });
        self.state.initiatives.append(&mut migrated.initiatives);
        Ok(vec![event])
    }

    /// Moving to in-delivery promotes the pre-approval estimate map into
    /// the committed allocation map.
    pub fn set_pipeline_status(
        &mut self,
        initiative_id: &str,
        status: PipelineStatus,
    ) -> PlannerResult<Vec<PlanEvent>> {
        let initiative = self.initiative_mut(initiative_id)?;
        let from = initiative.pipeline_status;
        initiative.pipeline_status = status;

        let mut events = vec![PlanEvent::PipelineStatusChanged {
            initiative_id: initiative_id.to_string(),
            from,
            to: status,
        }];
        if status == PipelineStatus::InDelivery {
            for (squad_id, percent) in initiative.estimated_capacity.clone() {
                initiative.allocations.insert(squad_id.clone(), percent);
                events.push(PlanEvent::AllocationSet {
                    initiative_id: initiative_id.to_string(),
                    squad_id,
                    percent,
                });
            }
        }
        log::info!("initiative {initiative_id}: {} -> {}", from.as_str(), status.as_str());
        Ok(events)
    }

    /// Writes the legacy percentage the initiative's status reads:
    /// `estimatedCapacity` while submitted, `allocations` otherwise.
    pub fn set_allocation(
        &mut self,
        initiative_id: &str,
        squad_id: &str,
        percent: Percent,
    ) -> PlannerResult<Vec<PlanEvent>> {
        check_percent("allocation", percent)?;
        self.require_squad(squad_id)?;
        let initiative = self.initiative_mut(initiative_id)?;
        let map = if initiative.pipeline_status == PipelineStatus::Submitted {
            &mut initiative.estimated_capacity
        } else {
            &mut initiative.allocations
        };
        map.insert(squad_id.to_string(), percent);
        Ok(vec![PlanEvent::AllocationSet {
            initiative_id: initiative_id.to_string(),
            squad_id: squad_id.to_string(),
            percent,
        }])
    }

    pub fn remove_allocation(&mut self, initiative_id: &str, squad_id: &str) -> PlannerResult<Vec<PlanEvent>> {
        let initiative = self.initiative_mut(initiative_id)?;
        initiative.allocations.remove(squad_id);
        initiative.estimated_capacity.remove(squad_id);
        Ok(vec![PlanEvent::AllocationRemoved {
            initiative_id: initiative_id.to_string(),
            squad_id: squad_id.to_string(),
        }])
    }

    /// Both ends absent clears the entry.
    pub fn set_initiative_dates(
        &mut self,
        initiative_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> PlannerResult<Vec<PlanEvent>> {
        self.initiative_ref(initiative_id)?;
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(PlannerError::InvalidInput(format!("start {s} is after end {e}")));
            }
        }
        if start.is_none() && end.is_none() {
            self.state.initiative_dates.remove(initiative_id);
        } else {
            self.state
                .initiative_dates
                .insert(initiative_id.to_string(), DateRangeRecord { start, end });
        }
        Ok(vec![PlanEvent::InitiativeDatesSet { initiative_id: initiative_id.to_string(), start, end }])
    }

    pub fn set_work_profile(&mut self, initiative_id: &str, profile: Vec<Percent>) -> PlannerResult<Vec<PlanEvent>> {
        self.initiative_ref(initiative_id)?;
        if let Some(bad) = profile.iter().find(|v| !(0.0..=100.0).contains(*v)) {
            return Err(PlannerError::InvalidInput(format!("work profile value {bad} outside 0..=100")));
        }
        let weeks = profile.len();
        if profile.is_empty() {
            self.state.work_profiles.remove(initiative_id);
        } else {
            self.state.work_profiles.insert(initiative_id.to_string(), profile);
        }
        Ok(vec![PlanEvent::WorkProfileSet { initiative_id: initiative_id.to_string(), weeks }])
    }

    // ── Estimates and assignments ──────────────────────────────

    pub fn add_estimate(&mut self, initiative_id: &str, mut estimate: Estimate) -> PlannerResult<Vec<PlanEvent>> {
        if !estimate.days.is_finite() || estimate.days < 0.0 {
            return Err(PlannerError::InvalidInput(format!("estimate days must be >= 0, got {}", estimate.days)));
        }
        self.require_optional_squad(estimate.squad.as_deref())?;
        if estimate.id.trim().is_empty() {
            estimate.id = new_id("est-");
        }
        let initiative = self.initiative_mut(initiative_id)?;
        if initiative.estimate(&estimate.id).is_some() {
            return Err(PlannerError::DuplicateId { kind: "estimate", id: estimate.id });
        }
        let estimate_id = estimate.id.clone();
        initiative.estimates.push(estimate);
        Ok(vec![PlanEvent::EstimateAdded { initiative_id: initiative_id.to_string(), estimate_id }])
    }

    /// Also clears any assignment link pointing at the estimate.
    pub fn remove_estimate(&mut self, initiative_id: &str, estimate_id: &str) -> PlannerResult<Vec<PlanEvent>> {
        let initiative = self.initiative_mut(initiative_id)?;
        if initiative.estimate(estimate_id).is_none() {
            return Err(PlannerError::EstimateNotFound {
                initiative_id: initiative_id.to_string(),
                estimate_id: estimate_id.to_string(),
            });
        }
        initiative.estimates.retain(|e| e.id != estimate_id);
        let mut unlinked = Vec::new();
        for assignment in &mut initiative.assignments {
            if assignment.estimate_id.as_deref() == Some(estimate_id) {
                assignment.estimate_id = None;
                unlinked.push(assignment.id.clone());
            }
        }
        Ok(vec![PlanEvent::EstimateRemoved {
            initiative_id: initiative_id.to_string(),
            estimate_id: estimate_id.to_string(),
            unlinked,
        }])
    }

    pub fn add_assignment(
        &mut self,
        initiative_id: &str,
        mut assignment: Assignment,
    ) -> PlannerResult<Vec<PlanEvent>> {
        check_percent("allocation", assignment.allocation)?;
        self.require_optional_squad(assignment.squad.as_deref())?;
        self.require_optional_squad(assignment.home_squad.as_deref())?;
        if let Some(person_id) = assignment.person_id.as_deref() {
            if self.state.person(person_id).is_none() {
                return Err(PlannerError::PersonNotFound { person_id: person_id.to_string() });
            }
        }
        if assignment.id.trim().is_empty() {
            assignment.id = new_id("asg-");
        }

        let initiative = self.initiative_ref(initiative_id)?;
        if initiative.assignment(&assignment.id).is_some() {
            return Err(PlannerError::DuplicateId { kind: "assignment", id: assignment.id });
        }
        if let Some(estimate_id) = assignment.estimate_id.as_deref() {
            ensure_linkable(initiative, estimate_id, &assignment.id)?;
        }

        let assignment_id = assignment.id.clone();
        self.initiative_mut(initiative_id)?.assignments.push(assignment);
        Ok(vec![PlanEvent::AssignmentAdded { initiative_id: initiative_id.to_string(), assignment_id }])
    }

    pub fn remove_assignment(&mut self, initiative_id: &str, assignment_id: &str) -> PlannerResult<Vec<PlanEvent>> {
        let initiative = self.initiative_mut(initiative_id)?;
        let before = initiative.assignments.len();
        initiative.assignments.retain(|a| a.id != assignment_id);
        if initiative.assignments.len() == before {
            return Err(PlannerError::AssignmentNotFound {
                initiative_id: initiative_id.to_string(),
                assignment_id: assignment_id.to_string(),
            });
        }
        Ok(vec![PlanEvent::AssignmentRemoved {
            initiative_id: initiative_id.to_string(),
            assignment_id: assignment_id.to_string(),
        }])
    }

    pub fn link_assignment(
        &mut self,
        initiative_id: &str,
        assignment_id: &str,
        estimate_id: &str,
    ) -> PlannerResult<Vec<PlanEvent>> {
        let initiative = self.initiative_ref(initiative_id)?;
        if initiative.assignment(assignment_id).is_none() {
            return Err(PlannerError::AssignmentNotFound {
                initiative_id: initiative_id.to_string(),
                assignment_id: assignment_id.to_string(),
            });
        }
        ensure_linkable(initiative, estimate_id, assignment_id)?;

        let initiative = self.initiative_mut(initiative_id)?;
        if let Some(assignment) = initiative.assignments.iter_mut().find(|a| a.id == assignment_id) {
            assignment.estimate_id = Some(estimate_id.to_string());
        }
        Ok(vec![PlanEvent::AssignmentLinked {
            initiative_id: initiative_id.to_string(),
            assignment_id: assignment_id.to_string(),
            estimate_id: estimate_id.to_string(),
        }])
    }

    pub fn unlink_assignment(&mut self, initiative_id: &str, assignment_id: &str) -> PlannerResult<Vec<PlanEvent>> {
        let initiative = self.initiative_mut(initiative_id)?;
        let assignment = initiative
            .assignments
            .iter_mut()
            .find(|a| a.id == assignment_id)
            .ok_or_else(|| PlannerError::AssignmentNotFound {
                initiative_id: initiative_id.to_string(),
                assignment_id: assignment_id.to_string(),
            })?;
        assignment.estimate_id = None;
        Ok(vec![PlanEvent::AssignmentUnlinked {
            initiative_id: initiative_id.to_string(),
            assignment_id: assignment_id.to_string(),
        }])
    }
}

/// The estimate exists and no other assignment fills it.
fn ensure_linkable(initiative: &Initiative, estimate_id: &str, assignment_id: &str) -> PlannerResult<()> {
    if initiative.estimate(estimate_id).is_none() {
        return Err(PlannerError::EstimateNotFound {
            initiative_id: initiative.id.clone(),
            estimate_id: estimate_id.to_string(),
        });
    }
    match initiative.assignment_filling(estimate_id) {
        Some(holder) if holder.id != assignment_id => Err(PlannerError::EstimateAlreadyLinked {
            estimate_id: estimate_id.to_string(),
            assignment_id: holder.id.clone(),
        }),
        _ => Ok(()),
    }
}
