//! The planner state object — tribes, squads, people, initiatives and dates.
//!
//! RULE: this IS the persisted shape. There is no separate wire format;
//! the store saves and loads `PlannerState` as one JSON blob.
//!
//! Field names are camelCase on the wire. Keys this crate does not model
//! (comments, next actions, leadership slots, ...) are carried through
//! untouched in the `extra` maps so a load/save cycle never drops data.

use crate::types::{EntityId, Percent, SquadId, TribeId};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Allocation percent assumed when an assignment does not say.
pub const FULL_TIME: Percent = 100.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerState {
    #[serde(default, deserialize_with = "null_as_default")]
    pub tribes: Vec<Tribe>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub squads: Vec<Squad>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub people: Vec<Person>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub initiatives: Vec<Initiative>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub initiative_dates: BTreeMap<EntityId, DateRangeRecord>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub work_profiles: BTreeMap<EntityId, Vec<Percent>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl PlannerState {
    pub fn squad(&self, squad_id: &str) -> Option<&Squad> {
        self.squads.iter().find(|s| s.id == squad_id)
    }

    pub fn person(&self, person_id: &str) -> Option<&Person> {
        self.people.iter().find(|p| p.id == person_id)
    }

    pub fn initiative(&self, initiative_id: &str) -> Option<&Initiative> {
        self.initiatives.iter().find(|i| i.id == initiative_id)
    }

    pub fn squads_in_tribe<'a>(&'a self, tribe_id: &'a str) -> impl Iterator<Item = &'a Squad> + 'a {
        self.squads.iter().filter(move |s| s.tribe == tribe_id)
    }

    /// Declared tribes first, then any tribe a squad references but
    /// nobody declared (named after its id).
    pub fn tribes_in_order(&self) -> Vec<Tribe> {
        let mut tribes = self.tribes.clone();
        for squad in &self.squads {
            if !tribes.iter().any(|t| t.id == squad.tribe) {
                tribes.push(Tribe {
                    id: squad.tribe.clone(),
                    name: squad.tribe.clone(),
                    color: None,
                });
            }
        }
        tribes
    }

    /// The initiative's working window: the explicit `initiativeDates`
    /// entry when both ends are set, otherwise `expectedStart` plus
    /// `expectedDuration` weeks, otherwise none.
    pub fn date_range(&self, initiative: &Initiative) -> Option<DateRange> {
        if let Some(record) = self.initiative_dates.get(&initiative.id) {
            if let (Some(start), Some(end)) = (record.start, record.end) {
                return Some(DateRange { start, end });
            }
        }
        match (initiative.expected_start, initiative.expected_duration) {
            (Some(start), Some(weeks)) if weeks > 0 => Some(DateRange {
                start,
                end: start + Duration::days(i64::from(weeks) * 7),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tribe {
    pub id: TribeId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Squad {
    pub id: SquadId,
    pub name: String,
    #[serde(default)]
    pub tribe: TribeId,
    /// Nominal size, used as headcount until people are registered.
    #[serde(default, deserialize_with = "null_as_default")]
    pub size: f64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

// ── People ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmploymentType {
    #[serde(rename = "perm", alias = "permanent")]
    Permanent,
    #[default]
    #[serde(rename = "contractor")]
    Contractor,
    #[serde(rename = "msp", alias = "consultant")]
    Consultant,
}

impl EmploymentType {
    pub fn is_permanent(self) -> bool {
        self == Self::Permanent
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Permanent  => "Permanent",
            Self::Contractor => "Contractor",
            Self::Consultant => "Consultant (MSP)",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[serde(default)]
    pub id: EntityId,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub employment: EmploymentType,
    #[serde(default)]
    pub day_rate: Option<f64>,
    #[serde(default)]
    pub agency: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: PersonStatus,
    #[serde(default, deserialize_with = "lenient_id")]
    pub squad: Option<SquadId>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub secondary_squad: Option<SquadId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_vacant: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vacancy_status: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Person {
    /// Share of this person that belongs to `squad_id`:
    /// 1.0 primary-only, 0.5 for each side of a split, 0.0 otherwise.
    pub fn squad_weight(&self, squad_id: &str) -> f64 {
        if self.squad.as_deref() == Some(squad_id) {
            if self.secondary_squad.is_some() { 0.5 } else { 1.0 }
        } else if self.secondary_squad.as_deref() == Some(squad_id) {
            0.5
        } else {
            0.0
        }
    }

    /// Active and a real person (not an open requisition).
    pub fn counts_toward_headcount(&self) -> bool {
        self.status == PersonStatus::Active && !self.is_vacant
    }

    pub fn belongs_to(&self, squad_id: &str) -> bool {
        self.squad.as_deref() == Some(squad_id) || self.secondary_squad.as_deref() == Some(squad_id)
    }

    pub fn ends_before(&self, date: NaiveDate) -> bool {
        self.end_date.is_some_and(|end| end < date)
    }

    pub fn vacancy_approved(&self) -> bool {
        self.vacancy_status.as_deref() == Some("approved")
    }
}

// ── Initiatives ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Submitted,
    Approved,
    #[default]
    InDelivery,
    Complete,
}

impl PipelineStatus {
    /// Approved or in delivery: the work is funded and counts as committed.
    pub fn is_committed(self) -> bool {
        matches!(self, Self::Approved | Self::InDelivery)
    }

    pub fn is_complete(self) -> bool {
        self == Self::Complete
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted  => "submitted",
            Self::Approved   => "approved",
            Self::InDelivery => "in_delivery",
            Self::Complete   => "complete",
        }
    }
}

pub fn tier_label(tier: u8) -> &'static str {
    match tier {
        1 => "T1 Program",
        2 => "T2 Project",
        _ => "T3 Product",
    }
}

fn default_tier() -> u8 {
    3
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Initiative {
    #[serde(default)]
    pub id: EntityId,
    pub name: String,
    #[serde(default = "default_tier")]
    pub tier: u8,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pipeline_status: PipelineStatus,
    #[serde(default)]
    pub sponsor: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub expected_start: Option<NaiveDate>,
    /// Expected duration in weeks.
    #[serde(default)]
    pub expected_duration: Option<u32>,
    /// Legacy: squad id → percent of that squad's delivery capacity.
    #[serde(default, deserialize_with = "null_as_default")]
    pub allocations: BTreeMap<SquadId, Percent>,
    /// Legacy, pre-approval twin of `allocations`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub estimated_capacity: BTreeMap<SquadId, Percent>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub estimates: Vec<Estimate>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub assignments: Vec<Assignment>,
    /// Pre-split shape; consumed by `migration::migrate_state`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_roles: Option<Vec<LegacyRole>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Initiative {
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tier: default_tier(),
            pipeline_status: PipelineStatus::default(),
            sponsor: None,
            owner: None,
            budget: None,
            expected_start: None,
            expected_duration: None,
            allocations: BTreeMap::new(),
            estimated_capacity: BTreeMap::new(),
            estimates: Vec::new(),
            assignments: Vec::new(),
            estimated_roles: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn estimate(&self, estimate_id: &str) -> Option<&Estimate> {
        self.estimates.iter().find(|e| e.id == estimate_id)
    }

    pub fn assignment(&self, assignment_id: &str) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.id == assignment_id)
    }

    /// The assignment currently filling `estimate_id`, if any.
    pub fn assignment_filling(&self, estimate_id: &str) -> Option<&Assignment> {
        self.assignments
            .iter()
            .find(|a| a.estimate_id.as_deref() == Some(estimate_id))
    }
}

/// A planning-stage role forecast not yet tied to a person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimate {
    #[serde(default)]
    pub id: EntityId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub employment: EmploymentType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub days: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub day_rate: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub budget: f64,
    #[serde(default, deserialize_with = "lenient_id")]
    pub squad: Option<SquadId>,
}

/// A person (or placeholder) bound to an initiative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    #[serde(default)]
    pub id: EntityId,
    /// The estimate this assignment fills. A filled estimate is never
    /// counted as unassigned demand.
    #[serde(default, deserialize_with = "lenient_id")]
    pub estimate_id: Option<EntityId>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub person_id: Option<EntityId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub employment: EmploymentType,
    /// Percent of ONE person's time, not of the squad.
    #[serde(default = "full_time", deserialize_with = "allocation_or_full_time")]
    pub allocation: Percent,
    #[serde(default, deserialize_with = "null_as_default")]
    pub day_rate: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub days: f64,
    #[serde(default, deserialize_with = "lenient_id")]
    pub squad: Option<SquadId>,
    /// The squad whose capacity this assignment consumes when it differs
    /// from the target squad.
    #[serde(default, deserialize_with = "lenient_id")]
    pub home_squad: Option<SquadId>,
    #[serde(default = "yes", deserialize_with = "bool_or_true")]
    pub in_budget: bool,
}

impl Assignment {
    pub fn affected_squad(&self) -> Option<&str> {
        self.home_squad.as_deref().or(self.squad.as_deref())
    }
}

/// The combined role row initiatives carried before estimates and
/// assignments were split apart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyRole {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<EntityId>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub person_id: Option<EntityId>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(rename = "type", default)]
    pub employment: Option<EmploymentType>,
    #[serde(default)]
    pub allocation: Option<Percent>,
    #[serde(default)]
    pub days: Option<f64>,
    #[serde(default)]
    pub day_rate: Option<f64>,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub squad: Option<SquadId>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub home_squad: Option<SquadId>,
    #[serde(default)]
    pub in_budget: Option<bool>,
}

// ── Dates ──────────────────────────────────────────────────────────

/// Stored start/end pair; either end may be missing while being edited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateRangeRecord {
    #[serde(default, deserialize_with = "lenient_date")]
    pub start: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub end: Option<NaiveDate>,
}

/// A closed date interval, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start <= end && self.end >= start
    }

    pub fn intersect(&self, start: NaiveDate, end: NaiveDate) -> Option<DateRange> {
        let lo = self.start.max(start);
        let hi = self.end.min(end);
        (lo <= hi).then_some(DateRange { start: lo, end: hi })
    }
}

// ── Lenient deserializers ──────────────────────────────────────────

fn full_time() -> Percent {
    FULL_TIME
}

fn yes() -> bool {
    true
}

fn null_as_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

fn allocation_or_full_time<'de, D: Deserializer<'de>>(de: D) -> Result<Percent, D::Error> {
    Ok(Option::<Percent>::deserialize(de)?.unwrap_or(FULL_TIME))
}

fn bool_or_true<'de, D: Deserializer<'de>>(de: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(de)?.unwrap_or(true))
}

/// Empty or whitespace-only ids read as absent.
fn lenient_id<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(de)?
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// `YYYY-MM-DD` (or a longer ISO timestamp starting with one). Empty,
/// null and unparseable values read as absent.
fn lenient_date<'de, D: Deserializer<'de>>(de: D) -> Result<Option<NaiveDate>, D::Error> {
    let raw = Option::<String>::deserialize(de)?;
    let Some(raw) = raw else { return Ok(None) };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let head = trimmed.get(..10).unwrap_or(trimmed);
    match NaiveDate::parse_from_str(head, "%Y-%m-%d") {
        Ok(date) => Ok(Some(date)),
        Err(_) => {
            log::warn!("ignoring unparseable date '{trimmed}'");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_member_weighs_half_in_each_squad() {
        let person: Person = serde_json::from_value(serde_json::json!({
            "id": "p1", "name": "Ada", "squad": "checkout", "secondarySquad": "payments"
        }))
        .unwrap();
        assert_eq!(person.squad_weight("checkout"), 0.5);
        assert_eq!(person.squad_weight("payments"), 0.5);
        assert_eq!(person.squad_weight("discover"), 0.0);
    }

    #[test]
    fn blank_fields_read_as_absent() {
        let person: Person = serde_json::from_value(serde_json::json!({
            "id": "p2", "name": "Bo", "squad": "", "secondarySquad": null,
            "endDate": "", "startDate": "2024-02-01T00:00:00.000Z", "type": "msp"
        }))
        .unwrap();
        assert_eq!(person.squad, None);
        assert_eq!(person.end_date, None);
        assert_eq!(person.start_date, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(person.employment, EmploymentType::Consultant);
    }

    #[test]
    fn assignment_defaults_to_full_time_and_in_budget() {
        let a: Assignment = serde_json::from_value(serde_json::json!({
            "id": "a1", "allocation": null, "squad": "checkout"
        }))
        .unwrap();
        assert_eq!(a.allocation, 100.0);
        assert!(a.in_budget);
        assert_eq!(a.affected_squad(), Some("checkout"));
    }

    #[test]
    fn unknown_keys_survive_a_round_trip() {
        let raw = serde_json::json!({
            "squads": [], "people": [], "initiatives": [],
            "tribeLeadership": { "web": ["p1"] }
        });
        let state: PlannerState = serde_json::from_value(raw).unwrap();
        let back = serde_json::to_value(&state).unwrap();
        assert_eq!(back["tribeLeadership"]["web"][0], "p1");
    }
}
