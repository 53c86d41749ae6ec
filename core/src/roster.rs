//! Contractor watch and day-rate spend projections.

use crate::{
    config::PlannerConfig,
    model::{Person, PlannerState},
    types::EntityId,
};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpiringContract {
    pub person_id:      EntityId,
    pub name:           String,
    pub role:           String,
    pub end_date:       NaiveDate,
    pub days_remaining: i64,
}

fn is_billable(person: &Person) -> bool {
    person.counts_toward_headcount() && !person.employment.is_permanent()
}

/// Contractors and consultants whose end date falls in
/// `today..=today + days`, soonest first.
pub fn contractors_expiring_within(state: &PlannerState, days: i64, today: NaiveDate) -> Vec<ExpiringContract> {
    let horizon = today + Duration::days(days);
    let mut out: Vec<ExpiringContract> = state
        .people
        .iter()
        .filter(|p| is_billable(p))
        .filter_map(|p| {
            let end = p.end_date?;
            (today <= end && end <= horizon).then(|| ExpiringContract {
                person_id: p.id.clone(),
                name: p.name.clone(),
                role: p.role.clone(),
                end_date: end,
                days_remaining: (end - today).num_days(),
            })
        })
        .collect();
    out.sort_by(|a, b| a.end_date.cmp(&b.end_date).then_with(|| a.name.cmp(&b.name)));
    out
}

/// Renewal urgency of a contract, by days until its end date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractBucket {
    Expired,
    Within14,
    Within30,
    Within90,
    /// More than 90 days out, or no end date at all.
    Healthy,
}

impl ContractBucket {
    pub fn from_days(days_remaining: Option<i64>) -> Self {
        match days_remaining {
            Some(d) if d < 0 => Self::Expired,
            Some(d) if d <= 14 => Self::Within14,
            Some(d) if d <= 30 => Self::Within30,
            Some(d) if d <= 90 => Self::Within90,
            _ => Self::Healthy,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Expired  => "Expired",
            Self::Within14 => "Next 14 days",
            Self::Within30 => "15–30 days",
            Self::Within90 => "31–90 days",
            Self::Healthy  => "90+ days",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchedContract {
    pub person_id:      EntityId,
    pub name:           String,
    pub role:           String,
    pub agency:         Option<String>,
    pub end_date:       Option<NaiveDate>,
    pub days_remaining: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractWatch {
    pub expired:    Vec<WatchedContract>,
    pub within_14:  Vec<WatchedContract>,
    pub within_30:  Vec<WatchedContract>,
    pub within_90:  Vec<WatchedContract>,
    pub healthy:    Vec<WatchedContract>,
}

impl ContractWatch {
    pub fn bucket(&self, bucket: ContractBucket) -> &[WatchedContract] {
        match bucket {
            ContractBucket::Expired  => &self.expired,
            ContractBucket::Within14 => &self.within_14,
            ContractBucket::Within30 => &self.within_30,
            ContractBucket::Within90 => &self.within_90,
            ContractBucket::Healthy  => &self.healthy,
        }
    }

    fn bucket_mut(&mut self, bucket: ContractBucket) -> &mut Vec<WatchedContract> {
        match bucket {
            ContractBucket::Expired  => &mut self.expired,
            ContractBucket::Within14 => &mut self.within_14,
            ContractBucket::Within30 => &mut self.within_30,
            ContractBucket::Within90 => &mut self.within_90,
            ContractBucket::Healthy  => &mut self.healthy,
        }
    }
}

/// Every active contractor and consultant, bucketed by how soon their
/// contract ends. Each bucket is soonest first; undated contracts last.
pub fn contract_watch(state: &PlannerState, today: NaiveDate) -> ContractWatch {
    let mut watch = ContractWatch::default();
    for person in state.people.iter().filter(|p| is_billable(p)) {
        let days_remaining = person.end_date.map(|end| (end - today).num_days());
        watch.bucket_mut(ContractBucket::from_days(days_remaining)).push(WatchedContract {
            person_id: person.id.clone(),
            name: person.name.clone(),
            role: person.role.clone(),
            agency: person.agency.clone(),
            end_date: person.end_date,
            days_remaining,
        });
    }
    for list in [
        &mut watch.expired,
        &mut watch.within_14,
        &mut watch.within_30,
        &mut watch.within_90,
        &mut watch.healthy,
    ] {
        list.sort_by(|a, b| {
            let key = |c: &WatchedContract| (c.end_date.is_none(), c.end_date);
            key(a).cmp(&key(b)).then_with(|| a.name.cmp(&b.name))
        });
    }
    log::debug!(
        "contract watch: {} expired, {} within 14 days",
        watch.expired.len(),
        watch.within_14.len()
    );
    watch
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpendLine {
    pub people: u32,
    pub daily:  f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpendSummary {
    pub people:   u32,
    pub daily:    f64,
    pub monthly:  f64,
    pub annual:   f64,
    pub by_role:   BTreeMap<String, SpendLine>,
    pub by_tribe:  BTreeMap<String, SpendLine>,
    pub by_agency: BTreeMap<String, SpendLine>,
}

fn bump(map: &mut BTreeMap<String, SpendLine>, key: String, rate: f64) {
    let line = map.entry(key).or_default();
    line.people += 1;
    line.daily += rate;
}

/// Spend of active contractors and consultants with a day rate. People
/// with no squad, or whose squad's tribe is unknown, group under
/// "Unassigned"; no agency groups under "Direct".
pub fn spend_summary(state: &PlannerState, config: &PlannerConfig) -> SpendSummary {
    let mut summary = SpendSummary::default();
    for person in state.people.iter().filter(|p| is_billable(p)) {
        let Some(rate) = person.day_rate.filter(|r| *r > 0.0) else {
            continue;
        };
        summary.people += 1;
        summary.daily += rate;

        let role = if person.role.trim().is_empty() { "Unknown".to_string() } else { person.role.clone() };
        let tribe = person
            .squad
            .as_deref()
            .and_then(|s| state.squad(s))
            .filter(|s| !s.tribe.is_empty())
            .map(|s| s.tribe.clone())
            .unwrap_or_else(|| "Unassigned".to_string());
        let agency = person
            .agency
            .clone()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| "Direct".to_string());

        bump(&mut summary.by_role, role, rate);
        bump(&mut summary.by_tribe, tribe, rate);
        bump(&mut summary.by_agency, agency, rate);
    }
    summary.monthly = summary.daily * config.working_days_per_month;
    summary.annual = summary.daily * config.working_days_per_year;
    summary
}
