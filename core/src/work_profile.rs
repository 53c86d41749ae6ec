//! Weekly work profiles and month-by-month peak collision analysis.
//!
//! A profile is a list of weekly percentages covering an initiative's date
//! range, one entry per week from its start. Initiatives without a stored
//! profile get the default bell curve.

use crate::{
    calendar::month_starts,
    model::{Initiative, PlannerState},
    types::{EntityId, Percent},
};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkProfilePreset {
    BellCurve,
    RampUp,
    RampDown,
    Flat50,
    Flat100,
    FrontHeavy,
}

impl WorkProfilePreset {
    pub const ALL: [WorkProfilePreset; 6] = [
        Self::BellCurve,
        Self::RampUp,
        Self::RampDown,
        Self::Flat50,
        Self::Flat100,
        Self::FrontHeavy,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::BellCurve  => "Bell curve",
            Self::RampUp     => "Ramp up",
            Self::RampDown   => "Ramp down",
            Self::Flat50     => "Flat 50%",
            Self::Flat100    => "Flat 100%",
            Self::FrontHeavy => "Front-heavy",
        }
    }

    /// Percent for week `week` of `weeks`, clamped to 0..=100.
    pub fn value(self, week: usize, weeks: usize) -> Percent {
        let span = if weeks > 1 { (weeks - 1) as f64 } else { 1.0 };
        let t = week as f64 / span;
        let raw = match self {
            Self::BellCurve  => bell(week, weeks),
            Self::RampUp     => (t * 100.0).round(),
            Self::RampDown   => ((1.0 - t) * 100.0).round(),
            Self::Flat50     => 50.0,
            Self::Flat100    => 100.0,
            Self::FrontHeavy => (100.0 - t.powf(1.5) * 95.0).max(5.0).round(),
        };
        raw.clamp(0.0, 100.0)
    }

    pub fn apply(self, weeks: usize) -> Vec<Percent> {
        (0..weeks).map(|w| self.value(w, weeks)).collect()
    }
}

/// Ramp to 30% over the first fifth, climb to 90% by 55%, taper to zero.
fn bell(week: usize, weeks: usize) -> Percent {
    let t = if weeks > 1 { week as f64 / (weeks - 1) as f64 } else { 0.5 };
    let pct = if t < 0.2 {
        t / 0.2 * 30.0
    } else if t < 0.55 {
        30.0 + (t - 0.2) / 0.35 * 60.0
    } else {
        90.0 - (t - 0.55) / 0.45 * 90.0
    };
    pct.round()
}

/// The profile assumed when none is stored: bell curve floored at 5%.
pub fn default_profile(weeks: usize) -> Vec<Percent> {
    (0..weeks).map(|w| bell(w, weeks).clamp(5.0, 100.0)).collect()
}

/// Weeks covered by the initiative's date range (at least one), or 0
/// when it has no range.
pub fn weeks_for(state: &PlannerState, initiative: &Initiative) -> usize {
    let Some(range) = state.date_range(initiative) else {
        return 0;
    };
    let days = (range.end - range.start).num_days().max(0);
    ((days + 6) / 7).max(1) as usize
}

pub fn profile_for(state: &PlannerState, initiative: &Initiative) -> Vec<Percent> {
    match state.work_profiles.get(&initiative.id) {
        Some(stored) if !stored.is_empty() => stored.clone(),
        _ => default_profile(weeks_for(state, initiative)),
    }
}

/// Profile percent for the week containing `date`; 0 outside the range.
/// Dates past the last stored week reuse the last week.
pub fn profile_percent_on(state: &PlannerState, initiative: &Initiative, date: NaiveDate) -> Percent {
    let Some(range) = state.date_range(initiative) else {
        return 0.0;
    };
    if date < range.start || date > range.end {
        return 0.0;
    }
    let profile = profile_for(state, initiative);
    let Some(last) = profile.len().checked_sub(1) else {
        return 0.0;
    };
    let week = ((date - range.start).num_days() / 7) as usize;
    profile[week.min(last)]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionSeverity {
    Medium,
    High,
    Critical,
}

impl CollisionSeverity {
    pub fn from_total(total: Percent) -> Self {
        if total > 150.0 {
            Self::Critical
        } else if total > 120.0 {
            Self::High
        } else {
            Self::Medium
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakContributor {
    pub initiative_id: EntityId,
    pub name:          String,
    pub peak:          Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collision {
    /// First day of the calendar month.
    pub month:        NaiveDate,
    pub total_demand: Percent,
    pub severity:     CollisionSeverity,
    pub contributors: Vec<PeakContributor>,
}

fn peak_in_month(state: &PlannerState, initiative: &Initiative, month: NaiveDate) -> Percent {
    let mut peak: Percent = 0.0;
    let mut day = month;
    while day.month() == month.month() {
        peak = peak.max(profile_percent_on(state, initiative, day));
        day = day + Duration::days(1);
    }
    peak
}

/// Months, starting at `from`'s month, where the selected initiatives'
/// peaks pile up: summed peaks over 100, or two or more above 50.
pub fn collisions(
    state: &PlannerState,
    initiative_ids: &[EntityId],
    from: NaiveDate,
    months: usize,
) -> Vec<Collision> {
    let selected: Vec<&Initiative> = initiative_ids
        .iter()
        .filter_map(|id| state.initiative(id))
        .collect();
    if selected.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    for month in month_starts(from, months) {
        let peaks: Vec<(&Initiative, Percent)> = selected
            .iter()
            .map(|i| (*i, peak_in_month(state, i, month)))
            .filter(|(_, peak)| *peak > 0.0)
            .collect();
        let total: Percent = peaks.iter().map(|(_, p)| p).sum();
        let heavy = peaks.iter().filter(|(_, p)| *p > 50.0).count();
        if total <= 100.0 && heavy < 2 {
            continue;
        }
        log::debug!("collision in {}: {:.0}% across {} initiatives", month, total, peaks.len());
        out.push(Collision {
            month,
            total_demand: total,
            severity: CollisionSeverity::from_total(total),
            contributors: peaks
                .iter()
                .filter(|(_, p)| *p > 20.0)
                .map(|(i, p)| PeakContributor {
                    initiative_id: i.id.clone(),
                    name: i.name.clone(),
                    peak: *p,
                })
                .collect(),
        });
    }
    out
}
