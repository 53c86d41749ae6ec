//! Demand aggregation — how much of a squad an initiative consumes in a
//! quarter, in headcount-equivalent units.
//!
//! An initiative can describe its demand three ways. They are reconciled
//! in strict priority order:
//!
//!   1. Assignments targeting the squad   (allocation % of one person)
//!   2. Unlinked estimates for the squad  (role days, prorated by date)
//!   3. Legacy flat percentages           (% of squad delivery headcount)
//!
//! If ANY assignment or unlinked estimate exists for the squad, the answer
//! is the sum of (1) and (2) — even when that sum is zero. Legacy
//! percentages only apply when neither richer source is present.
//!
//! An estimate linked from an assignment is "filled": the assignment
//! already accounts for it, so it never counts as unassigned demand.

use crate::{
    calendar::{working_days, FiscalQuarter},
    config::PlannerConfig,
    headcount::delivery_headcount,
    model::{Assignment, Estimate, Initiative, PipelineStatus, PlannerState},
    types::{EntityId, Headcount, Percent, SquadId},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Which sources a view takes into account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandOptions {
    /// When false, assignments are ignored entirely (and therefore no
    /// estimate counts as filled).
    pub include_assignments: bool,
}

impl Default for DemandOptions {
    fn default() -> Self {
        Self { include_assignments: true }
    }
}

/// All three candidate answers for one (initiative, squad, quarter).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DemandCandidates {
    pub assignment_count: usize,
    pub estimate_count:   usize,
    pub assignment_hc:    Headcount,
    pub estimate_hc:      Headcount,
    pub legacy_percent:   Percent,
    pub legacy_hc:        Headcount,
}

/// The outcome of the priority rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ResolvedDemand {
    /// Assignments and/or unlinked estimates exist for the squad.
    Detailed { assigned: Headcount, unassigned: Headcount },
    /// Only a legacy percentage applies.
    Legacy { percent: Percent, headcount: Headcount },
    /// No source describes this squad at all.
    Nothing,
}

impl ResolvedDemand {
    pub fn headcount(&self) -> Headcount {
        match *self {
            Self::Detailed { assigned, unassigned } => assigned + unassigned,
            Self::Legacy { headcount, .. } => headcount,
            Self::Nothing => 0.0,
        }
    }
}

impl DemandCandidates {
    /// Presence of richer sources, not their magnitude, gates the fallback.
    pub fn resolve(&self) -> ResolvedDemand {
        if self.assignment_count > 0 || self.estimate_count > 0 {
            ResolvedDemand::Detailed {
                assigned:   self.assignment_hc,
                unassigned: self.estimate_hc,
            }
        } else if self.legacy_percent != 0.0 {
            ResolvedDemand::Legacy {
                percent:   self.legacy_percent,
                headcount: self.legacy_hc,
            }
        } else {
            ResolvedDemand::Nothing
        }
    }
}

/// Ids of estimates currently filled by an assignment.
pub fn linked_estimate_ids(initiative: &Initiative) -> HashSet<&str> {
    initiative
        .assignments
        .iter()
        .filter_map(|a| a.estimate_id.as_deref())
        .collect()
}

pub fn squad_assignments<'a>(
    initiative: &'a Initiative,
    squad_id: &'a str,
) -> impl Iterator<Item = &'a Assignment> + 'a {
    initiative
        .assignments
        .iter()
        .filter(move |a| a.squad.as_deref() == Some(squad_id))
}

/// Estimates for the squad with positive days that no assignment fills.
pub fn unlinked_estimates<'a>(
    initiative: &'a Initiative,
    squad_id: &str,
    options: DemandOptions,
) -> Vec<&'a Estimate> {
    let linked = if options.include_assignments {
        linked_estimate_ids(initiative)
    } else {
        HashSet::new()
    };
    initiative
        .estimates
        .iter()
        .filter(|e| e.squad.as_deref() == Some(squad_id))
        .filter(|e| e.days > 0.0)
        .filter(|e| !linked.contains(e.id.as_str()))
        .collect()
}

/// Role names behind an initiative's demand on a squad, for drill-down.
pub fn contributing_roles(initiative: &Initiative, squad_id: &str, options: DemandOptions) -> Vec<String> {
    let name = |role: &str| {
        if role.trim().is_empty() { "Unnamed role".to_string() } else { role.to_string() }
    };
    let mut roles: Vec<String> = Vec::new();
    if options.include_assignments {
        roles.extend(squad_assignments(initiative, squad_id).map(|a| name(&a.role)));
    }
    roles.extend(unlinked_estimates(initiative, squad_id, options).iter().map(|e| name(&e.role)));
    roles
}

/// Legacy percentage that applies to `squad_id` for the initiative's
/// current pipeline status.
pub fn legacy_percent(initiative: &Initiative, squad_id: &str) -> Percent {
    let map = match initiative.pipeline_status {
        PipelineStatus::Approved | PipelineStatus::InDelivery => &initiative.allocations,
        PipelineStatus::Submitted => &initiative.estimated_capacity,
        PipelineStatus::Complete => return 0.0,
    };
    map.get(squad_id).copied().unwrap_or(0.0)
}

/// Evaluates demand over one state snapshot, caching per-initiative
/// working days and per-(squad, window) delivery headcount.
pub struct DemandResolver<'a> {
    state:   &'a PlannerState,
    config:  &'a PlannerConfig,
    options: DemandOptions,
    initiative_working_days: HashMap<EntityId, u32>,
    delivery_hc: HashMap<(SquadId, NaiveDate), Headcount>,
}

impl<'a> DemandResolver<'a> {
    pub fn new(state: &'a PlannerState, config: &'a PlannerConfig) -> Self {
        Self {
            state,
            config,
            options: DemandOptions::default(),
            initiative_working_days: HashMap::new(),
            delivery_hc: HashMap::new(),
        }
    }

    pub fn with_options(mut self, options: DemandOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> DemandOptions {
        self.options
    }

    pub fn state(&self) -> &'a PlannerState {
        self.state
    }

    /// Demand in headcount-equivalents; never negative, never NaN.
    pub fn demand(&mut self, initiative: &Initiative, squad_id: &str, quarter: &FiscalQuarter) -> Headcount {
        let hc = self.candidates(initiative, squad_id, quarter).resolve().headcount();
        if hc.is_finite() { hc.max(0.0) } else { 0.0 }
    }

    pub fn candidates(
        &mut self,
        initiative: &Initiative,
        squad_id: &str,
        quarter: &FiscalQuarter,
    ) -> DemandCandidates {
        let mut out = DemandCandidates::default();

        if self.options.include_assignments {
            let assignments: Vec<&Assignment> = squad_assignments(initiative, squad_id).collect();
            out.assignment_count = assignments.len();
            out.assignment_hc = self.assignment_demand(initiative, &assignments, quarter);
        }

        let estimates = unlinked_estimates(initiative, squad_id, self.options);
        out.estimate_count = estimates.len();
        out.estimate_hc = self.estimate_demand(initiative, &estimates, quarter);

        out.legacy_percent = legacy_percent(initiative, squad_id);
        out.legacy_hc = self.legacy_demand(initiative, squad_id, out.legacy_percent, quarter);

        log::debug!(
            "demand {} / {squad_id} / {}: asg={}x{:.2} est={}x{:.2} legacy={}%={:.2}",
            initiative.id,
            quarter.label,
            out.assignment_count,
            out.assignment_hc,
            out.estimate_count,
            out.estimate_hc,
            out.legacy_percent,
            out.legacy_hc,
        );
        out
    }

    /// Dev + QE headcount of a squad for the quarter, cached.
    pub fn delivery_headcount(&mut self, squad_id: &str, quarter: &FiscalQuarter) -> Headcount {
        let state = self.state;
        *self
            .delivery_hc
            .entry((squad_id.to_string(), quarter.start))
            .or_insert_with(|| delivery_headcount(state, squad_id, quarter.start))
    }

    fn overlaps_quarter(&self, initiative: &Initiative, quarter: &FiscalQuarter) -> bool {
        match self.state.date_range(initiative) {
            Some(range) => range.overlaps(quarter.start, quarter.end),
            None => true,
        }
    }

    /// Allocation is a fraction of one person, so it maps straight to
    /// headcount. Zero outside the initiative's dates.
    fn assignment_demand(
        &self,
        initiative: &Initiative,
        assignments: &[&Assignment],
        quarter: &FiscalQuarter,
    ) -> Headcount {
        if assignments.is_empty() || !self.overlaps_quarter(initiative, quarter) {
            return 0.0;
        }
        assignments.iter().map(|a| a.allocation / 100.0).sum()
    }

    /// Undated: days spread evenly over `no_date_range_quarters` quarters.
    /// Dated: days prorated by the share of the initiative's working days
    /// that fall in this quarter. Both normalised by the quarter's working days.
    fn estimate_demand(
        &mut self,
        initiative: &Initiative,
        estimates: &[&Estimate],
        quarter: &FiscalQuarter,
    ) -> Headcount {
        if estimates.is_empty() || quarter.working_days == 0 {
            return 0.0;
        }
        let total_days: f64 = estimates.iter().map(|e| e.days).sum();
        let quarter_wd = f64::from(quarter.working_days);

        let Some(range) = self.state.date_range(initiative) else {
            let spread = f64::from(self.config.no_date_range_quarters.max(1));
            return (total_days / spread) / quarter_wd;
        };
        let Some(overlap) = range.intersect(quarter.start, quarter.end) else {
            return 0.0;
        };
        let initiative_wd = *self
            .initiative_working_days
            .entry(initiative.id.clone())
            .or_insert_with(|| working_days(range.start, range.end));
        if initiative_wd == 0 {
            return 0.0;
        }
        let proportion = f64::from(working_days(overlap.start, overlap.end)) / f64::from(initiative_wd);
        (proportion * total_days) / quarter_wd
    }

    fn legacy_demand(
        &mut self,
        initiative: &Initiative,
        squad_id: &str,
        percent: Percent,
        quarter: &FiscalQuarter,
    ) -> Headcount {
        if percent == 0.0 || !self.overlaps_quarter(initiative, quarter) {
            return 0.0;
        }
        (percent / 100.0) * self.delivery_headcount(squad_id, quarter)
    }
}

/// One-shot demand evaluation without caching.
pub fn demand(
    state: &PlannerState,
    config: &PlannerConfig,
    initiative: &Initiative,
    squad_id: &str,
    quarter: &FiscalQuarter,
) -> Headcount {
    DemandResolver::new(state, config).demand(initiative, squad_id, quarter)
}
