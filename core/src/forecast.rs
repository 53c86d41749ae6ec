//! Forecast assembly — the tribe × squad × quarter capacity grid.
//!
//! For every cell: Dev+QE headcount for the quarter, the demand of every
//! non-complete initiative the mode admits, split into committed and
//! pipeline, and a RAG status on total utilisation.
//!
//! Tribe rows sum their squads' headcount and merge contributions by
//! initiative id, so an initiative spanning several squads of one tribe
//! appears once in the tribe summary.

use crate::{
    calendar::FiscalQuarter,
    config::{PlannerConfig, RagThresholds},
    demand::{contributing_roles, DemandOptions, DemandResolver},
    model::{tier_label, Initiative, PipelineStatus, PlannerState},
    types::{EntityId, Headcount, Percent, SquadId, TribeId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMode {
    /// Approved + in-delivery work, all three demand sources.
    Delivery,
    /// Submitted + approved work, estimates (and legacy) only.
    Pending,
    /// Every non-complete initiative: approved/in-delivery committed,
    /// submitted as pipeline.
    Combined,
}

impl ForecastMode {
    /// Which bucket an initiative with `status` lands in, if it is counted.
    pub fn bucket(self, status: PipelineStatus) -> Option<Commitment> {
        use PipelineStatus::*;
        match (self, status) {
            (_, Complete) => None,
            (Self::Delivery, Approved | InDelivery) => Some(Commitment::Committed),
            (Self::Delivery, Submitted) => None,
            (Self::Pending, Approved) => Some(Commitment::Committed),
            (Self::Pending, Submitted) => Some(Commitment::Pipeline),
            (Self::Pending, InDelivery) => None,
            (Self::Combined, Approved | InDelivery) => Some(Commitment::Committed),
            (Self::Combined, Submitted) => Some(Commitment::Pipeline),
        }
    }

    pub fn demand_options(self) -> DemandOptions {
        DemandOptions { include_assignments: self != Self::Pending }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "delivery" => Some(Self::Delivery),
            "pending" => Some(Self::Pending),
            "combined" => Some(Self::Combined),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Commitment {
    Committed,
    Pipeline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rag {
    Green,
    Amber,
    Red,
}

impl Rag {
    /// Strictly-greater comparisons: exactly 90 is amber, exactly 70 green.
    pub fn classify(used_percent: Percent, thresholds: &RagThresholds) -> Self {
        if used_percent > thresholds.red_above {
            Self::Red
        } else if used_percent > thresholds.amber_above {
            Self::Amber
        } else {
            Self::Green
        }
    }
}

/// `demand / headcount * 100`, defined as 0 when there is no headcount.
pub fn used_percent(demand: Headcount, delivery_headcount: Headcount) -> Percent {
    if delivery_headcount > 0.0 {
        demand / delivery_headcount * 100.0
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub initiative_id:   EntityId,
    pub initiative_name: String,
    pub tier:            u8,
    pub pipeline_status: PipelineStatus,
    pub commitment:      Commitment,
    pub headcount:       Headcount,
    pub roles:           Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastCell {
    pub quarter_index:      usize,
    pub delivery_headcount: Headcount,
    pub committed:          Headcount,
    pub pipeline:           Headcount,
    pub used_percent:       Percent,
    pub rag:                Rag,
    pub contributions:      Vec<Contribution>,
}

impl ForecastCell {
    fn new(quarter_index: usize, delivery_headcount: Headcount) -> Self {
        Self {
            quarter_index,
            delivery_headcount,
            committed: 0.0,
            pipeline: 0.0,
            used_percent: 0.0,
            rag: Rag::Green,
            contributions: Vec::new(),
        }
    }

    pub fn total_demand(&self) -> Headcount {
        self.committed + self.pipeline
    }

    pub fn available(&self) -> Headcount {
        (self.delivery_headcount - self.total_demand()).max(0.0)
    }

    /// Adds a contribution, merging with an existing entry for the same
    /// initiative.
    fn add(&mut self, contribution: Contribution) {
        match contribution.commitment {
            Commitment::Committed => self.committed += contribution.headcount,
            Commitment::Pipeline => self.pipeline += contribution.headcount,
        }
        if let Some(existing) = self
            .contributions
            .iter_mut()
            .find(|c| c.initiative_id == contribution.initiative_id)
        {
            existing.headcount += contribution.headcount;
            for role in contribution.roles {
                if !existing.roles.contains(&role) {
                    existing.roles.push(role);
                }
            }
        } else {
            self.contributions.push(contribution);
        }
    }

    fn finish(&mut self, thresholds: &RagThresholds) {
        self.used_percent = used_percent(self.total_demand(), self.delivery_headcount);
        self.rag = Rag::classify(self.used_percent, thresholds);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquadForecast {
    pub squad_id: SquadId,
    pub name:     String,
    pub cells:    Vec<ForecastCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TribeForecast {
    pub tribe_id: TribeId,
    pub name:     String,
    pub cells:    Vec<ForecastCell>,
    pub squads:   Vec<SquadForecast>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub mode:     ForecastMode,
    pub quarters: Vec<FiscalQuarter>,
    pub tribes:   Vec<TribeForecast>,
}

impl Forecast {
    pub fn squad(&self, squad_id: &str) -> Option<&SquadForecast> {
        self.tribes
            .iter()
            .flat_map(|t| t.squads.iter())
            .find(|s| s.squad_id == squad_id)
    }

    pub fn tribe(&self, tribe_id: &str) -> Option<&TribeForecast> {
        self.tribes.iter().find(|t| t.tribe_id == tribe_id)
    }

    pub fn cell(&self, squad_id: &str, quarter_index: usize) -> Option<&ForecastCell> {
        self.squad(squad_id).and_then(|s| s.cells.get(quarter_index))
    }

    /// Detail for one squad cell, contributions grouped by tier.
    pub fn drilldown(&self, squad_id: &str, quarter_index: usize) -> Option<Drilldown> {
        let squad = self.squad(squad_id)?;
        let cell = squad.cells.get(quarter_index)?;
        let quarter = self.quarters.get(quarter_index)?;

        let mut tiers: Vec<TierGroup> = Vec::new();
        for contribution in &cell.contributions {
            match tiers.iter_mut().find(|g| g.tier == contribution.tier) {
                Some(group) => {
                    group.headcount += contribution.headcount;
                    group.contributions.push(contribution.clone());
                }
                None => tiers.push(TierGroup {
                    tier: contribution.tier,
                    label: tier_label(contribution.tier).to_string(),
                    headcount: contribution.headcount,
                    contributions: vec![contribution.clone()],
                }),
            }
        }
        tiers.sort_by_key(|g| g.tier);

        Some(Drilldown {
            squad_id: squad.squad_id.clone(),
            squad_name: squad.name.clone(),
            quarter: quarter.clone(),
            delivery_headcount: cell.delivery_headcount,
            committed: cell.committed,
            pipeline: cell.pipeline,
            available: cell.available(),
            used_percent: cell.used_percent,
            rag: cell.rag,
            tiers,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierGroup {
    pub tier:          u8,
    pub label:         String,
    pub headcount:     Headcount,
    pub contributions: Vec<Contribution>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drilldown {
    pub squad_id:           SquadId,
    pub squad_name:         String,
    pub quarter:            FiscalQuarter,
    pub delivery_headcount: Headcount,
    pub committed:          Headcount,
    pub pipeline:           Headcount,
    pub available:          Headcount,
    pub used_percent:       Percent,
    pub rag:                Rag,
    pub tiers:              Vec<TierGroup>,
}

/// Builds the full grid for `quarters` (normally the next four).
pub fn build_forecast(
    state: &PlannerState,
    config: &PlannerConfig,
    quarters: &[FiscalQuarter],
    mode: ForecastMode,
) -> Forecast {
    let options = mode.demand_options();
    let mut resolver = DemandResolver::new(state, config).with_options(options);

    let active: Vec<&Initiative> = state
        .initiatives
        .iter()
        .filter(|i| mode.bucket(i.pipeline_status).is_some())
        .collect();

    let mut tribes = Vec::new();
    for tribe in state.tribes_in_order() {
        let mut tribe_cells: Vec<ForecastCell> = (0..quarters.len())
            .map(|qi| ForecastCell::new(qi, 0.0))
            .collect();
        let mut squads = Vec::new();

        for squad in state.squads_in_tribe(&tribe.id) {
            let mut cells = Vec::with_capacity(quarters.len());
            for (qi, quarter) in quarters.iter().enumerate() {
                let dhc = resolver.delivery_headcount(&squad.id, quarter);
                let mut cell = ForecastCell::new(qi, dhc);

                for initiative in &active {
                    let Some(commitment) = mode.bucket(initiative.pipeline_status) else {
                        continue;
                    };
                    let hc = resolver.demand(initiative, &squad.id, quarter);
                    if hc <= 0.0 {
                        continue;
                    }
                    cell.add(Contribution {
                        initiative_id: initiative.id.clone(),
                        initiative_name: initiative.name.clone(),
                        tier: initiative.tier,
                        pipeline_status: initiative.pipeline_status,
                        commitment,
                        headcount: hc,
                        roles: contributing_roles(initiative, &squad.id, options),
                    });
                }
                cell.finish(&config.rag);

                let tribe_cell = &mut tribe_cells[qi];
                tribe_cell.delivery_headcount += dhc;
                for contribution in &cell.contributions {
                    tribe_cell.add(contribution.clone());
                }
                cells.push(cell);
            }
            squads.push(SquadForecast {
                squad_id: squad.id.clone(),
                name: squad.name.clone(),
                cells,
            });
        }

        for cell in &mut tribe_cells {
            cell.finish(&config.rag);
        }
        log::debug!("forecast tribe {}: {} squads", tribe.id, squads.len());
        tribes.push(TribeForecast {
            tribe_id: tribe.id.clone(),
            name: tribe.name.clone(),
            cells: tribe_cells,
            squads,
        });
    }

    Forecast { mode, quarters: quarters.to_vec(), tribes }
}
