//! Plan events — the record of every mutation to the planner state.
//!
//! RULE: every successful repository mutation returns at least one event.
//! The engine appends each to the change log before persisting the state.

use crate::{
    model::PipelineStatus,
    types::{EntityId, Percent, SquadId, TribeId},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanEvent {
    // ── Tribes ─────────────────────────────────────
    TribeCreated {
        tribe_id: TribeId,
        name:     String,
    },
    TribeRenamed {
        tribe_id: TribeId,
        name:     String,
    },

    // ── Squads ─────────────────────────────────────
    SquadCreated {
        squad_id: SquadId,
        name:     String,
        tribe:    TribeId,
    },
    SquadRenamed {
        squad_id: SquadId,
        name:     String,
    },
    SquadDeleted {
        squad_id: SquadId,
        /// Initiatives whose legacy percentages referenced the squad.
        cascaded: Vec<EntityId>,
    },

    // ── People ─────────────────────────────────────
    PersonAdded {
        person_id: EntityId,
        squad:     Option<SquadId>,
    },
    PersonUpdated {
        person_id: EntityId,
    },
    PersonRemoved {
        person_id: EntityId,
    },

    // ── Initiatives ────────────────────────────────
    InitiativeAdded {
        initiative_id: EntityId,
        name:          String,
    },
    PipelineStatusChanged {
        initiative_id: EntityId,
        from:          PipelineStatus,
        to:            PipelineStatus,
    },
    AllocationSet {
        initiative_id: EntityId,
        squad_id:      SquadId,
        percent:       Percent,
    },
    AllocationRemoved {
        initiative_id: EntityId,
        squad_id:      SquadId,
    },
    InitiativeDatesSet {
        initiative_id: EntityId,
        start:         Option<NaiveDate>,
        end:           Option<NaiveDate>,
    },
    WorkProfileSet {
        initiative_id: EntityId,
        weeks:         usize,
    },

    // ── Estimates and assignments ──────────────────
    EstimateAdded {
        initiative_id: EntityId,
        estimate_id:   EntityId,
    },
    EstimateRemoved {
        initiative_id: EntityId,
        estimate_id:   EntityId,
        /// Assignments whose link to the estimate was cleared.
        unlinked:      Vec<EntityId>,
    },
    AssignmentAdded {
        initiative_id: EntityId,
        assignment_id: EntityId,
    },
    AssignmentRemoved {
        initiative_id: EntityId,
        assignment_id: EntityId,
    },
    AssignmentLinked {
        initiative_id: EntityId,
        assignment_id: EntityId,
        estimate_id:   EntityId,
    },
    AssignmentUnlinked {
        initiative_id: EntityId,
        assignment_id: EntityId,
    },

    // ── Whole state ────────────────────────────────
    StateReplaced {
        squads:      usize,
        people:      usize,
        initiatives: usize,
    },
}

impl PlanEvent {
    /// Stable name for the change log's `event_type` column.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::TribeCreated { .. }          => "tribe_created",
            Self::TribeRenamed { .. }          => "tribe_renamed",
            Self::SquadCreated { .. }          => "squad_created",
            Self::SquadRenamed { .. }          => "squad_renamed",
            Self::SquadDeleted { .. }          => "squad_deleted",
            Self::PersonAdded { .. }           => "person_added",
            Self::PersonUpdated { .. }         => "person_updated",
            Self::PersonRemoved { .. }         => "person_removed",
            Self::InitiativeAdded { .. }       => "initiative_added",
            Self::PipelineStatusChanged { .. } => "pipeline_status_changed",
            Self::AllocationSet { .. }         => "allocation_set",
            Self::AllocationRemoved { .. }     => "allocation_removed",
            Self::InitiativeDatesSet { .. }    => "initiative_dates_set",
            Self::WorkProfileSet { .. }        => "work_profile_set",
            Self::EstimateAdded { .. }         => "estimate_added",
            Self::EstimateRemoved { .. }       => "estimate_removed",
            Self::AssignmentAdded { .. }       => "assignment_added",
            Self::AssignmentRemoved { .. }     => "assignment_removed",
            Self::AssignmentLinked { .. }      => "assignment_linked",
            Self::AssignmentUnlinked { .. }    => "assignment_unlinked",
            Self::StateReplaced { .. }         => "state_replaced",
        }
    }
}

/// A change log row as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub seq:         i64,
    pub event_type:  String,
    pub payload:     String, // JSON-serialized PlanEvent
    pub recorded_at: String,
}

impl ChangeLogEntry {
    pub fn event(&self) -> serde_json::Result<PlanEvent> {
        serde_json::from_str(&self.payload)
    }
}
