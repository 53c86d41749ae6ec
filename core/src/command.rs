use crate::{
    model::{Assignment, Estimate, Initiative, Person, PipelineStatus},
    types::{EntityId, Percent, SquadId, TribeId},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Every mutation a client can request, in serialisable form.
/// Applied through `StateRepository::apply`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum PlannerCommand {
    // ── Tribes ────────────────────────────────────
    CreateTribe {
        #[serde(default)]
        tribe_id: Option<TribeId>,
        name:     String,
        #[serde(default)]
        color:    Option<String>,
    },
    RenameTribe {
        tribe_id: TribeId,
        name:     String,
    },

    // ── Squads ────────────────────────────────────
    CreateSquad {
        #[serde(default)]
        squad_id: Option<SquadId>,
        name:     String,
        tribe:    TribeId,
        #[serde(default)]
        size:     Option<f64>,
    },
    RenameSquad {
        squad_id: SquadId,
        name:     String,
    },
    DeleteSquad {
        squad_id: SquadId,
    },

    // ── People ────────────────────────────────────
    AddPerson {
        person: Person,
    },
    UpdatePerson {
        person: Person,
    },
    RemovePerson {
        person_id: EntityId,
    },

    // ── Initiatives ───────────────────────────────
    AddInitiative {
        initiative: Initiative,
    },
    SetPipelineStatus {
        initiative_id: EntityId,
        status:        PipelineStatus,
    },
    SetAllocation {
        initiative_id: EntityId,
        squad_id:      SquadId,
        percent:       Percent,
    },
    RemoveAllocation {
        initiative_id: EntityId,
        squad_id:      SquadId,
    },
    SetInitiativeDates {
        initiative_id: EntityId,
        #[serde(default)]
        start:         Option<NaiveDate>,
        #[serde(default)]
        end:           Option<NaiveDate>,
    },
    SetWorkProfile {
        initiative_id: EntityId,
        /// Weekly percentages; empty clears the stored profile.
        profile:       Vec<Percent>,
    },

    // ── Estimates and assignments ─────────────────
    AddEstimate {
        initiative_id: EntityId,
        estimate:      Estimate,
    },
    RemoveEstimate {
        initiative_id: EntityId,
        estimate_id:   EntityId,
    },
    AddAssignment {
        initiative_id: EntityId,
        assignment:    Assignment,
    },
    RemoveAssignment {
        initiative_id: EntityId,
        assignment_id: EntityId,
    },
    LinkAssignment {
        initiative_id: EntityId,
        assignment_id: EntityId,
        estimate_id:   EntityId,
    },
    UnlinkAssignment {
        initiative_id: EntityId,
        assignment_id: EntityId,
    },
}

impl PlannerCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateTribe { .. }        => "create_tribe",
            Self::RenameTribe { .. }        => "rename_tribe",
            Self::CreateSquad { .. }        => "create_squad",
            Self::RenameSquad { .. }        => "rename_squad",
            Self::DeleteSquad { .. }        => "delete_squad",
            Self::AddPerson { .. }          => "add_person",
            Self::UpdatePerson { .. }       => "update_person",
            Self::RemovePerson { .. }       => "remove_person",
            Self::AddInitiative { .. }      => "add_initiative",
            Self::SetPipelineStatus { .. }  => "set_pipeline_status",
            Self::SetAllocation { .. }      => "set_allocation",
            Self::RemoveAllocation { .. }   => "remove_allocation",
            Self::SetInitiativeDates { .. } => "set_initiative_dates",
            Self::SetWorkProfile { .. }     => "set_work_profile",
            Self::AddEstimate { .. }        => "add_estimate",
            Self::RemoveEstimate { .. }     => "remove_estimate",
            Self::AddAssignment { .. }      => "add_assignment",
            Self::RemoveAssignment { .. }   => "remove_assignment",
            Self::LinkAssignment { .. }     => "link_assignment",
            Self::UnlinkAssignment { .. }   => "unlink_assignment",
        }
    }
}
