//! Shared primitive types used across the planner.

/// A stable, unique identifier for any entity in the planner state.
pub type EntityId = String;

/// Squad identifier (also the key of an initiative's allocation maps).
pub type SquadId = String;

/// Tribe identifier — the parent group of a set of squads.
pub type TribeId = String;

/// Headcount-equivalent units: 1.0 = one full-time person for a period.
pub type Headcount = f64;

/// A whole percentage in the 0..=100 range (may exceed 100 for over-allocation).
pub type Percent = f64;
