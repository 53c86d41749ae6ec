//! capacity-core: derived-state core of the squad capacity planner.
//!
//! LAYERS (bottom-up):
//!   model / calendar / discipline  — the persisted shape and pure helpers
//!   headcount / demand / forecast  — the computation core, never errors
//!   availability / roster / work_profile — secondary views
//!   migration / repository / command / event — the mutation path
//!   store / engine                 — persistence and wiring

pub mod availability;
pub mod calendar;
pub mod command;
pub mod config;
pub mod demand;
pub mod discipline;
pub mod engine;
pub mod error;
pub mod event;
pub mod forecast;
pub mod headcount;
pub mod migration;
pub mod model;
pub mod repository;
pub mod roster;
pub mod store;
pub mod types;
pub mod work_profile;
