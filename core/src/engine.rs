//! The planner engine — wires the store, the repository and configuration.
//!
//! FLOW for every command:
//!   1. A staged copy of the repository validates and applies it,
//!      returning events.
//!   2. Each event is appended to the change log and the staged state is
//!      saved, in one transaction.
//!   3. Only then does the staged copy replace the live repository.
//!
//! Reads (forecast, drill-down, availability) are computed on demand from
//! the in-memory state; nothing derived is ever persisted.

use crate::{
    availability::{squad_available_capacity, SquadAvailability},
    calendar::{FiscalCalendar, FiscalQuarter},
    command::PlannerCommand,
    config::PlannerConfig,
    error::PlannerResult,
    event::PlanEvent,
    forecast::{build_forecast, Drilldown, Forecast, ForecastMode},
    migration::migrate_state,
    model::PlannerState,
    repository::StateRepository,
    roster::{
        contract_watch, contractors_expiring_within, spend_summary, ContractWatch, ExpiringContract,
        SpendSummary,
    },
    store::PlannerStore,
};
use chrono::{NaiveDate, Utc};

pub struct PlannerEngine {
    store:  PlannerStore,
    repo:   StateRepository,
    config: PlannerConfig,
}

impl PlannerEngine {
    /// Opens (or creates) the database at `path` and loads its state.
    pub fn open(path: &str, config: PlannerConfig) -> PlannerResult<Self> {
        Self::with_store(PlannerStore::open(path)?, config)
    }

    pub fn in_memory(config: PlannerConfig) -> PlannerResult<Self> {
        Self::with_store(PlannerStore::in_memory()?, config)
    }

    fn with_store(store: PlannerStore, config: PlannerConfig) -> PlannerResult<Self> {
        store.migrate()?;
        let stored = store.load_state()?.unwrap_or_default();
        let (state, report) = migrate_state(stored);
        if !report.is_clean() {
            log::warn!("stored state needed migration, saving upgraded copy: {report:?}");
            store.save_state(&state)?;
        }
        log::info!(
            "engine ready: {} squads, {} people, {} initiatives",
            state.squads.len(),
            state.people.len(),
            state.initiatives.len()
        );
        Ok(Self { store, repo: StateRepository::new(state), config })
    }

    pub fn state(&self) -> &PlannerState {
        self.repo.state()
    }

    pub fn repository(&self) -> &StateRepository {
        &self.repo
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn store(&self) -> &PlannerStore {
        &self.store
    }

    /// Apply one command, record its events and persist the result.
    /// On any failure the in-memory state is left as it was.
    pub fn submit_command(&mut self, command: PlannerCommand) -> PlannerResult<Vec<PlanEvent>> {
        let name = command.name();
        let mut staged = self.repo.clone();
        let events = staged.apply(command)?;
        log::info!("{name}: {} event(s)", events.len());
        self.commit(staged, &events)?;
        Ok(events)
    }

    /// Replace the whole state (an import), recorded as one event.
    pub fn replace_state(&mut self, state: PlannerState) -> PlannerResult<Vec<PlanEvent>> {
        let mut staged = self.repo.clone();
        let events = staged.replace(state);
        self.commit(staged, &events)?;
        Ok(events)
    }

    fn commit(&mut self, staged: StateRepository, events: &[PlanEvent]) -> PlannerResult<()> {
        let recorded_at = Utc::now().to_rfc3339();
        self.store.write_changes(events, &recorded_at, staged.state())?;
        self.repo = staged;
        Ok(())
    }

    pub fn quarters(&self, today: NaiveDate) -> Vec<FiscalQuarter> {
        FiscalCalendar::from_config(&self.config).next_four_quarters(today)
    }

    pub fn forecast(&self, today: NaiveDate, mode: ForecastMode) -> Forecast {
        let quarters = self.quarters(today);
        build_forecast(self.repo.state(), &self.config, &quarters, mode)
    }

    pub fn drilldown(
        &self,
        today: NaiveDate,
        mode: ForecastMode,
        squad_id: &str,
        quarter_index: usize,
    ) -> Option<Drilldown> {
        self.forecast(today, mode).drilldown(squad_id, quarter_index)
    }

    pub fn squad_availability(&self, squad_id: &str, today: NaiveDate) -> SquadAvailability {
        squad_available_capacity(self.repo.state(), squad_id, today)
    }

    pub fn expiring_contracts(&self, today: NaiveDate) -> Vec<ExpiringContract> {
        contractors_expiring_within(self.repo.state(), self.config.contractor_expiry_window_days, today)
    }

    pub fn contract_watch(&self, today: NaiveDate) -> ContractWatch {
        contract_watch(self.repo.state(), today)
    }

    pub fn spend(&self) -> SpendSummary {
        spend_summary(self.repo.state(), &self.config)
    }
}
