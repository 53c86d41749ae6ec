//! Append-only change log queries.

use super::PlannerStore;
use crate::{
    error::PlannerResult,
    event::{ChangeLogEntry, PlanEvent},
    model::PlannerState,
};
use rusqlite::params;

impl PlannerStore {
    /// Returns the sequence number assigned to the entry.
    pub fn append_change(&self, event: &PlanEvent, recorded_at: &str) -> PlannerResult<i64> {
        self.conn.execute(
            "INSERT INTO change_log (event_type, payload, recorded_at) VALUES (?1, ?2, ?3)",
            params![event.type_name(), serde_json::to_string(event)?, recorded_at],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Appends `events` and saves `state` atomically: either every row
    /// lands or none does.
    pub fn write_changes(&self, events: &[PlanEvent], recorded_at: &str, state: &PlannerState) -> PlannerResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        for event in events {
            self.append_change(event, recorded_at)?;
        }
        self.save_state(state)?;
        tx.commit()?;
        Ok(())
    }

    /// Entries with a sequence number greater than `seq`, oldest first.
    pub fn changes_since(&self, seq: i64) -> PlannerResult<Vec<ChangeLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT seq, event_type, payload, recorded_at
             FROM change_log WHERE seq > ?1
             ORDER BY seq ASC",
        )?;
        let entries = stmt
            .query_map(params![seq], |row| {
                Ok(ChangeLogEntry {
                    seq:         row.get(0)?,
                    event_type:  row.get(1)?,
                    payload:     row.get(2)?,
                    recorded_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn change_count(&self) -> PlannerResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM change_log", [], |row| row.get(0))?;
        Ok(count)
    }
}
