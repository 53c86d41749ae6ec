//! The state blob: one JSON document under a fixed key.

use super::PlannerStore;
use crate::{error::PlannerResult, model::PlannerState};
use rusqlite::{params, OptionalExtension};

pub const STATE_KEY: &str = "state";

impl PlannerStore {
    /// `None` when nothing has been saved yet. A stored blob that does
    /// not parse is an error, never silently replaced.
    pub fn load_state(&self) -> PlannerResult<Option<PlannerState>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM store WHERE key = ?1",
                params![STATE_KEY],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Saved wholesale; the previous blob is replaced.
    pub fn save_state(&self, state: &PlannerState) -> PlannerResult<()> {
        let json = serde_json::to_string(state)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO store (key, value) VALUES (?1, ?2)",
            params![STATE_KEY, json],
        )?;
        log::debug!("state saved ({} bytes)", json.len());
        Ok(())
    }
}
