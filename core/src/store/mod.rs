//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The repository and engine call store methods — they never execute SQL.

use crate::error::PlannerResult;
use rusqlite::Connection;

mod change_log;
mod state;

pub use state::STATE_KEY;

pub struct PlannerStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl PlannerStore {
    pub fn open(path: &str) -> PlannerResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        log::info!("opened store at {path}");
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> PlannerResult<Self> {
        let conn = Connection::open(":memory:")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases, this returns a new in-memory database (isolated).
    pub fn reopen(&self) -> PlannerResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Apply all schema migrations in order. Safe to run repeatedly.
    pub fn migrate(&self) -> PlannerResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_store.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_change_log.sql"))?;
        Ok(())
    }

    /// Cheap liveness probe: the connection answers and the schema exists.
    pub fn check_health(&self) -> PlannerResult<()> {
        self.conn
            .query_row("SELECT COUNT(*) FROM store", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}
