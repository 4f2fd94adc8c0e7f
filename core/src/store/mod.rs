//! SQLite data access layer.
//!
//! RULE: Only the store talks to the database.
//! Every accessor opens its own connection and drops it before returning,
//! so nothing is pooled or shared across calls. Keys are always bound as
//! parameters, never formatted into SQL text.

use crate::error::ReviewResult;
use rusqlite::{Connection, OpenFlags};
use std::time::Duration;

mod claims;
mod dashboard;
mod entities;
mod flags;

pub use dashboard::ClaimFlagRow;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ClaimStore {
    path: String,
}

impl ClaimStore {
    /// Handle on the database at `path`. Nothing is opened until a lookup runs.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Read-only connection used by every lookup.
    fn read(&self) -> ReviewResult<Connection> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    /// Writable connection, used only for schema setup and seeding.
    fn write(&self) -> ReviewResult<Connection> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    /// Create the four review tables if they do not exist yet.
    pub fn migrate(&self) -> ReviewResult<()> {
        let conn = self.write()?;
        conn.execute_batch(include_str!("../../../migrations/001_claims.sql"))?;
        log::debug!("Schema applied to {}", self.path);
        Ok(())
    }

    // ── Counts ─────────────────────────────────────────────────

    /// Number of distinct claim ids in the store.
    pub fn claim_count(&self) -> ReviewResult<i64> {
        let conn = self.read()?;
        let count = conn.query_row("SELECT COUNT(DISTINCT claim_id) FROM claims", [], |row| {
            row.get(0)
        })?;
        Ok(count)
    }

    /// Number of claims the scoring job flagged as fraud.
    pub fn flagged_count(&self) -> ReviewResult<i64> {
        let conn = self.read()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM fraud_flags WHERE fraud_detected = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
