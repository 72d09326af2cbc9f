//! SQLite outbox for dispatched cohorts.
//!
//! RULE: Only store.rs talks to the database.
//! Sinks call store methods; they never execute SQL directly.

use crate::{
    dispatch::{CohortSink, DispatchEnvelope},
    error::{DashResult, DispatchError},
    types::DispatchId,
};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::sync::Mutex;

/// One row of the outbox.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxEntry {
    pub id:          i64,
    pub dispatch_id: DispatchId,
    pub cohort_type: String,
    pub description: String,
    pub payload:     String,
    pub created_at:  String,
}

pub struct CohortOutbox {
    conn: Connection,
}

impl CohortOutbox {
    /// Open (or create) the outbox database at `path`.
    pub fn open(path: &str) -> DashResult<Self> {
        let conn = Connection::open(path)?;
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> DashResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> DashResult<()> {
        self.conn.execute_batch(include_str!("../migrations/001_outbox.sql"))?;
        Ok(())
    }

    pub fn append(&self, envelope: &DispatchEnvelope) -> DashResult<()> {
        let description = envelope
            .cohort
            .get("description")
            .and_then(|d| d.as_str())
            .unwrap_or_default();
        self.conn.execute(
            "INSERT INTO cohort_outbox (dispatch_id, cohort_type, description, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                envelope.dispatch_id,
                envelope.cohort_type,
                description,
                serde_json::to_string(&envelope.cohort)?,
                envelope.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn count(&self) -> DashResult<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM cohort_outbox", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    /// Every entry, oldest first.
    pub fn all(&self) -> DashResult<Vec<OutboxEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, dispatch_id, cohort_type, description, payload, created_at
             FROM cohort_outbox ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map([], |row| {
                Ok(OutboxEntry {
                    id:          row.get(0)?,
                    dispatch_id: row.get(1)?,
                    cohort_type: row.get(2)?,
                    description: row.get(3)?,
                    payload:     row.get(4)?,
                    created_at:  row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn by_type(&self, cohort_type: &str) -> DashResult<Vec<OutboxEntry>> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|e| e.cohort_type == cohort_type)
            .collect())
    }
}

// ── Sink ─────────────────────────────────────────────────────────────────────

/// Delivers cohorts by appending them to a local outbox.
pub struct OutboxSink {
    outbox: Mutex<CohortOutbox>,
}

impl OutboxSink {
    pub fn new(outbox: CohortOutbox) -> Self {
        Self { outbox: Mutex::new(outbox) }
    }

    pub fn count(&self) -> DashResult<u64> {
        self.with_outbox(|o| o.count())
    }

    pub fn entries(&self) -> DashResult<Vec<OutboxEntry>> {
        self.with_outbox(|o| o.all())
    }

    fn with_outbox<T>(&self, f: impl FnOnce(&CohortOutbox) -> DashResult<T>) -> DashResult<T> {
        let outbox = self.outbox.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&outbox)
    }
}

#[async_trait]
impl CohortSink for OutboxSink {
    fn name(&self) -> &'static str {
        "outbox"
    }

    async fn deliver(&self, envelope: &DispatchEnvelope) -> Result<(), DispatchError> {
        self.with_outbox(|o| o.append(envelope))
            .map_err(|e| DispatchError::Network(format!("outbox write failed: {e}")))
    }
}
