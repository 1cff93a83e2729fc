//! Database module for the intake service
//!
//! Persists in-flight dialog state between turns and the records of
//! completed intakes.

mod schema;

pub use schema::*;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Stored JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Database connection lock poisoned")]
    LockPoisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    fn run_migrations(&self) -> DbResult<()> {
        self.conn()?.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Session Operations ====================

    /// Insert or replace the stored state for a session
    pub fn save_session(&self, id: &str, state: &DialogState) -> DbResult<()> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();
        let state_json = serde_json::to_string(state)?;

        conn.execute(
            "INSERT INTO sessions (id, state, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(id) DO UPDATE SET state = excluded.state, updated_at = excluded.updated_at",
            params![id, state_json, now],
        )?;
        Ok(())
    }

    /// Stored state for a session, `None` if there is no active session
    pub fn load_session(&self, id: &str) -> DbResult<Option<DialogState>> {
        let conn = self.conn()?;
        let state_json: Option<String> = conn
            .query_row(
                "SELECT state FROM sessions WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        match state_json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Delete a session's state. Returns whether anything was stored.
    pub fn delete_session(&self, id: &str) -> DbResult<bool> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    // ==================== Record Operations ====================

    /// Store the final record of a completed session
    pub fn insert_record(&self, session_id: &str, record: &FieldRecord) -> DbResult<IntakeRecord> {
        let conn = self.conn()?;
        let now = Utc::now();
        let record_json = serde_json::to_string(record)?;

        conn.execute(
            "INSERT INTO intake_records (session_id, record, completed_at) VALUES (?1, ?2, ?3)",
            params![session_id, record_json, now.to_rfc3339()],
        )?;

        Ok(IntakeRecord {
            id: conn.last_insert_rowid(),
            session_id: session_id.to_string(),
            record: record.clone(),
            completed_at: now,
        })
    }

    /// All completed records, oldest first
    pub fn list_records(&self) -> DbResult<Vec<IntakeRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, session_id, record, completed_at FROM intake_records ORDER BY id ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, session_id, record_json, completed_at) = row?;
            records.push(IntakeRecord {
                id,
                session_id,
                record: serde_json::from_str(&record_json)?,
                completed_at: parse_datetime(&completed_at),
            });
        }
        Ok(records)
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
