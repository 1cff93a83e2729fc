//! Database schema and types

pub use crate::dialog::{DialogState, FieldRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    state TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_updated ON sessions(updated_at DESC);

CREATE TABLE IF NOT EXISTS intake_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    record TEXT NOT NULL,
    completed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_intake_records_session ON intake_records(session_id);
";

/// A finished intake, as handed to the completion sink
#[derive(Debug, Clone, Serialize)]
pub struct IntakeRecord {
    pub id: i64,
    pub session_id: String,
    pub record: FieldRecord,
    pub completed_at: DateTime<Utc>,
}
