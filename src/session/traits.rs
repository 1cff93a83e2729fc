//! Trait abstractions for session I/O
//!
//! The router only talks to storage through these traits so it can be
//! tested against in-memory doubles.

use crate::db::Database;
use crate::dialog::{DialogState, FieldRecord};
use async_trait::async_trait;
use std::sync::Arc;

/// Opaque key-value store for in-flight dialog state
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stored state, `None` when the session has not started or has ended
    async fn load(&self, session_id: &str) -> Result<Option<DialogState>, String>;

    /// Replace the stored state
    async fn save(&self, session_id: &str, state: &DialogState) -> Result<(), String>;

    /// Discard the stored state. Returns whether anything was stored.
    async fn remove(&self, session_id: &str) -> Result<bool, String>;
}

/// Receives the final record of each completed session
#[async_trait]
pub trait CompletionSink: Send + Sync {
    async fn deliver(&self, session_id: &str, record: &FieldRecord) -> Result<(), String>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn load(&self, session_id: &str) -> Result<Option<DialogState>, String> {
        (**self).load(session_id).await
    }

    async fn save(&self, session_id: &str, state: &DialogState) -> Result<(), String> {
        (**self).save(session_id, state).await
    }

    async fn remove(&self, session_id: &str) -> Result<bool, String> {
        (**self).remove(session_id).await
    }
}

#[async_trait]
impl<T: CompletionSink + ?Sized> CompletionSink for Arc<T> {
    async fn deliver(&self, session_id: &str, record: &FieldRecord) -> Result<(), String> {
        (**self).deliver(session_id, record).await
    }
}

// ============================================================================
// Production Adapter
// ============================================================================

/// Adapter to use Database as both session store and completion sink
#[derive(Clone)]
pub struct DatabaseStorage {
    db: Database,
}

impl DatabaseStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for DatabaseStorage {
    async fn load(&self, session_id: &str) -> Result<Option<DialogState>, String> {
        self.db.load_session(session_id).map_err(|e| e.to_string())
    }

    async fn save(&self, session_id: &str, state: &DialogState) -> Result<(), String> {
        self.db
            .save_session(session_id, state)
            .map_err(|e| e.to_string())
    }

    async fn remove(&self, session_id: &str) -> Result<bool, String> {
        self.db.delete_session(session_id).map_err(|e| e.to_string())
    }
}

#[async_trait]
impl CompletionSink for DatabaseStorage {
    async fn deliver(&self, session_id: &str, record: &FieldRecord) -> Result<(), String> {
        self.db
            .insert_record(session_id, record)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}
