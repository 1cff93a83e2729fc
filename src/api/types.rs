//! API request and response types

use crate::db::IntakeRecord;
use crate::session::{SessionStatus, TurnReply};
use serde::{Deserialize, Serialize};

/// Request body for a turn
#[derive(Debug, Default, Deserialize)]
pub struct TurnRequest {
    /// Omitted or `null` is an absent reply
    #[serde(default)]
    pub text: Option<String>,
}

/// Response for session creation
#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    #[serde(flatten)]
    pub reply: TurnReply,
}

/// Response for session lookup
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    #[serde(flatten)]
    pub status: SessionStatus,
}

/// Response for abandoning a session
#[derive(Debug, Serialize)]
pub struct AbandonResponse {
    pub abandoned: bool,
}

/// Response for listing completed records
#[derive(Debug, Serialize)]
pub struct RecordListResponse {
    pub records: Vec<IntakeRecord>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
