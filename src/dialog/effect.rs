//! Effects produced by a dialog turn

use super::prompt::{PromptRequest, ValidationError};
use super::record::FieldRecord;

/// Effects to be executed by the session router after a turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Informational message for the user
    SendMessage { text: String },

    /// Ask the user for the next value
    IssuePrompt(PromptRequest),

    /// Reply failed validation; the same prompt stays outstanding
    RejectInput {
        prompt: PromptRequest,
        error: ValidationError,
    },

    /// Persist the new state
    PersistState,

    /// Drop the stored state; the session is over
    ClearState,

    /// Hand the finished record to the completion sink
    DeliverRecord { record: FieldRecord },
}

impl Effect {
    pub fn send_message(text: impl Into<String>) -> Self {
        Effect::SendMessage { text: text.into() }
    }
}
