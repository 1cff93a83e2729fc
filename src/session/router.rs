//! Per-session turn execution

use super::traits::{CompletionSink, SessionStore};
use crate::dialog::{
    advance, DialogState, Effect, FieldRecord, PromptKind, PromptRequest, Registry, SequenceId,
    StructuralError, TurnResult,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// What the transport should show after a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEffect {
    PromptIssued {
        text: String,
        expected_kind: PromptKind,
    },
    SessionCompleted {
        record: FieldRecord,
    },
    /// The reply was rejected; `text` is the prompt being re-issued
    ValidationFailed {
        text: String,
        expected_kind: PromptKind,
        reason: String,
    },
}

/// Reply to one inbound turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnReply {
    /// Informational messages, in the order they were produced
    pub messages: Vec<String>,
    pub effect: TurnEffect,
}

/// Snapshot of an active session
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub depth: usize,
    pub sequence: SequenceId,
    pub step_index: usize,
    pub awaiting: Option<PromptRequest>,
}

impl SessionStatus {
    fn from_state(state: &DialogState) -> Option<Self> {
        let frame = state.active()?;
        Some(Self {
            depth: state.depth(),
            sequence: frame.sequence,
            step_index: frame.step_index,
            awaiting: state.awaiting().cloned(),
        })
    }
}

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Session {session_id} aborted: {source}")]
    Structural {
        session_id: String,
        #[source]
        source: StructuralError,
    },
    #[error("Turn for session {0} produced no reply")]
    EmptyTurn(String),
}

/// Runs turns for any number of sessions, one at a time per session
pub struct SessionRouter<S, C> {
    registry: Arc<Registry>,
    store: S,
    sink: C,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S: SessionStore, C: CompletionSink> SessionRouter<S, C> {
    pub fn new(registry: Arc<Registry>, store: S, sink: C) -> Self {
        Self {
            registry,
            store,
            sink,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Handle one inbound turn.
    ///
    /// A session with no stored state is started at the registry's root and
    /// `input` is ignored.
    pub async fn resume(
        &self,
        session_id: &str,
        input: Option<String>,
    ) -> Result<TurnReply, RouterError> {
        let lock = self.session_lock(session_id).await;
        let guard = lock.lock().await;
        let reply = self.run_turn(session_id, input).await;
        drop(guard);
        self.forget_lock(session_id, &lock).await;
        reply
    }

    async fn run_turn(
        &self,
        session_id: &str,
        input: Option<String>,
    ) -> Result<TurnReply, RouterError> {
        let state = self
            .store
            .load(session_id)
            .await
            .map_err(RouterError::Storage)?;
        if state.is_none() {
            tracing::info!(session_id, "Starting session");
        }

        let result = match advance(&self.registry, state, input.as_deref()) {
            Ok(result) => result,
            Err(source) => {
                tracing::error!(session_id, error = %source, "Structural error, discarding session");
                if let Err(e) = self.store.remove(session_id).await {
                    tracing::error!(session_id, error = %e, "Failed to discard session state");
                }
                return Err(RouterError::Structural {
                    session_id: session_id.to_string(),
                    source,
                });
            }
        };

        self.execute_effects(session_id, result).await
    }

    /// Drop a session without completing it. No record is delivered.
    pub async fn abandon(&self, session_id: &str) -> Result<bool, RouterError> {
        let lock = self.session_lock(session_id).await;
        let guard = lock.lock().await;
        let removed = self.store.remove(session_id).await;
        drop(guard);
        self.forget_lock(session_id, &lock).await;

        let removed = removed.map_err(RouterError::Storage)?;
        if removed {
            tracing::info!(session_id, "Session abandoned");
        }
        Ok(removed)
    }

    /// Current position of an active session, `None` if there is none
    pub async fn status(&self, session_id: &str) -> Result<Option<SessionStatus>, RouterError> {
        let state = self
            .store
            .load(session_id)
            .await
            .map_err(RouterError::Storage)?;
        Ok(state.as_ref().and_then(SessionStatus::from_state))
    }

    async fn execute_effects(
        &self,
        session_id: &str,
        result: TurnResult,
    ) -> Result<TurnReply, RouterError> {
        let TurnResult { new_state, effects } = result;
        let mut messages = Vec::new();
        let mut reply_effect = None;

        if let Some(status) = new_state.as_ref().and_then(SessionStatus::from_state) {
            tracing::debug!(
                session_id,
                sequence = %status.sequence,
                step_index = status.step_index,
                depth = status.depth,
                "Turn processed"
            );
        }

        for effect in effects {
            match effect {
                Effect::SendMessage { text } => messages.push(text),
                Effect::IssuePrompt(prompt) => {
                    reply_effect = Some(TurnEffect::PromptIssued {
                        text: prompt.text,
                        expected_kind: prompt.kind,
                    });
                }
                Effect::RejectInput { prompt, error } => {
                    tracing::warn!(session_id, kind = prompt.kind.as_str(), error = %error, "Input rejected");
                    reply_effect = Some(TurnEffect::ValidationFailed {
                        text: prompt.text,
                        expected_kind: prompt.kind,
                        reason: error.to_string(),
                    });
                }
                Effect::PersistState => {
                    if let Some(state) = &new_state {
                        self.store
                            .save(session_id, state)
                            .await
                            .map_err(RouterError::Storage)?;
                    }
                }
                Effect::ClearState => {
                    self.store
                        .remove(session_id)
                        .await
                        .map_err(RouterError::Storage)?;
                }
                Effect::DeliverRecord { record } => {
                    self.sink
                        .deliver(session_id, &record)
                        .await
                        .map_err(RouterError::Storage)?;
                    tracing::info!(session_id, review_items = record.review_items.len(), "Session completed");
                    reply_effect = Some(TurnEffect::SessionCompleted { record });
                }
            }
        }

        let effect = reply_effect.ok_or_else(|| RouterError::EmptyTurn(session_id.to_string()))?;
        Ok(TurnReply { messages, effect })
    }

    async fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(session_id.to_string()).or_default())
    }

    /// Drop the lock entry once a turn is done unless another turn holds or
    /// is queued on it. Session state lives in the store, not here.
    async fn forget_lock(&self, session_id: &str, lock: &Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        if Arc::strong_count(lock) <= 2 {
            locks.remove(session_id);
        }
    }

    #[cfg(test)]
    pub(crate) async fn lock_count(&self) -> usize {
        self.locks.lock().await.len()
    }
}
