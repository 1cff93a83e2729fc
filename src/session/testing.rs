//! In-memory doubles for router tests

use super::traits::*;
use crate::dialog::{DialogState, FieldRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

// ============================================================================
// In-Memory Session Store
// ============================================================================

/// Session store that keeps state as JSON, so every turn goes through a
/// serialize/deserialize cycle like the real database
#[derive(Default)]
pub struct InMemorySessionStore {
    states: Mutex<HashMap<String, String>>,
    fail_saves: AtomicBool,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `save` fail
    pub fn fail_saves(&self) {
        self.fail_saves.store(true, Ordering::SeqCst);
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.states.lock().unwrap().contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.states.lock().unwrap().len()
    }

    pub fn put(&self, session_id: &str, state: &DialogState) {
        self.states
            .lock()
            .unwrap()
            .insert(session_id.to_string(), serde_json::to_string(state).unwrap());
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<DialogState>, String> {
        let states = self.states.lock().unwrap();
        states
            .get(session_id)
            .map(|json| serde_json::from_str(json).map_err(|e| e.to_string()))
            .transpose()
    }

    async fn save(&self, session_id: &str, state: &DialogState) -> Result<(), String> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err("disk full".to_string());
        }
        self.put(session_id, state);
        Ok(())
    }

    async fn remove(&self, session_id: &str) -> Result<bool, String> {
        Ok(self.states.lock().unwrap().remove(session_id).is_some())
    }
}

// ============================================================================
// Recording Completion Sink
// ============================================================================

/// Completion sink that remembers everything delivered to it
#[derive(Default)]
pub struct RecordingSink {
    records: Mutex<Vec<(String, FieldRecord)>>,
    fail_deliveries: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle whether `deliver` fails
    pub fn fail_deliveries(&self, fail: bool) {
        self.fail_deliveries.store(fail, Ordering::SeqCst);
    }

    pub fn delivered(&self) -> Vec<(String, FieldRecord)> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionSink for RecordingSink {
    async fn deliver(&self, session_id: &str, record: &FieldRecord) -> Result<(), String> {
        if self.fail_deliveries.load(Ordering::SeqCst) {
            return Err("sink down".to_string());
        }
        self.records
            .lock()
            .unwrap()
            .push((session_id.to_string(), record.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::dialog::sequence::StepId;
    use crate::dialog::{FlowVariant, PromptKind, Registry, SequenceId};
    use crate::session::{RouterError, SessionRouter, TurnEffect, TurnReply};
    use std::sync::Arc;

    type TestRouter = SessionRouter<Arc<InMemorySessionStore>, Arc<RecordingSink>>;

    struct Harness {
        router: Arc<TestRouter>,
        store: Arc<InMemorySessionStore>,
        sink: Arc<RecordingSink>,
    }

    impl Harness {
        fn new(registry: Registry) -> Self {
            let store = Arc::new(InMemorySessionStore::new());
            let sink = Arc::new(RecordingSink::new());
            let router = Arc::new(SessionRouter::new(
                Arc::new(registry),
                Arc::clone(&store),
                Arc::clone(&sink),
            ));
            Self { router, store, sink }
        }

        async fn turn(&self, session_id: &str, input: Option<&str>) -> TurnReply {
            self.router
                .resume(session_id, input.map(String::from))
                .await
                .unwrap()
        }
    }

    fn prompt(reply: &TurnReply) -> &str {
        match &reply.effect {
            TurnEffect::PromptIssued { text, .. } => text,
            other => panic!("Expected prompt, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = InMemorySessionStore::new();
        assert!(store.load("s").await.unwrap().is_none());

        let state = DialogState::start(SequenceId::Intake);
        store.save("s", &state).await.unwrap();
        assert_eq!(store.load("s").await.unwrap(), Some(state));
        assert!(store.remove("s").await.unwrap());
        assert!(!store.remove("s").await.unwrap());
    }

    #[tokio::test]
    async fn test_full_session_through_router() {
        let h = Harness::new(Registry::new(FlowVariant::Basic));

        let reply = h.turn("s-1", None).await;
        assert_eq!(
            reply.effect,
            TurnEffect::PromptIssued {
                text: "Please enter your name.".to_string(),
                expected_kind: PromptKind::Text,
            }
        );
        assert!(h.store.contains("s-1"));

        assert_eq!(prompt(&h.turn("s-1", Some("Ana")).await), "Please enter your age.");
        let reply = h.turn("s-1", Some("30")).await;
        assert_eq!(prompt(&reply), "Please enter your phone number.");
        h.turn("s-1", Some("555-1234")).await;
        h.turn("s-1", Some("ana@x.com")).await;

        let reply = h.turn("s-1", Some("")).await;
        assert_eq!(reply.messages, vec!["Thanks for participating, Ana.".to_string()]);
        let TurnEffect::SessionCompleted { record } = reply.effect else {
            panic!("Expected completion, got {:?}", reply.effect);
        };
        assert_eq!(record.age, 30);
        assert!(record.review_items.is_empty());

        assert!(!h.store.contains("s-1"));
        let delivered = h.sink.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].0, "s-1");
        assert_eq!(delivered[0].1, record);
    }

    #[tokio::test]
    async fn test_validation_failure_reissues_prompt() {
        let h = Harness::new(Registry::default());
        h.turn("s-1", None).await;
        h.turn("s-1", Some("Ana")).await;

        let reply = h.turn("s-1", Some("thirty")).await;
        match reply.effect {
            TurnEffect::ValidationFailed {
                text,
                expected_kind,
                ..
            } => {
                assert_eq!(text, "Please enter your age.");
                assert_eq!(expected_kind, PromptKind::Number);
            }
            other => panic!("Expected validation failure, got {other:?}"),
        }

        let status = h.router.status("s-1").await.unwrap().unwrap();
        assert_eq!(status.step_index, 1);
        assert_eq!(prompt(&h.turn("s-1", Some("30")).await), "Please enter your phone number.");
    }

    #[tokio::test]
    async fn test_review_loop_through_router() {
        let h = Harness::new(Registry::default());
        for input in [None, Some("Ana"), Some("30"), Some("555-1234"), Some("ana@x.com"), Some("")] {
            h.turn("s-1", input).await;
        }
        let reply = h.turn("s-1", Some("Headache and FEVER")).await;
        assert_eq!(prompt(&reply), "Please enter a symptom to review, or `done` to finish.");

        h.turn("s-1", Some("headache")).await;
        let status = h.router.status("s-1").await.unwrap().unwrap();
        assert_eq!(status.depth, 3);
        assert_eq!(status.sequence, SequenceId::ReviewSelection);

        let reply = h.turn("s-1", Some("done")).await;
        let TurnEffect::SessionCompleted { record } = reply.effect else {
            panic!("Expected completion");
        };
        assert_eq!(record.review_items, vec!["headache".to_string()]);
    }

    #[tokio::test]
    async fn test_abandon_discards_without_delivery() {
        let h = Harness::new(Registry::default());
        h.turn("s-1", None).await;
        h.turn("s-1", Some("Ana")).await;

        assert!(h.router.abandon("s-1").await.unwrap());
        assert!(!h.router.abandon("s-1").await.unwrap());
        assert!(h.router.status("s-1").await.unwrap().is_none());
        assert!(h.sink.delivered().is_empty());

        // The next turn starts over
        let reply = h.turn("s-1", Some("Ana")).await;
        assert_eq!(prompt(&reply), "Please enter your name.");
    }

    #[tokio::test]
    async fn test_structural_error_discards_session() {
        let registry = Registry::empty(SequenceId::Intake)
            .with_sequence(SequenceId::Intake, vec![StepId::AskName]);
        let h = Harness::new(registry);
        h.turn("s-1", None).await;

        let err = h
            .router
            .resume("s-1", Some("Ana".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::Structural { ref session_id, .. } if session_id == "s-1"));
        assert!(!h.store.contains("s-1"));
        assert!(h.sink.delivered().is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces() {
        let h = Harness::new(Registry::default());
        h.store.fail_saves();
        let err = h.router.resume("s-1", None).await.unwrap_err();
        assert!(matches!(err, RouterError::Storage(ref msg) if msg == "disk full"));
    }

    #[tokio::test]
    async fn test_failed_delivery_keeps_last_prompt() {
        let h = Harness::new(Registry::new(FlowVariant::Basic));
        for input in [None, Some("Ana"), Some("30"), Some("555-1234"), Some("ana@x.com")] {
            h.turn("s-1", input).await;
        }

        h.sink.fail_deliveries(true);
        let err = h.router.resume("s-1", Some(String::new())).await.unwrap_err();
        assert!(matches!(err, RouterError::Storage(ref msg) if msg == "sink down"));
        assert!(h.store.contains("s-1"));
        let status = h.router.status("s-1").await.unwrap().unwrap();
        assert_eq!(status.awaiting.unwrap().text, "Please describe your symptoms.");

        h.sink.fail_deliveries(false);
        let reply = h.turn("s-1", Some("")).await;
        let TurnEffect::SessionCompleted { record } = reply.effect else {
            panic!("Expected completion, got {:?}", reply.effect);
        };
        assert_eq!(record.name, "Ana");
        assert_eq!(h.sink.delivered().len(), 1);
        assert!(!h.store.contains("s-1"));
    }

    #[tokio::test]
    async fn test_lock_entries_released_after_each_turn() {
        let h = Harness::new(Registry::default());
        for i in 0..200 {
            h.turn(&format!("s-{i}"), None).await;
        }
        assert_eq!(h.store.len(), 200);
        assert_eq!(h.router.lock_count().await, 0);

        // Failed turns and abandonment leave nothing behind either
        h.turn("s-0", Some("Ana")).await;
        h.store.fail_saves();
        assert!(h.router.resume("s-new", None).await.is_err());
        assert!(h.router.abandon("s-1").await.unwrap());
        assert_eq!(h.router.lock_count().await, 0);
    }

    #[tokio::test]
    async fn test_corrupt_stored_state_is_storage_error() {
        let h = Harness::new(Registry::default());
        h.store
            .states
            .lock()
            .unwrap()
            .insert("s-1".to_string(), "{not json".to_string());
        let err = h.router.resume("s-1", Some("Ana".to_string())).await.unwrap_err();
        assert!(matches!(err, RouterError::Storage(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_sessions_run_independently() {
        let h = Harness::new(Registry::new(FlowVariant::Basic));
        let mut handles = Vec::new();
        for i in 0..8 {
            let router = Arc::clone(&h.router);
            handles.push(tokio::spawn(async move {
                let id = format!("s-{i}");
                let name = format!("Patient {i}");
                router.resume(&id, None).await.unwrap();
                for input in [name.as_str(), "40", "555-0000", "p@x.com", " "] {
                    router.resume(&id, Some(input.to_string())).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut names: Vec<String> = h.sink.delivered().into_iter().map(|(_, r)| r.name).collect();
        names.sort();
        assert_eq!(names.len(), 8);
        assert_eq!(names[0], "Patient 0");
        assert_eq!(h.store.len(), 0);
        assert_eq!(h.router.lock_count().await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_turns_on_one_session_are_serialized() {
        let h = Harness::new(Registry::new(FlowVariant::Basic));
        h.turn("s-1", None).await;
        h.turn("s-1", Some("Ana")).await;

        let a = {
            let router = Arc::clone(&h.router);
            tokio::spawn(async move { router.resume("s-1", Some("30".to_string())).await })
        };
        let b = {
            let router = Arc::clone(&h.router);
            tokio::spawn(async move { router.resume("s-1", Some("31".to_string())).await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let state = h.store.load("s-1").await.unwrap().unwrap();
        assert_eq!(state.stack[0].step_index, 3);
        let record = state.record;
        assert!(
            (record.age == 30 && record.phone_number == "31")
                || (record.age == 31 && record.phone_number == "30"),
            "Turns interleaved: {record:?}"
        );
    }

    #[tokio::test]
    async fn test_router_against_database() {
        let db = Database::open_in_memory().unwrap();
        let storage = DatabaseStorage::new(db.clone());
        let router = SessionRouter::new(
            Arc::new(Registry::new(FlowVariant::Basic)),
            storage.clone(),
            storage,
        );

        router.resume("s-1", None).await.unwrap();
        for input in ["Ana", "30", "555-1234", "ana@x.com", ""] {
            router.resume("s-1", Some(input.to_string())).await.unwrap();
        }

        assert!(db.load_session("s-1").unwrap().is_none());
        let records = db.list_records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record.name, "Ana");
    }
}
