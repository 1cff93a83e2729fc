//! The per-session record of collected answers

use serde::{Deserialize, Serialize};

/// Answers gathered over the course of one intake session.
///
/// Owned by the session's [`DialogState`](super::DialogState) and handed to
/// the completion sink as a snapshot once the top-level sequence completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub name: String,
    pub age: i32,
    pub phone_number: String,
    pub email: String,
    pub gender: String,
    pub review_items: Vec<String>,
    /// Never populated: symptom matches are computed and then dropped.
    #[serde(default)]
    pub symptom_list: Vec<String>,
}

impl FieldRecord {
    pub fn new() -> Self {
        Self::default()
    }
}
