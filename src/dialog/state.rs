//! Session stack and step value types

use super::prompt::PromptRequest;
use super::record::FieldRecord;
use super::sequence::SequenceId;
use serde::{Deserialize, Serialize};

// ============================================================================
// Step Values
// ============================================================================

/// Value handed from one step to the next, or from a finished child
/// sequence back to the step that branched into it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StepValue {
    #[default]
    Empty,
    Text(String),
    Number(i32),
    List(Vec<String>),
    Record(FieldRecord),
}

impl StepValue {
    /// Text content, or an empty string for any other shape
    pub fn into_text(self) -> String {
        match self {
            StepValue::Text(s) => s,
            _ => String::new(),
        }
    }

    pub fn as_number(&self) -> Option<i32> {
        match self {
            StepValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// List content, `None` when the value has a different shape
    pub fn into_list(self) -> Option<Vec<String>> {
        match self {
            StepValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Short shape name for diagnostics
    pub fn shape(&self) -> &'static str {
        match self {
            StepValue::Empty => "empty",
            StepValue::Text(_) => "text",
            StepValue::Number(_) => "number",
            StepValue::List(_) => "list",
            StepValue::Record(_) => "record",
        }
    }
}

// ============================================================================
// Stack Frames
// ============================================================================

/// Values a frame keeps between its own turns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameLocals {
    /// Review item chosen in this frame, held until the nested frame returns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<String>,
}

/// One pending or active invocation of a step sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub sequence: SequenceId,
    pub step_index: usize,
    #[serde(default)]
    pub locals: FrameLocals,
    /// Prompt the active step is suspended on, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub awaiting: Option<PromptRequest>,
}

impl Frame {
    pub fn new(sequence: SequenceId) -> Self {
        Self {
            sequence,
            step_index: 0,
            locals: FrameLocals::default(),
            awaiting: None,
        }
    }
}

// ============================================================================
// Dialog State
// ============================================================================

/// Everything persisted for one session between turns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogState {
    /// Innermost frame last
    pub stack: Vec<Frame>,
    pub record: FieldRecord,
}

impl DialogState {
    /// Fresh state with a single frame for `root`
    pub fn start(root: SequenceId) -> Self {
        Self {
            stack: vec![Frame::new(root)],
            record: FieldRecord::new(),
        }
    }

    pub fn active(&self) -> Option<&Frame> {
        self.stack.last()
    }

    pub fn active_mut(&mut self) -> Option<&mut Frame> {
        self.stack.last_mut()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Prompt the session is currently waiting on
    pub fn awaiting(&self) -> Option<&PromptRequest> {
        self.active().and_then(|f| f.awaiting.as_ref())
    }
}
