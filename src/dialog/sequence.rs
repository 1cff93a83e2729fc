//! Step sequence definitions and the static registration table

use super::prompt::PromptRequest;
use super::record::FieldRecord;
use super::state::{FrameLocals, StepValue};
use super::steps;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identifier of a registered step sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceId {
    /// Top-level intake form
    Intake,
    /// Nested multi-select loop over review items
    ReviewSelection,
}

impl SequenceId {
    pub fn as_str(self) -> &'static str {
        match self {
            SequenceId::Intake => "intake",
            SequenceId::ReviewSelection => "review_selection",
        }
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every step the engine knows how to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepId {
    AskName,
    AskAge,
    AskPhoneNumber,
    AskEmail,
    AskGender,
    AskSymptoms,
    GateByAge,
    Acknowledge,
    PickReviewItem,
}

impl StepId {
    /// Execute this step once
    pub fn run(self, entry: StepEntry, ctx: &mut StepContext<'_>) -> StepOutcome {
        match self {
            StepId::AskName => steps::ask_name(entry, ctx),
            StepId::AskAge => steps::ask_age(entry, ctx),
            StepId::AskPhoneNumber => steps::ask_phone_number(entry, ctx),
            StepId::AskEmail => steps::ask_email(entry, ctx),
            StepId::AskGender => steps::ask_gender(entry, ctx),
            StepId::AskSymptoms => steps::ask_symptoms(entry, ctx),
            StepId::GateByAge => steps::gate_by_age(entry, ctx),
            StepId::Acknowledge => steps::acknowledge(entry, ctx),
            StepId::PickReviewItem => steps::pick_review_item(entry, ctx),
        }
    }
}

// ============================================================================
// Step Calling Convention
// ============================================================================

/// How control reached the step being run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepEntry {
    /// First entry; carries the previous step's `Advance` value
    Start(StepValue),
    /// Re-entry after suspending, with the validated prompt reply
    Answer(StepValue),
    /// Re-entry after a branched child sequence completed
    Returned(StepValue),
}

impl StepEntry {
    pub fn into_value(self) -> StepValue {
        match self {
            StepEntry::Start(v) | StepEntry::Answer(v) | StepEntry::Returned(v) => v,
        }
    }
}

/// What a step asks the sequencer to do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Suspend(PromptRequest),
    Advance(StepValue),
    Branch(SequenceId),
    Complete(StepValue),
}

impl StepOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            StepOutcome::Suspend(_) => "suspend",
            StepOutcome::Advance(_) => "advance",
            StepOutcome::Branch(_) => "branch",
            StepOutcome::Complete(_) => "complete",
        }
    }
}

/// Session data a step may read and mutate
pub struct StepContext<'a> {
    pub record: &'a mut FieldRecord,
    pub locals: &'a mut FrameLocals,
    pub messages: &'a mut Vec<String>,
}

impl StepContext<'_> {
    /// Queue an informational message for the user
    pub fn say(&mut self, text: impl Into<String>) {
        self.messages.push(text.into());
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Which top-level form to run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlowVariant {
    /// name, age, phone number, email, symptoms
    Basic,
    /// Basic plus a gender question before symptoms
    #[default]
    WithGender,
    /// No symptoms question; review is skipped for minors
    AgeGated,
}

impl FlowVariant {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "basic" => Some(FlowVariant::Basic),
            "with_gender" => Some(FlowVariant::WithGender),
            "age_gated" => Some(FlowVariant::AgeGated),
            _ => None,
        }
    }
}

/// Immutable definition of one step sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceDef {
    pub steps: Vec<StepId>,
}

impl SequenceDef {
    pub fn step(&self, index: usize) -> Option<StepId> {
        self.steps.get(index).copied()
    }
}

/// Sequences available to the engine, built once at startup
#[derive(Debug, Clone)]
pub struct Registry {
    root: SequenceId,
    sequences: HashMap<SequenceId, SequenceDef>,
}

impl Registry {
    /// The intake form with its review sub-flow
    pub fn new(variant: FlowVariant) -> Self {
        let mut intake = vec![
            StepId::AskName,
            StepId::AskAge,
            StepId::AskPhoneNumber,
            StepId::AskEmail,
        ];
        match variant {
            FlowVariant::Basic => intake.push(StepId::AskSymptoms),
            FlowVariant::WithGender => intake.extend([StepId::AskGender, StepId::AskSymptoms]),
            FlowVariant::AgeGated => intake.push(StepId::GateByAge),
        }
        intake.push(StepId::Acknowledge);

        Self::empty(SequenceId::Intake)
            .with_sequence(SequenceId::Intake, intake)
            .with_sequence(SequenceId::ReviewSelection, vec![StepId::PickReviewItem])
    }

    /// Registry with nothing registered yet
    pub fn empty(root: SequenceId) -> Self {
        Self {
            root,
            sequences: HashMap::new(),
        }
    }

    pub fn with_sequence(mut self, id: SequenceId, steps: Vec<StepId>) -> Self {
        self.sequences.insert(id, SequenceDef { steps });
        self
    }

    pub fn root(&self) -> SequenceId {
        self.root
    }

    pub fn get(&self, id: SequenceId) -> Option<&SequenceDef> {
        self.sequences.get(&id)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(FlowVariant::default())
    }
}
