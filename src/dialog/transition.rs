//! Pure turn function for the dialog engine
//!
//! Given the registry, the persisted state and the raw reply for this turn,
//! [`advance`] runs steps until one suspends or the top-level sequence
//! completes. It does no I/O; persistence and delivery come back as
//! [`Effect`]s for the session router to execute.

use super::effect::Effect;
use super::sequence::{Registry, SequenceId, StepContext, StepEntry, StepOutcome};
use super::state::{DialogState, Frame, StepValue};
use thiserror::Error;

/// Result of one turn
#[derive(Debug)]
pub struct TurnResult {
    /// `None` once the session has ended
    pub new_state: Option<DialogState>,
    pub effects: Vec<Effect>,
}

impl TurnResult {
    fn ongoing(state: DialogState) -> Self {
        Self {
            new_state: Some(state),
            effects: vec![],
        }
    }

    fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Fatal inconsistencies between the persisted state and the registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("Sequence `{sequence}` has no step at index {step_index}")]
    SequenceExhausted {
        sequence: SequenceId,
        step_index: usize,
    },
    #[error("Sequence `{0}` is not registered")]
    UnknownSequence(SequenceId),
    #[error("Session is not waiting for input")]
    NotAwaitingInput,
}

/// Run one turn.
///
/// With no prior state a new session starts at the registry's root sequence
/// and `input` is ignored. Otherwise `input` is validated against the prompt
/// the active frame is suspended on; a rejected reply leaves the state
/// untouched.
pub fn advance(
    registry: &Registry,
    state: Option<DialogState>,
    input: Option<&str>,
) -> Result<TurnResult, StructuralError> {
    let Some(mut state) = state else {
        let root = registry.root();
        if registry.get(root).is_none() {
            return Err(StructuralError::UnknownSequence(root));
        }
        return run_steps(registry, DialogState::start(root), StepEntry::Start(StepValue::Empty));
    };

    let frame = state
        .active_mut()
        .ok_or(StructuralError::NotAwaitingInput)?;
    let prompt = frame
        .awaiting
        .clone()
        .ok_or(StructuralError::NotAwaitingInput)?;

    match prompt.validate(input) {
        Ok(value) => {
            frame.awaiting = None;
            run_steps(registry, state, StepEntry::Answer(value))
        }
        Err(error) => {
            Ok(TurnResult::ongoing(state).with_effect(Effect::RejectInput { prompt, error }))
        }
    }
}

/// Drive the stack from `entry` until a step suspends or the stack empties
fn run_steps(
    registry: &Registry,
    mut state: DialogState,
    mut entry: StepEntry,
) -> Result<TurnResult, StructuralError> {
    let mut effects = Vec::new();

    loop {
        let DialogState { stack, record } = &mut state;
        let frame = stack.last_mut().ok_or(StructuralError::NotAwaitingInput)?;
        let sequence = registry
            .get(frame.sequence)
            .ok_or(StructuralError::UnknownSequence(frame.sequence))?;
        let step = sequence
            .step(frame.step_index)
            .ok_or(StructuralError::SequenceExhausted {
                sequence: frame.sequence,
                step_index: frame.step_index,
            })?;

        let mut messages = Vec::new();
        let outcome = step.run(
            entry,
            &mut StepContext {
                record,
                locals: &mut frame.locals,
                messages: &mut messages,
            },
        );
        effects.extend(messages.into_iter().map(Effect::send_message));
        tracing::debug!(
            sequence = %frame.sequence,
            step_index = frame.step_index,
            step = ?step,
            outcome = outcome.kind(),
            "Step ran"
        );

        match outcome {
            StepOutcome::Suspend(prompt) => {
                frame.awaiting = Some(prompt.clone());
                effects.push(Effect::PersistState);
                effects.push(Effect::IssuePrompt(prompt));
                return Ok(TurnResult {
                    new_state: Some(state),
                    effects,
                });
            }
            StepOutcome::Advance(value) => {
                frame.step_index += 1;
                entry = StepEntry::Start(value);
            }
            StepOutcome::Branch(child) => {
                if registry.get(child).is_none() {
                    return Err(StructuralError::UnknownSequence(child));
                }
                stack.push(Frame::new(child));
                entry = StepEntry::Start(StepValue::Empty);
            }
            StepOutcome::Complete(value) => {
                stack.pop();
                if stack.is_empty() {
                    let record = match value {
                        StepValue::Record(snapshot) => snapshot,
                        _ => state.record,
                    };
                    // Deliver first so a failed delivery leaves the last prompt stored
                    effects.push(Effect::DeliverRecord { record });
                    effects.push(Effect::ClearState);
                    return Ok(TurnResult {
                        new_state: None,
                        effects,
                    });
                }
                entry = StepEntry::Returned(value);
            }
        }
    }
}
