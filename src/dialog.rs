//! Dialog-stack engine
//!
//! Waterfall-style step sequences executed one turn at a time against a
//! persisted call stack. The transition function is pure: it consumes the
//! session's stored state plus one inbound input and returns the new state
//! together with the effects the session router must carry out.

mod effect;
pub mod prompt;
pub mod record;
pub mod sequence;
pub mod state;
mod steps;
pub(crate) mod transition;


pub use effect::Effect;
pub use prompt::{PromptKind, PromptRequest};
pub use record::FieldRecord;
pub use sequence::{FlowVariant, Registry, SequenceId};
pub use state::DialogState;
pub use transition::{advance, StructuralError, TurnResult};
