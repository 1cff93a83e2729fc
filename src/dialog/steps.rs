//! Step implementations for the intake form and its review sub-flow

use super::prompt::PromptRequest;
use super::sequence::{SequenceId, StepContext, StepEntry, StepOutcome};
use super::state::StepValue;

pub const NAME_PROMPT: &str = "Please enter your name.";
pub const AGE_PROMPT: &str = "Please enter your age.";
pub const PHONE_NUMBER_PROMPT: &str = "Please enter your phone number.";
pub const EMAIL_PROMPT: &str = "Please enter your Email address.";
pub const GENDER_PROMPT: &str = "Please enter your gender.";
pub const SYMPTOMS_PROMPT: &str = "Please describe your symptoms.";
pub const REVIEW_PROMPT: &str = "Please enter a symptom to review, or `done` to finish.";

/// Shown instead of the review loop to anyone younger than [`MINOR_AGE_LIMIT`]
pub const MINOR_NOTICE: &str = "You are to young, just call your mom to take you back.";
pub const MINOR_AGE_LIMIT: i32 = 16;

/// Reply that ends the review loop
pub const DONE_TOKEN: &str = "done";

/// Terms looked for in the free-text symptoms answer
pub const SYMPTOM_VOCABULARY: [&str; 3] = ["headache", "sore throat", "fever"];

/// Case-insensitive vocabulary hits, aligned with [`SYMPTOM_VOCABULARY`].
///
/// `None` means the answer carried no information at all (empty or only
/// whitespace).
pub fn match_symptoms(answer: &str) -> Option<[bool; SYMPTOM_VOCABULARY.len()]> {
    if answer.trim().is_empty() {
        return None;
    }
    let lowered = answer.to_lowercase();
    Some(SYMPTOM_VOCABULARY.map(|term| lowered.contains(term)))
}

pub fn is_done(reply: &str) -> bool {
    reply.trim() == DONE_TOKEN
}

/// Hand back the reply when this entry carries one, otherwise suspend on
/// `prompt`.
fn answer_or_prompt(entry: StepEntry, prompt: PromptRequest) -> Result<StepValue, StepOutcome> {
    match entry {
        StepEntry::Answer(value) => Ok(value),
        StepEntry::Start(_) | StepEntry::Returned(_) => Err(StepOutcome::Suspend(prompt)),
    }
}

pub fn ask_name(entry: StepEntry, ctx: &mut StepContext<'_>) -> StepOutcome {
    match answer_or_prompt(entry, PromptRequest::text(NAME_PROMPT)) {
        Ok(value) => {
            ctx.record.name = value.into_text();
            StepOutcome::Advance(StepValue::Empty)
        }
        Err(suspend) => suspend,
    }
}

pub fn ask_age(entry: StepEntry, ctx: &mut StepContext<'_>) -> StepOutcome {
    match answer_or_prompt(entry, PromptRequest::number(AGE_PROMPT)) {
        Ok(value) => {
            ctx.record.age = value.as_number().unwrap_or_default();
            StepOutcome::Advance(StepValue::Empty)
        }
        Err(suspend) => suspend,
    }
}

pub fn ask_phone_number(entry: StepEntry, ctx: &mut StepContext<'_>) -> StepOutcome {
    match answer_or_prompt(entry, PromptRequest::text(PHONE_NUMBER_PROMPT)) {
        Ok(value) => {
            ctx.record.phone_number = value.into_text();
            StepOutcome::Advance(StepValue::Empty)
        }
        Err(suspend) => suspend,
    }
}

pub fn ask_email(entry: StepEntry, ctx: &mut StepContext<'_>) -> StepOutcome {
    match answer_or_prompt(entry, PromptRequest::text(EMAIL_PROMPT)) {
        Ok(value) => {
            ctx.record.email = value.into_text();
            StepOutcome::Advance(StepValue::Empty)
        }
        Err(suspend) => suspend,
    }
}

pub fn ask_gender(entry: StepEntry, ctx: &mut StepContext<'_>) -> StepOutcome {
    match answer_or_prompt(entry, PromptRequest::optional_text(GENDER_PROMPT)) {
        Ok(value) => {
            ctx.record.gender = value.into_text();
            StepOutcome::Advance(StepValue::Empty)
        }
        Err(suspend) => suspend,
    }
}

/// Blank answers skip straight to acknowledgement with no review items.
/// Anything else enters the review sub-flow once; which terms matched does
/// not change the route.
pub fn ask_symptoms(entry: StepEntry, _ctx: &mut StepContext<'_>) -> StepOutcome {
    match entry {
        StepEntry::Start(_) => StepOutcome::Suspend(PromptRequest::optional_text(SYMPTOMS_PROMPT)),
        StepEntry::Answer(value) => {
            let answer = value.into_text();
            match match_symptoms(&answer) {
                None => StepOutcome::Advance(StepValue::List(Vec::new())),
                Some(hits) => {
                    tracing::debug!(?hits, "Symptoms answered, entering review");
                    StepOutcome::Branch(SequenceId::ReviewSelection)
                }
            }
        }
        StepEntry::Returned(selected) => StepOutcome::Advance(selected),
    }
}

/// Review for adults, an empty selection and a notice for minors
pub fn gate_by_age(entry: StepEntry, ctx: &mut StepContext<'_>) -> StepOutcome {
    match entry {
        StepEntry::Returned(selected) => StepOutcome::Advance(selected),
        StepEntry::Start(_) | StepEntry::Answer(_) => {
            if ctx.record.age < MINOR_AGE_LIMIT {
                ctx.say(MINOR_NOTICE);
                StepOutcome::Advance(StepValue::List(Vec::new()))
            } else {
                StepOutcome::Branch(SequenceId::ReviewSelection)
            }
        }
    }
}

pub fn acknowledge(entry: StepEntry, ctx: &mut StepContext<'_>) -> StepOutcome {
    let incoming = entry.into_value();
    let shape = incoming.shape();
    ctx.record.review_items = incoming.into_list().unwrap_or_else(|| {
        tracing::warn!(shape, "Review items had unexpected shape, using empty list");
        Vec::new()
    });

    let thanks = format!("Thanks for participating, {}.", ctx.record.name);
    ctx.say(thanks);
    StepOutcome::Complete(StepValue::Record(ctx.record.clone()))
}

/// One pass of the review loop. A non-`done` reply is held in the frame
/// and the loop continues in a nested frame; its result is appended after
/// this frame's selection on the way back out.
pub fn pick_review_item(entry: StepEntry, ctx: &mut StepContext<'_>) -> StepOutcome {
    match entry {
        StepEntry::Start(_) => StepOutcome::Suspend(PromptRequest::text(REVIEW_PROMPT)),
        StepEntry::Answer(value) => {
            let item = value.into_text();
            if is_done(&item) {
                StepOutcome::Complete(StepValue::List(Vec::new()))
            } else {
                ctx.locals.selection = Some(item);
                StepOutcome::Branch(SequenceId::ReviewSelection)
            }
        }
        StepEntry::Returned(rest) => {
            let mut items: Vec<String> = ctx.locals.selection.take().into_iter().collect();
            items.extend(rest.into_list().unwrap_or_default());
            StepOutcome::Complete(StepValue::List(items))
        }
    }
}
