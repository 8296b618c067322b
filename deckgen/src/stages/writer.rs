//! Writer stage: schema-constrained deck drafting.

use std::sync::LazyLock;

use tracing::{debug, warn};

use crate::core::deck::DeckSpec;
use crate::core::state::{PipelineState, StageUpdate};
use crate::io::deck_store::DECK_SPEC_SCHEMA;
use crate::llm::{ResponseSchema, StructuredCompletion};
use crate::stages::prompt::{PromptEngine, WRITER_SYSTEM};

static DECK_RESPONSE_SCHEMA: LazyLock<ResponseSchema> = LazyLock::new(|| ResponseSchema {
    name: "deck_spec".to_string(),
    schema: serde_json::from_str(DECK_SPEC_SCHEMA).expect("embedded deck schema is valid json"),
});

/// One drafting attempt. Never retries internally: every failure folds into
/// feedback for the next loop, and a failed attempt clears any prior draft
/// rather than leaving a stale one in place.
pub fn run_writer<L: StructuredCompletion>(
    llm: &L,
    engine: &PromptEngine,
    state: &PipelineState,
) -> StageUpdate {
    let user = match engine.render_writer(state) {
        Ok(user) => user,
        Err(err) => return failure(format!("Deck generation failed: {err:#}")),
    };
    match llm.complete_structured(WRITER_SYSTEM, &user, &DECK_RESPONSE_SCHEMA) {
        Ok(value) => match serde_json::from_value::<DeckSpec>(value) {
            Ok(deck) => {
                debug!(slides = deck.slides.len(), "draft produced");
                StageUpdate {
                    draft: Some(Some(deck)),
                    ..Default::default()
                }
            }
            Err(err) => failure(format!(
                "Deck generation failed: reply did not match the deck model: {err}"
            )),
        },
        Err(err) => failure(format!("Deck generation failed: {err}")),
    }
}

fn failure(feedback: String) -> StageUpdate {
    warn!(feedback = %feedback, "writer attempt failed");
    StageUpdate {
        draft: Some(None),
        review_feedback: Some(feedback),
        review_passed: Some(false),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::llm::LlmError;
    use crate::test_support::{ScriptedLlm, sample_deck, sample_profile, sample_request};

    fn state() -> PipelineState {
        PipelineState::new(sample_profile(), sample_request())
    }

    #[test]
    fn structured_reply_becomes_the_draft() {
        let deck = sample_deck();
        let llm = ScriptedLlm::new().with_draft(serde_json::to_value(&deck).expect("value"));
        let update = run_writer(&llm, &PromptEngine::new(), &state());
        assert_eq!(update.draft, Some(Some(deck)));
        assert!(update.review_feedback.is_none());
    }

    #[test]
    fn collaborator_failure_folds_into_feedback_and_clears_the_draft() {
        let llm = ScriptedLlm::new().with_draft_error(LlmError::Service {
            status: 429,
            body: "rate limited".to_string(),
        });
        let update = run_writer(&llm, &PromptEngine::new(), &state());
        assert_eq!(update.draft, Some(None));
        assert_eq!(update.review_passed, Some(false));
        let feedback = update.review_feedback.expect("feedback");
        assert!(feedback.starts_with("Deck generation failed:"));
        assert!(feedback.contains("429"));
    }

    #[test]
    fn model_mismatch_folds_into_feedback() {
        // Negative layout_id passes through a scripted stub but not the model.
        let llm = ScriptedLlm::new().with_draft(json!({
            "deck_title": "Launch",
            "slides": [
                {"slide_id": "s1", "layout_id": -1, "fields": [], "notes": null}
            ]
        }));
        let update = run_writer(&llm, &PromptEngine::new(), &state());
        assert_eq!(update.draft, Some(None));
        assert!(
            update
                .review_feedback
                .expect("feedback")
                .contains("did not match the deck model")
        );
    }
}
