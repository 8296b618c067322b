//! Semantic review of the current draft.

use tracing::debug;

use crate::core::state::{PipelineState, StageUpdate};

/// Cheap structural checks before any visual work is spent on the draft.
/// Pure, and always increments the shared iteration counter, pass or fail.
pub fn run_review(state: &PipelineState) -> StageUpdate {
    let iterations = state.iterations + 1;
    let mut update = StageUpdate {
        iterations: Some(iterations),
        ..Default::default()
    };
    match &state.draft {
        None => {
            // A failed writer attempt already explained itself; keep that
            // explanation rather than replacing it with a generic one.
            let feedback = state
                .review_feedback
                .clone()
                .unwrap_or_else(|| "No deck specification was produced.".to_string());
            update.review_passed = Some(false);
            update.review_feedback = Some(feedback);
        }
        Some(deck) if deck.slides.is_empty() => {
            update.review_passed = Some(false);
            update.review_feedback = Some("The deck has 0 slides generated.".to_string());
        }
        Some(deck) => {
            debug!(slides = deck.slides.len(), iterations, "semantic review passed");
            update.review_passed = Some(true);
        }
    }
    update
}
