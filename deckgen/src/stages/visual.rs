//! Visual validation: render the draft, rasterize it, and ask a vision
//! collaborator whether the slides hold up.

use std::path::Path;

use tracing::{debug, warn};

use crate::core::machine::VisualPolicy;
use crate::core::state::{PipelineState, StageUpdate};
use crate::llm::VisionCritique;
use crate::render::{DeckRenderer, Rasterizer, RenderRequest};
use crate::stages::prompt::PromptEngine;

/// Affirmative critique reply: the token alone, case-insensitive, with at
/// most a trailing period. A qualified "PASS - but ..." is a failure.
pub fn is_pass_reply(reply: &str) -> bool {
    let trimmed = reply.trim();
    let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed).trim_end();
    trimmed.eq_ignore_ascii_case("pass")
}

/// One visual-validation attempt over `dir`, a scratch directory owned by
/// this attempt. Always increments the shared iteration counter.
///
/// Failure handling is deliberately asymmetric: a render failure is feedback
/// for the writer (the deck itself may be at fault), while missing
/// rasterization output or an unreachable critique service says nothing
/// about the deck and passes when `fail_open` is set.
pub fn run_visual<R, Z, V>(
    renderer: &R,
    rasterizer: &Z,
    critic: &V,
    engine: &PromptEngine,
    policy: &VisualPolicy,
    state: &PipelineState,
    dir: &Path,
) -> StageUpdate
where
    R: DeckRenderer,
    Z: Rasterizer,
    V: VisionCritique,
{
    let iterations = state.iterations + 1;
    let Some(deck) = &state.draft else {
        return fail(
            iterations,
            "No deck specification available for visual validation.".to_string(),
        );
    };

    let request = RenderRequest {
        template: state.request.template.as_deref(),
        profile: &state.profile,
        deck,
        dir,
    };
    let document = match renderer.render(&request) {
        Ok(document) => document,
        Err(err) => {
            warn!(err = %err, "render attempt failed");
            return fail(iterations, format!("Rendering failed: {err}"));
        }
    };

    let images = rasterizer.rasterize(&document, dir);
    if images.is_empty() {
        if policy.fail_open {
            warn!("rasterization produced no images, passing visual check");
            return StageUpdate {
                review_passed: Some(true),
                iterations: Some(iterations),
                warnings: vec![
                    "visual check skipped: rasterization produced no images".to_string(),
                ],
                ..Default::default()
            };
        }
        return fail(iterations, "Rasterization produced no slide images.".to_string());
    }

    let instruction = match engine.render_critique() {
        Ok(instruction) => instruction,
        Err(err) => return service_failure(policy, iterations, format!("{err:#}")),
    };
    match critic.critique_images(&instruction, &images) {
        Ok(reply) if is_pass_reply(&reply) => {
            debug!(images = images.len(), iterations, "visual check passed");
            StageUpdate {
                review_passed: Some(true),
                iterations: Some(iterations),
                ..Default::default()
            }
        }
        // The critique itself is the feedback; forward it untouched.
        Ok(reply) => fail(iterations, reply),
        Err(err) => service_failure(policy, iterations, err.to_string()),
    }
}

/// A visual attempt whose environment could not even be prepared (no scratch
/// directory). Treated like a render failure: feedback, not a fatal error.
pub fn environment_failure(state: &PipelineState, reason: &str) -> StageUpdate {
    fail(
        state.iterations + 1,
        format!("Rendering failed: {reason}"),
    )
}

fn service_failure(policy: &VisualPolicy, iterations: u32, err: String) -> StageUpdate {
    if policy.fail_open {
        warn!(err = %err, "visual critique unavailable, passing");
        StageUpdate {
            review_passed: Some(true),
            iterations: Some(iterations),
            warnings: vec![format!("visual critique unavailable: {err}")],
            ..Default::default()
        }
    } else {
        fail(iterations, format!("Visual critique failed: {err}"))
    }
}

fn fail(iterations: u32, feedback: String) -> StageUpdate {
    StageUpdate {
        review_passed: Some(false),
        review_feedback: Some(feedback),
        iterations: Some(iterations),
        ..Default::default()
    }
}
