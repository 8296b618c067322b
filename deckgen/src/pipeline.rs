//! Orchestrator: drives the stage machine from context building to terminal
//! delivery, merging each stage's delta into one [`PipelineState`].
//!
//! [`PipelineState`]: crate::core::state::PipelineState

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::context::layouts_context;
use crate::core::deck::DeckSpec;
use crate::core::machine::{PipelinePolicy, Stage, next_stage};
use crate::core::profile::TemplateProfile;
use crate::core::state::{DeckRequest, PipelineState, StageUpdate};
use crate::io::workspace::RenderWorkspace;
use crate::llm::{StructuredCompletion, TextCompletion, VisionCritique};
use crate::render::{DeckRenderer, Rasterizer};
use crate::stages::prompt::PromptEngine;
use crate::stages::{planner, reviewer, visual, writer};

/// Terminal result of a run that produced a deck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub deck: DeckSpec,
    /// Whether the final validation attempt passed. `false` means the budget
    /// ran out with a draft in hand; the deck is delivered regardless.
    pub review_passed: bool,
    /// Last validation feedback, present only when `review_passed` is false.
    pub feedback: Option<String>,
    /// Final value of the shared validation counter.
    pub iterations: u32,
    /// Non-fatal findings accumulated across the run.
    pub warnings: Vec<String>,
}

/// Failures the orchestrator's caller must handle.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The profile failed its own invariants; nothing was attempted.
    #[error("invalid template profile: {0}")]
    InvalidProfile(String),
    /// The planner's collaborator failed. Propagated unrecovered: without an
    /// outline there is nothing downstream to retry against.
    #[error("planner failed: {0:#}")]
    Planner(anyhow::Error),
    /// The retry budget ran out before any draft existed.
    #[error("retry budget exhausted without a deck: {feedback}")]
    BudgetExhausted { feedback: String },
}

/// Run the full generation pipeline over one request.
///
/// Strictly sequential; blocks on every collaborator call. The render
/// workspace is created lazily on the first visual attempt and removed when
/// this function returns, whichever way it returns.
pub fn run_pipeline<L, R, Z, V>(
    llm: &L,
    renderer: &R,
    rasterizer: &Z,
    critic: &V,
    profile: TemplateProfile,
    request: DeckRequest,
    policy: &PipelinePolicy,
) -> Result<PipelineOutcome, PipelineError>
where
    L: TextCompletion + StructuredCompletion,
    R: DeckRenderer,
    Z: Rasterizer,
    V: VisionCritique,
{
    let problems = profile.validate();
    if !problems.is_empty() {
        return Err(PipelineError::InvalidProfile(problems.join("; ")));
    }

    let engine = PromptEngine::new();
    let mut state = PipelineState::new(profile, request);
    let mut stage = Stage::BuildContext;
    let mut workspace: Option<RenderWorkspace> = None;
    info!(
        slide_count = state.request.slide_count,
        tone = %state.request.tone,
        "pipeline started"
    );

    while stage != Stage::Done {
        let update = match stage {
            Stage::BuildContext => StageUpdate {
                layouts_context: Some(layouts_context(&state.profile)),
                ..Default::default()
            },
            Stage::Plan => {
                planner::run_planner(llm, &engine, &state).map_err(PipelineError::Planner)?
            }
            Stage::Write => writer::run_writer(llm, &engine, &state),
            Stage::Review => reviewer::run_review(&state),
            Stage::VisualCheck => match visual_attempt_dir(&mut workspace, state.iterations + 1) {
                Ok(dir) => visual::run_visual(
                    renderer,
                    rasterizer,
                    critic,
                    &engine,
                    &policy.visual,
                    &state,
                    &dir,
                ),
                Err(err) => visual::environment_failure(&state, &format!("{err:#}")),
            },
            Stage::Done => break,
        };
        update.apply(&mut state);
        let next = next_stage(stage, &state, &policy.retry, &policy.visual);
        debug!(
            from = ?stage,
            to = ?next,
            iterations = state.iterations,
            passed = state.review_passed,
            "stage complete"
        );
        stage = next;
    }

    finish(state)
}

fn visual_attempt_dir(
    workspace: &mut Option<RenderWorkspace>,
    attempt: u32,
) -> Result<std::path::PathBuf> {
    let workspace = match workspace {
        Some(workspace) => workspace,
        None => workspace.insert(RenderWorkspace::create()?),
    };
    workspace.attempt_dir(attempt)
}

fn finish(state: PipelineState) -> Result<PipelineOutcome, PipelineError> {
    match state.draft {
        Some(deck) => {
            info!(
                slides = deck.slides.len(),
                passed = state.review_passed,
                iterations = state.iterations,
                "pipeline finished"
            );
            let feedback = if state.review_passed {
                None
            } else {
                state.review_feedback
            };
            Ok(PipelineOutcome {
                deck,
                review_passed: state.review_passed,
                feedback,
                iterations: state.iterations,
                warnings: state.warnings,
            })
        }
        None => Err(PipelineError::BudgetExhausted {
            feedback: state
                .review_feedback
                .unwrap_or_else(|| "no deck specification was produced".to_string()),
        }),
    }
}

/// Prompt that re-enters the pipeline for an edit pass: the current deck,
/// serialized, followed by the requested change. Editing is not a separate
/// mode; this string simply becomes the request prompt of a fresh run.
pub fn edit_prompt(deck: &DeckSpec, instruction: &str) -> Result<String> {
    let current =
        serde_json::to_string_pretty(deck).context("serialize deck for edit prompt")?;
    Ok(format!(
        "Revise an existing deck.\n\nCurrent deck specification JSON:\n{current}\n\n\
         Edit instruction: {instruction}\n\n\
         Apply the requested change and return the full updated deck, keeping \
         everything not named in the instruction as it is."
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        ScriptedLlm, ScriptedRasterizer, ScriptedRenderer, sample_deck, sample_profile,
        sample_request,
    };

    #[test]
    fn invalid_profile_fails_before_any_collaborator_call() {
        let mut profile = sample_profile();
        profile.template_name.clear();
        let llm = ScriptedLlm::new();
        let err = run_pipeline(
            &llm,
            &ScriptedRenderer::new(),
            &ScriptedRasterizer::new(),
            &llm,
            profile,
            sample_request(),
            &PipelinePolicy::default(),
        )
        .expect_err("invalid profile");
        assert!(matches!(err, PipelineError::InvalidProfile(_)));
        assert_eq!(llm.text_prompts().len(), 0);
        assert_eq!(llm.structured_prompts().len(), 0);
    }

    #[test]
    fn edit_prompt_carries_the_deck_and_the_instruction_in_order() {
        let deck = sample_deck();
        let prompt = edit_prompt(&deck, "make slide 2 punchier").expect("edit prompt");
        let deck_at = prompt.find("\"deck_title\"").expect("deck json present");
        let instruction_at = prompt
            .find("make slide 2 punchier")
            .expect("instruction present");
        assert!(deck_at < instruction_at);
        assert!(prompt.contains(&deck.deck_title));
    }
}
