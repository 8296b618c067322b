//! Stage graph for the generation loop.
//!
//! The branch decisions live here as pure functions over the pipeline state
//! so the loop shape can be tested without any collaborators.

use crate::core::state::PipelineState;

/// Stages of the generation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Project the profile's allow-listed layouts into prompt context.
    BuildContext,
    /// Produce the narrative outline.
    Plan,
    /// Produce a structured deck draft.
    Write,
    /// Semantic review of the draft.
    Review,
    /// Render, rasterize, and critique the draft.
    VisualCheck,
    /// Terminal: deliver the outcome.
    Done,
}

/// Retry budgets over the shared iteration counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Writer re-invocations allowed after a failed semantic review.
    pub max_semantic_retries: u32,
    /// Writer re-invocations allowed across both validators combined.
    pub max_total_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_semantic_retries: 3,
            max_total_retries: 3,
        }
    }
}

/// Visual validation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualPolicy {
    /// Whether the visual stage runs at all.
    pub enabled: bool,
    /// Pass when rasterization yields no images or the critique service
    /// fails, instead of failing the attempt.
    pub fail_open: bool,
}

impl Default for VisualPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            fail_open: true,
        }
    }
}

/// Tunables for one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelinePolicy {
    pub retry: RetryPolicy,
    pub visual: VisualPolicy,
}

/// Next stage after `current`, given the merged state.
pub fn next_stage(
    current: Stage,
    state: &PipelineState,
    retry: &RetryPolicy,
    visual: &VisualPolicy,
) -> Stage {
    match current {
        Stage::BuildContext => Stage::Plan,
        Stage::Plan => Stage::Write,
        Stage::Write => Stage::Review,
        Stage::Review => after_review(state, retry, visual),
        Stage::VisualCheck => after_visual(state, retry),
        Stage::Done => Stage::Done,
    }
}

/// Routing after a semantic review: pass hands off to the visual check (or
/// terminates when it is disabled); failure loops back to the writer while
/// the iteration counter is under the semantic budget.
pub fn after_review(state: &PipelineState, retry: &RetryPolicy, visual: &VisualPolicy) -> Stage {
    if state.review_passed {
        if visual.enabled {
            Stage::VisualCheck
        } else {
            Stage::Done
        }
    } else if state.iterations < retry.max_semantic_retries {
        Stage::Write
    } else {
        Stage::Done
    }
}

/// Routing after a visual check: pass terminates; failure loops back to the
/// writer while the iteration counter is under the total budget. An exhausted
/// budget terminates regardless, so a visually failing deck is still
/// delivered.
pub fn after_visual(state: &PipelineState, retry: &RetryPolicy) -> Stage {
    if state.review_passed {
        Stage::Done
    } else if state.iterations < retry.max_total_retries {
        Stage::Write
    } else {
        Stage::Done
    }
}
