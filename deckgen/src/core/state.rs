//! Shared pipeline state and the per-stage deltas merged into it.

use std::path::PathBuf;

use crate::core::deck::DeckSpec;
use crate::core::profile::TemplateProfile;

/// Caller inputs for one generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckRequest {
    /// Natural-language description of the deck to produce.
    pub prompt: String,
    /// Desired number of slides.
    pub slide_count: u32,
    /// Presentation tone, e.g. "professional".
    pub tone: String,
    /// Template document to render against, when visual validation runs.
    pub template: Option<PathBuf>,
}

/// The single mutable state threaded through the pipeline stages.
///
/// Stages never mutate this directly; each returns a [`StageUpdate`] that the
/// orchestrator merges, so every transition stays auditable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineState {
    pub profile: TemplateProfile,
    pub request: DeckRequest,

    /// Layouts text block produced by the context builder.
    pub layouts_context: String,
    /// Narrative outline produced by the planner.
    pub planned_outline: Option<String>,
    /// Most recent draft produced by the writer, if any.
    pub draft: Option<DeckSpec>,
    /// Feedback from the most recent failed validation.
    pub review_feedback: Option<String>,
    /// Whether the most recent validation passed.
    pub review_passed: bool,
    /// Shared validation counter: incremented once by every reviewer or
    /// visual-validator invocation.
    pub iterations: u32,
    /// Non-fatal findings surfaced to the caller (e.g. fail-open passes).
    pub warnings: Vec<String>,
}

impl PipelineState {
    pub fn new(profile: TemplateProfile, request: DeckRequest) -> Self {
        Self {
            profile,
            request,
            layouts_context: String::new(),
            planned_outline: None,
            draft: None,
            review_feedback: None,
            review_passed: false,
            iterations: 0,
            warnings: Vec::new(),
        }
    }
}

/// Delta returned by a stage. `None` fields leave the state untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageUpdate {
    pub layouts_context: Option<String>,
    pub planned_outline: Option<String>,
    /// `Some(None)` clears a previously held draft (a failed writer attempt
    /// discards the prior draft rather than leaving a stale one in place).
    pub draft: Option<Option<DeckSpec>>,
    pub review_feedback: Option<String>,
    pub review_passed: Option<bool>,
    pub iterations: Option<u32>,
    /// Appended to the state's warnings, never replacing them.
    pub warnings: Vec<String>,
}

impl StageUpdate {
    pub fn apply(self, state: &mut PipelineState) {
        if let Some(context) = self.layouts_context {
            state.layouts_context = context;
        }
        if let Some(outline) = self.planned_outline {
            state.planned_outline = Some(outline);
        }
        if let Some(draft) = self.draft {
            state.draft = draft;
        }
        if let Some(feedback) = self.review_feedback {
            state.review_feedback = Some(feedback);
        }
        if let Some(passed) = self.review_passed {
            state.review_passed = passed;
        }
        if let Some(iterations) = self.iterations {
            state.iterations = iterations;
        }
        state.warnings.extend(self.warnings);
    }
}
