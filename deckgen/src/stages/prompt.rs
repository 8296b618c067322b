//! Prompt construction for the planner, writer, and critique calls.

use anyhow::Result;
use minijinja::{Environment, context};

use crate::core::state::PipelineState;

const PLANNER_TEMPLATE: &str = include_str!("prompts/planner.md");
const WRITER_TEMPLATE: &str = include_str!("prompts/writer.md");
const CRITIQUE_TEMPLATE: &str = include_str!("prompts/critique.md");

pub const PLANNER_SYSTEM: &str = "You are a master presentation strategist. \
You design compelling, audience-aware narrative outlines for slide decks.";

pub const WRITER_SYSTEM: &str = "You are an expert presentation writer. You \
turn outlines into complete structured deck specifications that fit the given \
template exactly.";

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("planner", PLANNER_TEMPLATE)
            .expect("planner template should be valid");
        env.add_template("writer", WRITER_TEMPLATE)
            .expect("writer template should be valid");
        env.add_template("critique", CRITIQUE_TEMPLATE)
            .expect("critique template should be valid");
        Self { env }
    }

    pub fn render_planner(&self, state: &PipelineState) -> Result<String> {
        let template = self.env.get_template("planner")?;
        let rendered = template.render(context! {
            prompt => state.request.prompt.trim(),
            slide_count => state.request.slide_count,
            tone => state.request.tone.trim(),
        })?;
        Ok(rendered)
    }

    /// Writer request body. After a failed validation (`iterations > 0`, not
    /// passed), the previous feedback is prepended verbatim so the writer can
    /// self-correct.
    pub fn render_writer(&self, state: &PipelineState) -> Result<String> {
        let failure = (state.iterations > 0 && !state.review_passed)
            .then(|| state.review_feedback.as_deref())
            .flatten()
            .filter(|s| !s.trim().is_empty());
        let template = self.env.get_template("writer")?;
        let rendered = template.render(context! {
            failure => failure,
            layouts_context => state.layouts_context.as_str(),
            outline => state.planned_outline.as_deref().unwrap_or(""),
            slide_count => state.request.slide_count,
            tone => state.request.tone.trim(),
        })?;
        Ok(rendered)
    }

    pub fn render_critique(&self) -> Result<String> {
        let template = self.env.get_template("critique")?;
        Ok(template.render(context! {})?)
    }
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}
