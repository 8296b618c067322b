//! Planner stage: narrative outline via free-text completion.

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::state::{PipelineState, StageUpdate};
use crate::llm::TextCompletion;
use crate::stages::prompt::{PLANNER_SYSTEM, PromptEngine};

/// Plan the deck outline. Collaborator failures propagate: with no outline
/// there is nothing downstream to salvage.
pub fn run_planner<L: TextCompletion>(
    llm: &L,
    engine: &PromptEngine,
    state: &PipelineState,
) -> Result<StageUpdate> {
    let user = engine.render_planner(state).context("render planner prompt")?;
    let outline = llm
        .complete_text(PLANNER_SYSTEM, &user)
        .context("planner completion")?;
    debug!(chars = outline.len(), "outline planned");
    Ok(StageUpdate {
        planned_outline: Some(outline),
        ..Default::default()
    })
}
