//! Pipeline stages: each one turns the current [`PipelineState`] into a
//! [`StageUpdate`] and leaves all control flow to the orchestrator.
//!
//! [`PipelineState`]: crate::core::state::PipelineState
//! [`StageUpdate`]: crate::core::state::StageUpdate

pub mod planner;
pub mod prompt;
pub mod reviewer;
pub mod visual;
pub mod writer;
