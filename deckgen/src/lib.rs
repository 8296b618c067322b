//! Prompt-to-deck generation pipeline.
//!
//! Turns a natural-language request into a validated deck specification
//! through a bounded generate-and-validate loop. The architecture enforces a
//! strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (data model, stage graph, layout
//!   binding). No I/O, fully testable in isolation.
//! - **[`stages`]**: One function per pipeline stage, each mapping the shared
//!   state to a delta through the collaborator traits.
//! - **[`llm`]** / **[`render`]**: Collaborator seams, with the
//!   OpenAI-compatible client, command renderer, and LibreOffice rasterizer as
//!   the concrete implementations.
//! - **[`io`]**: Side-effecting operations (config, stores, subprocesses).
//!
//! The [`pipeline`] module orchestrates the stages over the
//! [`core::machine`] stage graph and is the crate's main entry point.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod render;
pub mod stages;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
