//! Language-model collaborator seams.
//!
//! The pipeline talks to the model service through these traits so stages can
//! be driven by scripted stubs in tests. [`openai`] provides the real
//! OpenAI-compatible implementation.

pub mod openai;

use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

/// Failure modes of a model-service call.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The call could not be performed (connect, timeout, payload I/O).
    #[error("transport: {0}")]
    Transport(String),
    /// The service answered with a non-success status.
    #[error("service returned status {status}: {body}")]
    Service { status: u16, body: String },
    /// The service replied without usable content.
    #[error("completion was empty")]
    EmptyCompletion,
    /// The reply could not be parsed into the requested shape.
    #[error("malformed completion: {0}")]
    Malformed(String),
}

/// A named JSON Schema driving schema-constrained completion.
#[derive(Debug, Clone)]
pub struct ResponseSchema {
    pub name: String,
    pub schema: Value,
}

/// Free-text completion (planner).
pub trait TextCompletion {
    fn complete_text(&self, system: &str, user: &str) -> Result<String, LlmError>;
}

/// Schema-constrained completion (writer). Implementations guarantee the
/// returned value conforms to `schema`.
pub trait StructuredCompletion {
    fn complete_structured(
        &self,
        system: &str,
        user: &str,
        schema: &ResponseSchema,
    ) -> Result<Value, LlmError>;
}

/// Vision critique over rasterized slide images (visual validator).
pub trait VisionCritique {
    fn critique_images(&self, instruction: &str, images: &[PathBuf]) -> Result<String, LlmError>;
}
