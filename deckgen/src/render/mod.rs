//! Rendering and rasterization collaborator seams.
//!
//! Turning a deck specification into a concrete document, and that document
//! into page images, is external to the pipeline. [`command`] renders through
//! a user-configured command; [`raster`] rasterizes through LibreOffice and
//! pdftoppm.

pub mod command;
pub mod raster;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::binding::LayoutBindingError;
use crate::core::deck::DeckSpec;
use crate::core::profile::TemplateProfile;

/// Failure modes of one render attempt. These are validation feedback for
/// the pipeline, never a fatal abort.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A slide references a layout the profile cannot honor.
    #[error(transparent)]
    Layout(#[from] LayoutBindingError),
    /// The render tool failed, timed out, or could not run.
    #[error("render command failed: {0}")]
    Tool(String),
}

/// Inputs for one render attempt.
#[derive(Debug)]
pub struct RenderRequest<'a> {
    /// Template document to instantiate, when the renderer needs one.
    pub template: Option<&'a Path>,
    pub profile: &'a TemplateProfile,
    pub deck: &'a DeckSpec,
    /// Attempt-scoped scratch directory owned by the pipeline.
    pub dir: &'a Path,
}

/// Produces a rendered document from a deck specification.
pub trait DeckRenderer {
    fn render(&self, request: &RenderRequest<'_>) -> Result<PathBuf, RenderError>;
}

/// Converts a rendered document into per-page images.
///
/// Infallible by contract: an implementation that cannot rasterize returns an
/// empty list (after logging why), and the caller decides what an empty list
/// means.
pub trait Rasterizer {
    fn rasterize(&self, document: &Path, dir: &Path) -> Vec<PathBuf>;
}
