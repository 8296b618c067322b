//! Transient render workspace.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

/// Scratch directory for one run's render and rasterization artifacts.
///
/// Owned exclusively by the pipeline invocation and removed on drop, so
/// every exit path cleans up.
pub struct RenderWorkspace {
    dir: TempDir,
}

impl RenderWorkspace {
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("deckgen-")
            .tempdir()
            .context("create render workspace")?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Fresh subdirectory for one visual-validation attempt.
    pub fn attempt_dir(&self, attempt: u32) -> Result<PathBuf> {
        let path = self.dir.path().join(format!("attempt-{attempt}"));
        fs::create_dir_all(&path)
            .with_context(|| format!("create attempt dir {}", path.display()))?;
        Ok(path)
    }
}
