//! Rasterize rendered documents into per-page images.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, warn};

use crate::io::process::run_command_with_timeout;
use crate::render::Rasterizer;

static PAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^page-(\d+)\.png$").expect("page regex is valid"));

/// Converts a document to PDF with LibreOffice and the PDF to PNGs with
/// pdftoppm.
///
/// Environments without these tools are expected: every failure path logs a
/// warning and yields an empty list, leaving the fail-open decision to the
/// caller.
pub struct SofficeRasterizer {
    timeout: Duration,
    output_limit_bytes: usize,
}

impl SofficeRasterizer {
    pub fn new(timeout: Duration, output_limit_bytes: usize) -> Self {
        Self {
            timeout,
            output_limit_bytes,
        }
    }

    fn try_rasterize(&self, document: &Path, dir: &Path) -> Option<Vec<PathBuf>> {
        let mut cmd = Command::new("soffice");
        cmd.args(["--headless", "--convert-to", "pdf", "--outdir"])
            .arg(dir)
            .arg(document);
        let out = match run_command_with_timeout(cmd, self.timeout, self.output_limit_bytes) {
            Ok(out) => out,
            Err(err) => {
                warn!(err = %format!("{err:#}"), "soffice unavailable");
                return None;
            }
        };
        if out.timed_out || !out.status.success() {
            warn!(
                timed_out = out.timed_out,
                stderr = %out.stderr_lossy(),
                "pdf conversion failed"
            );
            return None;
        }

        let stem = document.file_stem()?.to_string_lossy();
        let pdf = dir.join(format!("{stem}.pdf"));
        if !pdf.exists() {
            warn!(pdf = %pdf.display(), "pdf conversion produced no file");
            return None;
        }

        let mut cmd = Command::new("pdftoppm");
        cmd.arg("-png").arg(&pdf).arg(dir.join("page"));
        let out = match run_command_with_timeout(cmd, self.timeout, self.output_limit_bytes) {
            Ok(out) => out,
            Err(err) => {
                warn!(err = %format!("{err:#}"), "pdftoppm unavailable");
                return None;
            }
        };
        if out.timed_out || !out.status.success() {
            warn!(
                timed_out = out.timed_out,
                stderr = %out.stderr_lossy(),
                "page conversion failed"
            );
            return None;
        }

        let pages = collect_pages(dir);
        if pages.is_empty() {
            warn!("pdftoppm produced no images");
            return None;
        }
        Some(pages)
    }
}

impl Rasterizer for SofficeRasterizer {
    fn rasterize(&self, document: &Path, dir: &Path) -> Vec<PathBuf> {
        match self.try_rasterize(document, dir) {
            Some(pages) => {
                debug!(pages = pages.len(), "document rasterized");
                pages
            }
            None => Vec::new(),
        }
    }
}

/// Collect images named `page-N.png` in numeric page order. pdftoppm pads
/// page numbers to a document-dependent width, so lexicographic order is not
/// enough.
fn collect_pages(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut pages: Vec<(u32, PathBuf)> = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(caps) = PAGE_RE.captures(name)
            && let Ok(n) = caps[1].parse::<u32>()
        {
            pages.push((n, entry.path()));
        }
    }
    pages.sort_by_key(|(n, _)| *n);
    pages.into_iter().map(|(_, path)| path).collect()
}
