//! Render through a user-configured command.
//!
//! Any concrete deck producer (a python-pptx script, unoconv, an in-house
//! tool) can plug in here: the configured argv gets the deck, profile,
//! template, and expected output path substituted in, and must leave the
//! rendered document at `{output}`.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tracing::{debug, warn};

use crate::core::binding::check_deck_binding;
use crate::io::deck_store;
use crate::io::process::run_command_with_timeout;
use crate::io::profile_store;
use crate::render::{DeckRenderer, RenderError, RenderRequest};

pub struct CommandRenderer {
    command: Vec<String>,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl CommandRenderer {
    pub fn new(command: Vec<String>, timeout: Duration, output_limit_bytes: usize) -> Self {
        Self {
            command,
            timeout,
            output_limit_bytes,
        }
    }
}

impl DeckRenderer for CommandRenderer {
    fn render(&self, request: &RenderRequest<'_>) -> Result<PathBuf, RenderError> {
        // Layout references are checked before anything runs so a bad deck
        // fails with the offending layout id. Unknown field keys are only
        // warned about; the render tool skips them.
        let unknown = check_deck_binding(request.profile, request.deck)?;
        for finding in &unknown {
            warn!(
                slide = %finding.slide_id,
                layout = finding.layout_id,
                key = %finding.key,
                "field key not in layout, renderer will skip it"
            );
        }

        if self.command.is_empty() {
            return Err(RenderError::Tool("no render command configured".to_string()));
        }

        let deck_path = request.dir.join("deck.json");
        let profile_path = request.dir.join("profile.json");
        let output_path = request.dir.join("deck.pptx");
        deck_store::write_deck(&deck_path, request.deck)
            .map_err(|e| RenderError::Tool(format!("{e:#}")))?;
        profile_store::write_profile(&profile_path, request.profile)
            .map_err(|e| RenderError::Tool(format!("{e:#}")))?;

        let argv = substitute_args(
            &self.command,
            &deck_path,
            &profile_path,
            request.template,
            &output_path,
        )?;

        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..]);
        let output = run_command_with_timeout(cmd, self.timeout, self.output_limit_bytes)
            .map_err(|e| RenderError::Tool(format!("{e:#}")))?;
        if output.timed_out {
            return Err(RenderError::Tool(format!(
                "timed out after {}s",
                self.timeout.as_secs()
            )));
        }
        if !output.status.success() {
            return Err(RenderError::Tool(format!(
                "exited with {}: {}",
                output.status,
                output.stderr_lossy()
            )));
        }
        if !output_path.exists() {
            return Err(RenderError::Tool(format!(
                "no output produced at {}",
                output_path.display()
            )));
        }
        debug!(document = %output_path.display(), "deck rendered");
        Ok(output_path)
    }
}

/// Substitute `{deck}`, `{profile}`, `{template}`, and `{output}` in every
/// argument of the configured command.
fn substitute_args(
    command: &[String],
    deck: &Path,
    profile: &Path,
    template: Option<&Path>,
    output: &Path,
) -> Result<Vec<String>, RenderError> {
    let mut argv = Vec::with_capacity(command.len());
    for arg in command {
        if arg.contains("{template}") && template.is_none() {
            return Err(RenderError::Tool(
                "render command uses {template} but no template document was provided".to_string(),
            ));
        }
        let mut substituted = arg
            .replace("{deck}", &deck.display().to_string())
            .replace("{profile}", &profile.display().to_string())
            .replace("{output}", &output.display().to_string());
        if let Some(template) = template {
            substituted = substituted.replace("{template}", &template.display().to_string());
        }
        argv.push(substituted);
    }
    Ok(argv)
}
