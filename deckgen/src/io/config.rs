//! deckgen configuration (TOML).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::machine::{PipelinePolicy, RetryPolicy, VisualPolicy};

/// deckgen configuration (TOML).
///
/// Intended to be edited by humans; missing fields default to sensible
/// values, so an empty file is a valid config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DeckgenConfig {
    pub llm: LlmConfig,
    pub pipeline: PipelineConfig,
    pub visual: VisualConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible API root, without the trailing `/chat/completions`.
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Wall-clock timeout per model call in seconds.
    pub call_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Writer re-invocations allowed after failed semantic reviews.
    pub max_semantic_retries: u32,
    /// Writer re-invocations allowed across semantic and visual validation.
    pub max_total_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VisualConfig {
    /// Run visual validation when a render command and template are at hand.
    pub enabled: bool,
    /// Pass the visual check when rasterization yields no images or the
    /// critique service fails.
    pub fail_open: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RenderConfig {
    /// Render command argv with `{deck}`, `{profile}`, `{template}`,
    /// `{output}` placeholders. Empty disables the visual stage.
    pub command: Vec<String>,
    /// Wall-clock timeout per render/rasterize subprocess in seconds.
    pub timeout_secs: u64,
    /// Truncate captured subprocess output beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-2024-08-06".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            call_timeout_secs: 120,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_semantic_retries: 3,
            max_total_retries: 3,
        }
    }
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fail_open: true,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            timeout_secs: 120,
            output_limit_bytes: 100_000,
        }
    }
}

impl Default for DeckgenConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            pipeline: PipelineConfig::default(),
            visual: VisualConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl DeckgenConfig {
    pub fn validate(&self) -> Result<()> {
        if self.llm.base_url.trim().is_empty() {
            return Err(anyhow!("llm.base_url must be non-empty"));
        }
        if self.llm.model.trim().is_empty() {
            return Err(anyhow!("llm.model must be non-empty"));
        }
        if self.llm.api_key_env.trim().is_empty() {
            return Err(anyhow!("llm.api_key_env must be non-empty"));
        }
        if self.llm.call_timeout_secs == 0 {
            return Err(anyhow!("llm.call_timeout_secs must be > 0"));
        }
        if self.pipeline.max_semantic_retries == 0 {
            return Err(anyhow!("pipeline.max_semantic_retries must be > 0"));
        }
        if self.pipeline.max_total_retries == 0 {
            return Err(anyhow!("pipeline.max_total_retries must be > 0"));
        }
        if self.render.timeout_secs == 0 {
            return Err(anyhow!("render.timeout_secs must be > 0"));
        }
        if self.render.output_limit_bytes == 0 {
            return Err(anyhow!("render.output_limit_bytes must be > 0"));
        }
        Ok(())
    }

    /// Policy for one pipeline run. `render_ready` says whether a renderer
    /// and template are actually at hand; the visual stage only runs when the
    /// config wants it and rendering is possible.
    pub fn pipeline_policy(&self, render_ready: bool) -> PipelinePolicy {
        PipelinePolicy {
            retry: RetryPolicy {
                max_semantic_retries: self.pipeline.max_semantic_retries,
                max_total_retries: self.pipeline.max_total_retries,
            },
            visual: VisualPolicy {
                enabled: self.visual.enabled && render_ready,
                fail_open: self.visual.fail_open,
            },
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `DeckgenConfig::default()`.
pub fn load_config(path: &Path) -> Result<DeckgenConfig> {
    if !path.exists() {
        let cfg = DeckgenConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: DeckgenConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &DeckgenConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
