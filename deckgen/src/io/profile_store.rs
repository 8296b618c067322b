//! Template profile load/save with schema + invariant validation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde_json::Value;

use crate::core::profile::{RawInventory, TemplateProfile};
use crate::io::validate_schema;

pub const TEMPLATE_PROFILE_SCHEMA: &str =
    include_str!("../../schemas/template_profile.schema.json");

/// Load and validate a profile from disk (schema + invariants).
pub fn load_profile(path: &Path) -> Result<TemplateProfile> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read profile {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parse profile {}", path.display()))?;
    validate_schema(TEMPLATE_PROFILE_SCHEMA, &value)
        .with_context(|| format!("validate profile {}", path.display()))?;
    let profile: TemplateProfile = serde_json::from_value(value)
        .with_context(|| format!("deserialize profile {}", path.display()))?;
    let errors = profile.validate();
    if !errors.is_empty() {
        return Err(anyhow!("profile invariants failed: {}", errors.join("; ")));
    }
    Ok(profile)
}

/// Write a profile as pretty-printed JSON with trailing newline.
pub fn write_profile(path: &Path, profile: &TemplateProfile) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(profile)?;
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write profile {}", path.display()))
}

/// Load a raw placeholder inventory (as emitted by an external profiler).
pub fn load_inventory(path: &Path) -> Result<RawInventory> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read inventory {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse inventory {}", path.display()))
}
