//! Side-effecting boundaries: config, persisted artifacts, subprocesses,
//! scratch space.

pub mod config;
pub mod deck_store;
pub mod process;
pub mod profile_store;
pub mod workspace;

use anyhow::{Result, anyhow};
use serde_json::Value;

/// Validate a JSON instance against an embedded schema document, joining
/// violations into one error.
pub(crate) fn validate_schema(schema_raw: &str, instance: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(schema_raw)
        .map_err(|err| anyhow!("embedded schema is not valid json: {err}"))?;
    let compiled =
        jsonschema::validator_for(&schema).map_err(|err| anyhow!("invalid schema: {err}"))?;
    if compiled.is_valid(instance) {
        return Ok(());
    }
    let messages = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect::<Vec<_>>();
    Err(anyhow!("schema validation failed: {}", messages.join("; ")))
}
