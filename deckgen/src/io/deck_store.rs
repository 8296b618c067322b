//! Deck specification load/save with schema validation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::core::deck::DeckSpec;
use crate::io::validate_schema;

/// The deck schema: validates persisted decks and drives schema-constrained
/// generation, so it follows strict-mode rules (every property required,
/// `notes` nullable rather than omittable).
pub const DECK_SPEC_SCHEMA: &str = include_str!("../../schemas/deck_spec.schema.json");

/// Load and validate a deck from disk.
pub fn load_deck(path: &Path) -> Result<DeckSpec> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read deck {}", path.display()))?;
    let value: Value =
        serde_json::from_str(&contents).with_context(|| format!("parse deck {}", path.display()))?;
    validate_schema(DECK_SPEC_SCHEMA, &value)
        .with_context(|| format!("validate deck {}", path.display()))?;
    serde_json::from_value(value).with_context(|| format!("deserialize deck {}", path.display()))
}

/// Write a deck as pretty-printed JSON with trailing newline.
pub fn write_deck(path: &Path, deck: &DeckSpec) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(deck)?;
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write deck {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_deck;

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("deck.json");
        let deck = sample_deck();
        write_deck(&path, &deck).expect("write");
        let loaded = load_deck(&path).expect("load");
        assert_eq!(loaded, deck);
    }

    /// What serde emits must satisfy the embedded schema, since the same
    /// schema is sent to the model service to constrain generation.
    #[test]
    fn serialized_decks_conform_to_the_embedded_schema() {
        let value = serde_json::to_value(sample_deck()).expect("serialize");
        validate_schema(DECK_SPEC_SCHEMA, &value).expect("schema agreement");
    }

    #[test]
    fn load_rejects_wrongly_typed_field_values() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("deck.json");
        fs::write(
            &path,
            r#"{
  "deck_title": "Launch",
  "slides": [
    {"slide_id": "s1", "layout_id": 0, "fields": [{"key": "title", "value": 3}], "notes": null}
  ]
}"#,
        )
        .expect("write");
        let err = load_deck(&path).expect_err("numeric field value");
        assert!(format!("{err:#}").contains("schema validation failed"));
    }

    /// The schema deliberately requires `notes` (as null when absent); decks
    /// written by this crate always carry it.
    #[test]
    fn load_rejects_slides_missing_the_notes_property() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("deck.json");
        fs::write(
            &path,
            r#"{
  "deck_title": "Launch",
  "slides": [
    {"slide_id": "s1", "layout_id": 0, "fields": []}
  ]
}"#,
        )
        .expect("write");
        assert!(load_deck(&path).is_err());
    }
}
