//! Deck specification data model: the structured, template-bound output of
//! the generation pipeline.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// Content of a single placeholder: one text run or a bullet list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Bullets(Vec<String>),
}

/// One filled placeholder on a slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideField {
    pub key: String,
    pub value: FieldValue,
}

/// One slide, bound to a template layout by id.
///
/// `notes` always serializes (as `null` when absent) so persisted decks match
/// the schema-constrained generation shape, which requires every property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideSpec {
    /// Caller-visible slide identifier, e.g. "s1". Not an index.
    pub slide_id: String,
    pub layout_id: u32,
    pub fields: Vec<SlideField>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A complete deck specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckSpec {
    pub deck_title: String,
    pub slides: Vec<SlideSpec>,
}

impl SlideSpec {
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|f| f.key == key).map(|f| &f.value)
    }
}

impl DeckSpec {
    /// Plain-text preview of the deck for terminal display.
    pub fn preview(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.deck_title);
        for slide in &self.slides {
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "Slide {} (layout {})",
                slide.slide_id, slide.layout_id
            );
            for field in &slide.fields {
                match &field.value {
                    FieldValue::Text(text) => {
                        let _ = writeln!(out, "  {}: {}", field.key, text);
                    }
                    FieldValue::Bullets(items) => {
                        let _ = writeln!(out, "  {}:", field.key);
                        for item in items {
                            let _ = writeln!(out, "    - {item}");
                        }
                    }
                }
            }
            if let Some(notes) = &slide.notes {
                let _ = writeln!(out, "  notes: {notes}");
            }
        }
        out
    }
}
