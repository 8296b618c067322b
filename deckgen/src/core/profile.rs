//! Template profile data model: the machine-readable inventory of a slide
//! template that generation is allowed to target.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// One addressable placeholder within a layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderInfo {
    /// Semantic field name (e.g. `title`, `body`, `ph_3`). Unique per layout.
    pub key: String,
    /// Placeholder kind as reported by the template (e.g. `TITLE`, `BODY`).
    #[serde(rename = "type")]
    pub kind: String,
    /// The template's internal placeholder index used to address the shape.
    pub idx: u32,
}

/// One layout of the template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub layout_id: u32,
    pub layout_name: String,
    pub placeholders: Vec<PlaceholderInfo>,
}

/// Profile of a slide template: its layouts plus the allow-list of layouts
/// offered to generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateProfile {
    pub template_name: String,
    pub layouts: Vec<LayoutInfo>,
    /// Layout ids permitted for generation. `None` means every layout is
    /// allowed; an empty set allows none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_layout_ids: Option<BTreeSet<u32>>,
}

impl TemplateProfile {
    /// The effective allow-list: the configured set, or every layout id when
    /// none was configured.
    pub fn allowed_ids(&self) -> BTreeSet<u32> {
        match &self.allowed_layout_ids {
            Some(ids) => ids.clone(),
            None => self.layouts.iter().map(|l| l.layout_id).collect(),
        }
    }

    pub fn layout(&self, layout_id: u32) -> Option<&LayoutInfo> {
        self.layouts.iter().find(|l| l.layout_id == layout_id)
    }

    /// Check structural invariants, returning human-readable violations.
    ///
    /// - layout ids are unique and contiguous from 0
    /// - placeholder keys are unique within each layout
    /// - every allow-listed id references an existing layout
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.template_name.trim().is_empty() {
            errors.push("template_name is empty".to_string());
        }

        let ids: Vec<u32> = self.layouts.iter().map(|l| l.layout_id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != ids.len() {
            errors.push("layout ids are not unique".to_string());
        }
        for (pos, id) in sorted.iter().enumerate() {
            if *id != pos as u32 {
                errors.push(format!(
                    "layout ids are not contiguous from 0 (missing id {pos})"
                ));
                break;
            }
        }

        for layout in &self.layouts {
            let mut seen = BTreeSet::new();
            for ph in &layout.placeholders {
                if !seen.insert(ph.key.as_str()) {
                    errors.push(format!(
                        "layout {} has duplicate placeholder key '{}'",
                        layout.layout_id, ph.key
                    ));
                }
            }
        }

        if let Some(allowed) = &self.allowed_layout_ids {
            let known: BTreeSet<u32> = self.layouts.iter().map(|l| l.layout_id).collect();
            for id in allowed {
                if !known.contains(id) {
                    errors.push(format!("allowed_layout_ids references unknown layout {id}"));
                }
            }
        }

        errors
    }
}

/// Raw placeholder inventory as emitted by an external template profiler:
/// layout and shape names straight from the template, before semantic keys
/// are assigned.
#[derive(Debug, Clone, Deserialize)]
pub struct RawInventory {
    pub template_name: String,
    pub layouts: Vec<RawLayout>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawLayout {
    pub name: String,
    pub placeholders: Vec<RawPlaceholder>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPlaceholder {
    /// Shape name from the template, e.g. "Title 1" or "Text Placeholder 3".
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub idx: u32,
}

/// Infer a semantic placeholder key from the template's shape name.
///
/// Subtitle is tested before title: "Subtitle 2" contains "title" as a
/// substring and would otherwise never be classified as a subtitle.
pub fn infer_placeholder_key(shape_name: &str, idx: u32) -> String {
    let name = shape_name.to_lowercase();
    if name.contains("subtitle") {
        "subtitle".to_string()
    } else if name.contains("title") {
        "title".to_string()
    } else if name.contains("body") || name.contains("content") || name.contains("text") {
        "body".to_string()
    } else if name.contains("footer") {
        "footer".to_string()
    } else if name.contains("date") {
        "date".to_string()
    } else {
        format!("ph_{idx}")
    }
}

impl TemplateProfile {
    /// Build a profile from a raw inventory: layout ids assigned by position,
    /// semantic keys inferred from shape names and deduplicated with numeric
    /// suffixes (`body`, `body_2`, ...), allow-list covering every layout.
    pub fn from_inventory(raw: &RawInventory) -> Self {
        let mut layouts = Vec::with_capacity(raw.layouts.len());
        for (pos, layout) in raw.layouts.iter().enumerate() {
            let mut counts: HashMap<String, u32> = HashMap::new();
            let placeholders = layout
                .placeholders
                .iter()
                .map(|ph| {
                    let base = infer_placeholder_key(&ph.name, ph.idx);
                    let count = counts.entry(base.clone()).or_insert(0);
                    *count += 1;
                    let key = if *count == 1 {
                        base
                    } else {
                        format!("{base}_{count}")
                    };
                    PlaceholderInfo {
                        key,
                        kind: ph.kind.clone(),
                        idx: ph.idx,
                    }
                })
                .collect();
            layouts.push(LayoutInfo {
                layout_id: pos as u32,
                layout_name: layout.name.clone(),
                placeholders,
            });
        }
        let allowed: BTreeSet<u32> = layouts.iter().map(|l| l.layout_id).collect();
        Self {
            template_name: raw.template_name.clone(),
            layouts,
            allowed_layout_ids: Some(allowed),
        }
    }
}
