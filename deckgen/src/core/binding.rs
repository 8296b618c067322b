//! Deck-to-profile binding checks.
//!
//! Field keys are deliberately unconstrained at the data-model level; whether
//! a deck actually fits its template is decided here, at render time.

use thiserror::Error;

use crate::core::deck::DeckSpec;
use crate::core::profile::TemplateProfile;

/// A slide whose layout reference cannot be honored by the profile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutBindingError {
    #[error(
        "slide {slide_id} references layout {layout_id}, which does not exist in template '{template_name}'"
    )]
    UnknownLayout {
        slide_id: String,
        layout_id: u32,
        template_name: String,
    },
    #[error("slide {slide_id} references layout {layout_id}, which is not allow-listed")]
    DisallowedLayout { slide_id: String, layout_id: u32 },
}

impl LayoutBindingError {
    /// The offending layout id.
    pub fn layout_id(&self) -> u32 {
        match self {
            Self::UnknownLayout { layout_id, .. } | Self::DisallowedLayout { layout_id, .. } => {
                *layout_id
            }
        }
    }
}

/// A field key that no placeholder of the slide's layout carries. Renderers
/// skip these with a warning rather than failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFieldKey {
    pub slide_id: String,
    pub layout_id: u32,
    pub key: String,
}

/// Check every slide's layout reference and field keys against the profile.
///
/// Fails on the first out-of-range or disallowed layout reference. Unknown
/// field keys are collected and returned for the caller to warn about.
pub fn check_deck_binding(
    profile: &TemplateProfile,
    deck: &DeckSpec,
) -> Result<Vec<UnknownFieldKey>, LayoutBindingError> {
    let allowed = profile.allowed_ids();
    let mut unknown = Vec::new();
    for slide in &deck.slides {
        let Some(layout) = profile.layout(slide.layout_id) else {
            return Err(LayoutBindingError::UnknownLayout {
                slide_id: slide.slide_id.clone(),
                layout_id: slide.layout_id,
                template_name: profile.template_name.clone(),
            });
        };
        if !allowed.contains(&slide.layout_id) {
            return Err(LayoutBindingError::DisallowedLayout {
                slide_id: slide.slide_id.clone(),
                layout_id: slide.layout_id,
            });
        }
        for field in &slide.fields {
            if !layout.placeholders.iter().any(|p| p.key == field.key) {
                unknown.push(UnknownFieldKey {
                    slide_id: slide.slide_id.clone(),
                    layout_id: slide.layout_id,
                    key: field.key.clone(),
                });
            }
        }
    }
    Ok(unknown)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::test_support::{sample_deck, sample_profile};

    #[test]
    fn well_bound_deck_yields_no_findings() {
        let unknown = check_deck_binding(&sample_profile(), &sample_deck()).expect("binding");
        assert!(unknown.is_empty());
    }

    #[test]
    fn out_of_range_layout_fails_naming_the_id() {
        let mut deck = sample_deck();
        deck.slides[0].layout_id = 7;
        let err = check_deck_binding(&sample_profile(), &deck).expect_err("binding error");
        assert_eq!(err.layout_id(), 7);
        assert!(err.to_string().contains("layout 7"));
    }

    #[test]
    fn disallowed_layout_fails_naming_the_id() {
        let mut profile = sample_profile();
        profile.allowed_layout_ids = Some(BTreeSet::from([0]));
        let mut deck = sample_deck();
        deck.slides[0].layout_id = 1;
        let err = check_deck_binding(&profile, &deck).expect_err("binding error");
        assert!(matches!(
            err,
            LayoutBindingError::DisallowedLayout { layout_id: 1, .. }
        ));
    }

    #[test]
    fn unknown_field_key_is_reported_not_fatal() {
        let mut deck = sample_deck();
        deck.slides[0].fields[0].key = "sidebar".to_string();
        let unknown = check_deck_binding(&sample_profile(), &deck).expect("binding");
        assert_eq!(unknown.len(), 1);
        assert_eq!(unknown[0].key, "sidebar");
        assert_eq!(unknown[0].slide_id, deck.slides[0].slide_id);
    }
}
