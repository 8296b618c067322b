//! Test-only fixtures and scripted collaborators.
//!
//! The scripted stubs consume their queued replies in order and panic on an
//! unscripted call, so tests double as call-count assertions.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::core::deck::{DeckSpec, FieldValue, SlideField, SlideSpec};
use crate::core::profile::{LayoutInfo, PlaceholderInfo, TemplateProfile};
use crate::core::state::DeckRequest;
use crate::llm::{
    LlmError, ResponseSchema, StructuredCompletion, TextCompletion, VisionCritique,
};
use crate::render::{DeckRenderer, Rasterizer, RenderError, RenderRequest};

/// Two-layout profile: a title slide (title, subtitle) and a content slide
/// (title, body), both allow-listed.
pub fn sample_profile() -> TemplateProfile {
    TemplateProfile {
        template_name: "corporate.pptx".to_string(),
        layouts: vec![
            LayoutInfo {
                layout_id: 0,
                layout_name: "Title Slide".to_string(),
                placeholders: vec![
                    placeholder("title", "TITLE", 0),
                    placeholder("subtitle", "SUBTITLE", 1),
                ],
            },
            LayoutInfo {
                layout_id: 1,
                layout_name: "Title and Content".to_string(),
                placeholders: vec![
                    placeholder("title", "TITLE", 0),
                    placeholder("body", "BODY", 1),
                ],
            },
        ],
        allowed_layout_ids: Some([0, 1].into()),
    }
}

fn placeholder(key: &str, kind: &str, idx: u32) -> PlaceholderInfo {
    PlaceholderInfo {
        key: key.to_string(),
        kind: kind.to_string(),
        idx,
    }
}

pub fn sample_request() -> DeckRequest {
    DeckRequest {
        prompt: "launch announcement".to_string(),
        slide_count: 1,
        tone: "professional".to_string(),
        template: None,
    }
}

/// Deck that binds cleanly against [`sample_profile`]: a title slide and a
/// content slide with bullets and speaker notes.
pub fn sample_deck() -> DeckSpec {
    DeckSpec {
        deck_title: "Launch".to_string(),
        slides: vec![
            SlideSpec {
                slide_id: "s1".to_string(),
                layout_id: 0,
                fields: vec![
                    SlideField {
                        key: "title".to_string(),
                        value: FieldValue::Text("We're Live".to_string()),
                    },
                    SlideField {
                        key: "subtitle".to_string(),
                        value: FieldValue::Text("Today".to_string()),
                    },
                ],
                notes: None,
            },
            SlideSpec {
                slide_id: "s2".to_string(),
                layout_id: 1,
                fields: vec![
                    SlideField {
                        key: "title".to_string(),
                        value: FieldValue::Text("What Shipped".to_string()),
                    },
                    SlideField {
                        key: "body".to_string(),
                        value: FieldValue::Bullets(vec![
                            "Faster onboarding".to_string(),
                            "New billing portal".to_string(),
                        ]),
                    },
                ],
                notes: Some("Pause here for the demo.".to_string()),
            },
        ],
    }
}

/// Scripted language-model collaborator implementing all three completion
/// traits, with captured prompts for call-shape assertions.
pub struct ScriptedLlm {
    text_replies: RefCell<VecDeque<Result<String, LlmError>>>,
    draft_replies: RefCell<VecDeque<Result<Value, LlmError>>>,
    critique_replies: RefCell<VecDeque<Result<String, LlmError>>>,
    text_prompts: RefCell<Vec<String>>,
    structured_prompts: RefCell<Vec<String>>,
    critique_image_counts: RefCell<Vec<usize>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self {
            text_replies: RefCell::new(VecDeque::new()),
            draft_replies: RefCell::new(VecDeque::new()),
            critique_replies: RefCell::new(VecDeque::new()),
            text_prompts: RefCell::new(Vec::new()),
            structured_prompts: RefCell::new(Vec::new()),
            critique_image_counts: RefCell::new(Vec::new()),
        }
    }

    pub fn with_outline(self, outline: &str) -> Self {
        self.text_replies
            .borrow_mut()
            .push_back(Ok(outline.to_string()));
        self
    }

    pub fn with_text_error(self, err: LlmError) -> Self {
        self.text_replies.borrow_mut().push_back(Err(err));
        self
    }

    pub fn with_draft(self, draft: Value) -> Self {
        self.draft_replies.borrow_mut().push_back(Ok(draft));
        self
    }

    pub fn with_draft_error(self, err: LlmError) -> Self {
        self.draft_replies.borrow_mut().push_back(Err(err));
        self
    }

    pub fn with_critique(self, reply: &str) -> Self {
        self.critique_replies
            .borrow_mut()
            .push_back(Ok(reply.to_string()));
        self
    }

    pub fn with_critique_error(self, err: LlmError) -> Self {
        self.critique_replies.borrow_mut().push_back(Err(err));
        self
    }

    /// User prompts seen by `complete_text`, in call order.
    pub fn text_prompts(&self) -> Vec<String> {
        self.text_prompts.borrow().clone()
    }

    /// User prompts seen by `complete_structured`, in call order.
    pub fn structured_prompts(&self) -> Vec<String> {
        self.structured_prompts.borrow().clone()
    }

    /// Image counts of each `critique_images` call, in call order.
    pub fn critique_image_counts(&self) -> Vec<usize> {
        self.critique_image_counts.borrow().clone()
    }

    /// Error when any scripted replies were left unconsumed.
    pub fn assert_drained(&self) -> Result<(), String> {
        let text = self.text_replies.borrow().len();
        let draft = self.draft_replies.borrow().len();
        let critique = self.critique_replies.borrow().len();
        if text + draft + critique == 0 {
            Ok(())
        } else {
            Err(format!(
                "unconsumed scripted replies: {text} text, {draft} draft, {critique} critique"
            ))
        }
    }
}

impl Default for ScriptedLlm {
    fn default() -> Self {
        Self::new()
    }
}

impl TextCompletion for ScriptedLlm {
    fn complete_text(&self, _system: &str, user: &str) -> Result<String, LlmError> {
        self.text_prompts.borrow_mut().push(user.to_string());
        self.text_replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("unscripted text completion for prompt: {user}"))
    }
}

impl StructuredCompletion for ScriptedLlm {
    fn complete_structured(
        &self,
        _system: &str,
        user: &str,
        _schema: &ResponseSchema,
    ) -> Result<Value, LlmError> {
        self.structured_prompts.borrow_mut().push(user.to_string());
        self.draft_replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("unscripted structured completion for prompt: {user}"))
    }
}

impl VisionCritique for ScriptedLlm {
    fn critique_images(&self, _instruction: &str, images: &[PathBuf]) -> Result<String, LlmError> {
        self.critique_image_counts.borrow_mut().push(images.len());
        self.critique_replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("unscripted critique over {} images", images.len()))
    }
}

/// Scripted renderer: each queued entry is one render attempt. An empty queue
/// always succeeds, producing a placeholder document in the request's dir.
pub struct ScriptedRenderer {
    outcomes: RefCell<VecDeque<Result<(), String>>>,
    render_count: RefCell<u32>,
}

impl ScriptedRenderer {
    pub fn new() -> Self {
        Self {
            outcomes: RefCell::new(VecDeque::new()),
            render_count: RefCell::new(0),
        }
    }

    pub fn with_success(self) -> Self {
        self.outcomes.borrow_mut().push_back(Ok(()));
        self
    }

    pub fn with_failure(self, reason: &str) -> Self {
        self.outcomes.borrow_mut().push_back(Err(reason.to_string()));
        self
    }

    pub fn render_count(&self) -> u32 {
        *self.render_count.borrow()
    }

    /// Error when any scripted outcomes were left unconsumed.
    pub fn assert_drained(&self) -> Result<(), String> {
        let left = self.outcomes.borrow().len();
        if left == 0 {
            Ok(())
        } else {
            Err(format!("unconsumed scripted render outcomes: {left}"))
        }
    }
}

impl Default for ScriptedRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl DeckRenderer for ScriptedRenderer {
    fn render(&self, request: &RenderRequest<'_>) -> Result<PathBuf, RenderError> {
        *self.render_count.borrow_mut() += 1;
        match self.outcomes.borrow_mut().pop_front() {
            Some(Err(reason)) => Err(RenderError::Tool(reason)),
            Some(Ok(())) | None => {
                let document = request.dir.join("deck.pptx");
                fs::write(&document, b"scripted document")
                    .map_err(|e| RenderError::Tool(e.to_string()))?;
                Ok(document)
            }
        }
    }
}

/// Scripted rasterizer: each queued entry is the page count of one attempt.
/// An empty queue yields no images, which exercises the fail-open path.
pub struct ScriptedRasterizer {
    page_counts: RefCell<VecDeque<usize>>,
}

impl ScriptedRasterizer {
    pub fn new() -> Self {
        Self {
            page_counts: RefCell::new(VecDeque::new()),
        }
    }

    pub fn with_pages(self, pages: usize) -> Self {
        self.page_counts.borrow_mut().push_back(pages);
        self
    }
}

impl Default for ScriptedRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer for ScriptedRasterizer {
    fn rasterize(&self, _document: &Path, dir: &Path) -> Vec<PathBuf> {
        let pages = self.page_counts.borrow_mut().pop_front().unwrap_or(0);
        (1..=pages)
            .map(|page| {
                let path = dir.join(format!("page-{page}.png"));
                fs::write(&path, b"png").ok();
                path
            })
            .collect()
    }
}
