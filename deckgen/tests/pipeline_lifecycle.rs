//! Pipeline-level lifecycle tests for full generation scenarios.
//!
//! These drive `run_pipeline` end to end with scripted collaborators to
//! verify stage routing, the shared retry budget, fail-open visual policy,
//! and terminal delivery behavior.

use deckgen::core::deck::DeckSpec;
use deckgen::core::machine::{PipelinePolicy, RetryPolicy, VisualPolicy};
use deckgen::core::state::DeckRequest;
use deckgen::llm::LlmError;
use deckgen::pipeline::{PipelineError, edit_prompt, run_pipeline};
use deckgen::test_support::{
    ScriptedLlm, ScriptedRasterizer, ScriptedRenderer, sample_deck, sample_profile,
};
use serde_json::{Value, json};

fn request() -> DeckRequest {
    DeckRequest {
        prompt: "launch announcement".to_string(),
        slide_count: 1,
        tone: "professional".to_string(),
        template: None,
    }
}

fn no_visual_policy() -> PipelinePolicy {
    PipelinePolicy {
        visual: VisualPolicy {
            enabled: false,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Draft the writer stub returns for the launch-announcement scenario.
fn launch_draft() -> Value {
    json!({
        "deck_title": "Launch",
        "slides": [
            {
                "slide_id": "s1",
                "layout_id": 0,
                "fields": [
                    {"key": "title", "value": "We're Live"},
                    {"key": "subtitle", "value": "Today"}
                ]
            }
        ]
    })
}

/// Happy path against a single-layout profile.
///
/// Execution sequence:
/// 1. Context + plan
/// 2. Writer returns the launch deck
/// 3. Semantic review passes (iterations = 1)
/// 4. Visual check: render succeeds, rasterization yields no images,
///    fail-open auto-pass with a warning (iterations = 2)
/// 5. Terminal returns exactly the writer's deck
#[test]
fn single_slide_generation_with_unavailable_rasterizer_auto_passes() {
    let mut profile = sample_profile();
    profile.layouts.truncate(1);
    profile.allowed_layout_ids = Some([0].into());

    let llm = ScriptedLlm::new()
        .with_outline("1. Announce the launch")
        .with_draft(launch_draft());
    let renderer = ScriptedRenderer::new().with_success();
    let rasterizer = ScriptedRasterizer::new(); // no images, ever

    let outcome = run_pipeline(
        &llm,
        &renderer,
        &rasterizer,
        &llm,
        profile,
        request(),
        &PipelinePolicy::default(),
    )
    .expect("pipeline");

    let expected: DeckSpec = serde_json::from_value(launch_draft()).expect("deck");
    assert_eq!(outcome.deck, expected);
    assert!(outcome.review_passed);
    assert_eq!(outcome.feedback, None);
    assert_eq!(outcome.iterations, 2);
    assert_eq!(
        outcome.warnings,
        vec!["visual check skipped: rasterization produced no images".to_string()]
    );
    assert_eq!(renderer.render_count(), 1);
    llm.assert_drained().expect("llm drained");
    renderer.assert_drained().expect("renderer drained");
}

/// A zero-slide draft fails semantic review and loops back to the writer,
/// whose second prompt carries the feedback verbatim.
///
/// Execution sequence:
/// 1. Writer returns a deck with no slides
/// 2. Review fails (iterations = 1, feedback mentions zero slides)
/// 3. Writer is re-invoked with the feedback prepended, returns a good deck
/// 4. Review passes (iterations = 2); visual disabled, so terminal
#[test]
fn zero_slide_draft_retries_with_feedback_in_the_writer_prompt() {
    let llm = ScriptedLlm::new()
        .with_outline("1. Announce the launch")
        .with_draft(json!({"deck_title": "Launch", "slides": []}))
        .with_draft(launch_draft());
    let renderer = ScriptedRenderer::new();
    let rasterizer = ScriptedRasterizer::new();

    let outcome = run_pipeline(
        &llm,
        &renderer,
        &rasterizer,
        &llm,
        sample_profile(),
        request(),
        &no_visual_policy(),
    )
    .expect("pipeline");

    assert!(outcome.review_passed);
    assert_eq!(outcome.iterations, 2);
    assert_eq!(renderer.render_count(), 0);

    let prompts = llm.structured_prompts();
    assert_eq!(prompts.len(), 2);
    assert!(!prompts[0].contains("0 slides"));
    let feedback_at = prompts[1]
        .find("The deck has 0 slides generated.")
        .expect("feedback forwarded verbatim");
    let layouts_at = prompts[1]
        .find("Available template layouts:")
        .expect("layouts follow the feedback");
    assert!(feedback_at < layouts_at);
    llm.assert_drained().expect("llm drained");
}

/// A writer that always fails schema validation terminates after exactly
/// `max_semantic_retries` attempts and surfaces the last feedback.
#[test]
fn always_failing_writer_exhausts_the_budget_and_reports_last_feedback() {
    let llm = ScriptedLlm::new()
        .with_outline("1. Announce the launch")
        .with_draft_error(LlmError::Malformed("schema violations: missing title".to_string()))
        .with_draft_error(LlmError::Malformed("schema violations: missing title".to_string()))
        .with_draft_error(LlmError::Malformed("schema violations: bad layout".to_string()));
    let renderer = ScriptedRenderer::new();
    let rasterizer = ScriptedRasterizer::new();

    let err = run_pipeline(
        &llm,
        &renderer,
        &rasterizer,
        &llm,
        sample_profile(),
        request(),
        &PipelinePolicy::default(),
    )
    .expect_err("budget exhausted");

    let feedback = match err {
        PipelineError::BudgetExhausted { feedback } => feedback,
        other => panic!("expected budget exhaustion, got: {other}"),
    };
    assert!(feedback.contains("bad layout"), "last feedback wins: {feedback}");
    // Exactly three writer invocations: the budget is a hard bound.
    assert_eq!(llm.structured_prompts().len(), 3);
    assert_eq!(renderer.render_count(), 0);
    llm.assert_drained().expect("llm drained");
}

/// A failed visual check loops back to the writer and may finish past the
/// budget number, since reviewer and visual validator share one counter.
///
/// Execution sequence:
/// 1. Writer deck #1; review passes (iterations = 1)
/// 2. Visual critique flags an overflow (iterations = 2) -> writer again
/// 3. Writer deck #2 with the critique prepended; review passes (3)
/// 4. Visual critique replies PASS (iterations = 4); terminal
#[test]
fn visual_failure_retries_the_writer_then_passes() {
    let llm = ScriptedLlm::new()
        .with_outline("1. Announce the launch")
        .with_draft(launch_draft())
        .with_critique("Slide 1: the title overflows the frame")
        .with_draft(launch_draft())
        .with_critique("PASS");
    let renderer = ScriptedRenderer::new().with_success().with_success();
    let rasterizer = ScriptedRasterizer::new().with_pages(1).with_pages(1);

    let outcome = run_pipeline(
        &llm,
        &renderer,
        &rasterizer,
        &llm,
        sample_profile(),
        request(),
        &PipelinePolicy::default(),
    )
    .expect("pipeline");

    assert!(outcome.review_passed);
    assert_eq!(outcome.feedback, None);
    assert_eq!(outcome.iterations, 4);
    assert_eq!(renderer.render_count(), 2);
    assert_eq!(llm.critique_image_counts(), vec![1, 1]);

    // The second writer prompt carries the critique verbatim.
    let prompts = llm.structured_prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains("Slide 1: the title overflows the frame"));
    llm.assert_drained().expect("llm drained");
    renderer.assert_drained().expect("renderer drained");
}

/// Visual failure never blocks delivery once the budget is exhausted: the
/// last draft is returned with `review_passed = false` and the critique as
/// feedback.
#[test]
fn exhausted_budget_still_delivers_a_visually_failing_deck() {
    let llm = ScriptedLlm::new()
        .with_outline("1. Announce the launch")
        .with_draft(launch_draft())
        .with_critique("Slide 1: the title overflows the frame")
        .with_draft(launch_draft())
        .with_critique("Slide 1: still overflowing");
    let renderer = ScriptedRenderer::new().with_success().with_success();
    let rasterizer = ScriptedRasterizer::new().with_pages(1).with_pages(1);

    let outcome = run_pipeline(
        &llm,
        &renderer,
        &rasterizer,
        &llm,
        sample_profile(),
        request(),
        &PipelinePolicy::default(),
    )
    .expect("deck still delivered");

    assert!(!outcome.review_passed);
    assert_eq!(
        outcome.feedback.as_deref(),
        Some("Slide 1: still overflowing")
    );
    assert_eq!(outcome.iterations, 4);
    let expected: DeckSpec = serde_json::from_value(launch_draft()).expect("deck");
    assert_eq!(outcome.deck, expected);
    llm.assert_drained().expect("llm drained");
}

/// A render failure is validation feedback, not a fatal error: the writer is
/// re-invoked with the render error in its prompt.
#[test]
fn render_failure_retries_the_writer_as_validation_feedback() {
    let llm = ScriptedLlm::new()
        .with_outline("1. Announce the launch")
        .with_draft(launch_draft())
        .with_draft(launch_draft())
        .with_critique("PASS");
    let renderer = ScriptedRenderer::new()
        .with_failure("boom")
        .with_success();
    let rasterizer = ScriptedRasterizer::new().with_pages(1);

    let outcome = run_pipeline(
        &llm,
        &renderer,
        &rasterizer,
        &llm,
        sample_profile(),
        request(),
        &PipelinePolicy::default(),
    )
    .expect("pipeline");

    assert!(outcome.review_passed);
    assert_eq!(outcome.iterations, 4);
    assert_eq!(renderer.render_count(), 2);

    let prompts = llm.structured_prompts();
    assert!(prompts[1].contains("Rendering failed:"));
    assert!(prompts[1].contains("boom"));
    llm.assert_drained().expect("llm drained");
    renderer.assert_drained().expect("renderer drained");
}

/// Critique-service unavailability passes with a warning when fail-open.
#[test]
fn critique_outage_passes_with_a_warning_when_fail_open() {
    let llm = ScriptedLlm::new()
        .with_outline("1. Announce the launch")
        .with_draft(launch_draft())
        .with_critique_error(LlmError::Transport("connect refused".to_string()));
    let renderer = ScriptedRenderer::new().with_success();
    let rasterizer = ScriptedRasterizer::new().with_pages(2);

    let outcome = run_pipeline(
        &llm,
        &renderer,
        &rasterizer,
        &llm,
        sample_profile(),
        request(),
        &PipelinePolicy::default(),
    )
    .expect("pipeline");

    assert!(outcome.review_passed);
    assert_eq!(outcome.iterations, 2);
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("visual critique unavailable"));
    assert!(outcome.warnings[0].contains("connect refused"));
    llm.assert_drained().expect("llm drained");
}

/// With fail-open off and a budget of one, a critique outage fails the
/// attempt; the draft is still delivered with the failure as feedback.
#[test]
fn critique_outage_fails_the_attempt_when_fail_open_is_off() {
    let policy = PipelinePolicy {
        retry: RetryPolicy {
            max_semantic_retries: 1,
            max_total_retries: 1,
        },
        visual: VisualPolicy {
            enabled: true,
            fail_open: false,
        },
    };
    let llm = ScriptedLlm::new()
        .with_outline("1. Announce the launch")
        .with_draft(launch_draft())
        .with_critique_error(LlmError::Transport("connect refused".to_string()));
    let renderer = ScriptedRenderer::new().with_success();
    let rasterizer = ScriptedRasterizer::new().with_pages(1);

    let outcome = run_pipeline(
        &llm,
        &renderer,
        &rasterizer,
        &llm,
        sample_profile(),
        request(),
        &policy,
    )
    .expect("deck still delivered");

    assert!(!outcome.review_passed);
    let feedback = outcome.feedback.expect("feedback");
    assert!(feedback.contains("Visual critique failed"));
    assert!(outcome.warnings.is_empty());
    llm.assert_drained().expect("llm drained");
}

/// Planner collaborator failures propagate unrecovered; nothing downstream
/// runs.
#[test]
fn planner_failure_propagates_before_any_writing() {
    let llm = ScriptedLlm::new().with_text_error(LlmError::Service {
        status: 503,
        body: "overloaded".to_string(),
    });
    let renderer = ScriptedRenderer::new();
    let rasterizer = ScriptedRasterizer::new();

    let err = run_pipeline(
        &llm,
        &renderer,
        &rasterizer,
        &llm,
        sample_profile(),
        request(),
        &PipelinePolicy::default(),
    )
    .expect_err("planner failure");

    assert!(matches!(err, PipelineError::Planner(_)));
    assert!(err.to_string().contains("503"));
    assert_eq!(llm.structured_prompts().len(), 0);
    assert_eq!(renderer.render_count(), 0);
}

/// Editing is the same machine re-entered: the current deck plus the
/// instruction become the planner's prompt, and a full run follows.
#[test]
fn edit_reenters_the_pipeline_with_the_deck_in_the_prompt() {
    let current = sample_deck();
    let prompt = edit_prompt(&current, "make the title punchier").expect("edit prompt");

    let revised = json!({
        "deck_title": "Launch",
        "slides": [
            {
                "slide_id": "s1",
                "layout_id": 0,
                "fields": [
                    {"key": "title", "value": "We Are LIVE!"},
                    {"key": "subtitle", "value": "Today"}
                ]
            }
        ]
    });
    let llm = ScriptedLlm::new()
        .with_outline("1. Punch up the title")
        .with_draft(revised.clone());
    let renderer = ScriptedRenderer::new();
    let rasterizer = ScriptedRasterizer::new();

    let outcome = run_pipeline(
        &llm,
        &renderer,
        &rasterizer,
        &llm,
        sample_profile(),
        DeckRequest {
            prompt,
            slide_count: current.slides.len() as u32,
            tone: "unchanged".to_string(),
            template: None,
        },
        &no_visual_policy(),
    )
    .expect("pipeline");

    // The planner saw the serialized deck and the instruction.
    let planner_prompt = &llm.text_prompts()[0];
    assert!(planner_prompt.contains("We're Live"));
    assert!(planner_prompt.contains("make the title punchier"));

    let expected: DeckSpec = serde_json::from_value(revised).expect("deck");
    assert_eq!(outcome.deck, expected);
    llm.assert_drained().expect("llm drained");
}
