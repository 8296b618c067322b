//! Prompt-to-deck generation CLI.
//!
//! Generates and edits validated deck specifications against a template
//! profile, with optional render-and-critique visual validation when a render
//! command is configured.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};

use deckgen::core::binding::check_deck_binding;
use deckgen::core::context::layouts_context;
use deckgen::core::profile::TemplateProfile;
use deckgen::core::state::DeckRequest;
use deckgen::exit_codes;
use deckgen::io::config::{DeckgenConfig, load_config};
use deckgen::io::{deck_store, profile_store};
use deckgen::llm::openai::OpenAiClient;
use deckgen::logging;
use deckgen::pipeline::{PipelineError, PipelineOutcome, edit_prompt, run_pipeline};
use deckgen::render::command::CommandRenderer;
use deckgen::render::raster::SofficeRasterizer;

#[derive(Parser)]
#[command(
    name = "deckgen",
    version,
    about = "Prompt-to-deck generation with semantic and visual validation"
)]
struct Cli {
    /// Config file (TOML); missing file means defaults.
    #[arg(long, global = true, default_value = "deckgen.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a deck from a prompt against a template profile.
    Generate(GenerateArgs),
    /// Apply an edit instruction to an existing deck.
    Edit(EditArgs),
    /// Print the layouts context block generation will see.
    Context {
        /// Template profile JSON.
        #[arg(long)]
        profile: PathBuf,
    },
    /// Validate a profile, and optionally a deck against it.
    Validate {
        /// Template profile JSON.
        #[arg(long)]
        profile: PathBuf,
        /// Deck JSON to check against the profile.
        #[arg(long)]
        deck: Option<PathBuf>,
    },
    /// Print a text preview of a deck.
    Show {
        /// Deck JSON.
        #[arg(long)]
        deck: PathBuf,
    },
    /// Normalize a raw placeholder inventory into a template profile.
    Profile {
        /// Raw inventory JSON as emitted by a template profiling tool.
        #[arg(long)]
        inventory: PathBuf,
        /// Where to write the profile JSON.
        #[arg(long, short)]
        output: PathBuf,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// Template profile JSON.
    #[arg(long)]
    profile: PathBuf,
    /// What the deck should be about (topic or pasted outline).
    #[arg(long, required_unless_present = "prompt_file", conflicts_with = "prompt_file")]
    prompt: Option<String>,
    /// File to read the prompt from instead of passing it inline.
    #[arg(long)]
    prompt_file: Option<PathBuf>,
    /// Desired number of slides.
    #[arg(long, default_value_t = 10)]
    slides: u32,
    /// Presentation tone.
    #[arg(long, default_value = "professional")]
    tone: String,
    /// Template document for the render command (visual validation).
    #[arg(long)]
    template: Option<PathBuf>,
    /// Where to write the deck JSON.
    #[arg(long, short)]
    output: PathBuf,
}

#[derive(Args)]
struct EditArgs {
    /// Template profile JSON.
    #[arg(long)]
    profile: PathBuf,
    /// Deck JSON to edit.
    #[arg(long)]
    deck: PathBuf,
    /// The requested change, in plain language.
    #[arg(long)]
    instruction: String,
    /// Target slide count; defaults to the current deck's.
    #[arg(long)]
    slides: Option<u32>,
    /// Presentation tone for the revision.
    #[arg(long, default_value = "unchanged")]
    tone: String,
    /// Template document for the render command (visual validation).
    #[arg(long)]
    template: Option<PathBuf>,
    /// Where to write the updated deck; defaults to editing in place.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    match cli.command {
        Command::Generate(args) => cmd_generate(&config, args),
        Command::Edit(args) => cmd_edit(&config, args),
        Command::Context { profile } => cmd_context(&profile),
        Command::Validate { profile, deck } => cmd_validate(&profile, deck.as_deref()),
        Command::Show { deck } => cmd_show(&deck),
        Command::Profile { inventory, output } => cmd_profile(&inventory, &output),
    }
}

fn cmd_generate(config: &DeckgenConfig, args: GenerateArgs) -> Result<i32> {
    let profile = profile_store::load_profile(&args.profile)?;
    let prompt = match (args.prompt, args.prompt_file) {
        (Some(prompt), _) => prompt,
        (None, Some(path)) => fs::read_to_string(&path)
            .with_context(|| format!("read prompt {}", path.display()))?,
        (None, None) => bail!("either --prompt or --prompt-file is required"),
    };
    let request = DeckRequest {
        prompt,
        slide_count: args.slides,
        tone: args.tone,
        template: args.template,
    };
    generate_into(config, profile, request, &args.output)
}

fn cmd_edit(config: &DeckgenConfig, args: EditArgs) -> Result<i32> {
    let profile = profile_store::load_profile(&args.profile)?;
    let deck = deck_store::load_deck(&args.deck)?;
    let prompt = edit_prompt(&deck, &args.instruction)?;
    let request = DeckRequest {
        prompt,
        slide_count: args.slides.unwrap_or(deck.slides.len() as u32),
        tone: args.tone,
        template: args.template,
    };
    let output = args.output.unwrap_or(args.deck);
    generate_into(config, profile, request, &output)
}

/// Run the pipeline with the configured collaborators and persist the result.
fn generate_into(
    config: &DeckgenConfig,
    profile: TemplateProfile,
    request: DeckRequest,
    output: &Path,
) -> Result<i32> {
    let llm = OpenAiClient::from_config(&config.llm)?;
    let timeout = Duration::from_secs(config.render.timeout_secs);
    let renderer = CommandRenderer::new(
        config.render.command.clone(),
        timeout,
        config.render.output_limit_bytes,
    );
    let rasterizer = SofficeRasterizer::new(timeout, config.render.output_limit_bytes);
    let policy = config.pipeline_policy(!config.render.command.is_empty());

    match run_pipeline(&llm, &renderer, &rasterizer, &llm, profile, request, &policy) {
        Ok(outcome) => {
            deck_store::write_deck(output, &outcome.deck)?;
            report(&outcome, output);
            Ok(exit_codes::OK)
        }
        Err(PipelineError::BudgetExhausted { feedback }) => {
            eprintln!("no deck produced after retries: {feedback}");
            Ok(exit_codes::EXHAUSTED)
        }
        Err(err) => Err(err.into()),
    }
}

fn report(outcome: &PipelineOutcome, output: &Path) {
    for warning in &outcome.warnings {
        eprintln!("warning: {warning}");
    }
    println!(
        "wrote {} ({} slides, {} validation round{})",
        output.display(),
        outcome.deck.slides.len(),
        outcome.iterations,
        if outcome.iterations == 1 { "" } else { "s" }
    );
    if !outcome.review_passed
        && let Some(feedback) = &outcome.feedback
    {
        eprintln!("delivered without a final validation pass: {feedback}");
    }
}

fn cmd_context(profile_path: &Path) -> Result<i32> {
    let profile = profile_store::load_profile(profile_path)?;
    println!("{}", layouts_context(&profile));
    Ok(exit_codes::OK)
}

fn cmd_validate(profile_path: &Path, deck_path: Option<&Path>) -> Result<i32> {
    let profile = profile_store::load_profile(profile_path)?;
    println!("profile ok: {}", profile.template_name);
    if let Some(deck_path) = deck_path {
        let deck = deck_store::load_deck(deck_path)?;
        let unknown = check_deck_binding(&profile, &deck)
            .with_context(|| format!("check deck {}", deck_path.display()))?;
        for finding in &unknown {
            eprintln!(
                "warning: slide {} uses key '{}' not in layout {}",
                finding.slide_id, finding.key, finding.layout_id
            );
        }
        println!("deck ok: {} slides", deck.slides.len());
    }
    Ok(exit_codes::OK)
}

fn cmd_show(deck_path: &Path) -> Result<i32> {
    let deck = deck_store::load_deck(deck_path)?;
    println!("{}", deck.preview());
    Ok(exit_codes::OK)
}

fn cmd_profile(inventory_path: &Path, output: &Path) -> Result<i32> {
    let raw = profile_store::load_inventory(inventory_path)?;
    let profile = TemplateProfile::from_inventory(&raw);
    profile_store::write_profile(output, &profile)?;
    println!(
        "wrote {} ({} layouts)",
        output.display(),
        profile.layouts.len()
    );
    Ok(exit_codes::OK)
}
