//! CLI binary for edgequake-pdf2cards.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `GenerationConfig`, prints the deck and optionally saves it.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2cards::{
    generate_cards, write_json, DeckStore, GenerationConfig, GenerationOutput,
    GenerationProgressCallback, ProgressCallback, MAX_CARD_COUNT,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one spinner whose prefix follows the pipeline stage,
/// plus a log line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
    stage_start: std::sync::Mutex<Instant>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style =
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            stage_start: std::sync::Mutex::new(Instant::now()),
        })
    }

    /// Seconds since the previous stage boundary; resets the clock.
    fn lap(&self) -> String {
        let mut start = self.stage_start.lock().unwrap();
        let secs = start.elapsed().as_secs_f64();
        *start = Instant::now();
        dim(&format!("{secs:.1}s"))
    }

    fn stage(&self, prefix: &'static str, msg: String) {
        self.bar.set_prefix(prefix);
        self.bar.set_message(msg);
    }
}

impl GenerationProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, filename: &str, bytes: usize) {
        self.lap();
        self.stage("Extracting", format!("{filename} ({} KB)", bytes / 1024));
    }

    fn on_extraction_complete(&self, pages: usize, chars: usize) {
        self.bar.println(format!(
            "  {} Extracted {} chars from {} pages  {}",
            green("✓"),
            chars,
            pages,
            self.lap()
        ));
    }

    fn on_generation_start(&self, prompt_chars: usize, truncated: bool) {
        let note = if truncated { " (truncated)" } else { "" };
        self.stage("Generating", format!("sending {prompt_chars} chars{note}"));
    }

    fn on_generation_complete(&self, reply_chars: usize) {
        self.bar.println(format!(
            "  {} Model replied with {} chars  {}",
            green("✓"),
            reply_chars,
            self.lap()
        ));
        self.stage("Parsing", "reading flashcards…".to_string());
    }

    fn on_parse_complete(&self, cards: usize, strategy: Option<&str>) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} flashcards parsed  {}",
            green("✔"),
            bold(&cards.to_string()),
            dim(strategy.unwrap_or("-"))
        );
    }

    fn on_error(&self, error: &str) {
        self.bar.finish_and_clear();
        let msg = error.lines().next().unwrap_or(error);
        eprintln!("{} {}", red("✘"), red(msg));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Ten cards from a local file, printed to stdout
  pdf2cards lecture_03.pdf

  # Twenty cards with an explicit title, saved as JSON
  pdf2cards -n 20 --title "Cell Biology" notes.pdf -o deck.json

  # From a URL, persisted to a deck database
  pdf2cards https://arxiv.org/pdf/1706.03762 --db decks.db

  # Use a specific model
  pdf2cards --model gpt-4.1-mini --provider openai notes.pdf

  # Machine-readable output
  pdf2cards --json notes.pdf > deck.json

OUTPUT:
  By default each card is printed as "N. Q: … / A: …". --json prints the full
  GenerationOutput (title, description, cards, stats). -o writes the same JSON
  to a file atomically. --db saves the deck and prints its id.

LIMITS:
  Only the first --max-input-chars characters of the document (default 4000)
  reach the model. The model is called once; there is no retry.

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  PDFIUM_AUTO_DOWNLOAD    Set to 0 to never download the PDF engine

SETUP:
  1. Set API key:     export OPENAI_API_KEY=sk-...
  2. Generate:        pdf2cards notes.pdf
     (the first run downloads the PDF engine, ~30 MB, to the user cache)
"#;

/// Generate flashcard decks from PDF files and URLs using LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2cards",
    version,
    about = "Generate question/answer flashcards from PDF files and URLs using LLMs",
    long_about = "Extract the text of a PDF (local file or URL), ask an LLM for question/answer \
flashcards and print, save or persist the resulting deck. Supports OpenAI, Anthropic, Google \
Gemini, Azure OpenAI, and any OpenAI-compatible endpoint (Ollama, vLLM, LiteLLM, etc.).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Deck title. Derived from the file name when omitted.
    #[arg(long, env = "PDF2CARDS_TITLE")]
    title: Option<String>,

    /// Number of flashcards to ask for.
    #[arg(short = 'n', long = "count", env = "PDF2CARDS_NUM_CARDS", default_value_t = 10,
          value_parser = clap::value_parser!(u32).range(1..=MAX_CARD_COUNT as i64))]
    count: u32,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1-mini, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// Characters of document text sent to the model.
    #[arg(long, env = "PDF2CARDS_MAX_INPUT_CHARS", default_value_t = 4000)]
    max_input_chars: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDF2CARDS_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "PDF2CARDS_MAX_TOKENS", default_value_t = 2000)]
    max_tokens: usize,

    /// LLM call timeout in seconds.
    #[arg(long, env = "PDF2CARDS_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2CARDS_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2CARDS_PASSWORD")]
    password: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "PDF2CARDS_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Write the deck as JSON to this file.
    #[arg(short, long, env = "PDF2CARDS_OUTPUT")]
    output: Option<PathBuf>,

    /// Print the deck as JSON instead of plain text.
    #[arg(long, env = "PDF2CARDS_JSON")]
    json: bool,

    /// Save the deck to this SQLite database.
    #[arg(long, env = "PDF2CARDS_DB")]
    db: Option<PathBuf>,

    /// Disable progress spinner.
    #[arg(long, env = "PDF2CARDS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2CARDS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the deck itself.
    #[arg(short, long, env = "PDF2CARDS_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active;
    // the spinner provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Ensure the PDF engine is available ──────────────────────────────
    // First run only: downloads pdfium into the user cache. Later runs find
    // it on disk and skip this block.
    // A failed download is not fatal: the system loader gets a last try when
    // the first PDF is opened.
    if !pdfium_auto::is_pdfium_cached() {
        if let Err(e) = ensure_pdf_engine(!cli.quiet && !cli.json) {
            if !cli.quiet {
                eprintln!("{} {:#}", red("warning:"), e);
            }
        }
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn GenerationProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Generate ─────────────────────────────────────────────────────────
    let output = generate_cards(&cli.input, cli.title.as_deref(), &config)
        .await
        .context("Flashcard generation failed")?;

    // ── Persist / write ──────────────────────────────────────────────────
    if let Some(ref db_path) = cli.db {
        let store = DeckStore::open(db_path)
            .with_context(|| format!("Failed to open deck database {:?}", db_path))?;
        let deck = store
            .save_generated(&output)
            .context("Failed to save deck")?;
        if !cli.quiet {
            eprintln!(
                "{} Saved deck {} '{}' to {}",
                green("✔"),
                bold(&deck.id.to_string()),
                deck.title,
                db_path.display()
            );
        }
    }

    if let Some(ref output_path) = cli.output {
        write_json(output_path, &output)
            .await
            .context("Failed to write output file")?;
        if !cli.quiet {
            eprintln!(
                "{} {} cards  →  {}",
                green("✔"),
                output.cards.len(),
                bold(&output_path.display().to_string())
            );
        }
    }

    // ── Print ────────────────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if cli.output.is_none() {
        print_deck(&output).context("Failed to write to stdout")?;
    }

    if !cli.quiet && !cli.json {
        eprintln!(
            "   {} tokens in  /  {} tokens out  —  {}ms total{}",
            dim(&output.stats.input_tokens.to_string()),
            dim(&output.stats.output_tokens.to_string()),
            output.stats.total_duration_ms,
            if output.stats.truncated {
                cyan("  (input truncated)")
            } else {
                String::new()
            }
        );
    }

    Ok(())
}

/// Plain-text rendering: a title line, then one numbered Q/A pair per card.
fn print_deck(output: &GenerationOutput) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "# {}", output.title)?;
    writeln!(handle)?;
    for card in &output.cards {
        writeln!(handle, "{}. Q: {}", card.order + 1, card.question)?;
        writeln!(handle, "   A: {}", card.answer)?;
        writeln!(handle)?;
    }
    Ok(())
}

/// Map CLI args to `GenerationConfig`.
fn ensure_pdf_engine(show_bar: bool) -> Result<()> {
    if !show_bar {
        tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
            .context("Failed to download the PDF engine")?;
        return Ok(());
    }

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:40.green/238}] {bytes}/{total_bytes}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  "),
    );
    bar.set_prefix("PDF engine");
    bar.set_message("downloading");
    bar.enable_steady_tick(Duration::from_millis(80));

    let progress = bar.clone();
    let result = tokio::task::block_in_place(|| {
        pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
            if let Some(t) = total {
                if progress.length() != Some(t) {
                    progress.set_length(t);
                }
            }
            progress.set_position(downloaded);
        }))
    });

    match result {
        Ok(_) => {
            bar.finish_with_message(green("ready ✓"));
            Ok(())
        }
        Err(e) => {
            bar.abandon_with_message(red("failed"));
            Err(e).context("Failed to download the PDF engine")
        }
    }
}

async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<GenerationConfig> {
    let mut builder = GenerationConfig::builder()
        .card_count(cli.count as usize)
        .max_input_chars(cli.max_input_chars)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
