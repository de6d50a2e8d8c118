//! Flashcard generation entry points.
//!
//! [`FlashcardPipeline`] is the reusable form: build it once from a
//! [`GenerationConfig`] (the HTTP server keeps one in its state) and call
//! [`FlashcardPipeline::run`] per PDF. The free functions wrap it for the
//! common one-shot cases: a path or URL, bytes in memory, a blocking caller,
//! or straight to a JSON file.

use crate::config::{GenerationConfig, MAX_CARD_COUNT};
use crate::error::FlashcardError;
use crate::output::{GenerationOutput, GenerationStats};
use crate::pipeline::extract::{ensure_pdf_header, PdfiumExtractor, TextExtractor};
use crate::pipeline::input::{self, PdfUpload};
use crate::pipeline::llm::{self, CardGenerator, ProviderGenerator};
use crate::pipeline::parse::ResponseParser;
use crate::prompts::build_generation_prompt;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Model used when a provider is named without one.
const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Title used when the file name yields nothing usable.
const FALLBACK_TITLE: &str = "Untitled Deck";

/// Extract → prompt → generate → parse, for one PDF at a time.
///
/// Cheap to clone; every field is shared. Runs are independent, so one
/// pipeline can serve concurrent requests.
#[derive(Clone)]
pub struct FlashcardPipeline {
    config: Arc<GenerationConfig>,
    generator: Arc<dyn CardGenerator>,
    extractor: Arc<dyn TextExtractor>,
    parser: Arc<ResponseParser>,
}

impl fmt::Debug for FlashcardPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlashcardPipeline")
            .field("config", &self.config)
            .field("parser", &self.parser)
            .finish_non_exhaustive()
    }
}

impl FlashcardPipeline {
    /// Build a pipeline, resolving the model generator once.
    ///
    /// Fails with [`FlashcardError::ProviderNotConfigured`] when no provider
    /// can be found; nothing is sent to the model here.
    pub fn new(config: GenerationConfig) -> Result<Self, FlashcardError> {
        let generator = resolve_generator(&config)?;
        Ok(Self {
            config: Arc::new(config),
            generator,
            extractor: Arc::new(PdfiumExtractor::new()),
            parser: Arc::new(ResponseParser::default()),
        })
    }

    /// Replace the PDF text extractor.
    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Replace the reply parser (e.g. to add a strategy).
    pub fn with_parser(mut self, parser: ResponseParser) -> Self {
        self.parser = Arc::new(parser);
        self
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Generate the configured number of cards from `upload`.
    pub async fn run(
        &self,
        upload: PdfUpload,
        title: Option<&str>,
    ) -> Result<GenerationOutput, FlashcardError> {
        self.run_with_count(upload, title, self.config.card_count).await
    }

    /// Generate `card_count` cards from `upload`.
    ///
    /// `card_count` is clamped to 1–[`MAX_CARD_COUNT`]. A blank `title` is
    /// treated as absent and the title is derived from the file name.
    pub async fn run_with_count(
        &self,
        upload: PdfUpload,
        title: Option<&str>,
        card_count: usize,
    ) -> Result<GenerationOutput, FlashcardError> {
        let result = self.run_inner(upload, title, card_count).await;
        if let (Err(e), Some(cb)) = (&result, &self.config.progress_callback) {
            cb.on_error(&e.to_string());
        }
        result
    }

    async fn run_inner(
        &self,
        upload: PdfUpload,
        title: Option<&str>,
        card_count: usize,
    ) -> Result<GenerationOutput, FlashcardError> {
        let total_start = Instant::now();
        let config = &self.config;
        let card_count = card_count.clamp(1, MAX_CARD_COUNT);
        let PdfUpload { filename, bytes } = upload;
        info!("Generating {} flashcards from '{}'", card_count, filename);

        // ── Step 1: Extract text ─────────────────────────────────────────────
        ensure_pdf_header(&bytes, &filename)?;
        if let Some(ref cb) = config.progress_callback {
            cb.on_extraction_start(&filename, bytes.len());
        }

        let extract_start = Instant::now();
        let extractor = Arc::clone(&self.extractor);
        let password = config.password.clone();
        let name = filename.clone();
        let extracted = tokio::task::spawn_blocking(move || {
            extractor.extract(&bytes, &name, password.as_deref())
        })
        .await
        .map_err(|e| FlashcardError::Internal(format!("Extraction task panicked: {}", e)))??;
        let extraction_duration_ms = extract_start.elapsed().as_millis() as u64;

        if extracted.is_empty() {
            warn!("No text extracted from '{}'", filename);
            return Err(FlashcardError::EmptyContent {
                filename,
                pages: extracted.page_count,
            });
        }
        let extracted_chars = extracted.char_count();
        if let Some(ref cb) = config.progress_callback {
            cb.on_extraction_complete(extracted.page_count, extracted_chars);
        }

        // ── Step 2: Build prompt ─────────────────────────────────────────────
        let prompt = build_generation_prompt(&extracted.text, card_count, config.max_input_chars);
        if prompt.truncated {
            debug!(
                "Truncated input from {} to {} chars",
                extracted_chars, prompt.source_chars
            );
        }
        if let Some(ref cb) = config.progress_callback {
            cb.on_generation_start(prompt.source_chars, prompt.truncated);
        }

        // ── Step 3: Single model call ────────────────────────────────────────
        let (reply, llm_duration_ms) =
            llm::request_cards(&self.generator, &prompt.text, config).await?;
        if let Some(ref cb) = config.progress_callback {
            cb.on_generation_complete(reply.content.len());
        }

        // ── Step 4: Parse reply ──────────────────────────────────────────────
        let cards = self.parser.parse(&reply.content);
        if cards.is_empty() {
            warn!(
                "No flashcards parsed from a {}-char reply",
                reply.content.len()
            );
            return Err(FlashcardError::NoCardsParsed {
                reply_chars: reply.content.len(),
            });
        }
        if let Some(ref cb) = config.progress_callback {
            cb.on_parse_complete(cards.len(), cards.strategy.as_deref());
        }

        let stats = GenerationStats {
            page_count: extracted.page_count,
            extracted_chars,
            prompt_chars: prompt.source_chars,
            truncated: prompt.truncated,
            requested_cards: card_count,
            generated_cards: cards.len(),
            input_tokens: reply.input_tokens as u64,
            output_tokens: reply.output_tokens as u64,
            extraction_duration_ms,
            llm_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };

        info!(
            "Generated {}/{} flashcards from '{}' in {}ms",
            stats.generated_cards, card_count, filename, stats.total_duration_ms
        );

        let title = match title.map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => default_title(&filename),
        };

        Ok(GenerationOutput {
            title,
            description: format!("Generated from {}", filename),
            source_filename: filename,
            cards,
            stats,
        })
    }
}

/// Derive a deck title from a file name.
///
/// Drops any directory and the extension, turns underscores into spaces and
/// title-cases each word: `"cell_biology-ch2.pdf"` → `"Cell Biology-Ch2"`.
pub fn default_title(filename: &str) -> String {
    let base = input::base_name(filename);
    let stem = match base.rfind('.') {
        Some(idx) if idx > 0 => &base[..idx],
        _ => base.as_str(),
    };

    let mut title = String::with_capacity(stem.len());
    let mut prev_alpha = false;
    for ch in stem.replace('_', " ").chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                title.extend(ch.to_lowercase());
            } else {
                title.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            title.push(ch);
            prev_alpha = false;
        }
    }

    let title = title.trim();
    if title.is_empty() {
        FALLBACK_TITLE.to_string()
    } else {
        title.to_string()
    }
}

/// Generate flashcards from a PDF file path or URL.
///
/// This is the primary one-shot entry point.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf2cards::{generate_cards, GenerationConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = GenerationConfig::builder().card_count(5).build()?;
/// let deck = generate_cards("lecture_notes.pdf", None, &config).await?;
/// for card in &deck.cards {
///     println!("Q: {}\nA: {}\n", card.question, card.answer);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn generate_cards(
    input_str: impl AsRef<str>,
    title: Option<&str>,
    config: &GenerationConfig,
) -> Result<GenerationOutput, FlashcardError> {
    let pipeline = FlashcardPipeline::new(config.clone())?;
    let upload = input::load_input(input_str.as_ref(), config.download_timeout_secs).await?;
    pipeline.run(upload, title).await
}

/// Generate flashcards from PDF bytes already in memory.
///
/// `filename` names the source for the title and error messages.
pub async fn generate_from_bytes(
    bytes: &[u8],
    filename: &str,
    title: Option<&str>,
    config: &GenerationConfig,
) -> Result<GenerationOutput, FlashcardError> {
    let pipeline = FlashcardPipeline::new(config.clone())?;
    pipeline.run(PdfUpload::new(filename, bytes), title).await
}

/// Synchronous wrapper around [`generate_cards`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(
    input_str: impl AsRef<str>,
    title: Option<&str>,
    config: &GenerationConfig,
) -> Result<GenerationOutput, FlashcardError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| FlashcardError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate_cards(input_str, title, config))
}

/// Generate flashcards and write the result to a JSON file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn generate_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    title: Option<&str>,
    config: &GenerationConfig,
) -> Result<GenerationStats, FlashcardError> {
    let output = generate_cards(input_str, title, config).await?;
    write_json(output_path.as_ref(), &output).await?;
    Ok(output.stats)
}

/// Serialise `output` as pretty JSON to `path` via a sibling temp file.
pub async fn write_json(
    path: &Path,
    output: &GenerationOutput,
) -> Result<(), FlashcardError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| FlashcardError::Internal(format!("JSON serialisation failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| FlashcardError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json)
        .await
        .map_err(|e| FlashcardError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| FlashcardError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn create_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, FlashcardError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        FlashcardError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

fn resolve_generator(config: &GenerationConfig) -> Result<Arc<dyn CardGenerator>, FlashcardError> {
    if let Some(ref generator) = config.generator {
        return Ok(Arc::clone(generator));
    }
    let provider = resolve_provider(config)?;
    Ok(Arc::new(ProviderGenerator::new(provider, config)))
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`); the factory reads
///    the matching API key from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`),
///    checked before auto-detection so the model choice is honoured even
///    when several API keys are present.
/// 4. **OpenAI** when `OPENAI_API_KEY` is set.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
fn resolve_provider(config: &GenerationConfig) -> Result<Arc<dyn LLMProvider>, FlashcardError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| FlashcardError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
