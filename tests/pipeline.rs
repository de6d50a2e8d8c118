//! Pipeline integration tests with in-process fakes.
//!
//! No pdfium library and no API key are needed: text extraction and the
//! model call are replaced by [`FakeExtractor`] and [`FakeGenerator`].

use edgequake_pdf2cards::{
    generate_cards, generate_from_bytes, CardGenerator, ErrorKind, ExtractedText, FlashcardError,
    FlashcardPipeline, GenerationConfig, GenerationProgressCallback, ModelReply, ParseStrategy,
    PdfUpload, ResponseParser, TextExtractor,
};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_test::{assert_err, assert_ok};

// ── Fakes ────────────────────────────────────────────────────────────────────

struct FakeExtractor {
    pages: Vec<String>,
    calls: AtomicUsize,
}

impl FakeExtractor {
    fn new(pages: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            pages: pages.iter().map(|p| p.to_string()).collect(),
            calls: AtomicUsize::new(0),
        })
    }
}

impl TextExtractor for FakeExtractor {
    fn extract(
        &self,
        _pdf: &[u8],
        _filename: &str,
        _password: Option<&str>,
    ) -> Result<ExtractedText, FlashcardError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ExtractedText::from_pages(&self.pages))
    }
}

struct FailingExtractor;

impl TextExtractor for FailingExtractor {
    fn extract(
        &self,
        _pdf: &[u8],
        filename: &str,
        _password: Option<&str>,
    ) -> Result<ExtractedText, FlashcardError> {
        Err(FlashcardError::CorruptPdf {
            filename: filename.to_string(),
            detail: "trailer not found".into(),
        })
    }
}

#[derive(Default)]
struct FakeGenerator {
    reply: String,
    fail_with: Option<String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    system_prompts: Mutex<Vec<String>>,
}

impl FakeGenerator {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            ..Default::default()
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_with: Some(message.to_string()),
            ..Default::default()
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

impl CardGenerator for FakeGenerator {
    fn generate<'a>(
        &'a self,
        system_prompt: &'a str,
        prompt: &'a str,
    ) -> BoxFuture<'a, Result<ModelReply, FlashcardError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.system_prompts.lock().unwrap().push(system_prompt.to_string());
        Box::pin(async move {
            match &self.fail_with {
                Some(message) => Err(FlashcardError::LlmApiError {
                    message: message.clone(),
                }),
                None => Ok(ModelReply {
                    content: self.reply.clone(),
                    input_tokens: 120,
                    output_tokens: 45,
                }),
            }
        })
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

const PDF_BYTES: &[u8] = b"%PDF-1.7\n%fake body for tests\n";

const SCENARIO_A: &str = "1. Q: What is 2+2? | A: 4\n2. Q: Capital of France? | A: Paris";

fn pipeline(
    extractor: Arc<dyn TextExtractor>,
    generator: Arc<FakeGenerator>,
    config: GenerationConfig,
) -> FlashcardPipeline {
    let config = GenerationConfig {
        generator: Some(generator as Arc<dyn CardGenerator>),
        ..config
    };
    FlashcardPipeline::new(config)
        .expect("an explicit generator always resolves")
        .with_extractor(extractor)
}

fn upload(name: &str) -> PdfUpload {
    PdfUpload::new(name, PDF_BYTES)
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn scenario_a_well_formed_reply() {
    let generator = FakeGenerator::replying(SCENARIO_A);
    let p = pipeline(
        FakeExtractor::new(&["Arithmetic and geography."]),
        generator.clone(),
        GenerationConfig::default(),
    );

    let out = assert_ok!(p.run(upload("quiz.pdf"), None).await);
    let cards: Vec<_> = out
        .cards
        .iter()
        .map(|c| (c.question.as_str(), c.answer.as_str(), c.order))
        .collect();
    assert_eq!(
        cards,
        vec![("What is 2+2?", "4", 0), ("Capital of France?", "Paris", 1)]
    );
    assert_eq!(out.cards.strategy.as_deref(), Some("numbered"));
    assert_eq!(out.stats.generated_cards, 2);
    assert_eq!(out.stats.requested_cards, 10);
    assert_eq!(out.stats.input_tokens, 120);
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn scenario_b_unparseable_reply_is_generation_error() {
    let generator = FakeGenerator::replying("I'm sorry, I cannot help with that.");
    let p = pipeline(
        FakeExtractor::new(&["Some text."]),
        generator.clone(),
        GenerationConfig::default(),
    );

    let err = assert_err!(p.run(upload("notes.pdf"), None).await);
    assert!(matches!(err, FlashcardError::NoCardsParsed { .. }));
    assert_eq!(err.kind(), ErrorKind::Generation);
    assert_eq!(generator.calls(), 1, "no retry after a useless reply");
}

#[tokio::test]
async fn scenario_c_non_pdf_fails_before_extraction_and_model() {
    let extractor = FakeExtractor::new(&["never read"]);
    let generator = FakeGenerator::replying(SCENARIO_A);
    let p = pipeline(extractor.clone(), generator.clone(), GenerationConfig::default());

    let err = assert_err!(
        p.run(PdfUpload::new("notes.pdf", b"PK\x03\x04 zip archive".to_vec()), None)
            .await
    );
    assert_eq!(err.kind(), ErrorKind::Extraction);
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn scenario_c_with_default_extractor() {
    // The header check runs before pdfium is bound, so no library is needed.
    let generator = FakeGenerator::replying(SCENARIO_A);
    let config = GenerationConfig {
        generator: Some(generator.clone() as Arc<dyn CardGenerator>),
        ..GenerationConfig::default()
    };

    let err = assert_err!(generate_from_bytes(b"hello world", "notes.pdf", None, &config).await);
    assert!(matches!(err, FlashcardError::NotAPdf { .. }));
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn scenario_d_blank_pages_are_empty_content() {
    let generator = FakeGenerator::replying(SCENARIO_A);
    let p = pipeline(
        FakeExtractor::new(&["   ", "\n\n", "\t"]),
        generator.clone(),
        GenerationConfig::default(),
    );

    let err = assert_err!(p.run(upload("scan.pdf"), None).await);
    match err {
        FlashcardError::EmptyContent { filename, pages } => {
            assert_eq!(filename, "scan.pdf");
            assert_eq!(pages, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn scenario_e_line_oriented_fallback() {
    let generator = FakeGenerator::replying("Q: Define X\nA: Y definition\n\nsome noise");
    let p = pipeline(
        FakeExtractor::new(&["X is defined as Y."]),
        generator,
        GenerationConfig::default(),
    );

    let out = assert_ok!(p.run(upload("defs.pdf"), None).await);
    assert_eq!(out.cards.len(), 1);
    assert_eq!(out.cards.cards[0].question, "Define X");
    assert_eq!(out.cards.cards[0].answer, "Y definition");
    assert_eq!(out.cards.cards[0].order, 0);
    assert_eq!(out.cards.strategy.as_deref(), Some("block"));
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn extractor_failure_is_extraction_error() {
    let generator = FakeGenerator::replying(SCENARIO_A);
    let p = pipeline(Arc::new(FailingExtractor), generator.clone(), GenerationConfig::default());

    let err = assert_err!(p.run(upload("broken.pdf"), None).await);
    assert_eq!(err.kind(), ErrorKind::Extraction);
    assert!(err.to_string().contains("trailer not found"));
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn provider_failure_is_generation_error_without_retry() {
    let generator = FakeGenerator::failing("503 Service Unavailable");
    let p = pipeline(
        FakeExtractor::new(&["text"]),
        generator.clone(),
        GenerationConfig::default(),
    );

    let err = assert_err!(p.run(upload("a.pdf"), None).await);
    assert_eq!(err.kind(), ErrorKind::Generation);
    assert!(err.to_string().contains("503"));
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn missing_input_file_is_input_error() {
    let config = GenerationConfig {
        generator: Some(FakeGenerator::replying(SCENARIO_A) as Arc<dyn CardGenerator>),
        ..GenerationConfig::default()
    };
    let err = assert_err!(generate_cards("/no/such/dir/notes.pdf", None, &config).await);
    assert_eq!(err.kind(), ErrorKind::Input);
}

// ── Prompt & config flow ─────────────────────────────────────────────────────

#[tokio::test]
async fn prompt_is_truncated_to_budget() {
    let long_text = "abcdefghij".repeat(1000);
    let generator = FakeGenerator::replying(SCENARIO_A);
    let p = pipeline(
        FakeExtractor::new(&[&long_text]),
        generator.clone(),
        GenerationConfig::builder().max_input_chars(25).build().unwrap(),
    );

    let out = assert_ok!(p.run(upload("long.pdf"), None).await);
    assert!(out.stats.truncated);
    assert_eq!(out.stats.extracted_chars, 10_000);
    assert_eq!(out.stats.prompt_chars, 25);

    let prompt = generator.last_prompt();
    assert!(prompt.contains("abcdefghijabcdefghijabcde"));
    assert!(!prompt.contains("abcdefghijabcdefghijabcdef"));
}

#[tokio::test]
async fn requested_count_reaches_prompt() {
    let generator = FakeGenerator::replying(SCENARIO_A);
    let p = pipeline(
        FakeExtractor::new(&["text"]),
        generator.clone(),
        GenerationConfig::default(),
    );

    let out = assert_ok!(p.run_with_count(upload("a.pdf"), None, 7).await);
    assert_eq!(out.stats.requested_cards, 7);
    assert!(generator.last_prompt().contains("exactly 7 flashcards"));
}

#[tokio::test]
async fn custom_system_prompt_is_forwarded() {
    let generator = FakeGenerator::replying(SCENARIO_A);
    let p = pipeline(
        FakeExtractor::new(&["text"]),
        generator.clone(),
        GenerationConfig::builder()
            .system_prompt("You write terse medical flashcards.")
            .build()
            .unwrap(),
    );

    assert_ok!(p.run(upload("a.pdf"), None).await);
    let system = generator.system_prompts.lock().unwrap().clone();
    assert_eq!(system, vec!["You write terse medical flashcards.".to_string()]);
}

// ── Titles ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn title_and_description_defaults() {
    let p = pipeline(
        FakeExtractor::new(&["text"]),
        FakeGenerator::replying(SCENARIO_A),
        GenerationConfig::default(),
    );

    let out = assert_ok!(p.run(upload("organic_chemistry_ch4.pdf"), None).await);
    assert_eq!(out.title, "Organic Chemistry Ch4");
    assert_eq!(out.description, "Generated from organic_chemistry_ch4.pdf");
    assert_eq!(out.source_filename, "organic_chemistry_ch4.pdf");
}

#[tokio::test]
async fn supplied_title_wins_unless_blank() {
    let p = pipeline(
        FakeExtractor::new(&["text"]),
        FakeGenerator::replying(SCENARIO_A),
        GenerationConfig::default(),
    );

    let named = assert_ok!(p.run(upload("x_y.pdf"), Some("  My Deck ")).await);
    assert_eq!(named.title, "My Deck");

    let blank = assert_ok!(p.run(upload("x_y.pdf"), Some("   ")).await);
    assert_eq!(blank.title, "X Y");
}

// ── Progress & parser injection ──────────────────────────────────────────────

#[derive(Default)]
struct Events(Mutex<Vec<String>>);

impl GenerationProgressCallback for Events {
    fn on_extraction_start(&self, filename: &str, _bytes: usize) {
        self.0.lock().unwrap().push(format!("extract:{filename}"));
    }
    fn on_extraction_complete(&self, pages: usize, _chars: usize) {
        self.0.lock().unwrap().push(format!("extracted:{pages}"));
    }
    fn on_generation_start(&self, _prompt_chars: usize, _truncated: bool) {
        self.0.lock().unwrap().push("generate".into());
    }
    fn on_generation_complete(&self, _reply_chars: usize) {
        self.0.lock().unwrap().push("generated".into());
    }
    fn on_parse_complete(&self, cards: usize, _strategy: Option<&str>) {
        self.0.lock().unwrap().push(format!("parsed:{cards}"));
    }
    fn on_error(&self, _error: &str) {
        self.0.lock().unwrap().push("error".into());
    }
}

#[tokio::test]
async fn progress_events_fire_in_stage_order() {
    let events = Arc::new(Events::default());
    let config = GenerationConfig::builder()
        .progress_callback(events.clone() as Arc<dyn GenerationProgressCallback>)
        .build()
        .unwrap();
    let p = pipeline(
        FakeExtractor::new(&["one", "two"]),
        FakeGenerator::replying(SCENARIO_A),
        config,
    );

    assert_ok!(p.run(upload("a.pdf"), None).await);
    assert_eq!(
        *events.0.lock().unwrap(),
        vec!["extract:a.pdf", "extracted:2", "generate", "generated", "parsed:2"]
    );
}

#[tokio::test]
async fn progress_reports_error_and_stops() {
    let events = Arc::new(Events::default());
    let config = GenerationConfig::builder()
        .progress_callback(events.clone() as Arc<dyn GenerationProgressCallback>)
        .build()
        .unwrap();
    let p = pipeline(
        FakeExtractor::new(&["text"]),
        FakeGenerator::replying("no cards here"),
        config,
    );

    assert_err!(p.run(upload("a.pdf"), None).await);
    assert_eq!(
        *events.0.lock().unwrap(),
        vec!["extract:a.pdf", "extracted:1", "generate", "generated", "error"]
    );
}

struct ArrowStrategy;

impl ParseStrategy for ArrowStrategy {
    fn name(&self) -> &'static str {
        "arrow"
    }

    fn extract_pairs(&self, reply: &str) -> Vec<(String, String)> {
        reply
            .lines()
            .filter_map(|l| l.split_once("=>"))
            .map(|(q, a)| (q.to_string(), a.to_string()))
            .collect()
    }
}

#[tokio::test]
async fn injected_parser_strategy_is_used() {
    let p = pipeline(
        FakeExtractor::new(&["text"]),
        FakeGenerator::replying("mitochondria => powerhouse of the cell"),
        GenerationConfig::default(),
    )
    .with_parser(ResponseParser::default().with_strategy(ArrowStrategy));

    let out = assert_ok!(p.run(upload("bio.pdf"), None).await);
    assert_eq!(out.cards.strategy.as_deref(), Some("arrow"));
    assert_eq!(out.cards.cards[0].question, "mitochondria");
    assert_eq!(out.cards.cards[0].answer, "powerhouse of the cell");
}
