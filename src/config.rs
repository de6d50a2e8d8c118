//! Configuration types for PDF-to-flashcard generation.
//!
//! Every knob lives in [`GenerationConfig`], built via
//! [`GenerationConfigBuilder`]. The config is passed explicitly into
//! [`crate::generate::FlashcardPipeline::new`]; nothing reads process-wide
//! client state after construction, which keeps runs independent and lets
//! tests inject a fake generator.

use crate::error::FlashcardError;
use crate::pipeline::llm::CardGenerator;
use crate::progress::ProgressCallback;
use crate::prompts::DEFAULT_MAX_INPUT_CHARS;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Upper bound on cards per request; larger decks need several runs.
pub const MAX_CARD_COUNT: usize = 100;

/// Configuration for a flashcard generation run.
///
/// # Example
/// ```rust
/// use edgequake_pdf2cards::GenerationConfig;
///
/// let config = GenerationConfig::builder()
///     .card_count(15)
///     .model("gpt-4.1-mini")
///     .build()
///     .unwrap();
/// assert_eq!(config.card_count, 15);
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// Number of flashcards to ask the model for. Range: 1–100. Default: 10.
    ///
    /// This is a request, not a guarantee: the model may return fewer or
    /// more, and every parsed card is kept.
    pub card_count: usize,

    /// Characters of extracted text included in the prompt. Default: 4000.
    ///
    /// Text beyond the budget is dropped, not summarised. 4000 characters is
    /// roughly 1000 tokens, comfortably inside every supported model's
    /// context together with the instructions and the reply.
    pub max_input_chars: usize,

    /// LLM model identifier, e.g. "gpt-4.1-nano", "llama-3.3-70b-versatile".
    /// If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed generator. Takes precedence over every provider setting.
    pub generator: Option<Arc<dyn CardGenerator>>,

    /// Sampling temperature. Default: 0.7.
    ///
    /// Question writing benefits from some variety; transcription-style
    /// near-zero temperatures tend to produce repetitive "What is X?" decks.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 2000.
    pub max_tokens: usize,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Custom system prompt. If None, uses the built-in default.
    pub system_prompt: Option<String>,

    /// Timeout for the single model call in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional stage-event sink (progress bars, logs).
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            card_count: 10,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            model: None,
            provider_name: None,
            provider: None,
            generator: None,
            temperature: 0.7,
            max_tokens: 2000,
            password: None,
            system_prompt: None,
            api_timeout_secs: 60,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("card_count", &self.card_count)
            .field("max_input_chars", &self.max_input_chars)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("generator", &self.generator.as_ref().map(|_| "<dyn CardGenerator>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .finish()
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`GenerationConfig`].
#[derive(Debug)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn card_count(mut self, n: usize) -> Self {
        self.config.card_count = n;
        self
    }

    pub fn max_input_chars(mut self, n: usize) -> Self {
        self.config.max_input_chars = n.max(1);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn generator(mut self, generator: Arc<dyn CardGenerator>) -> Self {
        self.config.generator = Some(generator);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, FlashcardError> {
        let c = &self.config;
        if c.card_count == 0 || c.card_count > MAX_CARD_COUNT {
            return Err(FlashcardError::InvalidConfig(format!(
                "Card count must be 1–{}, got {}",
                MAX_CARD_COUNT, c.card_count
            )));
        }
        if c.max_tokens == 0 {
            return Err(FlashcardError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = GenerationConfig::default();
        assert_eq!(c.card_count, 10);
        assert_eq!(c.max_input_chars, 4000);
        assert_eq!(c.max_tokens, 2000);
        assert_eq!(c.api_timeout_secs, 60);
        assert!((c.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn zero_cards_rejected() {
        let err = GenerationConfig::builder().card_count(0).build().unwrap_err();
        assert!(err.to_string().contains("Card count"), "got: {err}");
    }

    #[test]
    fn too_many_cards_rejected() {
        assert!(GenerationConfig::builder()
            .card_count(MAX_CARD_COUNT + 1)
            .build()
            .is_err());
    }

    #[test]
    fn setters_clamp() {
        let c = GenerationConfig::builder()
            .temperature(9.0)
            .api_timeout_secs(0)
            .max_input_chars(0)
            .build()
            .unwrap();
        assert_eq!(c.temperature, 2.0);
        assert_eq!(c.api_timeout_secs, 1);
        assert_eq!(c.max_input_chars, 1);
    }

    #[test]
    fn debug_redacts_password() {
        let c = GenerationConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }
}
