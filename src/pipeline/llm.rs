//! LLM interaction: send the generation prompt and return the raw reply.
//!
//! The pipeline talks to the model through [`CardGenerator`], a one-method
//! seam: prompt in, reply text out. [`ProviderGenerator`] implements it over
//! any `edgequake-llm` provider; tests and embedders can supply their own.
//!
//! There is deliberately no retry loop here. A run makes exactly one model
//! call, bounded by `api_timeout_secs`; any failure ends the run with a
//! generation error.

use crate::config::GenerationConfig;
use crate::error::FlashcardError;
use crate::output::ModelReply;
use crate::prompts::DEFAULT_SYSTEM_PROMPT;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

/// Produces the model's reply for a generation prompt.
pub trait CardGenerator: Send + Sync {
    /// Run one completion. Implementations must not retry.
    fn generate<'a>(
        &'a self,
        system_prompt: &'a str,
        prompt: &'a str,
    ) -> BoxFuture<'a, Result<ModelReply, FlashcardError>>;
}

/// [`CardGenerator`] backed by an `edgequake-llm` provider.
pub struct ProviderGenerator {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
}

impl ProviderGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &GenerationConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

impl CardGenerator for ProviderGenerator {
    fn generate<'a>(
        &'a self,
        system_prompt: &'a str,
        prompt: &'a str,
    ) -> BoxFuture<'a, Result<ModelReply, FlashcardError>> {
        Box::pin(async move {
            let messages = vec![ChatMessage::system(system_prompt), ChatMessage::user(prompt)];
            let options = self.options();

            let response = self
                .provider
                .chat(&messages, Some(&options))
                .await
                .map_err(|e| classify_provider_error(&e.to_string()))?;

            Ok(ModelReply {
                content: response.content,
                input_tokens: response.prompt_tokens,
                output_tokens: response.completion_tokens,
            })
        })
    }
}

/// Map a provider error message onto our error variants.
///
/// Providers surface HTTP status codes only inside their message text, so
/// authentication failures are recognised by substring.
fn classify_provider_error(message: &str) -> FlashcardError {
    let lower = message.to_lowercase();
    if lower.contains("401")
        || lower.contains("403")
        || lower.contains("unauthorized")
        || lower.contains("invalid api key")
    {
        FlashcardError::AuthError {
            detail: message.to_string(),
        }
    } else {
        FlashcardError::LlmApiError {
            message: message.to_string(),
        }
    }
}

/// Send `prompt` to the generator once, bounded by the configured timeout.
///
/// An empty reply is reported as an empty [`ModelReply`], not an error: the
/// parser turns it into an empty batch and the pipeline decides.
pub async fn request_cards(
    generator: &Arc<dyn CardGenerator>,
    prompt: &str,
    config: &GenerationConfig,
) -> Result<(ModelReply, u64), FlashcardError> {
    let start = Instant::now();
    let system_prompt = config
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);
    let secs = config.api_timeout_secs;

    let call = generator.generate(system_prompt, prompt);
    let reply = match timeout(Duration::from_secs(secs), call).await {
        Ok(Ok(reply)) => reply,
        Ok(Err(e)) => {
            warn!("LLM call failed: {}", e);
            return Err(e);
        }
        Err(_) => {
            warn!("LLM call timed out after {}s", secs);
            return Err(FlashcardError::ApiTimeout { secs });
        }
    };

    let elapsed_ms = start.elapsed().as_millis() as u64;
    debug!(
        "LLM reply: {} chars, {} input tokens, {} output tokens, {}ms",
        reply.content.len(),
        reply.input_tokens,
        reply.output_tokens,
        elapsed_ms
    );
    Ok((reply, elapsed_ms))
}
