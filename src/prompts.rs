//! Prompts for LLM-based flashcard generation.
//!
//! All prompt text lives here so it can be tuned in one place and inspected
//! by unit tests without calling a model. Callers can override the system
//! prompt via [`crate::config::GenerationConfig::system_prompt`]; the user
//! prompt is always built by [`build_generation_prompt`] because the reply
//! parser depends on the line format it asks for.

/// Default system prompt sent with every generation request.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert educator who creates high-quality \
flashcards for studying. You extract key concepts and create clear, concise questions with \
accurate answers.";

/// Default number of characters of document text sent to the model.
pub const DEFAULT_MAX_INPUT_CHARS: usize = 4000;

/// A generation prompt plus what happened to the source text on the way in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPrompt {
    pub text: String,
    /// Characters of document text embedded in the prompt.
    pub source_chars: usize,
    pub truncated: bool,
}

/// Keep the first `max_chars` characters of `text`.
///
/// Counts Unicode scalar values so a multi-byte character is never split.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Build the user prompt asking for `num_cards` flashcards about `text`.
///
/// Only the first `max_chars` characters of `text` are included. The output
/// is a pure function of its arguments.
pub fn build_generation_prompt(text: &str, num_cards: usize, max_chars: usize) -> GenerationPrompt {
    let excerpt = truncate_chars(text, max_chars);
    let source_chars = excerpt.chars().count();
    let truncated = excerpt.len() < text.len();

    let prompt = format!(
        "Based on the following text, create {num_cards} high-quality flashcards for studying.

TEXT:
{excerpt}

INSTRUCTIONS:
1. Extract the most important concepts, definitions, and facts
2. Create clear, specific questions
3. Provide accurate, concise answers
4. Format each flashcard on its own line as: <n>. Q: [question] | A: [answer]
5. Number each flashcard (1., 2., 3., etc.)
6. Focus on testable knowledge and key takeaways
7. Do not add any commentary before or after the flashcards

Generate exactly {num_cards} flashcards now:"
    );

    GenerationPrompt {
        text: prompt,
        source_chars,
        truncated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_not_truncated() {
        let p = build_generation_prompt("Photosynthesis converts light.", 5, 4000);
        assert!(!p.truncated);
        assert!(p.text.contains("Photosynthesis converts light."));
        assert!(p.text.contains("create 5 high-quality flashcards"));
        assert!(p.text.contains("Generate exactly 5 flashcards now:"));
        assert!(p.text.contains("Q: [question] | A: [answer]"));
    }

    #[test]
    fn long_text_is_cut_to_budget() {
        let text = "x".repeat(5000) + "TAIL";
        let p = build_generation_prompt(&text, 10, 4000);
        assert!(p.truncated);
        assert_eq!(p.source_chars, 4000);
        assert!(!p.text.contains("TAIL"));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "héllo wörld";
        assert_eq!(truncate_chars(text, 2), "hé");
        assert_eq!(truncate_chars(text, 100), text);
        assert_eq!(truncate_chars(text, 0), "");
    }

    #[test]
    fn prompt_is_deterministic() {
        let a = build_generation_prompt("same input", 3, 4000);
        let b = build_generation_prompt("same input", 3, 4000);
        assert_eq!(a, b);
    }
}
