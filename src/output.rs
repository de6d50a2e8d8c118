//! Output types: extracted text, parsed flashcards, and run statistics.
//!
//! Everything here is plain data with `serde` derives so callers can dump a
//! [`GenerationOutput`] straight to JSON (the CLI's `--json` mode does exactly
//! that) or hand the [`FlashcardBatch`] to a deck store.

use serde::{Deserialize, Serialize};

/// Text pulled out of a PDF, pages joined by `\n` and trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub text: String,
    pub page_count: usize,
}

impl ExtractedText {
    /// Join per-page text in document order.
    ///
    /// Pages are separated by a single newline and the result is trimmed on
    /// both ends, so a document of blank pages yields an empty string.
    pub fn from_pages<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut text = String::new();
        let mut page_count = 0;
        for page in pages {
            text.push_str(page.as_ref());
            text.push('\n');
            page_count += 1;
        }
        Self {
            text: text.trim().to_string(),
            page_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Length in characters (not bytes).
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// The model's reply, verbatim, plus whatever usage the provider reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelReply {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl ModelReply {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// One question/answer pair and its position in the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardRecord {
    pub question: String,
    pub answer: String,
    /// Zero-based position in the parsed sequence.
    pub order: usize,
}

/// Ordered flashcards parsed from one model reply.
///
/// May be empty: the parser reports "nothing matched" this way and leaves it
/// to the pipeline to turn that into an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardBatch {
    pub cards: Vec<FlashcardRecord>,
    /// Name of the parse strategy that produced the cards, if any did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

impl FlashcardBatch {
    /// Build a batch from trimmed pairs, numbering them from zero.
    ///
    /// Pairs with an empty question or answer are dropped before numbering so
    /// `order` stays contiguous.
    pub fn from_pairs(pairs: Vec<(String, String)>, strategy: Option<&str>) -> Self {
        let cards = pairs
            .into_iter()
            .map(|(q, a)| (q.trim().to_string(), a.trim().to_string()))
            .filter(|(q, a)| !q.is_empty() && !a.is_empty())
            .enumerate()
            .map(|(order, (question, answer))| FlashcardRecord {
                question,
                answer,
                order,
            })
            .collect::<Vec<_>>();
        let strategy = if cards.is_empty() {
            None
        } else {
            strategy.map(str::to_string)
        };
        Self { cards, strategy }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FlashcardRecord> {
        self.cards.iter()
    }
}

impl<'a> IntoIterator for &'a FlashcardBatch {
    type Item = &'a FlashcardRecord;
    type IntoIter = std::slice::Iter<'a, FlashcardRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.cards.iter()
    }
}

/// Result of one pipeline run, ready to be persisted as a deck.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub title: String,
    pub description: String,
    pub source_filename: String,
    pub cards: FlashcardBatch,
    pub stats: GenerationStats,
}

/// Per-run numbers, mostly for logs and the CLI summary line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationStats {
    pub page_count: usize,
    /// Characters extracted from the PDF.
    pub extracted_chars: usize,
    /// Characters of document text actually sent to the model.
    pub prompt_chars: usize,
    /// True when the text was cut to the configured budget.
    pub truncated: bool,
    pub requested_cards: usize,
    pub generated_cards: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub extraction_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_joined_with_newline_and_trimmed() {
        let text = ExtractedText::from_pages(["  Intro", "Body\n", "  "]);
        assert_eq!(text.text, "Intro\nBody");
        assert_eq!(text.page_count, 3);
    }

    #[test]
    fn whitespace_pages_are_empty() {
        let text = ExtractedText::from_pages(["   ", "\n\t", ""]);
        assert!(text.is_empty());
        assert_eq!(text.page_count, 3);
    }

    #[test]
    fn batch_numbers_from_zero_and_skips_blank_pairs() {
        let batch = FlashcardBatch::from_pairs(
            vec![
                (" a ".into(), " 1 ".into()),
                ("   ".into(), "orphan".into()),
                ("b".into(), "2".into()),
            ],
            Some("numbered"),
        );
        let orders: Vec<_> = batch.iter().map(|c| c.order).collect();
        assert_eq!(orders, vec![0, 1]);
        assert_eq!(batch.cards[0].question, "a");
        assert_eq!(batch.cards[1].answer, "2");
        assert_eq!(batch.strategy.as_deref(), Some("numbered"));
    }

    #[test]
    fn empty_batch_has_no_strategy() {
        let batch = FlashcardBatch::from_pairs(Vec::new(), Some("numbered"));
        assert!(batch.is_empty());
        assert_eq!(batch.strategy, None);
    }
}
