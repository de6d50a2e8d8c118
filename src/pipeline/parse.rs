//! Reply parsing: turn the model's free-form text into flashcard records.
//!
//! Models drift. Even with an explicit line format in the prompt, replies
//! come back with preambles, missing numbers, or `Q:`/`A:` on separate
//! lines. The parser is therefore an ordered chain of [`ParseStrategy`]
//! objects: each one tries to read the whole reply, and the first that yields
//! at least one card wins. Adding support for a new reply shape means adding
//! a strategy, not touching the pipeline.
//!
//! ## Built-in chain
//!
//! 1. [`NumberedStrategy`] — `1. Q: … | A: …` entries, case-insensitive,
//!    each running until the next numbered entry or the end of the reply.
//! 2. [`BlockStrategy`] — blank-line separated blocks holding `Q:` and `A:`
//!    markers, with or without a `|` between them.
//!
//! Parsing never fails: a reply nothing understands yields an empty
//! [`FlashcardBatch`], and the caller decides whether that is an error.

use crate::output::FlashcardBatch;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// One reply format the parser knows how to read.
pub trait ParseStrategy: Send + Sync {
    /// Short identifier recorded in [`FlashcardBatch::strategy`].
    fn name(&self) -> &'static str;

    /// Extract raw `(question, answer)` pairs in reply order.
    ///
    /// Pairs are trimmed and blank ones dropped by the caller, so strategies
    /// may return them as found.
    fn extract_pairs(&self, reply: &str) -> Vec<(String, String)>;
}

/// Ordered chain of strategies; first non-empty result wins.
pub struct ResponseParser {
    strategies: Vec<Box<dyn ParseStrategy>>,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self {
            strategies: vec![Box::new(NumberedStrategy), Box::new(BlockStrategy)],
        }
    }
}

impl std::fmt::Debug for ResponseParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.strategies.iter().map(|s| s.name()))
            .finish()
    }
}

impl ResponseParser {
    /// The built-in chain: numbered entries, then Q/A blocks.
    pub fn new() -> Self {
        Self::default()
    }

    /// A parser with no strategies; every reply parses to an empty batch.
    pub fn empty() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Append a strategy to the end of the chain.
    pub fn with_strategy(mut self, strategy: impl ParseStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Names of the strategies, in the order they are tried.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Parse `reply` into an ordered batch; empty if no strategy matched.
    pub fn parse(&self, reply: &str) -> FlashcardBatch {
        let reply = normalise_line_endings(reply);

        for strategy in &self.strategies {
            let pairs = strategy.extract_pairs(&reply);
            let batch = FlashcardBatch::from_pairs(pairs, Some(strategy.name()));
            if !batch.is_empty() {
                debug!("Parsed {} cards with '{}' strategy", batch.len(), strategy.name());
                return batch;
            }
            debug!("Strategy '{}' found no cards", strategy.name());
        }

        FlashcardBatch::default()
    }
}

/// Parse with the built-in chain.
pub fn parse_reply(reply: &str) -> FlashcardBatch {
    ResponseParser::default().parse(reply)
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Strategy 1: numbered entries ─────────────────────────────────────────────

/// Where a numbered entry begins: `12. Q:` (any case, any spacing).
static RE_ENTRY_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\d+\.\s*Q:").unwrap());

/// A whole entry, once cut out of the reply. The question stops at the first
/// `| A:`; the answer takes the rest of the entry, newlines included.
static RE_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\A\d+\.\s*Q:\s*(.+?)\s*\|\s*A:\s*(.+)\z").unwrap());

/// `<n>. Q: <question> | A: <answer>` entries.
///
/// The reply is cut at every entry start, so an answer spans everything up
/// to the next entry (or the end of the reply). An entry without a `| A:`
/// separator is skipped rather than swallowing its neighbour.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberedStrategy;

impl ParseStrategy for NumberedStrategy {
    fn name(&self) -> &'static str {
        "numbered"
    }

    fn extract_pairs(&self, reply: &str) -> Vec<(String, String)> {
        let starts: Vec<usize> = RE_ENTRY_START.find_iter(reply).map(|m| m.start()).collect();

        starts
            .iter()
            .enumerate()
            .filter_map(|(i, &start)| {
                let end = starts.get(i + 1).copied().unwrap_or(reply.len());
                let caps = RE_ENTRY.captures(&reply[start..end])?;
                Some((caps[1].to_string(), caps[2].to_string()))
            })
            .collect()
    }
}

// ── Strategy 2: blank-line separated blocks ─────────────────────────────────

static RE_BLANK_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*\n").unwrap());

/// Blocks separated by blank lines, each carrying `Q:` and `A:` markers.
///
/// Pipe form `Q: … | A: …` applies when the text before the first `|` holds
/// `Q:` and the text after it starts with `A:`; the answer then runs to the
/// next `|`. Any other block is read line-wise, split at the first `A:`
/// after `Q:`, so a `|` inside a question or answer is kept. A block whose
/// question still contains `A:`, or with an empty side, is skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockStrategy;

impl ParseStrategy for BlockStrategy {
    fn name(&self) -> &'static str {
        "block"
    }

    fn extract_pairs(&self, reply: &str) -> Vec<(String, String)> {
        RE_BLANK_LINE.split(reply).filter_map(parse_block).collect()
    }
}

fn parse_block(block: &str) -> Option<(String, String)> {
    let q_idx = block.find("Q:")?;

    let (question, answer) = match split_piped(block) {
        Some(pair) => pair,
        None => {
            let after_q = &block[q_idx + 2..];
            let a_idx = after_q.find("A:")?;
            (&after_q[..a_idx], &after_q[a_idx + 2..])
        }
    };

    let (question, answer) = (question.trim(), answer.trim());
    if question.is_empty() || answer.is_empty() || question.contains("A:") {
        return None;
    }
    Some((question.to_string(), answer.to_string()))
}

fn split_piped(block: &str) -> Option<(&str, &str)> {
    let mut segments = block.split('|');
    let first = segments.next()?;
    let second = segments.next()?.trim_start().strip_prefix("A:")?;
    let question = first.rsplit_once("Q:")?.1;
    Some((question, second))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(batch: &FlashcardBatch) -> Vec<(&str, &str, usize)> {
        batch
            .iter()
            .map(|c| (c.question.as_str(), c.answer.as_str(), c.order))
            .collect()
    }

    #[test]
    fn numbered_reply() {
        let batch = parse_reply("1. Q: What is 2+2? | A: 4\n2. Q: Capital of France? | A: Paris");
        assert_eq!(
            pairs(&batch),
            vec![("What is 2+2?", "4", 0), ("Capital of France?", "Paris", 1)]
        );
        assert_eq!(batch.strategy.as_deref(), Some("numbered"));
    }

    #[test]
    fn numbered_reply_with_preamble_and_outro() {
        let reply = "Here are your flashcards:\n\n\
                     1. Q: What is ATP? | A: The energy currency of the cell.\n\
                     2. Q: Where is ATP made? | A: Mostly in mitochondria.\n";
        let batch = parse_reply(reply);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.cards[0].question, "What is ATP?");
        assert_eq!(batch.cards[1].answer, "Mostly in mitochondria.");
    }

    #[test]
    fn numbered_is_case_insensitive_and_spans_lines() {
        let reply =
            "1. q: Name two noble gases\n| a: Helium\nand neon\n2.Q:Define entropy|A:Disorder";
        let batch = parse_reply(reply);
        assert_eq!(
            pairs(&batch),
            vec![
                ("Name two noble gases", "Helium\nand neon", 0),
                ("Define entropy", "Disorder", 1),
            ]
        );
    }

    #[test]
    fn numbered_entry_without_separator_is_skipped() {
        let reply = "1. Q: Broken entry with no answer\n2. Q: Good one? | A: Yes";
        let batch = parse_reply(reply);
        assert_eq!(pairs(&batch), vec![("Good one?", "Yes", 0)]);
    }

    #[test]
    fn crlf_replies_parse() {
        let batch = parse_reply("1. Q: A? | A: B\r\n2. Q: C? | A: D\r\n");
        assert_eq!(pairs(&batch), vec![("A?", "B", 0), ("C?", "D", 1)]);
    }

    #[test]
    fn orders_follow_appearance() {
        let reply: String = (1..=12)
            .map(|n| format!("{n}. Q: question {n} | A: answer {n}\n"))
            .collect();
        let batch = parse_reply(&reply);
        assert_eq!(batch.len(), 12);
        for (i, card) in batch.iter().enumerate() {
            assert_eq!(card.order, i);
            assert_eq!(card.question, format!("question {}", i + 1));
        }
    }

    #[test]
    fn encoded_record_parses_back_trimmed() {
        for (q, a) in [
            ("What is Rust?", "A systems language"),
            ("  padded question  ", "\tpadded answer "),
            ("Is 3.14 pi?", "Approximately"),
        ] {
            let batch = parse_reply(&format!("1. Q: {q} | A: {a}"));
            assert_eq!(batch.len(), 1, "reply for {q:?}");
            assert_eq!(batch.cards[0].question, q.trim());
            assert_eq!(batch.cards[0].answer, a.trim());
        }
    }

    #[test]
    fn parsing_is_idempotent() {
        let reply = "1. Q: One | A: 1\n\nQ: stray | A: block\n2. Q: Two | A: 2";
        assert_eq!(parse_reply(reply), parse_reply(reply));
    }

    #[test]
    fn no_markers_yields_empty_batch() {
        let batch = parse_reply("I'm sorry, I can't help with that document.");
        assert!(batch.is_empty());
        assert_eq!(batch.strategy, None);
    }

    #[test]
    fn empty_reply_yields_empty_batch() {
        assert!(parse_reply("").is_empty());
        assert!(parse_reply("   \n\n ").is_empty());
    }

    #[test]
    fn block_fallback_line_oriented() {
        let batch = parse_reply("Q: Define X\nA: Y definition\n\nsome noise");
        assert_eq!(pairs(&batch), vec![("Define X", "Y definition", 0)]);
        assert_eq!(batch.strategy.as_deref(), Some("block"));
    }

    #[test]
    fn block_fallback_with_pipe() {
        let reply = "Q: What is mitosis? | A: Cell division\n\n\
                     Q: What is meiosis? | A: Reduction division";
        let batch = parse_reply(reply);
        assert_eq!(
            pairs(&batch),
            vec![
                ("What is mitosis?", "Cell division", 0),
                ("What is meiosis?", "Reduction division", 1),
            ]
        );
    }

    #[test]
    fn block_with_answer_before_question_is_skipped() {
        let batch = parse_reply("A: backwards\nQ: block\n\nQ: Fine | A: ok");
        assert_eq!(pairs(&batch), vec![("Fine", "ok", 0)]);
    }

    #[test]
    fn pipe_inside_line_oriented_answer_is_kept() {
        let batch = parse_reply("Q: Define OR\nA: a | b");
        assert_eq!(pairs(&batch), vec![("Define OR", "a | b", 0)]);
    }

    #[test]
    fn pipe_inside_line_oriented_question_is_kept() {
        let batch = parse_reply("Q: What is a|b?\nA: bitwise or");
        assert_eq!(pairs(&batch), vec![("What is a|b?", "bitwise or", 0)]);
    }

    #[test]
    fn block_whose_question_swallows_an_answer_is_skipped() {
        let batch = parse_reply("Q: one A: two | A: three\n\nQ: Fine | A: ok");
        assert_eq!(pairs(&batch), vec![("Fine", "ok", 0)]);
    }

    #[test]
    fn block_with_empty_answer_is_skipped() {
        assert!(parse_reply("Q: Half a card | A:   ").is_empty());
    }

    #[test]
    fn numbered_wins_over_block() {
        let reply = "Q: block card | A: ignored\n\n1. Q: numbered | A: kept";
        let batch = parse_reply(reply);
        assert_eq!(pairs(&batch), vec![("numbered", "kept", 0)]);
    }

    struct TermDefinition;

    impl ParseStrategy for TermDefinition {
        fn name(&self) -> &'static str {
            "term"
        }

        fn extract_pairs(&self, reply: &str) -> Vec<(String, String)> {
            reply
                .lines()
                .filter_map(|l| l.split_once(" :: "))
                .map(|(t, d)| (format!("Define {t}"), d.to_string()))
                .collect()
        }
    }

    #[test]
    fn custom_strategy_extends_chain() {
        let parser = ResponseParser::new().with_strategy(TermDefinition);
        assert_eq!(parser.strategy_names(), vec!["numbered", "block", "term"]);

        let batch = parser.parse("Osmosis :: Diffusion of water\nLipid :: A fat");
        assert_eq!(batch.strategy.as_deref(), Some("term"));
        assert_eq!(
            pairs(&batch),
            vec![("Define Osmosis", "Diffusion of water", 0), ("Define Lipid", "A fat", 1)]
        );
    }

    #[test]
    fn empty_parser_never_matches() {
        assert!(ResponseParser::empty().parse("1. Q: a | A: b").is_empty());
    }
}
