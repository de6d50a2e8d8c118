//! Pipeline stages for PDF-to-flashcard generation.
//!
//! Each submodule implements exactly one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ prompt ──▶ llm ──▶ parse
//! (URL/path) (pdfium)   (truncate)  (1 call) (Q/A pairs)
//! ```
//!
//! 1. [`input`]   — read the user-supplied path or download the URL
//! 2. [`extract`] — pull page text; runs in `spawn_blocking` because pdfium
//!    is not async-safe
//! 3. [`crate::prompts`] — cut the text to the character budget and build
//!    the instruction
//! 4. [`llm`]     — one model call under a timeout; the only stage with
//!    network I/O besides downloads
//! 5. [`parse`]   — turn the free-text reply into ordered flashcards

pub mod extract;
pub mod input;
pub mod llm;
pub mod parse;
