//! SQLite persistence for decks and their flashcards.
//!
//! One [`Connection`] behind a [`Mutex`]; every operation is short and
//! synchronous. Generated decks are written with [`DeckStore::save_generated`]
//! in a single transaction, so a deck never exists without its cards.

use crate::output::GenerationOutput;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS decks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    pdf_filename TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE TABLE IF NOT EXISTS flashcards (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    deck_id INTEGER NOT NULL REFERENCES decks(id) ON DELETE CASCADE,
    question TEXT NOT NULL,
    answer TEXT NOT NULL,
    mastered INTEGER NOT NULL DEFAULT 0,
    "order" INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_flashcards_deck ON flashcards(deck_id);
"#;

const DECK_COLUMNS: &str = "id, title, description, pdf_filename, created_at, updated_at";
const CARD_COLUMNS: &str = r#"id, deck_id, question, answer, mastered, "order""#;
const INSERT_CARD: &str =
    r#"INSERT INTO flashcards (deck_id, question, answer, "order") VALUES (?1, ?2, ?3, ?4)"#;

/// Errors from the deck store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Deck {0} not found")]
    DeckNotFound(i64),

    #[error("Flashcard {0} not found")]
    CardNotFound(i64),

    #[error("Invalid {field}: must not be empty")]
    EmptyField { field: &'static str },

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Database lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::DeckNotFound(_) | StoreError::CardNotFound(_))
    }
}

/// A flashcard as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: i64,
    #[serde(skip)]
    pub deck_id: i64,
    pub question: String,
    pub answer: String,
    pub mastered: bool,
    pub order: i64,
}

/// A deck with its cards and counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub pdf_filename: String,
    pub created_at: String,
    pub updated_at: String,
    pub flashcards: Vec<Card>,
    pub card_count: usize,
    pub mastered_count: usize,
}

/// Fields for a new deck.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewDeck {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub pdf_filename: Option<String>,
}

/// Fields for a new card.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCard {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub order: i64,
}

/// Deck and flashcard persistence.
pub struct DeckStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for DeckStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeckStore").finish_non_exhaustive()
    }
}

impl DeckStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        info!("Opened deck store at {}", path.display());
        Self::init(conn)
    }

    /// A throwaway store, mostly for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Create an empty deck.
    pub fn create_deck(&self, deck: &NewDeck) -> Result<Deck, StoreError> {
        let title = deck.title.trim();
        if title.is_empty() {
            return Err(StoreError::EmptyField { field: "title" });
        }
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO decks (title, description, pdf_filename) VALUES (?1, ?2, ?3)",
            params![
                title,
                deck.description.as_deref().unwrap_or(""),
                deck.pdf_filename.as_deref().unwrap_or("")
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!("Created deck {}", id);
        load_deck(&conn, id)
    }

    /// Every deck with its cards, newest first.
    pub fn list_decks(&self) -> Result<Vec<Deck>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {DECK_COLUMNS} FROM decks ORDER BY created_at DESC, id DESC"
        ))?;
        let mut decks = stmt
            .query_map([], deck_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        for deck in &mut decks {
            attach_cards(&conn, deck)?;
        }
        Ok(decks)
    }

    pub fn get_deck(&self, id: i64) -> Result<Deck, StoreError> {
        let conn = self.lock()?;
        load_deck(&conn, id)
    }

    /// Delete a deck; its cards go with it.
    pub fn delete_deck(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM decks WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StoreError::DeckNotFound(id));
        }
        debug!("Deleted deck {}", id);
        Ok(())
    }

    /// Add a card to an existing deck.
    pub fn add_card(&self, deck_id: i64, card: &NewCard) -> Result<Card, StoreError> {
        let question = card.question.trim();
        let answer = card.answer.trim();
        if question.is_empty() {
            return Err(StoreError::EmptyField { field: "question" });
        }
        if answer.is_empty() {
            return Err(StoreError::EmptyField { field: "answer" });
        }

        let conn = self.lock()?;
        if !deck_exists(&conn, deck_id)? {
            return Err(StoreError::DeckNotFound(deck_id));
        }
        conn.execute(INSERT_CARD, params![deck_id, question, answer, card.order])?;
        load_card(&conn, conn.last_insert_rowid())
    }

    /// Flip a card's mastered flag.
    pub fn set_mastered(&self, card_id: i64, mastered: bool) -> Result<Card, StoreError> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE flashcards SET mastered = ?1 WHERE id = ?2",
            params![mastered, card_id],
        )?;
        if updated == 0 {
            return Err(StoreError::CardNotFound(card_id));
        }
        load_card(&conn, card_id)
    }

    /// Persist a generated deck and all of its cards atomically.
    pub fn save_generated(&self, output: &GenerationOutput) -> Result<Deck, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO decks (title, description, pdf_filename) VALUES (?1, ?2, ?3)",
            params![output.title, output.description, output.source_filename],
        )?;
        let deck_id = tx.last_insert_rowid();
        {
            let mut stmt = tx.prepare_cached(INSERT_CARD)?;
            for card in &output.cards {
                stmt.execute(params![deck_id, card.question, card.answer, card.order as i64])?;
            }
        }
        tx.commit()?;

        info!(
            "Saved deck {} '{}' with {} cards",
            deck_id,
            output.title,
            output.cards.len()
        );
        load_deck(&conn, deck_id)
    }
}

fn deck_from_row(row: &Row<'_>) -> rusqlite::Result<Deck> {
    Ok(Deck {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        pdf_filename: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
        flashcards: Vec::new(),
        card_count: 0,
        mastered_count: 0,
    })
}

fn card_from_row(row: &Row<'_>) -> rusqlite::Result<Card> {
    Ok(Card {
        id: row.get(0)?,
        deck_id: row.get(1)?,
        question: row.get(2)?,
        answer: row.get(3)?,
        mastered: row.get(4)?,
        order: row.get(5)?,
    })
}

fn deck_exists(conn: &Connection, id: i64) -> Result<bool, StoreError> {
    let found = conn
        .query_row("SELECT 1 FROM decks WHERE id = ?1", params![id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

fn load_deck(conn: &Connection, id: i64) -> Result<Deck, StoreError> {
    let mut deck = conn
        .query_row(
            &format!("SELECT {DECK_COLUMNS} FROM decks WHERE id = ?1"),
            params![id],
            deck_from_row,
        )
        .optional()?
        .ok_or(StoreError::DeckNotFound(id))?;
    attach_cards(conn, &mut deck)?;
    Ok(deck)
}

fn load_card(conn: &Connection, id: i64) -> Result<Card, StoreError> {
    conn.query_row(
        &format!("SELECT {CARD_COLUMNS} FROM flashcards WHERE id = ?1"),
        params![id],
        card_from_row,
    )
    .optional()?
    .ok_or(StoreError::CardNotFound(id))
}

fn attach_cards(conn: &Connection, deck: &mut Deck) -> Result<(), StoreError> {
    let mut stmt = conn.prepare_cached(&format!(
        r#"SELECT {CARD_COLUMNS} FROM flashcards WHERE deck_id = ?1 ORDER BY "order", id"#
    ))?;
    deck.flashcards = stmt
        .query_map(params![deck.id], card_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    deck.card_count = deck.flashcards.len();
    deck.mastered_count = deck.flashcards.iter().filter(|c| c.mastered).count();
    Ok(())
}
