//! Flashcard review persistence store.
//!
//! Provides SQLite-backed storage for flashcard scheduling state and review
//! history. Every write of a card's fields and its history append happens in
//! one transaction, so readers never see an interval that disagrees with
//! `next_review_at`.
//!
//! Submissions for the same card are serialized: in-process by the connection
//! mutex and an IMMEDIATE transaction, across processes by a per-card
//! `version` column checked on every write. A writer holding a stale version
//! gets [`LingoError::Conflict`] rather than overwriting a newer review.

use crate::config::StoreConfig;
use crate::error::{ErrorCode, LingoError, LingoResult};
use crate::review::SpacedRepetitionScheduler;
use crate::types::{FlashcardSchedulingState, Outcome, ReviewEntry};
use chrono::{DateTime, Timelike, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Mastery level counted as "mastered" in statistics.
const MASTERED_LEVEL: u8 = 5;

const BUSY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// A card that is due for review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueCard {
    pub card_id: String,
    pub state: FlashcardSchedulingState,
}

/// Aggregate review statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub total_cards: usize,
    /// Cards that were never reviewed.
    pub new_cards: usize,
    pub due_cards: usize,
    pub mastered_cards: usize,
    /// Mean ease factor, None when there are no cards.
    pub average_ease: Option<f64>,
}

/// Scheduling columns of a card row, before timestamp decoding.
struct CardRow {
    interval_days: f64,
    ease_factor: f64,
    repetitions: u32,
    next_review_at: i64,
    last_reviewed_at: Option<i64>,
    mastery_level: u8,
    version: i64,
}

/// SQLite-backed store for flashcard scheduling state.
#[derive(Clone)]
pub struct ReviewStore {
    conn: Arc<Mutex<Connection>>,
}

impl ReviewStore {
    /// Create a new review store with the given database path.
    ///
    /// Creates the database file and schema if they don't exist.
    pub fn new<P: AsRef<Path>>(path: P) -> LingoResult<Self> {
        let conn = Connection::open(path.as_ref()).map_err(|e| LingoError::Database {
            message: format!("failed to open {}: {}", path.as_ref().display(), e),
            code: ErrorCode::DbConnectionFailed,
            source: Some(Box::new(e)),
        })?;
        Self::with_connection(conn)
    }

    /// Create an in-memory review store (useful for testing).
    pub fn in_memory() -> LingoResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    /// Open the store described by a [`StoreConfig`].
    pub fn from_config(config: &StoreConfig) -> LingoResult<Self> {
        if config.in_memory {
            return Self::in_memory();
        }
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::new(&config.db_path)
    }

    fn with_connection(conn: Connection) -> LingoResult<Self> {
        // Other processes may hold the write lock briefly
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> LingoResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| LingoError::database(e.to_string()))
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> LingoResult<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            "
            -- One row per flashcard; timestamps are Unix milliseconds
            CREATE TABLE IF NOT EXISTS flashcards (
                card_id TEXT PRIMARY KEY,
                interval_days REAL NOT NULL DEFAULT 1.0,
                ease_factor REAL NOT NULL DEFAULT 2.5,
                repetitions INTEGER NOT NULL DEFAULT 0,
                next_review_at INTEGER NOT NULL,
                last_reviewed_at INTEGER,
                mastery_level INTEGER NOT NULL DEFAULT 0,
                version INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_flashcards_next_review_at ON flashcards(next_review_at);

            -- Append-only review log, insertion order is chronological
            CREATE TABLE IF NOT EXISTS review_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                card_id TEXT NOT NULL,
                reviewed_at INTEGER NOT NULL,
                outcome TEXT NOT NULL CHECK (outcome IN ('again', 'hard', 'good', 'easy')),
                time_spent_seconds REAL NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_review_history_card_id ON review_history(card_id, id);
            ",
        )?;

        Ok(())
    }

    // ==================== Card Operations ====================

    /// Create a new card with the scheduler's default state.
    ///
    /// Returns the generated card ID.
    pub fn create_card(
        &self,
        scheduler: &SpacedRepetitionScheduler,
        now: DateTime<Utc>,
    ) -> LingoResult<String> {
        let now = to_stored_precision(now);
        let card_id = Uuid::new_v4().to_string();
        self.insert_card(&card_id, &scheduler.initial_state(now), now)?;
        Ok(card_id)
    }

    /// Insert a card with an explicit state (e.g. when importing).
    ///
    /// Fails if a card with this ID already exists.
    pub fn insert_card(
        &self,
        card_id: &str,
        state: &FlashcardSchedulingState,
        now: DateTime<Utc>,
    ) -> LingoResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO flashcards
             (card_id, interval_days, ease_factor, repetitions, next_review_at,
              last_reviewed_at, mastery_level, version, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?8)",
            params![
                card_id,
                state.interval_days,
                state.ease_factor,
                state.repetitions,
                state.next_review_at.timestamp_millis(),
                state.last_reviewed_at.map(|dt| dt.timestamp_millis()),
                state.mastery_level,
                now.timestamp_millis(),
            ],
        )?;
        append_history(&tx, card_id, &state.review_history)?;

        tx.commit()?;
        debug!(card_id, "Inserted flashcard");
        Ok(())
    }

    /// Get the scheduling state of a card.
    ///
    /// Returns None if the card doesn't exist.
    pub fn get_state(&self, card_id: &str) -> LingoResult<Option<FlashcardSchedulingState>> {
        Ok(self.get_versioned(card_id)?.map(|(state, _)| state))
    }

    /// Get the scheduling state of a card together with its version.
    ///
    /// Pass the version back to [`save_versioned`](Self::save_versioned).
    pub fn get_versioned(
        &self,
        card_id: &str,
    ) -> LingoResult<Option<(FlashcardSchedulingState, u64)>> {
        let conn = self.lock()?;
        load_card(&conn, card_id)
    }

    /// Persist a state computed from the version read earlier.
    ///
    /// Writes every scheduling field and the new history entries in one
    /// transaction. Returns the new version, or [`LingoError::Conflict`] if the
    /// card was written since `expected_version` was read.
    pub fn save_versioned(
        &self,
        card_id: &str,
        state: &FlashcardSchedulingState,
        expected_version: u64,
        now: DateTime<Utc>,
    ) -> LingoResult<u64> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let version = write_card(&tx, card_id, state, expected_version, now)?;
        tx.commit()?;
        Ok(version)
    }

    /// Delete a card and its review history.
    pub fn delete_card(&self, card_id: &str) -> LingoResult<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM review_history WHERE card_id = ?1",
            params![card_id],
        )?;
        let deleted = tx.execute("DELETE FROM flashcards WHERE card_id = ?1", params![card_id])?;

        tx.commit()?;
        Ok(deleted > 0)
    }

    /// Number of stored cards.
    pub fn count(&self) -> LingoResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM flashcards", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ==================== Review Operations ====================

    /// Submit a review given as a label.
    ///
    /// An unknown label fails with [`LingoError::InvalidOutcome`] and nothing
    /// is written.
    pub fn submit_review(
        &self,
        card_id: &str,
        scheduler: &SpacedRepetitionScheduler,
        label: &str,
        time_spent_seconds: f64,
        now: DateTime<Utc>,
    ) -> LingoResult<FlashcardSchedulingState> {
        let outcome = Outcome::parse(label).map_err(|e| {
            warn!(card_id, label, "Rejected review with invalid outcome");
            e
        })?;
        self.submit_outcome(card_id, scheduler, outcome, time_spent_seconds, now)
    }

    /// Load, schedule and persist one review as a single atomic step.
    pub fn submit_outcome(
        &self,
        card_id: &str,
        scheduler: &SpacedRepetitionScheduler,
        outcome: Outcome,
        time_spent_seconds: f64,
        now: DateTime<Utc>,
    ) -> LingoResult<FlashcardSchedulingState> {
        let now = to_stored_precision(now);
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (prior, version) =
            load_card(&tx, card_id)?.ok_or_else(|| LingoError::not_found(card_id))?;
        let old_interval = prior.interval_days;
        let old_ease = prior.ease_factor;

        let next = scheduler.apply(prior, outcome, time_spent_seconds, now);
        write_card(&tx, card_id, &next, version, now)?;
        tx.commit()?;

        info!(
            card_id,
            outcome = %outcome,
            "Review saved: ease {:.2} -> {:.2}, interval {:.1}d -> {:.1}d, mastery {}",
            old_ease,
            next.ease_factor,
            old_interval,
            next.interval_days,
            next.mastery_level
        );
        Ok(next)
    }

    /// Reset a card to the scheduler's defaults, discarding its history.
    pub fn reset_card(
        &self,
        card_id: &str,
        scheduler: &SpacedRepetitionScheduler,
        now: DateTime<Utc>,
    ) -> LingoResult<FlashcardSchedulingState> {
        let now = to_stored_precision(now);
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (prior, version) =
            load_card(&tx, card_id)?.ok_or_else(|| LingoError::not_found(card_id))?;
        let next = scheduler.reset(prior, now);
        write_card(&tx, card_id, &next, version, now)?;
        tx.commit()?;

        info!(card_id, "Flashcard reset");
        Ok(next)
    }

    /// Cards whose `next_review_at` is at or before `now`, most overdue first.
    pub fn due_cards(&self, now: DateTime<Utc>, limit: Option<usize>) -> LingoResult<Vec<DueCard>> {
        let conn = self.lock()?;

        // SQLite treats a negative LIMIT as no limit
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let mut stmt = conn.prepare(
            "SELECT card_id FROM flashcards
             WHERE next_review_at <= ?1
             ORDER BY next_review_at ASC, card_id ASC
             LIMIT ?2",
        )?;
        let ids = stmt
            .query_map(params![now.timestamp_millis(), limit], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut due = Vec::with_capacity(ids.len());
        for card_id in ids {
            if let Some((state, _)) = load_card(&conn, &card_id)? {
                due.push(DueCard { card_id, state });
            }
        }
        Ok(due)
    }

    /// Review statistics across all cards.
    pub fn stats(&self, now: DateTime<Utc>) -> LingoResult<ReviewStats> {
        let conn = self.lock()?;

        let stats = conn.query_row(
            "SELECT
                COUNT(*),
                COALESCE(SUM(NOT EXISTS (SELECT 1 FROM review_history h WHERE h.card_id = f.card_id)), 0),
                COALESCE(SUM(f.next_review_at <= ?1), 0),
                COALESCE(SUM(f.mastery_level >= ?2), 0),
                AVG(f.ease_factor)
             FROM flashcards f",
            params![now.timestamp_millis(), MASTERED_LEVEL],
            |row| {
                Ok(ReviewStats {
                    total_cards: row.get::<_, i64>(0)? as usize,
                    new_cards: row.get::<_, i64>(1)? as usize,
                    due_cards: row.get::<_, i64>(2)? as usize,
                    mastered_cards: row.get::<_, i64>(3)? as usize,
                    average_ease: row.get(4)?,
                })
            },
        )?;

        Ok(stats)
    }
}

/// Drop sub-millisecond precision so computed states match what is stored.
fn to_stored_precision(now: DateTime<Utc>) -> DateTime<Utc> {
    now.with_nanosecond(now.nanosecond() / 1_000_000 * 1_000_000)
        .unwrap_or(now)
}

fn from_millis(millis: i64) -> LingoResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or_else(|| LingoError::corrupted(format!("timestamp out of range: {}", millis)))
}

/// Load a card's state and version.
fn load_card(
    conn: &Connection,
    card_id: &str,
) -> LingoResult<Option<(FlashcardSchedulingState, u64)>> {
    let row = conn
        .query_row(
            "SELECT interval_days, ease_factor, repetitions, next_review_at,
                    last_reviewed_at, mastery_level, version
             FROM flashcards WHERE card_id = ?1",
            params![card_id],
            |row| {
                Ok(CardRow {
                    interval_days: row.get(0)?,
                    ease_factor: row.get(1)?,
                    repetitions: row.get(2)?,
                    next_review_at: row.get(3)?,
                    last_reviewed_at: row.get(4)?,
                    mastery_level: row.get(5)?,
                    version: row.get(6)?,
                })
            },
        )
        .optional()?;

    let Some(row) = row else {
        return Ok(None);
    };

    let state = FlashcardSchedulingState {
        interval_days: row.interval_days,
        ease_factor: row.ease_factor,
        repetitions: row.repetitions,
        next_review_at: from_millis(row.next_review_at)?,
        last_reviewed_at: row.last_reviewed_at.map(from_millis).transpose()?,
        mastery_level: row.mastery_level,
        review_history: load_history(conn, card_id)?,
    };

    Ok(Some((state, row.version as u64)))
}

fn load_history(conn: &Connection, card_id: &str) -> LingoResult<Vec<ReviewEntry>> {
    let mut stmt = conn.prepare(
        "SELECT reviewed_at, outcome, time_spent_seconds
         FROM review_history WHERE card_id = ?1
         ORDER BY id ASC",
    )?;

    let rows = stmt
        .query_map(params![card_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(reviewed_at, outcome, time_spent_seconds)| {
            let outcome = Outcome::parse(&outcome).map_err(|_| {
                LingoError::corrupted(format!("unknown outcome '{}' in history", outcome))
            })?;
            Ok(ReviewEntry::new(
                from_millis(reviewed_at)?,
                outcome,
                time_spent_seconds,
            ))
        })
        .collect()
}

fn append_history(conn: &Connection, card_id: &str, entries: &[ReviewEntry]) -> LingoResult<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO review_history (card_id, reviewed_at, outcome, time_spent_seconds)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for entry in entries {
        stmt.execute(params![
            card_id,
            entry.timestamp.timestamp_millis(),
            entry.outcome.as_str(),
            entry.time_spent_seconds,
        ])?;
    }
    Ok(())
}

/// Write a card's fields and reconcile its history, guarded by version.
///
/// History is append-only: when the stored entries are a prefix of the new
/// history, only the tail is appended. Anything else (a reset, possibly
/// followed by new reviews) replaces the stored history.
fn write_card(
    conn: &Connection,
    card_id: &str,
    state: &FlashcardSchedulingState,
    expected_version: u64,
    now: DateTime<Utc>,
) -> LingoResult<u64> {
    let updated = conn.execute(
        "UPDATE flashcards SET
            interval_days = ?1,
            ease_factor = ?2,
            repetitions = ?3,
            next_review_at = ?4,
            last_reviewed_at = ?5,
            mastery_level = ?6,
            version = version + 1,
            updated_at = ?7
         WHERE card_id = ?8 AND version = ?9",
        params![
            state.interval_days,
            state.ease_factor,
            state.repetitions,
            state.next_review_at.timestamp_millis(),
            state.last_reviewed_at.map(|dt| dt.timestamp_millis()),
            state.mastery_level,
            now.timestamp_millis(),
            card_id,
            expected_version as i64,
        ],
    )?;

    if updated == 0 {
        let actual: Option<i64> = conn
            .query_row(
                "SELECT version FROM flashcards WHERE card_id = ?1",
                params![card_id],
                |row| row.get(0),
            )
            .optional()?;

        return Err(match actual {
            Some(actual) => {
                warn!(
                    card_id,
                    expected_version,
                    actual_version = actual,
                    "Stale flashcard write rejected"
                );
                LingoError::conflict(card_id, expected_version, actual as u64)
            }
            None => LingoError::not_found(card_id),
        });
    }

    let stored = load_history(conn, card_id)?;
    let extends_stored = stored.len() <= state.review_history.len()
        && stored
            .iter()
            .zip(&state.review_history)
            .all(|(old, new)| same_entry(old, new));

    if extends_stored {
        append_history(conn, card_id, &state.review_history[stored.len()..])?;
    } else {
        debug!(card_id, "Replacing review history");
        conn.execute(
            "DELETE FROM review_history WHERE card_id = ?1",
            params![card_id],
        )?;
        append_history(conn, card_id, &state.review_history)?;
    }

    Ok(expected_version + 1)
}

/// Entry equality at stored precision.
fn same_entry(stored: &ReviewEntry, entry: &ReviewEntry) -> bool {
    stored.timestamp.timestamp_millis() == entry.timestamp.timestamp_millis()
        && stored.outcome == entry.outcome
        && stored.time_spent_seconds == entry.time_spent_seconds
}
