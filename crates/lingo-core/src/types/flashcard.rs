//! Flashcard scheduling state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::review::ReviewEntry;

/// Interval of a freshly created (or reset) card, in days.
pub const DEFAULT_INTERVAL_DAYS: f64 = 1.0;
/// Ease factor of a freshly created (or reset) card.
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// Spaced repetition state of a single flashcard.
///
/// Invariants maintained by the scheduler:
/// - `interval_days >= 1` after any review
/// - `ease_factor >= 1.3`
/// - `mastery_level` in `[0, 5]`
/// - `review_history` is chronological and only grows, except on reset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardSchedulingState {
    /// Days until the next review.
    pub interval_days: f64,
    /// Multiplier applied to the interval on successful recall.
    pub ease_factor: f64,
    /// Consecutive non-lapse reviews since the last `again`.
    pub repetitions: u32,
    /// When the card becomes due.
    pub next_review_at: DateTime<Utc>,
    /// When the card was last reviewed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reviewed_at: Option<DateTime<Utc>>,
    /// Rolling 0-5 competence score over recent reviews.
    #[serde(default)]
    pub mastery_level: u8,
    /// Every review so far, oldest first.
    #[serde(default)]
    pub review_history: Vec<ReviewEntry>,
}

impl FlashcardSchedulingState {
    /// Create the default state for a card created at `now`.
    ///
    /// A new card is due immediately.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            interval_days: DEFAULT_INTERVAL_DAYS,
            ease_factor: DEFAULT_EASE_FACTOR,
            repetitions: 0,
            next_review_at: now,
            last_reviewed_at: None,
            mastery_level: 0,
            review_history: Vec::new(),
        }
    }

    /// Check if the card is due for review at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_at <= now
    }

    /// Whether the card has never been reviewed.
    pub fn is_new(&self) -> bool {
        self.review_history.is_empty()
    }

    /// Number of reviews recorded.
    pub fn review_count(&self) -> usize {
        self.review_history.len()
    }
}

impl Default for FlashcardSchedulingState {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}
