//! Review outcome and history entry types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::{LingoError, LingoResult};

/// Recall quality a learner assigns after reviewing a flashcard.
///
/// Ordered by increasing recall quality, so `Outcome::Again < Outcome::Easy`:
/// - Again (1): Failed recall, the card lapses
/// - Hard (2): Recalled with serious difficulty
/// - Good (3): Recalled after some hesitation
/// - Easy (4): Effortless recall
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum Outcome {
    /// Failed recall.
    Again = 1,
    /// Successful but difficult recall.
    Hard = 2,
    /// Normal successful recall.
    Good = 3,
    /// Effortless recall.
    Easy = 4,
}

impl Outcome {
    /// Parse an outcome label.
    ///
    /// Labels are the lowercase names only. Anything else is rejected with
    /// [`LingoError::InvalidOutcome`]; there is no fallback outcome.
    pub fn parse(label: &str) -> LingoResult<Self> {
        label
            .parse::<Outcome>()
            .map_err(|_| LingoError::invalid_outcome(label))
    }

    /// Label as stored and accepted on input.
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Convert to the 1-4 rating value.
    pub fn to_rating(self) -> u8 {
        self as u8
    }

    /// Create from a 1-4 rating value.
    ///
    /// Returns None for invalid rating values.
    pub fn from_rating(rating: u8) -> Option<Self> {
        match rating {
            1 => Some(Outcome::Again),
            2 => Some(Outcome::Hard),
            3 => Some(Outcome::Good),
            4 => Some(Outcome::Easy),
            _ => None,
        }
    }

    /// Whether this outcome counts toward mastery (`good` or `easy`).
    pub fn is_confident(self) -> bool {
        matches!(self, Outcome::Good | Outcome::Easy)
    }

    /// Whether this outcome resets the repetition streak.
    pub fn is_lapse(self) -> bool {
        self == Outcome::Again
    }
}

impl From<Outcome> for u8 {
    fn from(outcome: Outcome) -> Self {
        outcome.to_rating()
    }
}

/// One entry of a flashcard's append-only review history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEntry {
    /// When the review happened.
    pub timestamp: DateTime<Utc>,
    /// Outcome the learner chose.
    pub outcome: Outcome,
    /// Time spent on the card, recorded as given (not used for scheduling).
    pub time_spent_seconds: f64,
}

impl ReviewEntry {
    pub fn new(timestamp: DateTime<Utc>, outcome: Outcome, time_spent_seconds: f64) -> Self {
        Self {
            timestamp,
            outcome,
            time_spent_seconds,
        }
    }
}
