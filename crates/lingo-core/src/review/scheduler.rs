//! SM-2 style review scheduler.
//!
//! Computes the next scheduling state of a flashcard from its previous state
//! and the outcome of a review. The scheduler is a pure transformation: it
//! owns no state besides its constants, does no I/O, and never mutates a state
//! it did not receive by value. Persisting the result is the caller's job
//! (see [`ReviewStore`](super::ReviewStore)).
//!
//! | outcome | interval                 | repetitions | ease                 |
//! |---------|--------------------------|-------------|----------------------|
//! | again   | `1`                      | `0`         | `max(1.3, ease-0.2)` |
//! | hard    | `max(1, interval * 0.8)` | `+1`        | `max(1.3, ease-0.15)`|
//! | good    | `interval * ease`        | `+1`        | `ease + 0.1`         |
//! | easy    | `interval * ease * 1.3`  | `+1`        | `ease + 0.15`        |

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::mastery::mastery_level;
use crate::config::SchedulerConfig;
use crate::error::LingoResult;
use crate::types::{FlashcardSchedulingState, Outcome, ReviewEntry};

const MILLIS_PER_DAY: f64 = 86_400_000.0;
/// Upper bound for a single interval when converted to a duration.
const MAX_INTERVAL_MILLIS: f64 = 1e17;

/// Interval each outcome would produce, in days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalPreview {
    pub again: f64,
    pub hard: f64,
    pub good: f64,
    pub easy: f64,
}

impl IntervalPreview {
    /// Interval for a given outcome.
    pub fn get(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Again => self.again,
            Outcome::Hard => self.hard,
            Outcome::Good => self.good,
            Outcome::Easy => self.easy,
        }
    }
}

/// Spaced repetition scheduler.
#[derive(Debug, Clone, Default)]
pub struct SpacedRepetitionScheduler {
    config: SchedulerConfig,
}

impl SpacedRepetitionScheduler {
    /// Create a scheduler with the production constants.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scheduler with custom constants.
    pub fn with_config(config: SchedulerConfig) -> LingoResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Default state for a card created at `now`.
    pub fn initial_state(&self, now: DateTime<Utc>) -> FlashcardSchedulingState {
        FlashcardSchedulingState {
            interval_days: self.config.initial_interval_days,
            ease_factor: self.config.initial_ease,
            repetitions: 0,
            next_review_at: now,
            last_reviewed_at: None,
            mastery_level: 0,
            review_history: Vec::new(),
        }
    }

    /// Apply a review outcome to a card.
    ///
    /// The prior state is not validated; a state produced by this scheduler
    /// always satisfies the invariants it relies on.
    pub fn apply(
        &self,
        mut state: FlashcardSchedulingState,
        outcome: Outcome,
        time_spent_seconds: f64,
        now: DateTime<Utc>,
    ) -> FlashcardSchedulingState {
        let (interval, repetitions, ease) = self.step(&state, outcome);

        debug!(
            outcome = %outcome,
            old_interval = state.interval_days,
            new_interval = interval,
            old_ease = state.ease_factor,
            new_ease = ease,
            repetitions,
            "Scheduling review"
        );

        state.interval_days = interval;
        state.repetitions = repetitions;
        state.ease_factor = ease;
        state
            .review_history
            .push(ReviewEntry::new(now, outcome, time_spent_seconds));
        state.next_review_at = add_days(now, interval);
        state.last_reviewed_at = Some(now);
        state.mastery_level = mastery_level(
            &state.review_history,
            self.config.mastery_window,
            self.config.max_mastery,
        );

        state
    }

    /// Apply a review outcome at the current instant.
    pub fn apply_now(
        &self,
        state: FlashcardSchedulingState,
        outcome: Outcome,
        time_spent_seconds: f64,
    ) -> FlashcardSchedulingState {
        self.apply(state, outcome, time_spent_seconds, Utc::now())
    }

    /// Parse an outcome label and apply it.
    ///
    /// Fails with [`LingoError::InvalidOutcome`](crate::LingoError::InvalidOutcome)
    /// before touching anything, leaving `state` as it was.
    pub fn apply_label(
        &self,
        state: &FlashcardSchedulingState,
        label: &str,
        time_spent_seconds: f64,
        now: DateTime<Utc>,
    ) -> LingoResult<FlashcardSchedulingState> {
        let outcome = Outcome::parse(label)?;
        Ok(self.apply(state.clone(), outcome, time_spent_seconds, now))
    }

    /// Start the card over: default interval, ease and streak, empty history,
    /// due at `now`.
    pub fn reset(
        &self,
        state: FlashcardSchedulingState,
        now: DateTime<Utc>,
    ) -> FlashcardSchedulingState {
        debug!(
            discarded_reviews = state.review_history.len(),
            "Resetting flashcard schedule"
        );
        self.initial_state(now)
    }

    /// Intervals each outcome would produce from `state`, without applying any.
    pub fn preview(&self, state: &FlashcardSchedulingState) -> IntervalPreview {
        IntervalPreview {
            again: self.step(state, Outcome::Again).0,
            hard: self.step(state, Outcome::Hard).0,
            good: self.step(state, Outcome::Good).0,
            easy: self.step(state, Outcome::Easy).0,
        }
    }

    /// New (interval, repetitions, ease) for an outcome, from the prior state.
    fn step(&self, state: &FlashcardSchedulingState, outcome: Outcome) -> (f64, u32, f64) {
        let c = &self.config;
        let interval = state.interval_days;
        let ease = state.ease_factor;
        let streak = state.repetitions.saturating_add(1);

        let (new_interval, repetitions, new_ease) = match outcome {
            Outcome::Again => (
                c.initial_interval_days,
                0,
                (ease - c.again_ease_penalty).max(c.ease_floor),
            ),
            Outcome::Hard => (
                interval * c.hard_interval_multiplier,
                streak,
                (ease - c.hard_ease_penalty).max(c.ease_floor),
            ),
            Outcome::Good => (interval * ease, streak, ease + c.good_ease_bonus),
            Outcome::Easy => (
                interval * ease * c.easy_interval_bonus,
                streak,
                ease + c.easy_ease_bonus,
            ),
        };

        // Floors also cover out-of-range prior states; for valid ones they are no-ops
        // except on the hard branch.
        (
            new_interval.max(c.min_interval_days),
            repetitions,
            new_ease.max(c.ease_floor),
        )
    }
}

/// `now` plus a fractional number of days, at millisecond resolution.
fn add_days(now: DateTime<Utc>, days: f64) -> DateTime<Utc> {
    let millis = (days * MILLIS_PER_DAY)
        .round()
        .clamp(0.0, MAX_INTERVAL_MILLIS) as i64;
    now.checked_add_signed(Duration::milliseconds(millis))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
