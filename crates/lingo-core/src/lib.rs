//! lingo-core - Core library for lingo.
//!
//! This crate provides the flashcard scheduling types, the SM-2 style
//! spaced repetition scheduler, and a SQLite review store for the lingo
//! language-learning backend.
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use lingo_core::{Outcome, SpacedRepetitionScheduler};
//!
//! let scheduler = SpacedRepetitionScheduler::new();
//! let now = Utc::now();
//! let card = scheduler.initial_state(now);
//!
//! let card = scheduler.apply(card, Outcome::Good, 12.0, now);
//! assert_eq!(card.repetitions, 1);
//! assert!(card.next_review_at > now);
//! ```

pub mod config;
pub mod error;
pub mod review;
pub mod types;

// Re-export commonly used types
pub use config::{LingoConfig, SchedulerConfig, StoreConfig};
pub use error::{ErrorCode, LingoError, LingoResult};
pub use review::{
    mastery_level, DueCard, IntervalPreview, ReviewStats, ReviewStore, SpacedRepetitionScheduler,
};
pub use types::{FlashcardSchedulingState, Outcome, ReviewEntry};
