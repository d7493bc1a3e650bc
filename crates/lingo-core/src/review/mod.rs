//! Flashcard review scheduling.
//!
//! Pure SM-2 style scheduling plus a SQLite-backed store that persists each
//! review atomically and answers the due-card query.

mod mastery;
mod scheduler;
mod store;

pub use mastery::mastery_level;
pub use scheduler::{IntervalPreview, SpacedRepetitionScheduler};
pub use store::{DueCard, ReviewStats, ReviewStore};
