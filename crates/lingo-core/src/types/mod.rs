//! Core types for lingo.

mod flashcard;
mod review;

pub use flashcard::{FlashcardSchedulingState, DEFAULT_EASE_FACTOR, DEFAULT_INTERVAL_DAYS};
pub use review::{Outcome, ReviewEntry};
