//! Rolling mastery score.

use crate::types::ReviewEntry;

/// Compute the mastery level from the most recent reviews.
///
/// Looks at the last `min(window, history.len())` entries and scales the
/// share of `good`/`easy` outcomes to `0..=max_level`, rounding down.
/// Recomputed from history on every review, so mastery drops again when
/// recent reviews get weaker.
pub fn mastery_level(history: &[ReviewEntry], window: usize, max_level: u8) -> u8 {
    let window_size = window.min(history.len());
    if window_size == 0 {
        return 0;
    }

    let recent = &history[history.len() - window_size..];
    let good_count = recent.iter().filter(|e| e.outcome.is_confident()).count();

    let level = good_count * max_level as usize / window_size;
    level.min(max_level as usize) as u8
}
