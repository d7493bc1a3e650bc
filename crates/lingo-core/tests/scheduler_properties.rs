//! Property-based tests for the review scheduler.
//!
//! Checks the scheduling invariants over arbitrary valid prior states and
//! arbitrary review sequences.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use lingo_core::{FlashcardSchedulingState, Outcome, SpacedRepetitionScheduler};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
}

fn outcome() -> impl Strategy<Value = Outcome> {
    prop_oneof![
        Just(Outcome::Again),
        Just(Outcome::Hard),
        Just(Outcome::Good),
        Just(Outcome::Easy),
    ]
}

/// Prior states satisfying the scheduler's invariants.
fn valid_state() -> impl Strategy<Value = FlashcardSchedulingState> {
    (1.0f64..3650.0, 1.3f64..4.0, 0u32..200).prop_map(|(interval, ease, repetitions)| {
        FlashcardSchedulingState {
            interval_days: interval,
            ease_factor: ease,
            repetitions,
            ..FlashcardSchedulingState::new(t0())
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn again_always_resets_interval_and_streak(prior in valid_state()) {
        let scheduler = SpacedRepetitionScheduler::new();
        let next = scheduler.apply(prior, Outcome::Again, 1.0, t0());

        prop_assert_eq!(next.interval_days, 1.0);
        prop_assert_eq!(next.repetitions, 0);
    }

    #[test]
    fn ease_never_below_floor(prior in valid_state(), o in outcome()) {
        let scheduler = SpacedRepetitionScheduler::new();
        let next = scheduler.apply(prior, o, 1.0, t0());

        prop_assert!(next.ease_factor >= 1.3);
    }

    #[test]
    fn successful_reviews_extend_streak(prior in valid_state(), o in outcome()) {
        prop_assume!(o != Outcome::Again);
        let scheduler = SpacedRepetitionScheduler::new();
        let before = prior.repetitions;
        let next = scheduler.apply(prior, o, 1.0, t0());

        prop_assert_eq!(next.repetitions, before + 1);
    }

    #[test]
    fn easier_outcomes_never_shorten_interval(prior in valid_state()) {
        let scheduler = SpacedRepetitionScheduler::new();
        let hard = scheduler.apply(prior.clone(), Outcome::Hard, 1.0, t0());
        let good = scheduler.apply(prior.clone(), Outcome::Good, 1.0, t0());
        let easy = scheduler.apply(prior, Outcome::Easy, 1.0, t0());

        prop_assert!(easy.interval_days >= good.interval_days);
        prop_assert!(good.interval_days >= hard.interval_days);
    }

    #[test]
    fn next_review_is_in_the_future(prior in valid_state(), o in outcome()) {
        let scheduler = SpacedRepetitionScheduler::new();
        let next = scheduler.apply(prior, o, 1.0, t0());

        prop_assert!(next.interval_days >= 1.0);
        prop_assert!(next.next_review_at >= t0() + Duration::days(1));
    }

    #[test]
    fn reset_is_idempotent(prior in valid_state(), outcomes in prop::collection::vec(outcome(), 0..10)) {
        let scheduler = SpacedRepetitionScheduler::new();
        let mut state = prior;
        for o in outcomes {
            state = scheduler.apply(state, o, 3.0, t0());
        }

        let once = scheduler.reset(state, t0());
        let twice = scheduler.reset(once.clone(), t0());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn invariants_hold_over_review_sequences(
        outcomes in prop::collection::vec(outcome(), 1..10),
        seconds in prop::collection::vec(-60.0f64..600.0, 10),
    ) {
        let scheduler = SpacedRepetitionScheduler::new();
        let mut state = scheduler.initial_state(t0());
        let mut now = t0();

        for (i, o) in outcomes.iter().enumerate() {
            let prior_len = state.review_history.len();
            state = scheduler.apply(state, *o, seconds[i], now);

            prop_assert!(state.mastery_level <= 5);
            prop_assert!(state.ease_factor >= 1.3);
            prop_assert!(state.interval_days >= 1.0);
            prop_assert!(state.next_review_at > now);
            prop_assert_eq!(state.review_history.len(), prior_len + 1);
            prop_assert_eq!(state.review_history.last().map(|e| e.outcome), Some(*o));
            prop_assert_eq!(state.review_history.last().map(|e| e.time_spent_seconds), Some(seconds[i]));

            now = state.next_review_at;
        }
    }
}

#[test]
fn invalid_label_leaves_state_unchanged() {
    let scheduler = SpacedRepetitionScheduler::new();
    let prior = FlashcardSchedulingState {
        interval_days: 10.0,
        ease_factor: 2.0,
        repetitions: 5,
        ..FlashcardSchedulingState::new(t0())
    };
    let snapshot = prior.clone();

    for label in ["wrong", "GOOD", "medium", ""] {
        assert!(scheduler.apply_label(&prior, label, 1.0, t0()).is_err());
    }
    assert_eq!(prior, snapshot);
}
