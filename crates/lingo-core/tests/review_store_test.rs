//! Integration tests for the on-disk review store.
//!
//! Covers persistence across reopen, concurrent submissions for one card, and
//! the optimistic-concurrency path used by external writers.

use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Duration, TimeZone, Utc};
use lingo_core::{
    LingoConfig, LingoError, Outcome, ReviewStore, SpacedRepetitionScheduler, StoreConfig,
};
use tempfile::TempDir;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 9, 14, 18, 0, 0).unwrap()
}

/// Test that reviews survive closing and reopening the database.
#[test]
fn test_state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cards.db");
    let scheduler = SpacedRepetitionScheduler::new();

    let card_id = {
        let store = ReviewStore::new(&path).unwrap();
        let card_id = store.create_card(&scheduler, t0()).unwrap();
        store
            .submit_review(&card_id, &scheduler, "good", 14.0, t0())
            .unwrap();
        store
            .submit_review(&card_id, &scheduler, "easy", 6.0, t0() + Duration::days(3))
            .unwrap();
        card_id
    };

    let store = ReviewStore::new(&path).unwrap();
    let (state, version) = store.get_versioned(&card_id).unwrap().unwrap();

    assert_eq!(version, 2);
    assert_eq!(state.repetitions, 2);
    assert_eq!(state.review_history.len(), 2);
    assert_eq!(state.review_history[1].outcome, Outcome::Easy);
    assert_eq!(state.last_reviewed_at, Some(t0() + Duration::days(3)));
}

/// Test that the store can be opened from configuration, creating directories.
#[test]
fn test_from_config_creates_parent_dir() {
    let dir = TempDir::new().unwrap();
    let config = LingoConfig::builder()
        .db_path(dir.path().join("nested").join("lingo.db"))
        .build()
        .unwrap();

    let store = ReviewStore::from_config(&config.store).unwrap();
    assert_eq!(store.count().unwrap(), 0);
    assert!(dir.path().join("nested").join("lingo.db").exists());

    let memory = ReviewStore::from_config(&StoreConfig {
        in_memory: true,
        ..Default::default()
    })
    .unwrap();
    assert_eq!(memory.count().unwrap(), 0);
}

/// Test that concurrent submissions on the same card are all applied.
#[test]
fn test_concurrent_reviews_are_not_lost() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(ReviewStore::new(dir.path().join("cards.db")).unwrap());
    let scheduler = Arc::new(SpacedRepetitionScheduler::new());
    let card_id = store.create_card(&scheduler, t0()).unwrap();

    let threads = 8;
    let per_thread = 5;
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let store = Arc::clone(&store);
            let scheduler = Arc::clone(&scheduler);
            let card_id = card_id.clone();
            thread::spawn(move || {
                for i in 0..per_thread {
                    let label = if (t + i) % 2 == 0 { "good" } else { "hard" };
                    store
                        .submit_review(&card_id, &scheduler, label, 1.0, t0())
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let (state, version) = store.get_versioned(&card_id).unwrap().unwrap();
    assert_eq!(state.review_history.len(), threads * per_thread);
    assert_eq!(version as usize, threads * per_thread);
    // Nothing but good/hard was submitted, so the streak never broke
    assert_eq!(state.repetitions as usize, threads * per_thread);
}

/// Test read-compute-write with a stale version from a second handle.
#[test]
fn test_second_handle_sees_conflict() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cards.db");
    let scheduler = SpacedRepetitionScheduler::new();

    let first = ReviewStore::new(&path).unwrap();
    let second = ReviewStore::new(&path).unwrap();
    let card_id = first.create_card(&scheduler, t0()).unwrap();

    let (state, version) = second.get_versioned(&card_id).unwrap().unwrap();

    first
        .submit_review(&card_id, &scheduler, "again", 2.0, t0())
        .unwrap();

    let stale = scheduler.apply(state, Outcome::Easy, 2.0, t0());
    let err = second
        .save_versioned(&card_id, &stale, version, t0())
        .unwrap_err();
    assert!(err.is_retryable());
    assert!(matches!(err, LingoError::Conflict { .. }));

    // Retry from fresh state succeeds and keeps both reviews
    let (fresh, version) = second.get_versioned(&card_id).unwrap().unwrap();
    let next = scheduler.apply(fresh, Outcome::Easy, 2.0, t0());
    assert_eq!(
        second.save_versioned(&card_id, &next, version, t0()).unwrap(),
        version + 1
    );

    let stored = first.get_state(&card_id).unwrap().unwrap();
    let outcomes: Vec<Outcome> = stored.review_history.iter().map(|e| e.outcome).collect();
    assert_eq!(outcomes, vec![Outcome::Again, Outcome::Easy]);
}

/// Test a learner's session: due queue drains as cards are reviewed.
#[test]
fn test_review_session_drains_due_queue() {
    let store = ReviewStore::in_memory().unwrap();
    let scheduler = SpacedRepetitionScheduler::new();

    let ids: Vec<String> = (0..4)
        .map(|i| {
            store
                .create_card(&scheduler, t0() - Duration::minutes(i))
                .unwrap()
        })
        .collect();

    let due = store.due_cards(t0(), None).unwrap();
    assert_eq!(due.len(), 4);
    // Oldest creation time is most overdue
    assert_eq!(due[0].card_id, ids[3]);

    for card in due {
        store
            .submit_outcome(&card.card_id, &scheduler, Outcome::Good, 7.0, t0())
            .unwrap();
    }

    assert!(store.due_cards(t0(), None).unwrap().is_empty());
    let stats = store.stats(t0() + Duration::days(3)).unwrap();
    assert_eq!(stats.total_cards, 4);
    assert_eq!(stats.new_cards, 0);
    assert_eq!(stats.due_cards, 4);
}
