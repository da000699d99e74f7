//! Stress tests for participant context
//!
//! Many engines may log from many threads at once; each thread must only
//! ever see its own participant.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Instant;

use coedit_core::ParticipantId;
use coedit_logging::ParticipantContextGuard;

/// Concurrent guard creation and teardown across threads
#[test]
fn test_concurrent_participant_contexts() {
    const NUM_THREADS: usize = 32;
    const ITERATIONS: usize = 200;

    let barrier = Arc::new(Barrier::new(NUM_THREADS));
    let start = Instant::now();

    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|thread_id| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let participant = ParticipantId::new(format!("p{thread_id}")).unwrap();
                barrier.wait();

                for _ in 0..ITERATIONS {
                    let _guard = ParticipantContextGuard::new(&participant);
                    assert_eq!(
                        ParticipantContextGuard::current_participant(),
                        Some(participant.short_id().to_string())
                    );
                }

                assert!(ParticipantContextGuard::current().is_none());
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    println!(
        "Completed {} guard scopes across {} threads in {:?}",
        NUM_THREADS * ITERATIONS,
        NUM_THREADS,
        start.elapsed()
    );
}

/// Deep nesting restores every level on the way out
#[test]
fn test_deeply_nested_guards() {
    const DEPTH: usize = 100;

    let participants: Vec<ParticipantId> = (0..DEPTH)
        .map(|i| ParticipantId::new(format!("n{i}")).unwrap())
        .collect();

    let mut guards = Vec::with_capacity(DEPTH);
    for participant in &participants {
        guards.push(ParticipantContextGuard::new(participant));
        assert_eq!(
            ParticipantContextGuard::current_participant().as_deref(),
            Some(participant.short_id())
        );
    }

    for level in (0..DEPTH).rev() {
        assert_eq!(
            ParticipantContextGuard::current_participant().as_deref(),
            Some(participants[level].short_id())
        );
        guards.pop();
    }
    assert!(ParticipantContextGuard::current().is_none());
}
