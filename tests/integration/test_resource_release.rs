//! Every handle and cursor a run opens is closed exactly once

use std::collections::HashSet;

use kvbench::{run_benchmark, BenchError};
use kvbench_tests::{init_test_environment, text_workload, FaultPoint, MockBackend, ReadBehavior};
use tempfile::TempDir;

const RUNS: usize = 25;

#[tokio::test]
async fn test_sequential_runs_release_everything() {
    init_test_environment();
    let dir = TempDir::new().unwrap();
    let backend = MockBackend::ephemeral();
    let workload = text_workload(100, 21);

    for _ in 0..RUNS {
        run_benchmark(&backend, &workload, dir.path()).await.unwrap();
    }

    let counters = backend.counters();
    assert_eq!(counters.handles_opened(), RUNS);
    assert_eq!(counters.cursors_opened(), RUNS);
    assert_eq!(counters.open_handles(), 0);
    assert_eq!(counters.open_cursors(), 0);
    counters.assert_balanced();
}

#[tokio::test]
async fn test_ephemeral_instances_never_collide() {
    init_test_environment();
    let dir = TempDir::new().unwrap();
    let backend = MockBackend::ephemeral();
    let workload = text_workload(10, 22);

    for _ in 0..RUNS {
        run_benchmark(&backend, &workload, dir.path()).await.unwrap();
    }

    let paths = backend.opened_paths();
    assert_eq!(paths.len(), RUNS);
    assert_eq!(paths.iter().collect::<HashSet<_>>().len(), RUNS);
    assert!(paths.iter().all(|p| p.starts_with(dir.path())));
}

#[tokio::test]
async fn test_in_place_runs_reuse_one_instance() {
    init_test_environment();
    let dir = TempDir::new().unwrap();
    let backend = MockBackend::in_place("mock-store");
    let workload = text_workload(10, 23);

    for _ in 0..3 {
        run_benchmark(&backend, &workload, dir.path()).await.unwrap();
    }

    let paths = backend.opened_paths();
    assert!(paths.iter().all(|p| p == &dir.path().join("mock-store")));
    assert_eq!(backend.counters().clears(), 3);
    backend.counters().assert_balanced();
}

#[tokio::test]
async fn test_failures_still_release_everything() {
    init_test_environment();
    let dir = TempDir::new().unwrap();
    let workload = text_workload(50, 24);

    let cases = [
        MockBackend::ephemeral().with_fault(FaultPoint::Write),
        MockBackend::ephemeral().with_fault(FaultPoint::CursorNext),
        MockBackend::ephemeral().with_fault(FaultPoint::Close),
        MockBackend::in_place("mock-store").with_fault(FaultPoint::Clear),
        MockBackend::ephemeral().with_read_behavior(ReadBehavior::DropLast),
        MockBackend::ephemeral().with_read_behavior(ReadBehavior::AlterValue(3)),
    ];

    for backend in cases {
        for _ in 0..RUNS {
            let result = run_benchmark(&backend, &workload, dir.path()).await;
            assert!(result.is_err());
        }
        let counters = backend.counters();
        assert_eq!(counters.handles_opened(), RUNS);
        counters.assert_balanced();
    }
}

#[tokio::test]
async fn test_failed_open_has_nothing_to_release() {
    init_test_environment();
    let dir = TempDir::new().unwrap();
    let backend = MockBackend::ephemeral().with_fault(FaultPoint::Open);

    let err = run_benchmark(&backend, &text_workload(5, 25), dir.path())
        .await
        .unwrap_err();
    assert!(matches!(err, BenchError::Backend(_)));
    assert_eq!(backend.counters().handles_opened(), 0);
    assert_eq!(backend.counters().handles_closed(), 0);
}
