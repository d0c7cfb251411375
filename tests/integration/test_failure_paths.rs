//! Error propagation from the runner

use kvbench::{run_benchmark, BackendError, BenchError, ValidationError};
use kvbench_tests::{init_test_environment, text_workload, FaultPoint, MockBackend, ReadBehavior};
use tempfile::TempDir;

async fn run(backend: &MockBackend) -> Result<kvbench::BenchmarkResult, BenchError> {
    let dir = TempDir::new().unwrap();
    run_benchmark(backend, &text_workload(20, 31), dir.path()).await
}

#[tokio::test]
async fn test_altered_value_is_reported_on_its_key() {
    init_test_environment();
    let backend = MockBackend::ephemeral().with_read_behavior(ReadBehavior::AlterValue(4));

    match run(&backend).await {
        Err(BenchError::Validation(ValidationError::ValueMismatch { key, written, read })) => {
            assert_eq!(read, format!("{}!", written));
            assert_eq!(key.len(), 16);
        }
        other => panic!("expected a value mismatch, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_and_extra_entries_fail_validation() {
    init_test_environment();

    let dropped = MockBackend::ephemeral().with_read_behavior(ReadBehavior::DropLast);
    assert!(matches!(
        run(&dropped).await,
        Err(BenchError::Validation(ValidationError::LengthMismatch { written: 20, read: 19 }))
    ));

    let extra = MockBackend::ephemeral().with_read_behavior(ReadBehavior::InjectExtra);
    assert!(matches!(
        run(&extra).await,
        Err(BenchError::Validation(ValidationError::LengthMismatch { written: 20, read: 21 }))
    ));
}

#[tokio::test]
async fn test_tolerated_clear_failure_is_swallowed() {
    init_test_environment();
    let backend = MockBackend::in_place("async-storage").with_tolerated_clear_failure();

    let result = run(&backend).await.unwrap();
    assert_eq!(result.read_phase().item_count, 20);
    assert_eq!(backend.counters().clears(), 1);
}

#[tokio::test]
async fn test_other_clear_failures_propagate() {
    init_test_environment();
    let backend = MockBackend::in_place("mock-store").with_fault(FaultPoint::Clear);

    let err = run(&backend).await.unwrap_err();
    assert!(matches!(err, BenchError::Backend(BackendError::Io(_))));
    assert!(!err.is_tolerated());
}

#[tokio::test]
async fn test_stale_in_place_entries_are_cleared() {
    init_test_environment();
    let backend = MockBackend::in_place("mock-store");
    backend.preload(b"stale", b"entry");

    run(&backend).await.unwrap();
    assert_eq!(backend.stored_len(), 20);
}

#[tokio::test]
async fn test_stale_entries_fail_validation_when_clear_is_skipped() {
    init_test_environment();
    // A missing-directory clear leaves whatever was there behind
    let backend = MockBackend::in_place("mock-store").with_tolerated_clear_failure();
    backend.preload(b"stale", b"entry");

    let err = run(&backend).await.unwrap_err();
    assert_eq!(err.category(), "validation");
}

#[tokio::test]
async fn test_phase_error_takes_precedence_over_close_error() {
    init_test_environment();
    let backend = MockBackend::ephemeral()
        .with_fault(FaultPoint::Write)
        .with_fault(FaultPoint::Close);

    let err = run(&backend).await.unwrap_err();
    assert!(err.to_string().contains("Write"), "unexpected error: {}", err);
    backend.counters().assert_balanced();
}

#[tokio::test]
async fn test_close_error_after_clean_phases_propagates() {
    init_test_environment();
    let backend = MockBackend::ephemeral().with_fault(FaultPoint::Close);

    let err = run(&backend).await.unwrap_err();
    assert!(err.to_string().contains("Close"), "unexpected error: {}", err);
    assert_eq!(err.category(), "backend");
}
