//! Write then read back through every backend and check the sets match

use kvbench::backends::{LmdbCache, MemoryBackend, SledStore, SqliteStorage};
use kvbench::{compare_read_write, run_benchmark, KeyValuePair, Workload};
use kvbench_tests::{binary_workload, init_test_environment, text_workload, MockBackend, ReadBehavior};
use proptest::prelude::*;
use tempfile::TempDir;

const LMDB_MAP_SIZE: usize = 32 * 1024 * 1024;

#[tokio::test]
async fn test_sled_string_round_trip() {
    init_test_environment();
    let dir = TempDir::new().unwrap();
    let workload = text_workload(1_000, 11);

    let result = run_benchmark(&SledStore::new(), &workload, dir.path()).await.unwrap();
    assert_eq!(result.write_phase().item_count, 1_000);
    assert_eq!(result.read_phase().item_count, 1_000);
}

#[tokio::test]
async fn test_sled_buffer_round_trip() {
    init_test_environment();
    let dir = TempDir::new().unwrap();
    let workload = binary_workload(1_000, 12);

    let result = run_benchmark(&SledStore::new(), &workload, dir.path()).await.unwrap();
    assert_eq!(result.read_phase().item_count, 1_000);
}

#[tokio::test]
async fn test_lmdb_cache_round_trip_and_reuse() {
    init_test_environment();
    let dir = TempDir::new().unwrap();
    let cache = LmdbCache::new(LMDB_MAP_SIZE);

    // The second run reuses the same instance; the clear keeps the sets equal
    for seed in [13, 14] {
        let workload = text_workload(500, seed);
        let result = run_benchmark(&cache, &workload, dir.path()).await.unwrap();
        assert_eq!(result.read_phase().item_count, 500);
    }
}

#[tokio::test]
async fn test_sqlite_round_trip_on_fresh_root() {
    init_test_environment();
    let dir = TempDir::new().unwrap();
    let workload = text_workload(500, 15);

    // First run: the storage directory does not exist yet, so the clear
    // fails in the tolerated way
    let result = run_benchmark(&SqliteStorage::new(), &workload, dir.path()).await.unwrap();
    assert_eq!(result.read_phase().item_count, 500);

    let again = text_workload(200, 16);
    let result = run_benchmark(&SqliteStorage::new(), &again, dir.path()).await.unwrap();
    assert_eq!(result.read_phase().item_count, 200);
}

#[tokio::test]
async fn test_memory_round_trip() {
    init_test_environment();
    let dir = TempDir::new().unwrap();
    let backend = MemoryBackend::new();

    let result = run_benchmark(&backend, &text_workload(300, 17), dir.path()).await.unwrap();
    assert_eq!(result.read_phase().item_count, 300);
    assert_eq!(backend.len().unwrap(), 300);
}

#[tokio::test]
async fn test_three_pair_scenario() {
    init_test_environment();
    let dir = TempDir::new().unwrap();
    let workload = Workload::<String>::from_pairs([("a", "1"), ("b", "2"), ("c", "3")]);

    let result = run_benchmark(&SledStore::new(), &workload, dir.path()).await.unwrap();
    assert_eq!(result.read_phase().item_count, 3);

    let sorted: Vec<KeyValuePair<String>> =
        vec![("a", "1").into(), ("b", "2").into(), ("c", "3").into()];
    assert!(compare_read_write(workload.pairs(), &sorted).is_ok());
}

#[tokio::test]
async fn test_reordering_backends_still_validate() {
    init_test_environment();
    let dir = TempDir::new().unwrap();
    let workload = text_workload(200, 18);

    for behavior in [ReadBehavior::Reverse, ReadBehavior::Shuffle(5)] {
        let backend = MockBackend::ephemeral().with_read_behavior(behavior);
        let result = run_benchmark(&backend, &workload, dir.path()).await;
        assert!(result.is_ok(), "{:?}: {:?}", behavior, result.err());
    }
}

#[tokio::test]
async fn test_empty_workload_round_trip() {
    init_test_environment();
    let dir = TempDir::new().unwrap();
    let workload = text_workload(0, 19);

    let result = run_benchmark(&SledStore::new(), &workload, dir.path()).await.unwrap();
    assert_eq!(result.write_phase().item_count, 0);
    assert_eq!(result.write_phase().items_per_ms(), Some(0.0));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_binary_round_trip_through_sled(
        entries in prop::collection::btree_map(
            prop::collection::vec(any::<u8>(), 1..24),
            prop::collection::vec(any::<u8>(), 0..64),
            0..48,
        ),
    ) {
        let dir = TempDir::new().unwrap();
        let workload = Workload::<Vec<u8>>::from_pairs(entries);
        let result = tokio_test::block_on(run_benchmark(&SledStore::new(), &workload, dir.path()));
        prop_assert!(result.is_ok(), "{:?}", result.err());
        prop_assert_eq!(result.unwrap().read_phase().item_count, workload.len());
    }
}
