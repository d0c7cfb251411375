//! End-to-end suite runs and report rendering

use kvbench::{BackendKind, BenchmarkSuite, Config, ReportFormat};
use kvbench_tests::init_test_environment;
use tempfile::TempDir;

fn config(root: &std::path::Path, kinds: &[BackendKind]) -> Config {
    let mut config = Config::default();
    config.workload.item_count = 200;
    config.workload.seed = Some(41);
    config.backends.enabled = kinds.to_vec();
    config.storage.data_dir = Some(root.to_path_buf());
    config.storage.lmdb_map_size = 16 * 1024 * 1024;
    config
}

#[tokio::test]
async fn test_full_suite_reports_every_backend() {
    init_test_environment();
    let dir = TempDir::new().unwrap();
    let config = config(dir.path(), &BackendKind::ALL);
    config.validate().unwrap();

    let board = BenchmarkSuite::new(config).run().await.unwrap();
    assert!(!board.has_failures(), "{:?}", board.failures());

    let text = board.render(ReportFormat::Text).unwrap();
    for kind in BackendKind::ALL {
        assert!(text.contains(&format!("== {}", kind.title())), "missing {}", kind);
    }
    assert!(text.contains("Benchmark write many: wrote 200 items in "));
    assert!(text.contains("Benchmark read many: read 200 items in "));
}

#[tokio::test]
async fn test_failed_backend_does_not_stop_the_others() {
    init_test_environment();
    let dir = TempDir::new().unwrap();
    // A plain file where the cache expects its instance directory
    std::fs::write(dir.path().join("lmdb-cache"), b"not a directory").unwrap();

    let config = config(
        dir.path(),
        &[BackendKind::SledString, BackendKind::LmdbCache, BackendKind::Memory],
    );
    let board = BenchmarkSuite::new(config).run().await.unwrap();

    assert_eq!(board.records().len(), 2);
    assert_eq!(board.failures().len(), 1);
    assert_eq!(board.failures()[0].backend, BackendKind::LmdbCache);
    assert_eq!(board.failures()[0].category, "backend");

    let text = board.render(ReportFormat::Text).unwrap();
    assert!(text.contains("== Sled String"));
    assert!(text.contains("== Memory"));
    assert!(!text.contains("LMDB Cache"));
}

#[tokio::test]
async fn test_parallel_suite_json_and_csv() {
    init_test_environment();
    let dir = TempDir::new().unwrap();
    let mut config = config(
        dir.path(),
        &[BackendKind::SledBuffer, BackendKind::SqliteAsync, BackendKind::Memory],
    );
    config.execution.parallel = true;

    let board = BenchmarkSuite::new(config).run().await.unwrap();
    assert!(!board.has_failures(), "{:?}", board.failures());

    let json: serde_json::Value =
        serde_json::from_str(&board.render(ReportFormat::Json).unwrap()).unwrap();
    let records = json.as_array().unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["backend"], "sled-buffer");
    assert_eq!(records[1]["title"], "SQLite AsyncStorage");
    assert_eq!(records[2]["read_phase"]["item_count"], 200);

    let csv = board.render(ReportFormat::Csv).unwrap();
    assert_eq!(csv.lines().count(), 1 + 3 * 2);
    assert!(csv.lines().any(|line| line.starts_with("memory,Memory,read,200,")));
}
