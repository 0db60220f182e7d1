//! Full pipeline runs: planning through storage, with failure isolation.

use std::sync::Arc;

use marketdl::coordinator::{DownloadCoordinator, DownloadRequest, ErrorKind};
use marketdl::storage::csv::CsvStorage;
use marketdl::{DataType, DateRange};

use crate::common::{request, FlakySource, MemoryStorage, SymbolFailSource};

#[tokio::test]
async fn one_failing_symbol_does_not_abort_its_siblings() {
    let source = Arc::new(SymbolFailSource::new("BOGUS"));
    let storage = Arc::new(MemoryStorage::new());
    let coordinator = DownloadCoordinator::new(source, storage.clone());

    let requests = vec![request(
        &["AAPL", "BOGUS", "MSFT"],
        DataType::Trades,
        None,
        "2024-01-02",
        "2024-01-03",
    )];
    let summary = coordinator.run(&requests, 3).await.unwrap();

    assert_eq!(summary.total, 6);
    assert_eq!(summary.completed, 4);
    assert_eq!(summary.failed, 2);
    assert!(!summary.is_success());
    assert!(summary.errors.iter().all(|e| e.artifact.starts_with("BOGUS:")));
    assert!(summary.errors.iter().all(|e| e.kind == ErrorKind::Permanent));

    // Both healthy symbols landed, both days each
    let keys = storage.saved_keys();
    assert_eq!(keys.len(), 4);
    assert!(keys.iter().all(|k| !k.starts_with("BOGUS:")));
}

#[tokio::test]
async fn mixed_request_plan_expands_and_completes() {
    let source = Arc::new(FlakySource::new(vec![]));
    let storage = Arc::new(MemoryStorage::new());
    let coordinator = DownloadCoordinator::new(source, storage.clone());

    let requests = vec![
        // 1 symbol × minute aggregates × 3 days = 3 artifacts
        request(&["AAPL"], DataType::Aggregates, Some("1minute"), "2024-01-01", "2024-01-03"),
        // 1 symbol × daily aggregates, unsplit = 1 artifact
        request(&["AAPL"], DataType::Aggregates, Some("1day"), "2024-01-01", "2024-01-31"),
    ];
    let summary = coordinator.run(&requests, 4).await.unwrap();

    assert_eq!(summary.total, 4);
    assert_eq!(summary.completed, 4);
    assert_eq!(summary.skipped, 0);
}

#[tokio::test]
async fn duplicate_requests_download_once() {
    let source = Arc::new(FlakySource::new(vec![]));
    let storage = Arc::new(MemoryStorage::new());
    let coordinator = DownloadCoordinator::new(source.clone(), storage.clone());

    let single = request(&["AAPL"], DataType::Quotes, None, "2024-01-02", "2024-01-02");
    let requests: Vec<DownloadRequest> = vec![single.clone(), single];
    let summary = coordinator.run(&requests, 2).await.unwrap();

    assert_eq!(summary.total, 1);
    assert_eq!(source.call_count(), 1);
}

#[tokio::test]
async fn csv_storage_materializes_files_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(FlakySource::new(vec![]));
    let storage = Arc::new(CsvStorage::new(dir.path()));
    let coordinator = DownloadCoordinator::new(source, storage)
        .with_base_path(dir.path());

    let requests = vec![request(&["AAPL"], DataType::Trades, None, "2024-01-02", "2024-01-02")];
    let summary = coordinator.run(&requests, 1).await.unwrap();
    assert_eq!(summary.completed, 1);

    let path = dir.path().join("AAPL").join("trades_20240102_20240102.csv");
    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with("t,p\n"));
    assert_eq!(contents.lines().count(), 3);

    // Re-run against the same directory skips the existing file
    let rerun = DownloadCoordinator::new(
        Arc::new(FlakySource::new(vec![])),
        Arc::new(CsvStorage::new(dir.path())),
    )
    .with_base_path(dir.path());
    let requests = vec![request(&["AAPL"], DataType::Trades, None, "2024-01-02", "2024-01-02")];
    let summary = rerun.run(&requests, 1).await.unwrap();
    assert_eq!(summary.skipped, 1);
}

#[tokio::test]
async fn invalid_request_fails_before_any_dispatch() {
    let source = Arc::new(FlakySource::new(vec![]));
    let storage = Arc::new(MemoryStorage::new());
    let coordinator = DownloadCoordinator::new(source.clone(), storage.clone());

    let requests = vec![DownloadRequest {
        symbols: vec![],
        data_types: vec![DataType::Trades],
        frequencies: vec![],
        date_range: DateRange::from_dates("2024-01-01", "2024-01-01").unwrap(),
    }];
    assert!(coordinator.run(&requests, 2).await.is_err());
    assert_eq!(source.call_count(), 0);
    assert_eq!(storage.save_count(), 0);
}
