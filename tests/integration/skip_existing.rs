//! Skip-if-exists: re-runs are cheap and idempotent.

use std::sync::Arc;

use marketdl::coordinator::DownloadCoordinator;
use marketdl::DataType;

use crate::common::{request, ConcurrencyProbeSource, FlakySource, MemoryStorage};
use std::time::Duration;

#[tokio::test]
async fn second_run_skips_everything_without_fetching() {
    let storage = Arc::new(MemoryStorage::new());
    let requests = vec![request(&["AAPL", "MSFT"], DataType::Trades, None, "2024-01-02", "2024-01-03")];

    let first = DownloadCoordinator::new(Arc::new(FlakySource::new(vec![])), storage.clone());
    let summary = first.run(&requests, 4).await.unwrap();
    assert_eq!(summary.completed, 4);
    assert_eq!(storage.save_count(), 4);

    // Same storage, fresh coordinator: everything is already on disk
    let source = Arc::new(ConcurrencyProbeSource::new(Duration::from_millis(1)));
    let second = DownloadCoordinator::new(source.clone(), storage.clone());
    let summary = second.run(&requests, 4).await.unwrap();

    assert_eq!(summary.skipped, 4);
    assert_eq!(summary.completed, 0);
    assert_eq!(source.high_water_mark(), 0, "skipped artifacts must not fetch");
    assert_eq!(storage.save_count(), 4);
}

#[tokio::test]
async fn partially_seeded_storage_downloads_only_the_gap() {
    let storage = Arc::new(MemoryStorage::new());
    let source = Arc::new(FlakySource::new(vec![]));
    let coordinator = DownloadCoordinator::new(source.clone(), storage.clone());

    // 3 daily artifacts; pre-seed the middle day
    let requests = vec![request(&["AAPL"], DataType::Quotes, None, "2024-01-01", "2024-01-03")];
    let planned = marketdl::coordinator::plan::expand_requests(
        &requests,
        std::path::Path::new("data"),
    )
    .unwrap();
    storage.seed(&planned[1]);

    let summary = coordinator.run(&requests, 2).await.unwrap();
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(source.call_count(), 2);
}
