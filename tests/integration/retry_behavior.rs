//! Retry behavior: attempt budgets, error classes, and backoff limits.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use marketdl::coordinator::{DownloadCoordinator, RetryPolicy};
use marketdl::source::{FetchError, FetchResult, MarketDataSource};
use marketdl::{Artifact, DataType, Table};

use crate::common::{request, sample_table, FlakySource, MemoryStorage, SymbolFailSource};

fn policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy::new(max_retries, Duration::from_millis(1))
}

/// Source that stamps the clock at every fetch and fails the first
/// `fail_first` calls with a transient error.
struct TimestampedSource {
    fail_first: usize,
    calls: AtomicUsize,
    stamps: Mutex<Vec<Instant>>,
}

impl TimestampedSource {
    fn new(fail_first: usize) -> Self {
        Self {
            fail_first,
            calls: AtomicUsize::new(0),
            stamps: Mutex::new(Vec::new()),
        }
    }

    fn stamps(&self) -> Vec<Instant> {
        self.stamps.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketDataSource for TimestampedSource {
    async fn fetch(&self, _artifact: &Artifact) -> FetchResult<Table> {
        self.stamps.lock().unwrap().push(Instant::now());
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.fail_first {
            Err(FetchError::Transient("HTTP 503".to_string()))
        } else {
            Ok(sample_table())
        }
    }
}

#[tokio::test]
async fn transient_failures_retry_until_success() {
    let source = Arc::new(FlakySource::new(vec![
        FetchError::Transient("HTTP 503".to_string()),
        FetchError::Transient("HTTP 503".to_string()),
    ]));
    let storage = Arc::new(MemoryStorage::new());
    let coordinator = DownloadCoordinator::new(source.clone(), storage.clone())
        .with_retry_policy(policy(3));

    let requests = vec![request(&["AAPL"], DataType::Trades, None, "2024-01-02", "2024-01-02")];
    let summary = coordinator.run(&requests, 1).await.unwrap();

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failed, 0);
    // Two failures plus the succeeding attempt
    assert_eq!(source.call_count(), 3);
    assert_eq!(storage.save_count(), 1);
}

#[tokio::test]
async fn retries_exhaust_after_max_attempts() {
    let source = Arc::new(FlakySource::new(vec![
        FetchError::Transient("HTTP 503".to_string()),
        FetchError::Transient("HTTP 503".to_string()),
        FetchError::Transient("HTTP 503".to_string()),
        FetchError::Transient("HTTP 503".to_string()),
    ]));
    let storage = Arc::new(MemoryStorage::new());
    let coordinator = DownloadCoordinator::new(source.clone(), storage.clone())
        .with_retry_policy(policy(3));

    let requests = vec![request(&["AAPL"], DataType::Trades, None, "2024-01-02", "2024-01-02")];
    let summary = coordinator.run(&requests, 1).await.unwrap();

    assert_eq!(summary.failed, 1);
    // Exactly max_retries attempts, never more
    assert_eq!(source.call_count(), 3);
    assert_eq!(storage.save_count(), 0);
    assert!(summary.errors[0].message.contains("HTTP 503"));
}

#[tokio::test]
async fn timeouts_are_retried() {
    let source = Arc::new(FlakySource::new(vec![FetchError::Timeout(
        "request timed out".to_string(),
    )]));
    let storage = Arc::new(MemoryStorage::new());
    let coordinator = DownloadCoordinator::new(source.clone(), storage.clone())
        .with_retry_policy(policy(2));

    let requests = vec![request(&["AAPL"], DataType::Quotes, None, "2024-01-02", "2024-01-02")];
    let summary = coordinator.run(&requests, 1).await.unwrap();

    assert_eq!(summary.completed, 1);
    assert_eq!(source.call_count(), 2);
}

#[tokio::test]
async fn permanent_failures_never_retry() {
    let source = Arc::new(SymbolFailSource::new("BOGUS"));
    let storage = Arc::new(MemoryStorage::new());
    let coordinator = DownloadCoordinator::new(source.clone(), storage.clone())
        .with_retry_policy(policy(5));

    let requests = vec![request(&["BOGUS"], DataType::Trades, None, "2024-01-02", "2024-01-02")];
    let summary = coordinator.run(&requests, 1).await.unwrap();

    assert_eq!(summary.failed, 1);
    // A single attempt despite a budget of 5
    assert_eq!(source.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_sleep_the_linear_backoff_schedule() {
    // Budget of 3 attempts: exactly 2 sleeps, at 1x and 2x the base delay.
    let source = Arc::new(TimestampedSource::new(usize::MAX));
    let storage = Arc::new(MemoryStorage::new());
    let coordinator = DownloadCoordinator::new(source.clone(), storage)
        .with_retry_policy(RetryPolicy::new(3, Duration::from_secs(1)));

    let requests = vec![request(&["AAPL"], DataType::Trades, None, "2024-01-02", "2024-01-02")];
    let summary = coordinator.run(&requests, 1).await.unwrap();
    assert_eq!(summary.failed, 1);

    let stamps = source.stamps();
    assert_eq!(stamps.len(), 3);
    assert_eq!(stamps[1] - stamps[0], Duration::from_secs(1));
    assert_eq!(stamps[2] - stamps[1], Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn recovered_fetch_sleeps_once() {
    let source = Arc::new(TimestampedSource::new(1));
    let storage = Arc::new(MemoryStorage::new());
    let coordinator = DownloadCoordinator::new(source.clone(), storage.clone())
        .with_retry_policy(RetryPolicy::new(3, Duration::from_secs(2)));

    let requests = vec![request(&["AAPL"], DataType::Trades, None, "2024-01-02", "2024-01-02")];
    let summary = coordinator.run(&requests, 1).await.unwrap();
    assert_eq!(summary.completed, 1);

    let stamps = source.stamps();
    assert_eq!(stamps.len(), 2);
    assert_eq!(stamps[1] - stamps[0], Duration::from_secs(2));
}

#[tokio::test]
async fn single_attempt_policy_never_retries() {
    let source = Arc::new(FlakySource::new(vec![FetchError::Transient(
        "HTTP 429".to_string(),
    )]));
    let storage = Arc::new(MemoryStorage::new());
    let coordinator = DownloadCoordinator::new(source.clone(), storage.clone())
        .with_retry_policy(policy(1));

    let requests = vec![request(&["AAPL"], DataType::Trades, None, "2024-01-02", "2024-01-02")];
    let summary = coordinator.run(&requests, 1).await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(source.call_count(), 1);
}
