//! On-disk layout: per-symbol directories and deterministic file names.

use marketdl::partition::day_envelope;
use marketdl::storage::csv::CsvStorage;
use marketdl::storage::Storage;
use marketdl::{Artifact, DataType, DateRange};

use crate::common::sample_table;

fn artifact(symbol: &str, data_type: DataType, freq: Option<&str>, base: &std::path::Path) -> Artifact {
    Artifact {
        symbol: symbol.to_string(),
        data_type,
        frequency: freq.map(|f| f.parse().unwrap()),
        date_range: day_envelope(chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
        base_path: base.to_path_buf(),
    }
}

#[tokio::test]
async fn aggregates_file_name_carries_the_frequency() {
    let dir = tempfile::tempdir().unwrap();
    let storage = CsvStorage::new(dir.path());
    let a = artifact("AAPL", DataType::Aggregates, Some("5minute"), dir.path());

    storage.save(&a, &sample_table()).await.unwrap();

    let expected = dir
        .path()
        .join("AAPL")
        .join("aggregates_5minute_20240102_20240102.csv");
    assert!(expected.is_file());
    assert!(storage.exists(&a));
}

#[tokio::test]
async fn tick_file_name_has_no_frequency_segment() {
    let dir = tempfile::tempdir().unwrap();
    let storage = CsvStorage::new(dir.path());
    let a = artifact("MSFT", DataType::Quotes, None, dir.path());

    storage.save(&a, &sample_table()).await.unwrap();

    assert!(dir
        .path()
        .join("MSFT")
        .join("quotes_20240102_20240102.csv")
        .is_file());
}

#[tokio::test]
async fn intraday_ranges_store_to_distinct_files() {
    // Hourly requests pass through unsplit, keeping wall-clock bounds.
    // Two such artifacts over the same days must not collapse onto one
    // key, one progress entry, or one file.
    let dir = tempfile::tempdir().unwrap();
    let storage = CsvStorage::new(dir.path());

    let make = |start: &str, end: &str| Artifact {
        symbol: "AAPL".to_string(),
        data_type: DataType::Aggregates,
        frequency: Some("1hour".parse().unwrap()),
        date_range: DateRange::from_dates(start, end).unwrap(),
        base_path: dir.path().to_path_buf(),
    };
    let a = make("2024-01-01", "2024-01-02");
    let b = make("2024-01-01T06:00:00", "2024-01-02T12:00:00");
    assert_ne!(a, b);
    assert_ne!(a.key(), b.key());

    storage.save(&a, &sample_table()).await.unwrap();
    assert!(storage.exists(&a));
    assert!(!storage.exists(&b), "unfetched data must not look materialized");

    storage.save(&b, &sample_table()).await.unwrap();
    let files = std::fs::read_dir(dir.path().join("AAPL")).unwrap().count();
    assert_eq!(files, 2);
}

#[tokio::test]
async fn hostile_symbols_cannot_escape_the_base_directory() {
    let dir = tempfile::tempdir().unwrap();
    let storage = CsvStorage::new(dir.path());
    let a = artifact("../etc/passwd", DataType::Trades, None, dir.path());

    storage.save(&a, &sample_table()).await.unwrap();

    // The sanitized directory stays inside base_path
    for entry in std::fs::read_dir(dir.path()).unwrap() {
        let path = entry.unwrap().path();
        assert!(path.starts_with(dir.path()));
    }
    assert!(!dir.path().parent().unwrap().join("etc").exists());
}
