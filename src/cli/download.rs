//! Download command implementation

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::Config;
use crate::coordinator::{DownloadCoordinator, DownloadSummary, ProgressTracker};
use crate::shutdown::SharedShutdown;
use crate::source::polygon::PolygonSource;
use crate::source::FetchError;
use crate::storage::csv::CsvStorage;

use super::{Cli, CliError, OutputFormat};

/// Interval between progress bar refreshes.
const PROGRESS_REFRESH: Duration = Duration::from_millis(100);

/// Run the downloads declared in a config file.
#[derive(Parser, Debug)]
pub struct DownloadCommand {
    /// Path to the config file
    #[arg(long, short, default_value = "config.yaml")]
    pub config: PathBuf,
}

impl DownloadCommand {
    /// Execute the download batch and render the summary.
    pub async fn execute(&self, cli: &Cli, shutdown: SharedShutdown) -> Result<(), CliError> {
        let config = Config::load(&self.config)?;
        let requests = config.requests()?;

        let api_key = config.api_key().ok_or_else(|| {
            CliError::Source(FetchError::Permanent(
                "no API key: set api.api_key or POLYGON_API_KEY".to_string(),
            ))
        })?;
        let source = Arc::new(PolygonSource::with_timeout(
            api_key,
            config.request_timeout(),
        )?);
        let storage = Arc::new(CsvStorage::new(&config.storage.base_path));

        let coordinator = DownloadCoordinator::new(source, storage)
            .with_retry_policy(config.retry_policy())
            .with_base_path(&config.storage.base_path)
            .with_shutdown(shutdown);

        let bar = match cli.output_format {
            OutputFormat::Human => Some(spawn_progress_bar(coordinator.progress())),
            OutputFormat::Json => None,
        };

        info!(config = %self.config.display(), "starting download run");
        let summary = coordinator.run(&requests, config.max_concurrent).await?;

        if let Some((bar, handle)) = bar {
            handle.abort();
            bar.finish_and_clear();
        }

        match cli.output_format {
            OutputFormat::Json => output_json(&summary)?,
            OutputFormat::Human => output_human(&summary),
        }

        if summary.is_success() {
            Ok(())
        } else {
            Err(CliError::DownloadsFailed {
                failed: summary.failed,
                total: summary.total,
            })
        }
    }
}

/// Create the progress bar and a background task that feeds it from the
/// shared tracker.
fn spawn_progress_bar(
    progress: Arc<ProgressTracker>,
) -> (ProgressBar, tokio::task::JoinHandle<()>) {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("hardcoded template is valid")
            .progress_chars("#>-"),
    );
    bar.set_message("downloading");

    let handle = tokio::spawn({
        let bar = bar.clone();
        async move {
            loop {
                let snapshot = progress.snapshot();
                bar.set_length(snapshot.total as u64);
                bar.set_position(snapshot.done() as u64);
                bar.set_message(format!(
                    "ok={} skip={} fail={}",
                    snapshot.completed, snapshot.skipped, snapshot.failed
                ));
                tokio::time::sleep(PROGRESS_REFRESH).await;
            }
        }
    });

    (bar, handle)
}

/// Output the summary as a single JSON line.
fn output_json(summary: &DownloadSummary) -> Result<(), CliError> {
    println!("{}", serde_json::to_string(summary)?);
    Ok(())
}

/// Output the summary in human-readable format.
fn output_human(summary: &DownloadSummary) {
    println!("\nDownload run finished");
    println!("Total:     {}", summary.total);
    println!("Completed: {}", summary.completed);
    println!("Skipped:   {}", summary.skipped);
    println!("Failed:    {}", summary.failed);
    for failure in &summary.errors {
        eprintln!("  {} [{:?}]: {}", failure.artifact, failure.kind, failure.message);
    }
}
