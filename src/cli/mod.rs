//! CLI command implementations

use clap::{Parser, Subcommand};
use std::str::FromStr;

pub mod download;
pub mod error;
pub mod init;
pub mod validate;

pub use download::DownloadCommand;
pub use error::CliError;
pub use init::InitCommand;
pub use validate::ValidateCommand;

/// Market data downloader CLI
#[derive(Parser, Debug)]
#[command(name = "marketdl")]
#[command(about = "Download historical market data to local files", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the downloads declared in a config file
    Download(DownloadCommand),

    /// Validate a config file and report the planned work
    Validate(ValidateCommand),

    /// Write a starter config file
    Init(InitCommand),
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}
