//! Validate command implementation

use clap::Parser;
use serde_json::json;
use std::path::PathBuf;

use crate::config::Config;
use crate::coordinator::plan::expand_requests;

use super::{Cli, CliError, OutputFormat};

/// Validate a config file and report the planned work without fetching.
#[derive(Parser, Debug)]
pub struct ValidateCommand {
    /// Path to the config file
    #[arg(long, short, default_value = "config.yaml")]
    pub config: PathBuf,
}

impl ValidateCommand {
    /// Parse, validate, and expand the config, reporting the artifact count.
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let config = Config::load(&self.config)?;
        let requests = config.requests()?;
        let artifacts = expand_requests(&requests, &config.storage.base_path)?;

        match cli.output_format {
            OutputFormat::Json => {
                let output = json!({
                    "valid": true,
                    "config": self.config.display().to_string(),
                    "requests": requests.len(),
                    "artifacts": artifacts.len(),
                    "max_concurrent": config.max_concurrent,
                });
                println!("{}", serde_json::to_string(&output)?);
            }
            OutputFormat::Human => {
                println!("Config {} is valid", self.config.display());
                println!("Requests:  {}", requests.len());
                println!("Artifacts: {}", artifacts.len());
                println!("Concurrency limit: {}", config.max_concurrent);
            }
        }
        Ok(())
    }
}
