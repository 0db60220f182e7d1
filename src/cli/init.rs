//! Init command implementation

use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use crate::config::sample_config;

use super::CliError;

/// Write a starter config file.
#[derive(Parser, Debug)]
pub struct InitCommand {
    /// Destination path for the new config file
    #[arg(long, short, default_value = "config.yaml")]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

impl InitCommand {
    /// Write the starter config, refusing to clobber without `--force`.
    pub async fn execute(&self) -> Result<(), CliError> {
        if self.output.exists() && !self.force {
            return Err(CliError::InvalidArgument(format!(
                "{} already exists (use --force to overwrite)",
                self.output.display()
            )));
        }
        std::fs::write(&self.output, sample_config())?;
        info!(path = %self.output.display(), "wrote starter config");
        println!("Wrote {}", self.output.display());
        Ok(())
    }
}
