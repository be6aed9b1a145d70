//! Export Subcommand

use anyhow::{Context as _, Result};
use clap::{Parser, ValueEnum};
use ethscope_block_cache::{BlockCache, ExportFormat};
use std::path::PathBuf;
use tracing::info;

/// Container of the export file.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FormatArg {
    /// Plain JSON document.
    #[default]
    Json,
    /// Zip archive holding the JSON document.
    Zip,
}

impl From<FormatArg> for ExportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Json => Self::Json,
            FormatArg::Zip => Self::Zip,
        }
    }
}

/// The `export` Subcommand
///
/// Writes every cached block to a JSON document, optionally zipped.
///
/// # Usage
///
/// ```sh
/// ethscope-cache export [--format zip] [--output <PATH>]
/// ```
#[derive(Parser, Debug, Clone)]
#[command(about = "Writes every cached block to a file")]
pub struct ExportCommand {
    /// Container of the export file.
    #[arg(long, value_enum, default_value_t = FormatArg::Json)]
    pub format: FormatArg,
    /// Destination file. Defaults to a timestamped name in the working directory.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

impl ExportCommand {
    /// Runs the subcommand.
    pub async fn run(self, cache: &BlockCache) -> Result<()> {
        let format = ExportFormat::from(self.format);
        let snapshot = cache.export_snapshot().await?;
        let bytes = snapshot.encode(format)?;
        let output = self.output.unwrap_or_else(|| PathBuf::from(snapshot.file_name(format)));

        tokio::fs::write(&output, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", output.display()))?;
        info!(blocks = snapshot.blocks.len(), path = %output.display(), "Exported block cache");
        println!("{}", output.display());
        Ok(())
    }
}
