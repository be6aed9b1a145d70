//! Import Subcommand

use anyhow::{Context as _, Result};
use clap::Parser;
use ethscope_block_cache::BlockCache;
use std::path::PathBuf;

/// The `import` Subcommand
///
/// Loads blocks from an export file, either raw JSON or a zip archive holding one `.json` file.
///
/// # Usage
///
/// ```sh
/// ethscope-cache import <PATH>
/// ```
#[derive(Parser, Debug, Clone)]
#[command(about = "Loads blocks from an export file")]
pub struct ImportCommand {
    /// Export file to load.
    pub path: PathBuf,
}

impl ImportCommand {
    /// Runs the subcommand.
    pub async fn run(self, cache: &BlockCache) -> Result<()> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let summary = cache
            .import_cache(&bytes)
            .await
            .with_context(|| format!("Failed to import {}", self.path.display()))?;
        super::print_json(&summary)
    }
}
