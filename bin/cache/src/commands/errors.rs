//! Errors Subcommand

use clap::Parser;
use ethscope_block_cache::BlockCache;
use tracing::info;

/// The `errors` Subcommand
///
/// Lists the blocks recorded as failed to fetch, optionally filtered by range or error type, or
/// empties the ledger.
///
/// # Usage
///
/// ```sh
/// ethscope-cache errors [--type <TYPE>] [--start <N> --end <N>] [--clear]
/// ```
#[derive(Parser, Debug, Clone)]
#[command(about = "Inspects or clears the fetch-failure ledger")]
pub struct ErrorsCommand {
    /// Only list failures of this type.
    #[arg(long = "type", conflicts_with_all = ["start", "clear"])]
    pub error_type: Option<String>,
    /// First block number of the listed range.
    #[arg(long, requires = "end")]
    pub start: Option<String>,
    /// Last block number of the listed range, inclusive.
    #[arg(long, requires = "start")]
    pub end: Option<String>,
    /// Remove every recorded failure instead of listing them.
    #[arg(long)]
    pub clear: bool,
}

impl ErrorsCommand {
    /// Runs the subcommand.
    pub async fn run(self, cache: &BlockCache) -> anyhow::Result<()> {
        if self.clear {
            cache.clear_error_blocks().await;
            info!("Cleared the error ledger");
            return Ok(());
        }

        let records = match (self.error_type, self.start, self.end) {
            (Some(error_type), _, _) => cache.get_error_blocks_by_type(&error_type).await,
            (None, Some(start), Some(end)) => {
                cache.get_error_blocks_in_range(start.as_str(), end.as_str()).await
            }
            _ => cache.get_error_blocks().await,
        };
        super::print_json(&records)
    }
}
