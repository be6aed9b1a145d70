//! Stats Subcommand

use clap::Parser;
use ethscope_block_cache::BlockCache;

/// The `stats` Subcommand
///
/// Prints the block count, block-number and timestamp extents, estimated size and error count.
///
/// # Usage
///
/// ```sh
/// ethscope-cache stats [OPTIONS]
/// ```
#[derive(Parser, Debug, Clone)]
#[command(about = "Summarizes the block cache")]
pub struct StatsCommand {}

impl StatsCommand {
    /// Runs the subcommand.
    pub async fn run(self, cache: &BlockCache) -> anyhow::Result<()> {
        let stats = cache.get_cache_stats().await;
        super::print_json(&stats)
    }
}
