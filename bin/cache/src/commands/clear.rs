//! Clear Subcommand

use anyhow::bail;
use clap::Parser;
use ethscope_block_cache::BlockCache;
use tracing::info;

/// The `clear` Subcommand
///
/// Deletes every cached block and every recorded failure.
///
/// # Usage
///
/// ```sh
/// ethscope-cache clear --yes
/// ```
#[derive(Parser, Debug, Clone)]
#[command(about = "Deletes every cached block and recorded failure")]
pub struct ClearCommand {
    /// Confirm the deletion.
    #[arg(long)]
    pub yes: bool,
}

impl ClearCommand {
    /// Runs the subcommand.
    pub async fn run(self, cache: &BlockCache) -> anyhow::Result<()> {
        if !self.yes {
            bail!("Refusing to clear the cache without --yes");
        }
        let blocks = cache.get_cache_stats().await.total_blocks;
        cache.clear_cache().await;
        info!(blocks, "Cleared block cache");
        Ok(())
    }
}
