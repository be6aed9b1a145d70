//! Block Subcommand

use anyhow::bail;
use clap::Parser;
use ethscope_block_cache::BlockCache;

/// The `block` Subcommand
///
/// Prints one cached block as JSON.
///
/// # Usage
///
/// ```sh
/// ethscope-cache block <NUMBER>
/// ```
#[derive(Parser, Debug, Clone)]
#[command(about = "Prints one cached block")]
pub struct BlockCommand {
    /// Block number, decimal or 0x-prefixed hex.
    pub number: String,
}

impl BlockCommand {
    /// Runs the subcommand.
    pub async fn run(self, cache: &BlockCache) -> anyhow::Result<()> {
        match cache.get_block(self.number.as_str()).await {
            Some(block) => super::print_json(&block),
            None => bail!("Block {} is not cached", self.number),
        }
    }
}
