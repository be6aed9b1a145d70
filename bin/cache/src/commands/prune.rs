//! Prune Subcommand

use anyhow::{Result, bail};
use chrono::{Duration, Utc};
use clap::Parser;
use ethscope_block_cache::BlockCache;

/// The `prune` Subcommand
///
/// Deletes every block whose chain timestamp is at or below a cutoff, given either as a Unix
/// timestamp or as a maximum age in days.
///
/// # Usage
///
/// ```sh
/// ethscope-cache prune --max-age-days 30
/// ```
#[derive(Parser, Debug, Clone)]
#[command(about = "Deletes blocks older than a cutoff")]
pub struct PruneCommand {
    /// Delete blocks with a timestamp at or below this Unix time, in seconds.
    #[arg(long, conflicts_with = "max_age_days")]
    pub older_than: Option<u64>,
    /// Delete blocks older than this many days.
    #[arg(long)]
    pub max_age_days: Option<u32>,
}

impl PruneCommand {
    /// Runs the subcommand.
    pub async fn run(self, cache: &BlockCache) -> Result<()> {
        let cutoff = self.cutoff()?;
        let removed = cache.clear_old_blocks(cutoff).await;
        println!("Removed {removed} blocks with a timestamp at or below {cutoff}");
        Ok(())
    }

    /// Resolves the flags into a Unix timestamp in seconds.
    fn cutoff(&self) -> Result<u64> {
        match (self.older_than, self.max_age_days) {
            (Some(timestamp), _) => Ok(timestamp),
            (None, Some(days)) => {
                let cutoff = Utc::now() - Duration::days(days.into());
                Ok(u64::try_from(cutoff.timestamp()).unwrap_or_default())
            }
            (None, None) => bail!("Either --older-than or --max-age-days is required"),
        }
    }
}
