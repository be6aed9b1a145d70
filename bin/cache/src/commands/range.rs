//! Range Subcommand

use clap::Parser;
use ethscope_block_cache::BlockCache;

/// The `range` Subcommand
///
/// Lists the cached block numbers in an inclusive range. With `--full` the blocks themselves are
/// printed; with `--missing` the numbers that still need a live fetch are listed instead.
///
/// # Usage
///
/// ```sh
/// ethscope-cache range <START> <END> [--full | --missing]
/// ```
#[derive(Parser, Debug, Clone)]
#[command(about = "Lists cached or missing blocks in a range")]
pub struct RangeCommand {
    /// First block number of the range.
    pub start: String,
    /// Last block number of the range, inclusive.
    pub end: String,
    /// Print full blocks instead of their numbers.
    #[arg(long, conflicts_with = "missing")]
    pub full: bool,
    /// List numbers that are neither cached nor recorded as failed.
    #[arg(long)]
    pub missing: bool,
    /// Most numbers listed with `--missing`.
    #[arg(long, default_value_t = 1000)]
    pub limit: usize,
}

impl RangeCommand {
    /// Runs the subcommand.
    pub async fn run(self, cache: &BlockCache) -> anyhow::Result<()> {
        let (start, end) = (self.start.as_str(), self.end.as_str());
        if self.full {
            super::print_json(&cache.get_blocks_in_range(start, end).await)
        } else if self.missing {
            super::print_json(&cache.get_missing_block_numbers(start, end, self.limit).await)
        } else {
            super::print_json(&cache.get_cached_block_numbers(start, end).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_conflicts_with_missing() {
        assert!(RangeCommand::try_parse_from(["range", "1", "2", "--full", "--missing"]).is_err());

        let command = RangeCommand::try_parse_from(["range", "0x10", "32", "--missing"]).unwrap();
        assert!(command.missing);
        assert_eq!(command.limit, 1000);
    }
}
