//! Global arguments for the CLI.

use anyhow::{Context as _, Result};
use clap::Parser;
use ethscope_block_cache::{BlockCache, CacheConfig, DEFAULT_AVERAGE_BLOCK_SIZE};
use std::path::PathBuf;

/// Global arguments for the CLI.
#[derive(Parser, Default, Clone, Debug)]
pub struct GlobalArgs {
    /// Directory holding the cache database. Defaults to the platform data directory.
    #[arg(long, global = true, env = "ETHSCOPE_DATADIR")]
    pub datadir: Option<PathBuf>,
    /// Assumed serialized size of one block in bytes, used for the size estimate.
    #[arg(
        long = "avg-block-size",
        global = true,
        env = "ETHSCOPE_AVG_BLOCK_SIZE",
        default_value_t = DEFAULT_AVERAGE_BLOCK_SIZE
    )]
    pub average_block_size: u64,
}

impl GlobalArgs {
    /// Builds the cache configuration from the flags.
    pub fn cache_config(&self) -> CacheConfig {
        let mut config = CacheConfig::default();
        if let Some(datadir) = &self.datadir {
            config.datadir.clone_from(datadir);
        }
        config.average_block_size = self.average_block_size;
        config
    }

    /// Opens the cache, failing when its database cannot be opened.
    pub async fn open_cache(&self) -> Result<BlockCache> {
        let config = self.cache_config();
        let path = config.database_path();
        let cache = BlockCache::new(config);
        cache
            .open()
            .await
            .with_context(|| format!("Failed to open block cache at {}", path.display()))?;
        Ok(cache)
    }
}
