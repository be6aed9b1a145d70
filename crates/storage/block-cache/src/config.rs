//! Configuration of the block cache.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Name of the database directory created under [`CacheConfig::datadir`].
pub const DATABASE_NAME: &str = "ethscope-block-cache";

/// Assumed serialized size of one cached block, used for the size estimate in
/// [`CacheStats`](crate::CacheStats).
pub const DEFAULT_AVERAGE_BLOCK_SIZE: u64 = 50 * 1024;

/// Block cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheConfig {
    /// Directory holding the cache database.
    pub datadir: PathBuf,
    /// Assumed serialized size of one block, in bytes.
    pub average_block_size: u64,
}

impl CacheConfig {
    /// Creates a config rooted at `datadir` with the default block size estimate.
    pub fn new(datadir: impl Into<PathBuf>) -> Self {
        Self { datadir: datadir.into(), ..Default::default() }
    }

    /// Path of the database environment.
    pub fn database_path(&self) -> PathBuf {
        self.datadir.join(DATABASE_NAME)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        let datadir = dirs::data_local_dir()
            .map(|dir| dir.join("ethscope"))
            .unwrap_or_else(|| PathBuf::from(".ethscope"));
        Self { datadir, average_block_size: DEFAULT_AVERAGE_BLOCK_SIZE }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_path_is_under_datadir() {
        let config = CacheConfig::new("/tmp/ethscope");
        assert_eq!(config.database_path(), PathBuf::from("/tmp/ethscope/ethscope-block-cache"));
        assert_eq!(config.average_block_size, DEFAULT_AVERAGE_BLOCK_SIZE);
    }

    #[test]
    fn test_deserialize_fills_missing_fields() {
        let config: CacheConfig = serde_json::from_str(r#"{"datadir":"/data"}"#).unwrap();
        assert_eq!(config.datadir, PathBuf::from("/data"));
        assert_eq!(config.average_block_size, DEFAULT_AVERAGE_BLOCK_SIZE);
    }
}
