//! Cache-wide statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const BYTE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Summary of what the cache holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Number of cached blocks.
    pub total_blocks: usize,
    /// Lowest cached block number.
    pub oldest_block: Option<u64>,
    /// Highest cached block number.
    pub newest_block: Option<u64>,
    /// Chain time of the lowest cached block.
    pub oldest_timestamp: Option<DateTime<Utc>>,
    /// Chain time of the highest cached block.
    pub newest_timestamp: Option<DateTime<Utc>>,
    /// Approximate size of the cached blocks, e.g. `1.50 MB`.
    pub cache_size: String,
    /// Number of blocks recorded as failed to fetch.
    pub error_blocks: usize,
}

impl Default for CacheStats {
    fn default() -> Self {
        Self {
            total_blocks: 0,
            oldest_block: None,
            newest_block: None,
            oldest_timestamp: None,
            newest_timestamp: None,
            cache_size: format_bytes(0),
            error_blocks: 0,
        }
    }
}

/// Converts a chain timestamp in Unix seconds to a wall-clock instant.
pub(crate) fn chain_time(seconds: u64) -> Option<DateTime<Utc>> {
    let millis = i64::try_from(seconds).ok()?.checked_mul(1000)?;
    DateTime::from_timestamp_millis(millis)
}

/// Formats a byte count with base-1024 units and two decimals.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", BYTE_UNITS[unit])
}
