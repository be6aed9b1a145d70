//! Models for the ledger of blocks that failed to fetch.

use super::{ErrorTypeKey, JsonBlob, TimestampKey, U64Value};
use reth_db_api::table::Table;
use serde::{Deserialize, Serialize};

/// Longest error classification kept, in characters.
pub const MAX_ERROR_TYPE_LEN: usize = 128;

/// A block number whose live fetch failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBlock {
    /// The block that failed to fetch, the primary key.
    pub block_number: u64,
    /// Short classification of the failure.
    pub error_type: String,
    /// Human-readable failure detail.
    pub error_message: String,
    /// Unix milliseconds of the most recent failure.
    pub timestamp: u64,
    /// Retry attempts recorded since the last failure.
    pub retry_count: u32,
}

impl ErrorBlock {
    /// Creates a fresh record with a zero retry count.
    ///
    /// `error_type` is cut to [`MAX_ERROR_TYPE_LEN`] characters since it doubles as an index key.
    pub fn new(
        block_number: u64,
        error_type: &str,
        error_message: impl Into<String>,
        timestamp: u64,
    ) -> Self {
        Self {
            block_number,
            error_type: error_type.chars().take(MAX_ERROR_TYPE_LEN).collect(),
            error_message: error_message.into(),
            timestamp,
            retry_count: 0,
        }
    }

    pub(crate) const fn timestamp_key(&self) -> TimestampKey {
        TimestampKey::new(self.timestamp, self.block_number)
    }

    pub(crate) fn type_key(&self) -> ErrorTypeKey {
        ErrorTypeKey::new(self.error_type.clone(), self.block_number)
    }
}

/// A table for storing fetch failures by block number.
///
/// - **Key**: `u64` (block number)
/// - **Value**: [`ErrorBlock`] as JSON
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct ErrorBlocks;

impl Table for ErrorBlocks {
    const NAME: &'static str = "error_blocks";
    const DUPSORT: bool = false;

    type Key = u64;
    type Value = JsonBlob<ErrorBlock>;
}

/// Secondary index of [`ErrorBlocks`] by failure time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct ErrorBlockTimestamps;

impl Table for ErrorBlockTimestamps {
    const NAME: &'static str = "error_blocks_by_timestamp";
    const DUPSORT: bool = false;

    type Key = TimestampKey;
    type Value = U64Value;
}

/// Secondary index of [`ErrorBlocks`] by error classification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct ErrorBlockTypes;

impl Table for ErrorBlockTypes {
    const NAME: &'static str = "error_blocks_by_type";
    const DUPSORT: bool = false;

    type Key = ErrorTypeKey;
    type Value = U64Value;
}
