//! Models for storing fetched chain blocks.
//!
//! Blocks are stored whole, keyed by block number, as JSON documents that keep every field the
//! chain-data provider delivered. A secondary index keyed by `(timestamp, number)` lets age-based
//! pruning walk only the rows it deletes.

use super::{JsonBlob, TimestampKey, U64Value};
use crate::{error::BlockRecordError, normalize::Normalized, number::IntoBlockNumber};
use reth_db_api::table::Table;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A block as held by the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedBlock {
    /// Block number, the primary key.
    pub number: u64,
    /// Block hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Block timestamp in Unix seconds.
    #[serde(default)]
    pub timestamp: u64,
    /// Transactions in block order.
    #[serde(default)]
    pub transactions: Vec<BlockTransaction>,
    /// Every other field supplied by the provider, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CachedBlock {
    /// Creates a block with no transactions and no extra fields.
    pub fn new(number: u64, hash: impl Into<String>, timestamp: u64) -> Self {
        Self {
            number,
            hash: Some(hash.into()),
            timestamp,
            transactions: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Builds a block from any serializable provider payload.
    ///
    /// `number` and `timestamp` may be integers, decimal strings or hex quantities. Every other
    /// 64- or 128-bit integer in the payload, however deeply nested, is stored as a decimal
    /// string.
    pub fn from_payload<B: Serialize + ?Sized>(payload: &B) -> Result<Self, BlockRecordError> {
        let value =
            serde_json::to_value(Normalized::new(payload)).map_err(BlockRecordError::Encoding)?;
        let Value::Object(mut fields) = value else {
            return Err(BlockRecordError::NotAnObject);
        };
        let number =
            fields.get("number").into_block_number().ok_or(BlockRecordError::InvalidNumber)?;
        let timestamp = fields.get("timestamp").into_block_number().unwrap_or_default();

        fields.insert("number".to_string(), number.into());
        fields.insert("timestamp".to_string(), timestamp.into());

        serde_json::from_value(Value::Object(fields)).map_err(BlockRecordError::Malformed)
    }

    /// Builds a block from a JSON payload. See [`CachedBlock::from_payload`].
    pub fn from_value(value: &Value) -> Result<Self, BlockRecordError> {
        Self::from_payload(value)
    }
}

/// One entry of [`CachedBlock::transactions`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockTransaction {
    /// Only the transaction hash was fetched.
    Hash(String),
    /// The full transaction object was fetched.
    Full(TransactionRecord),
}

impl BlockTransaction {
    /// Returns the transaction hash.
    pub fn hash(&self) -> &str {
        match self {
            Self::Hash(hash) => hash,
            Self::Full(record) => &record.hash,
        }
    }
}

/// A transaction carried inside a cached block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Transaction hash.
    #[serde(default)]
    pub hash: String,
    /// Sender address.
    #[serde(default)]
    pub from: Option<String>,
    /// Recipient address, `None` for contract creation.
    #[serde(default)]
    pub to: Option<String>,
    /// Transferred value, as delivered (hex quantity or decimal string).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Number of the containing block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<Value>,
    /// Hash of the containing block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<String>,
    /// Every other field supplied by the provider.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Projection of a stored block that reads only its timestamp.
#[derive(Debug, Deserialize)]
pub(crate) struct BlockTimestamp {
    #[serde(default)]
    pub(crate) timestamp: u64,
}

/// A table for storing blocks by block number.
///
/// - **Key**: `u64` (block number)
/// - **Value**: [`CachedBlock`] as JSON
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Blocks;

impl Table for Blocks {
    const NAME: &'static str = "blocks";
    const DUPSORT: bool = false;

    type Key = u64;
    type Value = JsonBlob<CachedBlock>;
}

/// Secondary index of [`Blocks`] by block timestamp.
///
/// - **Key**: [`TimestampKey`], ordered by `(timestamp, block number)`
/// - **Value**: block number
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct BlockTimestamps;

impl Table for BlockTimestamps {
    const NAME: &'static str = "blocks_by_timestamp";
    const DUPSORT: bool = false;

    type Key = TimestampKey;
    type Value = U64Value;
}
