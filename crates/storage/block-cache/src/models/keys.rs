//! Composite keys of the secondary index tables.
//!
//! MDBX orders keys by their raw bytes, so every integer is encoded big-endian and every
//! variable-length component is length-prefixed. A range over one leading component then
//! never bleeds into a neighbouring one.

use reth_db_api::{
    DatabaseError,
    table::{Decode, Encode},
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Key of a timestamp index: rows sort by timestamp, then by block number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimestampKey {
    /// Timestamp of the indexed record.
    pub timestamp: u64,
    /// Block number of the indexed record.
    pub block_number: u64,
}

impl TimestampKey {
    /// Creates a new [`TimestampKey`].
    pub const fn new(timestamp: u64, block_number: u64) -> Self {
        Self { timestamp, block_number }
    }

    /// The last possible key for `timestamp`, used as an inclusive upper bound.
    pub const fn upper_bound(timestamp: u64) -> Self {
        Self { timestamp, block_number: u64::MAX }
    }
}

impl Encode for TimestampKey {
    type Encoded = [u8; 16];

    fn encode(self) -> Self::Encoded {
        let mut buf = [0u8; 16];
        buf[..8].copy_from_slice(&self.timestamp.to_be_bytes());
        buf[8..].copy_from_slice(&self.block_number.to_be_bytes());
        buf
    }
}

impl Decode for TimestampKey {
    fn decode(value: &[u8]) -> Result<Self, DatabaseError> {
        let (timestamp, block_number) = value.split_at_checked(8).ok_or(DatabaseError::Decode)?;
        Ok(Self { timestamp: read_u64(timestamp)?, block_number: read_u64(block_number)? })
    }
}

/// Key of the error-type index: rows sort by error type, then by block number.
///
/// Error types compare by byte length first, then by their bytes, which is the order of the
/// encoded key in the database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorTypeKey {
    /// Error classification of the indexed record.
    pub error_type: String,
    /// Block number of the indexed record.
    pub block_number: u64,
}

impl ErrorTypeKey {
    /// Creates a new [`ErrorTypeKey`].
    pub fn new(error_type: impl Into<String>, block_number: u64) -> Self {
        Self { error_type: error_type.into(), block_number }
    }

    /// The error type bytes that make it into the encoded key.
    fn type_bytes(&self) -> &[u8] {
        let bytes = self.error_type.as_bytes();
        &bytes[..bytes.len().min(usize::from(u16::MAX))]
    }
}

impl Ord for ErrorTypeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let (this, that) = (self.type_bytes(), other.type_bytes());
        this.len()
            .cmp(&that.len())
            .then_with(|| this.cmp(that))
            .then_with(|| self.block_number.cmp(&other.block_number))
    }
}

impl PartialOrd for ErrorTypeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Encode for ErrorTypeKey {
    type Encoded = Vec<u8>;

    fn encode(self) -> Self::Encoded {
        let type_bytes = self.type_bytes();
        let type_len = u16::try_from(type_bytes.len()).unwrap_or(u16::MAX);

        let mut buf = Vec::with_capacity(2 + type_bytes.len() + 8);
        buf.extend_from_slice(&type_len.to_be_bytes());
        buf.extend_from_slice(type_bytes);
        buf.extend_from_slice(&self.block_number.to_be_bytes());
        buf
    }
}

impl Decode for ErrorTypeKey {
    fn decode(value: &[u8]) -> Result<Self, DatabaseError> {
        let (len, rest) = value.split_at_checked(2).ok_or(DatabaseError::Decode)?;
        let len = usize::from(u16::from_be_bytes([len[0], len[1]]));
        let (error_type, block_number) = rest.split_at_checked(len).ok_or(DatabaseError::Decode)?;
        let error_type = String::from_utf8(error_type.to_vec()).map_err(|_| DatabaseError::Decode)?;
        Ok(Self { error_type, block_number: read_u64(block_number)? })
    }
}

/// Keys of the `metadata` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MetadataKey {
    /// Latest applied schema migration.
    SchemaVersion,
}

impl Encode for MetadataKey {
    type Encoded = [u8; 1];

    fn encode(self) -> Self::Encoded {
        match self {
            Self::SchemaVersion => [0],
        }
    }
}

impl Decode for MetadataKey {
    fn decode(value: &[u8]) -> Result<Self, DatabaseError> {
        match value {
            [0] => Ok(Self::SchemaVersion),
            _ => Err(DatabaseError::Decode),
        }
    }
}

fn read_u64(bytes: &[u8]) -> Result<u64, DatabaseError> {
    let bytes: [u8; 8] = bytes.try_into().map_err(|_| DatabaseError::Decode)?;
    Ok(u64::from_be_bytes(bytes))
}
