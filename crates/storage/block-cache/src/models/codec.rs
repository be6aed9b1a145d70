//! Value encodings shared by the cache tables.

use bytes::BufMut;
use reth_db_api::{
    DatabaseError,
    table::{Compress, Decompress},
};
use serde::{Deserialize, Serialize, Serializer, de::DeserializeOwned};
use std::{fmt, marker::PhantomData};

/// A record stored as JSON bytes.
///
/// Decompressing a row only copies its bytes; the JSON is parsed when [`JsonBlob::decode`] is
/// called. Key-only scans over a table therefore never parse the records they skip.
pub struct JsonBlob<T> {
    bytes: Vec<u8>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonBlob<T> {
    pub(crate) const fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes, _marker: PhantomData }
    }

    /// Returns the raw JSON bytes of the record.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl<T: Serialize> JsonBlob<T> {
    /// Encodes `value` as JSON.
    pub fn encode(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_vec(value).map(Self::from_bytes)
    }
}

impl<T: DeserializeOwned> JsonBlob<T> {
    /// Parses the stored JSON back into `T`.
    pub fn decode(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.bytes)
    }

    /// Parses only the parts of the stored JSON that `U` asks for.
    pub fn decode_as<U: DeserializeOwned>(&self) -> Result<U, serde_json::Error> {
        serde_json::from_slice(&self.bytes)
    }
}

impl<T> Clone for JsonBlob<T> {
    fn clone(&self) -> Self {
        Self::from_bytes(self.bytes.clone())
    }
}

impl<T> PartialEq for JsonBlob<T> {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl<T> Eq for JsonBlob<T> {}

impl<T> fmt::Debug for JsonBlob<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonBlob").field("len", &self.bytes.len()).finish()
    }
}

impl<T> Serialize for JsonBlob<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.bytes)
    }
}

/// A `u64` stored as 8 big-endian bytes.
///
/// Used for the schema version and as the value of every secondary index row, where it holds
/// the block number the index entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct U64Value(pub u64);

impl From<u64> for U64Value {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<U64Value> for u64 {
    fn from(value: U64Value) -> Self {
        value.0
    }
}

impl<T> Compress for JsonBlob<T> {
    type Compressed = Vec<u8>;

    fn compress_to_buf<B: BufMut + AsMut<[u8]>>(&self, buf: &mut B) {
        buf.put_slice(&self.bytes);
    }
}

impl<T> Decompress for JsonBlob<T> {
    fn decompress(value: &[u8]) -> Result<Self, DatabaseError> {
        Ok(Self::from_bytes(value.to_vec()))
    }
}

impl Compress for U64Value {
    type Compressed = Vec<u8>;

    fn compress_to_buf<B: BufMut + AsMut<[u8]>>(&self, buf: &mut B) {
        buf.put_slice(&self.0.to_be_bytes());
    }
}

impl Decompress for U64Value {
    fn decompress(value: &[u8]) -> Result<Self, DatabaseError> {
        let bytes: [u8; 8] = value.try_into().map_err(|_| DatabaseError::Decode)?;
        Ok(Self(u64::from_be_bytes(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reth_db_api::table::{Compress, Decompress};
    use serde_json::json;

    #[test]
    fn test_json_blob_bytes_survive_compression() {
        let blob = JsonBlob::<serde_json::Value>::encode(&json!({"number": 7})).unwrap();
        let compressed = blob.clone().compress();
        let restored = JsonBlob::<serde_json::Value>::decompress(compressed.as_ref()).unwrap();
        assert_eq!(restored, blob);
        assert_eq!(restored.decode().unwrap(), json!({"number": 7}));
    }

    #[test]
    fn test_u64_value_rejects_wrong_length() {
        assert!(U64Value::decompress(&[1, 2, 3]).is_err());
        let compressed = U64Value(0x0102).compress();
        assert_eq!(compressed.as_ref(), &[0, 0, 0, 0, 0, 0, 1, 2]);
    }
}
