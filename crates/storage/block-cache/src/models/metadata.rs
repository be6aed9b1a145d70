//! Database bookkeeping table.

use super::{MetadataKey, U64Value};
use reth_db_api::table::Table;
use serde::{Deserialize, Serialize};

/// A table for database-level bookkeeping such as the applied schema version.
///
/// - **Key**: [`MetadataKey`]
/// - **Value**: `u64`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Metadata;

impl Table for Metadata {
    const NAME: &'static str = "metadata";
    const DUPSORT: bool = false;

    type Key = MetadataKey;
    type Value = U64Value;
}
