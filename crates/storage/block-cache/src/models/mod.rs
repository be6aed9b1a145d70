//! Database table schemas used by the block cache.
//!
//! This module defines the value types, keys, and table layouts for all data persisted by the
//! cache. Tables are registered using [`reth_db_api::table::TableInfo`] and grouped into
//! [`reth_db_api::TableSet`]s, one per schema migration, so that each migration creates exactly
//! the tables it introduces.

mod codec;
pub use codec::{JsonBlob, U64Value};
mod keys;
pub use keys::{ErrorTypeKey, MetadataKey, TimestampKey};
mod block;
pub(crate) use block::BlockTimestamp;
pub use block::{BlockTimestamps, BlockTransaction, Blocks, CachedBlock, TransactionRecord};
mod error_block;
pub use error_block::{
    ErrorBlock, ErrorBlockTimestamps, ErrorBlockTypes, ErrorBlocks, MAX_ERROR_TYPE_LEN,
};
mod metadata;
pub use metadata::Metadata;

/// Implements [`reth_db_api::table::TableInfo`] for one or more table types that implement
/// [`reth_db_api::table::Table`].
///
/// This allows the table to be registered and introspected by the Reth database schema system.
///
/// # Example
/// ```ignore
/// impl_table_info!(Blocks, ErrorBlocks);
/// ```
macro_rules! impl_table_info {
    ($($table:ty),+ $(,)?) => {
        $(
            impl reth_db_api::table::TableInfo for $table
            where
                $table: reth_db_api::table::Table,
            {
                fn name(&self) -> &'static str {
                    <$table as reth_db_api::table::Table>::NAME
                }

                fn is_dupsort(&self) -> bool {
                    <$table as reth_db_api::table::Table>::DUPSORT
                }
            }
        )+
    };
}

/// Declares a struct representing a collection of tables and implements [`reth_db_api::TableSet`]
/// for it.
///
/// The resulting struct can be passed to `DatabaseEnv::create_tables_for` to create only the
/// specified tables.
///
/// # Example
/// ```ignore
/// impl_table_set!(BlockStoreTables, Blocks, BlockTimestamps);
/// ```
macro_rules! impl_table_set {
    (
        $(#[$outer:meta])*
        $set_name:ident, $($table:ty),+ $(,)?
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, Copy)]
        pub(crate) struct $set_name;

        impl reth_db_api::TableSet for $set_name {
            fn tables() -> Box<dyn Iterator<Item = Box<dyn reth_db_api::table::TableInfo>>> {
                Box::new(vec![
                    $(
                        Box::new(<$table>::default()) as Box<dyn reth_db_api::table::TableInfo>
                    ),*
                ].into_iter())
            }
        }
    };
}

// Enable reflection for each table (name + dupsort metadata)
impl_table_info!(Metadata, Blocks, BlockTimestamps, ErrorBlocks, ErrorBlockTimestamps, ErrorBlockTypes);

impl_table_set!(
    /// Bookkeeping tables, present in every schema version.
    MetadataTables,
    Metadata
);

impl_table_set!(
    /// Tables introduced by schema version 1.
    BlockStoreTables,
    Blocks,
    BlockTimestamps
);

impl_table_set!(
    /// Tables introduced by schema version 2.
    ErrorLedgerTables,
    ErrorBlocks,
    ErrorBlockTimestamps,
    ErrorBlockTypes
);
