//! Opening the cache database and migrating its schema.
//!
//! Schema history:
//! - **v1**: [`Blocks`] and its [`BlockTimestamps`] index.
//! - **v2**: the fetch-failure ledger, [`ErrorBlocks`] with [`ErrorBlockTimestamps`] and
//!   [`ErrorBlockTypes`] indexes.
//!
//! Migrations only ever add tables. Each step checks which of its tables already exist and
//! creates the rest, so re-running a step against a database that already has it is a no-op.

use crate::{
    error::StorageError,
    models::{
        BlockStoreTables, BlockTimestamps, Blocks, ErrorBlockTimestamps, ErrorBlockTypes,
        ErrorBlocks, ErrorLedgerTables, Metadata, MetadataKey, MetadataTables,
    },
};
use reth_db::{
    DatabaseEnv,
    mdbx::{DatabaseArguments, create_db},
};
use reth_db_api::{
    Database, TableSet,
    table::Table,
    transaction::{DbTx, DbTxMut},
};
use std::path::Path;
use tracing::{debug, info};

/// Schema version written by this build.
pub const SCHEMA_VERSION: u64 = 2;

/// One additive schema step.
#[derive(Debug)]
struct Migration {
    version: u64,
    description: &'static str,
    apply: fn(&mut DatabaseEnv) -> Result<(), StorageError>,
}

/// Every migration, in the order it must be applied.
const MIGRATIONS: [Migration; 2] = [
    Migration {
        version: 1,
        description: "block store with timestamp index",
        apply: create_block_store,
    },
    Migration {
        version: 2,
        description: "error ledger with timestamp and error-type indexes",
        apply: create_error_ledger,
    },
];

/// Creates or opens the database at `path` and migrates it to [`SCHEMA_VERSION`].
pub(crate) fn open(path: &Path) -> Result<DatabaseEnv, StorageError> {
    let mut env = create_db(path, DatabaseArguments::default())
        .map_err(|err| StorageError::Open(err.to_string()))?;
    create_tables::<MetadataTables>(&mut env).map_err(|err| StorageError::Open(err.to_string()))?;
    migrate(&mut env, SCHEMA_VERSION)?;
    Ok(env)
}

/// Applies every pending migration up to and including `target`.
///
/// Returns the schema version recorded afterwards.
pub(crate) fn migrate(env: &mut DatabaseEnv, target: u64) -> Result<u64, StorageError> {
    let current = schema_version(env)?;
    if current > SCHEMA_VERSION {
        return Err(StorageError::UnsupportedSchema { found: current, supported: SCHEMA_VERSION });
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > current && m.version <= target) {
        (migration.apply)(env).map_err(|err| StorageError::Migration {
            version: migration.version,
            reason: err.to_string(),
        })?;
        write_schema_version(env, migration.version)?;
        info!(
            target: "block_cache",
            version = migration.version,
            description = migration.description,
            "Applied schema migration"
        );
    }

    schema_version(env)
}

/// Reads the recorded schema version; a database without one is at version 0.
pub(crate) fn schema_version(env: &DatabaseEnv) -> Result<u64, StorageError> {
    let version = env.view(|tx| tx.get::<Metadata>(MetadataKey::SchemaVersion))??;
    Ok(version.map(u64::from).unwrap_or_default())
}

fn write_schema_version(env: &DatabaseEnv, version: u64) -> Result<(), StorageError> {
    let tx = env.tx_mut()?;
    tx.put::<Metadata>(MetadataKey::SchemaVersion, version.into())?;
    tx.commit()?;
    Ok(())
}

fn create_block_store(env: &mut DatabaseEnv) -> Result<(), StorageError> {
    if table_exists::<Blocks>(env) && table_exists::<BlockTimestamps>(env) {
        debug!(target: "block_cache", "Block store already present");
        return Ok(());
    }
    create_tables::<BlockStoreTables>(env)
}

fn create_error_ledger(env: &mut DatabaseEnv) -> Result<(), StorageError> {
    if table_exists::<ErrorBlocks>(env) &&
        table_exists::<ErrorBlockTimestamps>(env) &&
        table_exists::<ErrorBlockTypes>(env)
    {
        debug!(target: "block_cache", "Error ledger already present");
        return Ok(());
    }
    create_tables::<ErrorLedgerTables>(env)
}

/// Creates the tables of `TS` that do not exist yet.
fn create_tables<TS: TableSet>(env: &mut DatabaseEnv) -> Result<(), StorageError> {
    env.create_tables_for::<TS>().map_err(|err| StorageError::Open(err.to_string()))
}

/// Probes for `T` by opening it inside a read transaction.
pub(crate) fn table_exists<T: Table>(env: &DatabaseEnv) -> bool {
    env.tx().and_then(|tx| tx.entries::<T>()).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::CachedBlock,
        providers::{BlockProvider, read, write},
    };
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_current_schema() {
        let tmp_dir = TempDir::new().expect("create temp dir");
        let env = open(tmp_dir.path()).expect("open database");

        assert_eq!(schema_version(&env).unwrap(), SCHEMA_VERSION);
        assert!(table_exists::<Blocks>(&env));
        assert!(table_exists::<BlockTimestamps>(&env));
        assert!(table_exists::<ErrorBlocks>(&env));
        assert!(table_exists::<ErrorBlockTimestamps>(&env));
        assert!(table_exists::<ErrorBlockTypes>(&env));
    }

    #[test]
    fn test_upgrade_from_v1_keeps_blocks() {
        let tmp_dir = TempDir::new().expect("create temp dir");
        {
            let mut env = create_db(tmp_dir.path(), DatabaseArguments::default()).unwrap();
            create_tables::<MetadataTables>(&mut env).unwrap();
            assert_eq!(migrate(&mut env, 1).unwrap(), 1);
            assert!(!table_exists::<ErrorBlocks>(&env));

            write(&env, |tx| BlockProvider::new(tx).put_block(&CachedBlock::new(7, "0x07", 70)))
                .expect("write block at v1");
        }

        let env = open(tmp_dir.path()).expect("reopen database");
        assert_eq!(schema_version(&env).unwrap(), 2);
        assert!(table_exists::<ErrorBlocks>(&env));

        let block = read(&env, |tx| BlockProvider::new(tx).get_block(7)).unwrap();
        assert_eq!(block, Some(CachedBlock::new(7, "0x07", 70)));
    }

    #[test]
    fn test_reopen_is_idempotent() {
        let tmp_dir = TempDir::new().expect("create temp dir");
        drop(open(tmp_dir.path()).expect("first open"));
        let env = open(tmp_dir.path()).expect("second open");
        assert_eq!(schema_version(&env).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let tmp_dir = TempDir::new().expect("create temp dir");
        {
            let env = open(tmp_dir.path()).expect("open database");
            write_schema_version(&env, SCHEMA_VERSION + 1).unwrap();
        }
        assert!(matches!(
            open(tmp_dir.path()),
            Err(StorageError::UnsupportedSchema { found: 3, supported: 2 })
        ));
    }
}
