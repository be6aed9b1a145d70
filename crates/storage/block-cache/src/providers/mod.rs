//! Providers for the block cache tables.
//!
//! Each provider wraps a borrowed transaction and owns the rules for one group of tables:
//! - Cached blocks and their timestamp index (via [BlockProvider](block_provider::BlockProvider))
//! - The fetch-failure ledger and its indexes (via
//!   [ErrorBlockProvider](error_block_provider::ErrorBlockProvider))
//!
//! Writes that touch a primary table and its indexes always go through one read-write
//! transaction, opened by [`write`].
mod block_provider;
pub(crate) use block_provider::BlockProvider;

mod error_block_provider;
pub(crate) use error_block_provider::ErrorBlockProvider;

use crate::{
    error::StorageError,
    models::{Blocks, ErrorBlocks},
};
use reth_db_api::{Database, cursor::DbCursorRO, transaction::DbTx};

/// Runs `f` inside a read-only transaction.
pub(crate) fn read<DB, T, F>(db: &DB, f: F) -> Result<T, StorageError>
where
    DB: Database,
    F: FnOnce(&DB::TX) -> Result<T, StorageError>,
{
    let tx = db.tx()?;
    let result = f(&tx);
    tx.commit()?;
    result
}

/// Runs `f` inside a read-write transaction.
///
/// The transaction commits only when `f` succeeds; otherwise it is aborted and nothing `f` wrote
/// becomes visible.
pub(crate) fn write<DB, T, F>(db: &DB, f: F) -> Result<T, StorageError>
where
    DB: Database,
    F: FnOnce(&DB::TXMut) -> Result<T, StorageError>,
{
    let tx = db.tx_mut()?;
    match f(&tx) {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(err) => {
            tx.abort();
            Err(err)
        }
    }
}

/// Lists up to `limit` numbers in `start..=end` that have neither a cached block nor a recorded
/// failure, in ascending order.
///
/// Both tables are walked in step, so the walk stops as soon as `limit` gaps are found.
pub(crate) fn missing_block_numbers<TX: DbTx>(
    tx: &TX,
    start: u64,
    end: u64,
    limit: usize,
) -> Result<Vec<u64>, StorageError> {
    let mut missing = Vec::new();
    if start > end || limit == 0 {
        return Ok(missing);
    }

    let mut block_cursor = tx.cursor_read::<Blocks>()?;
    let mut cached = block_cursor.walk_range(start..=end)?.map(|row| row.map(|(number, _)| number));
    let mut error_cursor = tx.cursor_read::<ErrorBlocks>()?;
    let mut failed = error_cursor.walk_range(start..=end)?.map(|row| row.map(|(number, _)| number));

    let mut next_cached = cached.next().transpose()?;
    let mut next_failed = failed.next().transpose()?;
    let mut candidate = start;
    loop {
        let known = match (next_cached, next_failed) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        if known == Some(candidate) {
            if next_cached == Some(candidate) {
                next_cached = cached.next().transpose()?;
            }
            if next_failed == Some(candidate) {
                next_failed = failed.next().transpose()?;
            }
        } else {
            missing.push(candidate);
            if missing.len() == limit {
                break;
            }
        }

        if candidate == end {
            break;
        }
        candidate += 1;
    }
    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{CachedBlock, ErrorBlock},
        schema,
    };
    use reth_db::DatabaseEnv;
    use tempfile::TempDir;

    fn setup_db(cached: &[u64], failed: &[u64]) -> (TempDir, DatabaseEnv) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let env = schema::open(temp_dir.path()).expect("Failed to open database");
        write(&env, |tx| {
            for number in cached {
                BlockProvider::new(tx).put_block(&CachedBlock::new(*number, "0x", *number))?;
            }
            for number in failed {
                ErrorBlockProvider::new(tx)
                    .put_error_block(&ErrorBlock::new(*number, "timeout", "boom", 1))?;
            }
            Ok(())
        })
        .expect("Failed to seed database");
        (temp_dir, env)
    }

    fn missing(env: &DatabaseEnv, start: u64, end: u64, limit: usize) -> Vec<u64> {
        read(env, |tx| missing_block_numbers(tx, start, end, limit)).unwrap()
    }

    #[test]
    fn test_missing_numbers_skip_both_tables() {
        let (_tmp, env) = setup_db(&[2, 3, 6, 20], &[3, 4, 21]);
        assert_eq!(missing(&env, 1, 8, 10), vec![1, 5, 7, 8]);
        assert_eq!(missing(&env, 2, 4, 10), Vec::<u64>::new());
        assert_eq!(missing(&env, 19, 22, 10), vec![19, 22]);
    }

    #[test]
    fn test_missing_numbers_stop_at_limit() {
        let (_tmp, env) = setup_db(&[1], &[]);
        assert_eq!(missing(&env, 0, u64::MAX, 3), vec![0, 2, 3]);
        assert!(missing(&env, 0, 10, 0).is_empty());
        assert!(missing(&env, 10, 0, 5).is_empty());
    }

    #[test]
    fn test_missing_numbers_at_upper_edge() {
        let (_tmp, env) = setup_db(&[u64::MAX - 1], &[]);
        assert_eq!(missing(&env, u64::MAX - 2, u64::MAX, 10), vec![u64::MAX - 2, u64::MAX]);
    }
}
