//! Provider for the ledger of blocks that failed to fetch.

use crate::{
    error::StorageError,
    models::{
        ErrorBlock, ErrorBlockTimestamps, ErrorBlockTypes, ErrorBlocks, ErrorTypeKey, JsonBlob,
        MAX_ERROR_TYPE_LEN,
    },
};
use reth_db_api::{
    cursor::DbCursorRO,
    transaction::{DbTx, DbTxMut},
};
use tracing::{error, trace};

/// Provides access to the error ledger within a transaction.
#[derive(Debug)]
pub(crate) struct ErrorBlockProvider<'tx, TX> {
    tx: &'tx TX,
}

impl<'tx, TX> ErrorBlockProvider<'tx, TX> {
    /// Creates a new [`ErrorBlockProvider`] instance.
    pub(crate) const fn new(tx: &'tx TX) -> Self {
        Self { tx }
    }
}

impl<TX> ErrorBlockProvider<'_, TX>
where
    TX: DbTx,
{
    /// Gets the failure recorded for `block_number`.
    pub(crate) fn get_error_block(
        &self,
        block_number: u64,
    ) -> Result<Option<ErrorBlock>, StorageError> {
        let stored = self.tx.get::<ErrorBlocks>(block_number).inspect_err(|err| {
            error!(
                target: "block_cache",
                block_number,
                ?err,
                "Failed to read error block"
            );
        })?;

        Ok(stored.map(|blob| blob.decode()).transpose()?)
    }

    /// Gets every recorded failure in ascending block-number order.
    pub(crate) fn all_error_blocks(&self) -> Result<Vec<ErrorBlock>, StorageError> {
        let mut cursor = self.tx.cursor_read::<ErrorBlocks>()?;
        let walker = cursor.walk(None)?;

        walker
            .map(|row| -> Result<ErrorBlock, StorageError> {
                let (_, blob) = row?;
                Ok(blob.decode()?)
            })
            .collect()
    }

    /// Gets the failures recorded for block numbers in `start..=end`.
    pub(crate) fn error_blocks_in_range(
        &self,
        start: u64,
        end: u64,
    ) -> Result<Vec<ErrorBlock>, StorageError> {
        let mut cursor = self.tx.cursor_read::<ErrorBlocks>()?;
        let walker = cursor.walk_range(start..=end)?;

        walker
            .map(|row| -> Result<ErrorBlock, StorageError> {
                let (_, blob) = row?;
                Ok(blob.decode()?)
            })
            .collect()
    }

    /// Gets every failure classified as `error_type`, in ascending block-number order.
    pub(crate) fn error_blocks_by_type(
        &self,
        error_type: &str,
    ) -> Result<Vec<ErrorBlock>, StorageError> {
        let error_type: String = error_type.chars().take(MAX_ERROR_TYPE_LEN).collect();
        let numbers = {
            let mut cursor = self.tx.cursor_read::<ErrorBlockTypes>()?;
            let walker = cursor.walk_range(
                ErrorTypeKey::new(error_type.clone(), 0)..=ErrorTypeKey::new(error_type, u64::MAX),
            )?;
            walker.map(|row| row.map(|(_, number)| u64::from(number))).collect::<Result<Vec<_>, _>>()?
        };

        let mut records = Vec::with_capacity(numbers.len());
        for number in numbers {
            if let Some(record) = self.get_error_block(number)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Counts the recorded failures.
    pub(crate) fn error_count(&self) -> Result<usize, StorageError> {
        Ok(self.tx.entries::<ErrorBlocks>()?)
    }
}

impl<TX> ErrorBlockProvider<'_, TX>
where
    TX: DbTxMut + DbTx,
{
    /// Stores `record`, replacing any failure recorded for the same block.
    pub(crate) fn put_error_block(&self, record: &ErrorBlock) -> Result<(), StorageError> {
        if let Some(previous) = self.get_error_block(record.block_number)? {
            self.delete_index_entries(&previous)?;
        }

        let blob = JsonBlob::encode(record)?;
        self.tx.put::<ErrorBlocks>(record.block_number, blob).inspect_err(|err| {
            error!(
                target: "block_cache",
                block_number = record.block_number,
                ?err,
                "Failed to write error block"
            );
        })?;
        self.tx.put::<ErrorBlockTimestamps>(record.timestamp_key(), record.block_number.into())?;
        self.tx.put::<ErrorBlockTypes>(record.type_key(), record.block_number.into())?;
        Ok(())
    }

    /// Removes the failure recorded for `block_number`, if any.
    ///
    /// Returns whether a record was removed.
    pub(crate) fn remove_error_block(&self, block_number: u64) -> Result<bool, StorageError> {
        let Some(previous) = self.get_error_block(block_number)? else {
            return Ok(false);
        };

        self.delete_index_entries(&previous)?;
        self.tx.delete::<ErrorBlocks>(block_number, None)?;
        trace!(target: "block_cache", block_number, "Removed error block");
        Ok(true)
    }

    /// Bumps the retry counter of the failure recorded for `block_number`.
    ///
    /// Returns the new count, or `None` when nothing is recorded for the block.
    pub(crate) fn increment_retry(&self, block_number: u64) -> Result<Option<u32>, StorageError> {
        let Some(mut record) = self.get_error_block(block_number)? else {
            return Ok(None);
        };

        record.retry_count = record.retry_count.saturating_add(1);
        self.tx.put::<ErrorBlocks>(block_number, JsonBlob::encode(&record)?)?;
        Ok(Some(record.retry_count))
    }

    /// Removes every recorded failure and its index entries.
    pub(crate) fn clear(&self) -> Result<(), StorageError> {
        self.tx.clear::<ErrorBlocks>()?;
        self.tx.clear::<ErrorBlockTimestamps>()?;
        self.tx.clear::<ErrorBlockTypes>()?;
        Ok(())
    }

    fn delete_index_entries(&self, record: &ErrorBlock) -> Result<(), StorageError> {
        self.tx.delete::<ErrorBlockTimestamps>(record.timestamp_key(), None)?;
        self.tx.delete::<ErrorBlockTypes>(record.type_key(), None)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::TimestampKey,
        providers::{read, write},
        schema,
    };
    use reth_db::DatabaseEnv;
    use tempfile::TempDir;

    fn setup_db() -> (TempDir, DatabaseEnv) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let env = schema::open(temp_dir.path()).expect("Failed to open database");
        (temp_dir, env)
    }

    fn record(env: &DatabaseEnv, record: ErrorBlock) {
        write(env, |tx| ErrorBlockProvider::new(tx).put_error_block(&record))
            .expect("Failed to record error block");
    }

    fn timestamp_index(env: &DatabaseEnv) -> Vec<TimestampKey> {
        read(env, |tx| {
            let mut cursor = tx.cursor_read::<ErrorBlockTimestamps>()?;
            let walker = cursor.walk(None)?;
            walker.map(|row| row.map(|(key, _)| key).map_err(Into::into)).collect()
        })
        .unwrap()
    }

    #[test]
    fn test_put_overwrites_and_reindexes() {
        let (_tmp, env) = setup_db();
        record(&env, ErrorBlock::new(5, "timeout", "first", 1_000));
        record(&env, ErrorBlock::new(5, "rate_limited", "second", 2_000));

        let stored = read(&env, |tx| ErrorBlockProvider::new(tx).get_error_block(5)).unwrap();
        assert_eq!(stored, Some(ErrorBlock::new(5, "rate_limited", "second", 2_000)));
        assert_eq!(timestamp_index(&env), vec![TimestampKey::new(2_000, 5)]);

        let by_old_type =
            read(&env, |tx| ErrorBlockProvider::new(tx).error_blocks_by_type("timeout")).unwrap();
        assert!(by_old_type.is_empty());
    }

    #[test]
    fn test_lookup_by_type() {
        let (_tmp, env) = setup_db();
        record(&env, ErrorBlock::new(3, "timeout", "a", 1));
        record(&env, ErrorBlock::new(1, "timeout", "b", 2));
        record(&env, ErrorBlock::new(2, "timeout-ish", "c", 3));

        let timeouts =
            read(&env, |tx| ErrorBlockProvider::new(tx).error_blocks_by_type("timeout")).unwrap();
        assert_eq!(timeouts.iter().map(|r| r.block_number).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_ranges_and_count() {
        let (_tmp, env) = setup_db();
        for number in [4, 8, 15, 16, 23, 42] {
            record(&env, ErrorBlock::new(number, "timeout", "boom", number));
        }

        let in_range =
            read(&env, |tx| ErrorBlockProvider::new(tx).error_blocks_in_range(8, 23)).unwrap();
        assert_eq!(in_range.len(), 4);

        let low =
            read(&env, |tx| ErrorBlockProvider::new(tx).error_blocks_in_range(0, 10)).unwrap();
        assert_eq!(low.iter().map(|r| r.block_number).collect::<Vec<_>>(), vec![4, 8]);

        let count = read(&env, |tx| ErrorBlockProvider::new(tx).error_count()).unwrap();
        assert_eq!(count, 6);
    }

    #[test]
    fn test_remove_only_when_present() {
        let (_tmp, env) = setup_db();
        record(&env, ErrorBlock::new(7, "timeout", "boom", 10));

        let removed = write(&env, |tx| ErrorBlockProvider::new(tx).remove_error_block(7)).unwrap();
        let removed_again =
            write(&env, |tx| ErrorBlockProvider::new(tx).remove_error_block(7)).unwrap();
        assert!(removed);
        assert!(!removed_again);
        assert!(timestamp_index(&env).is_empty());
    }

    #[test]
    fn test_increment_retry() {
        let (_tmp, env) = setup_db();
        assert_eq!(write(&env, |tx| ErrorBlockProvider::new(tx).increment_retry(1)).unwrap(), None);

        record(&env, ErrorBlock::new(1, "timeout", "boom", 10));
        assert_eq!(write(&env, |tx| ErrorBlockProvider::new(tx).increment_retry(1)).unwrap(), Some(1));
        assert_eq!(write(&env, |tx| ErrorBlockProvider::new(tx).increment_retry(1)).unwrap(), Some(2));

        record(&env, ErrorBlock::new(1, "timeout", "again", 20));
        let stored = read(&env, |tx| ErrorBlockProvider::new(tx).get_error_block(1)).unwrap();
        assert_eq!(stored.map(|r| r.retry_count), Some(0));
    }

    #[test]
    fn test_clear() {
        let (_tmp, env) = setup_db();
        record(&env, ErrorBlock::new(1, "timeout", "boom", 10));
        write(&env, |tx| ErrorBlockProvider::new(tx).clear()).unwrap();

        let all = read(&env, |tx| ErrorBlockProvider::new(tx).all_error_blocks()).unwrap();
        assert!(all.is_empty());
        assert!(timestamp_index(&env).is_empty());
    }
}
