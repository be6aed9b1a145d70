//! Provider for cached block operations.

use crate::{
    error::StorageError,
    models::{BlockTimestamp, BlockTimestamps, Blocks, CachedBlock, JsonBlob, TimestampKey},
};
use reth_db_api::{
    cursor::DbCursorRO,
    transaction::{DbTx, DbTxMut},
};
use tracing::{debug, error};

/// Provides access to the block store within a transaction.
#[derive(Debug)]
pub(crate) struct BlockProvider<'tx, TX> {
    tx: &'tx TX,
}

impl<'tx, TX> BlockProvider<'tx, TX> {
    /// Creates a new [`BlockProvider`] instance.
    pub(crate) const fn new(tx: &'tx TX) -> Self {
        Self { tx }
    }
}

impl<TX> BlockProvider<'_, TX>
where
    TX: DbTx,
{
    /// Gets the block stored under `block_number`.
    pub(crate) fn get_block(&self, block_number: u64) -> Result<Option<CachedBlock>, StorageError> {
        let stored = self.tx.get::<Blocks>(block_number).inspect_err(|err| {
            error!(
                target: "block_cache",
                block_number,
                ?err,
                "Failed to read block"
            );
        })?;

        Ok(stored.map(|blob| blob.decode()).transpose()?)
    }

    /// Gets the timestamp of the block stored under `block_number` without parsing the rest of
    /// the record.
    pub(crate) fn block_timestamp(&self, block_number: u64) -> Result<Option<u64>, StorageError> {
        let Some(blob) = self.tx.get::<Blocks>(block_number)? else {
            return Ok(None);
        };
        let projection: BlockTimestamp = blob.decode_as()?;
        Ok(Some(projection.timestamp))
    }

    /// Gets every block with a number in `start..=end`, in ascending order.
    pub(crate) fn blocks_in_range(
        &self,
        start: u64,
        end: u64,
    ) -> Result<Vec<CachedBlock>, StorageError> {
        let mut cursor = self.tx.cursor_read::<Blocks>()?;
        let walker = cursor.walk_range(start..=end)?;

        walker
            .map(|row| -> Result<CachedBlock, StorageError> {
                let (_, blob) = row?;
                Ok(blob.decode()?)
            })
            .collect()
    }

    /// Gets the numbers of the blocks cached in `start..=end`, in ascending order.
    ///
    /// Rows are only copied, never parsed.
    pub(crate) fn block_numbers_in_range(
        &self,
        start: u64,
        end: u64,
    ) -> Result<Vec<u64>, StorageError> {
        let mut cursor = self.tx.cursor_read::<Blocks>()?;
        let walker = cursor.walk_range(start..=end)?;

        walker.map(|row| row.map(|(number, _)| number).map_err(Into::into)).collect()
    }

    /// Gets every cached block in ascending block-number order.
    pub(crate) fn all_blocks(&self) -> Result<Vec<CachedBlock>, StorageError> {
        let mut cursor = self.tx.cursor_read::<Blocks>()?;
        let walker = cursor.walk(None)?;

        walker
            .map(|row| -> Result<CachedBlock, StorageError> {
                let (_, blob) = row?;
                Ok(blob.decode()?)
            })
            .collect()
    }

    /// Gets the lowest cached block number.
    pub(crate) fn lowest_block_number(&self) -> Result<Option<u64>, StorageError> {
        let mut cursor = self.tx.cursor_read::<Blocks>()?;
        Ok(cursor.first()?.map(|(number, _)| number))
    }

    /// Gets the highest cached block number.
    pub(crate) fn highest_block_number(&self) -> Result<Option<u64>, StorageError> {
        let mut cursor = self.tx.cursor_read::<Blocks>()?;
        Ok(cursor.last()?.map(|(number, _)| number))
    }

    /// Counts the cached blocks.
    pub(crate) fn block_count(&self) -> Result<usize, StorageError> {
        Ok(self.tx.entries::<Blocks>()?)
    }
}

impl<TX> BlockProvider<'_, TX>
where
    TX: DbTxMut + DbTx,
{
    /// Stores `block`, replacing any block with the same number.
    ///
    /// The timestamp index entry of a replaced block is removed before the new one is written.
    pub(crate) fn put_block(&self, block: &CachedBlock) -> Result<(), StorageError> {
        if let Some(previous) = self.block_timestamp(block.number)? {
            self.tx.delete::<BlockTimestamps>(TimestampKey::new(previous, block.number), None)?;
        }

        let blob = JsonBlob::encode(block)?;
        self.tx.put::<Blocks>(block.number, blob).inspect_err(|err| {
            error!(
                target: "block_cache",
                block_number = block.number,
                ?err,
                "Failed to write block"
            );
        })?;
        self.tx.put::<BlockTimestamps>(
            TimestampKey::new(block.timestamp, block.number),
            block.number.into(),
        )?;
        Ok(())
    }

    /// Deletes every block whose timestamp is at or below `timestamp`.
    ///
    /// Walks the timestamp index up to the threshold so untouched blocks are never read.
    /// Returns the number of blocks removed.
    pub(crate) fn delete_blocks_up_to(&self, timestamp: u64) -> Result<usize, StorageError> {
        let expired = {
            let mut cursor = self.tx.cursor_read::<BlockTimestamps>()?;
            let walker = cursor.walk_range(..=TimestampKey::upper_bound(timestamp))?;
            walker.map(|row| row.map(|(key, _)| key)).collect::<Result<Vec<_>, _>>()?
        };

        for key in &expired {
            self.tx.delete::<Blocks>(key.block_number, None)?;
            self.tx.delete::<BlockTimestamps>(*key, None)?;
        }

        debug!(
            target: "block_cache",
            timestamp,
            removed = expired.len(),
            "Pruned blocks by age"
        );
        Ok(expired.len())
    }

    /// Removes every block and its index entries.
    pub(crate) fn clear(&self) -> Result<(), StorageError> {
        self.tx.clear::<Blocks>()?;
        self.tx.clear::<BlockTimestamps>()?;
        Ok(())
    }
}
