//! The asynchronous block cache facade.

use crate::{
    config::CacheConfig,
    error::{StorageError, TransferError},
    metrics::Metrics,
    models::{CachedBlock, ErrorBlock},
    number::IntoBlockNumber,
    providers::{self, BlockProvider, ErrorBlockProvider},
    schema,
    stats::{CacheStats, chain_time, format_bytes},
    transfer::{CacheExport, ExportFormat, ImportDocument, ImportSummary},
};
use chrono::{DateTime, Utc};
use reth_db::DatabaseEnv;
use reth_db_api::Database;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

type RoTx = <DatabaseEnv as Database>::TX;
type RwTx = <DatabaseEnv as Database>::TXMut;

/// Persistent cache of fetched blocks, with a ledger of blocks that failed to fetch.
///
/// The database is opened on first use; concurrent first calls share a single open. Every
/// transaction runs on the blocking thread pool.
///
/// Regular operations never fail: a storage failure is logged and the operation answers with
/// its empty value (`None`, an empty list, `0`). Only [`BlockCache::open`],
/// [`BlockCache::export_cache`] and [`BlockCache::import_cache`] report errors, since they are
/// driven directly by a user.
///
/// A block number is never present in both stores: caching a block drops any failure recorded
/// for it.
#[derive(Debug)]
pub struct BlockCache {
    config: CacheConfig,
    env: OnceCell<Arc<DatabaseEnv>>,
}

impl BlockCache {
    /// Creates a cache for `config`. No I/O happens until the first operation.
    pub fn new(config: CacheConfig) -> Self {
        Metrics::init();
        Self { config, env: OnceCell::new() }
    }

    /// Returns the configuration of this cache.
    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Opens the database now instead of on first use, reporting why it cannot be opened.
    pub async fn open(&self) -> Result<(), StorageError> {
        self.env().await.map(|_| ())
    }

    /// Returns the schema version of the opened database.
    pub async fn schema_version(&self) -> Result<u64, StorageError> {
        let env = self.env().await?;
        tokio::task::spawn_blocking(move || schema::schema_version(&env)).await?
    }

    /// Stores `block`, replacing any block with the same number.
    ///
    /// Payloads without a valid block number are skipped.
    pub async fn cache_block<B: Serialize + ?Sized>(&self, block: &B) {
        let block = match CachedBlock::from_payload(block) {
            Ok(block) => block,
            Err(err) => {
                warn!(target: "block_cache", %err, "Skipping block that cannot be cached");
                return;
            }
        };

        let block_number = block.number;
        match self.write(move |tx| BlockProvider::new(tx).put_block(&block)).await {
            Ok(()) => {
                Metrics::record_blocks_written(1);
                self.discard_error_block(block_number).await;
            }
            Err(err) => report_failure("cache_block", &err),
        }
    }

    /// Stores every valid block of `blocks` in a single transaction.
    ///
    /// Returns how many blocks were written; `0` when the transaction failed.
    pub async fn cache_blocks<B: Serialize>(&self, blocks: &[B]) -> usize {
        let valid: Vec<CachedBlock> =
            blocks.iter().filter_map(|block| CachedBlock::from_payload(block).ok()).collect();
        if valid.len() != blocks.len() {
            warn!(
                target: "block_cache",
                received = blocks.len(),
                valid = valid.len(),
                "Skipping blocks that cannot be cached"
            );
        }

        or_default("cache_blocks", self.write_blocks(valid).await)
    }

    /// Gets the block cached under `number`.
    pub async fn get_block(&self, number: impl IntoBlockNumber) -> Option<CachedBlock> {
        let block_number = valid_number("get_block", number)?;
        let block = or_default(
            "get_block",
            self.read(move |tx| BlockProvider::new(tx).get_block(block_number)).await,
        );
        Metrics::record_lookup(block.is_some());
        block
    }

    /// Gets the cached blocks numbered `start..=end`, in ascending order.
    pub async fn get_blocks_in_range(
        &self,
        start: impl IntoBlockNumber,
        end: impl IntoBlockNumber,
    ) -> Vec<CachedBlock> {
        let Some((start, end)) = valid_range("get_blocks_in_range", start, end) else {
            return Vec::new();
        };
        or_default(
            "get_blocks_in_range",
            self.read(move |tx| BlockProvider::new(tx).blocks_in_range(start, end)).await,
        )
    }

    /// Gets the numbers of the blocks cached in `start..=end`, in ascending order.
    ///
    /// Cheaper than [`BlockCache::get_blocks_in_range`]: no block is parsed.
    pub async fn get_cached_block_numbers(
        &self,
        start: impl IntoBlockNumber,
        end: impl IntoBlockNumber,
    ) -> Vec<u64> {
        let Some((start, end)) = valid_range("get_cached_block_numbers", start, end) else {
            return Vec::new();
        };
        or_default(
            "get_cached_block_numbers",
            self.read(move |tx| BlockProvider::new(tx).block_numbers_in_range(start, end)).await,
        )
    }

    /// Gets the highest cached block number.
    pub async fn get_highest_block_number(&self) -> Option<u64> {
        or_default(
            "get_highest_block_number",
            self.read(|tx| BlockProvider::new(tx).highest_block_number()).await,
        )
    }

    /// Gets the lowest cached block number.
    pub async fn get_lowest_block_number(&self) -> Option<u64> {
        or_default(
            "get_lowest_block_number",
            self.read(|tx| BlockProvider::new(tx).lowest_block_number()).await,
        )
    }

    /// Records that fetching `number` failed, replacing any earlier failure for it.
    ///
    /// The retry count starts over at zero.
    pub async fn record_error_block(
        &self,
        number: impl IntoBlockNumber,
        error_type: &str,
        error_message: impl Into<String>,
    ) {
        let Some(block_number) = valid_number("record_error_block", number) else {
            return;
        };

        let record = ErrorBlock::new(block_number, error_type, error_message, now_millis());
        match self.write(move |tx| ErrorBlockProvider::new(tx).put_error_block(&record)).await {
            Ok(()) => Metrics::record_error_block(),
            Err(err) => report_failure("record_error_block", &err),
        }
    }

    /// Drops the failure recorded for `number`, if any.
    pub async fn remove_error_block(&self, number: impl IntoBlockNumber) {
        if let Some(block_number) = valid_number("remove_error_block", number) {
            self.discard_error_block(block_number).await;
        }
    }

    /// Gets every recorded failure in ascending block-number order.
    pub async fn get_error_blocks(&self) -> Vec<ErrorBlock> {
        or_default(
            "get_error_blocks",
            self.read(|tx| ErrorBlockProvider::new(tx).all_error_blocks()).await,
        )
    }

    /// Gets the failures recorded for blocks numbered `start..=end`.
    pub async fn get_error_blocks_in_range(
        &self,
        start: impl IntoBlockNumber,
        end: impl IntoBlockNumber,
    ) -> Vec<ErrorBlock> {
        let Some((start, end)) = valid_range("get_error_blocks_in_range", start, end) else {
            return Vec::new();
        };
        or_default(
            "get_error_blocks_in_range",
            self.read(move |tx| ErrorBlockProvider::new(tx).error_blocks_in_range(start, end)).await,
        )
    }

    /// Gets every failure classified as `error_type`.
    pub async fn get_error_blocks_by_type(&self, error_type: &str) -> Vec<ErrorBlock> {
        let error_type = error_type.to_string();
        or_default(
            "get_error_blocks_by_type",
            self.read(move |tx| ErrorBlockProvider::new(tx).error_blocks_by_type(&error_type))
                .await,
        )
    }

    /// Counts one more retry of the failure recorded for `number`.
    ///
    /// Returns the updated count, or `None` when no failure is recorded for the block.
    pub async fn record_retry_attempt(&self, number: impl IntoBlockNumber) -> Option<u32> {
        let block_number = valid_number("record_retry_attempt", number)?;
        or_default(
            "record_retry_attempt",
            self.write(move |tx| ErrorBlockProvider::new(tx).increment_retry(block_number)).await,
        )
    }

    /// Empties the failure ledger. Cached blocks are kept.
    pub async fn clear_error_blocks(&self) {
        if let Err(err) = self.write(|tx| ErrorBlockProvider::new(tx).clear()).await {
            report_failure("clear_error_blocks", &err);
        }
    }

    /// Summarizes the cache contents.
    ///
    /// Each figure is computed on its own; one that cannot be read is left empty without
    /// affecting the others.
    pub async fn get_cache_stats(&self) -> CacheStats {
        let total_blocks = or_default(
            "get_cache_stats",
            self.read(|tx| BlockProvider::new(tx).block_count()).await,
        );
        let oldest_block = self.get_lowest_block_number().await;
        let newest_block = self.get_highest_block_number().await;
        let oldest_timestamp = self.block_time(oldest_block).await;
        let newest_timestamp = self.block_time(newest_block).await;
        let error_blocks = or_default(
            "get_cache_stats",
            self.read(|tx| ErrorBlockProvider::new(tx).error_count()).await,
        );

        let estimated_bytes =
            (total_blocks as u64).saturating_mul(self.config.average_block_size);
        CacheStats {
            total_blocks,
            oldest_block,
            newest_block,
            oldest_timestamp,
            newest_timestamp,
            cache_size: format_bytes(estimated_bytes),
            error_blocks,
        }
    }

    /// Gets every cached block in ascending block-number order.
    pub async fn get_all_blocks(&self) -> Vec<CachedBlock> {
        or_default("get_all_blocks", self.read(|tx| BlockProvider::new(tx).all_blocks()).await)
    }

    /// Empties the cache: blocks, failures and every index.
    pub async fn clear_cache(&self) {
        let cleared = self
            .write(|tx| {
                BlockProvider::new(tx).clear()?;
                ErrorBlockProvider::new(tx).clear()
            })
            .await;
        match cleared {
            Ok(()) => info!(target: "block_cache", "Cleared block cache"),
            Err(err) => report_failure("clear_cache", &err),
        }
    }

    /// Deletes every block whose timestamp is at or below `older_than` (Unix seconds).
    ///
    /// Returns how many blocks were removed.
    pub async fn clear_old_blocks(&self, older_than: u64) -> usize {
        let removed = or_default(
            "clear_old_blocks",
            self.write(move |tx| BlockProvider::new(tx).delete_blocks_up_to(older_than)).await,
        );
        if removed > 0 {
            info!(target: "block_cache", older_than, removed, "Pruned old blocks");
        }
        removed
    }

    /// Lists up to `limit` numbers in `start..=end` that are neither cached nor recorded as
    /// failed, in ascending order.
    pub async fn get_missing_block_numbers(
        &self,
        start: impl IntoBlockNumber,
        end: impl IntoBlockNumber,
        limit: usize,
    ) -> Vec<u64> {
        let Some((start, end)) = valid_range("get_missing_block_numbers", start, end) else {
            return Vec::new();
        };
        or_default(
            "get_missing_block_numbers",
            self.read(move |tx| providers::missing_block_numbers(tx, start, end, limit)).await,
        )
    }

    /// Takes a snapshot of every cached block for export.
    pub async fn export_snapshot(&self) -> Result<CacheExport, TransferError> {
        let blocks = self.read(|tx| BlockProvider::new(tx).all_blocks()).await?;
        if blocks.is_empty() {
            return Err(TransferError::Empty);
        }
        Ok(CacheExport::new(blocks, Utc::now()))
    }

    /// Exports every cached block as a document in `format`.
    pub async fn export_cache(&self, format: ExportFormat) -> Result<Vec<u8>, TransferError> {
        let snapshot = self.export_snapshot().await?;
        let bytes = snapshot.encode(format)?;
        info!(
            target: "block_cache",
            blocks = snapshot.blocks.len(),
            bytes = bytes.len(),
            ?format,
            "Exported block cache"
        );
        Ok(bytes)
    }

    /// Imports an export document, either raw JSON or a zip archive holding one `.json` file.
    ///
    /// Blocks are written in a single transaction. Entries that are not valid blocks are
    /// skipped and counted.
    pub async fn import_cache(&self, bytes: &[u8]) -> Result<ImportSummary, TransferError> {
        let document = ImportDocument::decode(bytes)?;
        if document.skipped > 0 {
            warn!(
                target: "block_cache",
                skipped = document.skipped,
                "Skipping import entries that are not valid blocks"
            );
        }

        let imported = self.write_blocks(document.blocks).await?;
        info!(target: "block_cache", imported, "Imported blocks");
        Ok(ImportSummary { imported, skipped: document.skipped })
    }

    async fn write_blocks(&self, blocks: Vec<CachedBlock>) -> Result<usize, StorageError> {
        if blocks.is_empty() {
            return Ok(0);
        }

        let numbers: Vec<u64> = blocks.iter().map(|block| block.number).collect();
        self.write(move |tx| {
            let provider = BlockProvider::new(tx);
            blocks.iter().try_for_each(|block| provider.put_block(block))
        })
        .await?;
        Metrics::record_blocks_written(numbers.len());

        for block_number in &numbers {
            self.discard_error_block(*block_number).await;
        }
        Ok(numbers.len())
    }

    /// Drops the failure recorded for `block_number`. Failures are logged and ignored.
    async fn discard_error_block(&self, block_number: u64) {
        let removed =
            self.write(move |tx| ErrorBlockProvider::new(tx).remove_error_block(block_number)).await;
        match removed {
            Ok(true) => debug!(target: "block_cache", block_number, "Cleared error block"),
            Ok(false) => {}
            Err(err) => warn!(
                target: "block_cache",
                block_number,
                %err,
                "Failed to clear error block"
            ),
        }
    }

    async fn block_time(&self, block_number: Option<u64>) -> Option<DateTime<Utc>> {
        let block_number = block_number?;
        let timestamp = or_default(
            "get_cache_stats",
            self.read(move |tx| BlockProvider::new(tx).block_timestamp(block_number)).await,
        )?;
        chain_time(timestamp)
    }

    /// Returns the shared database environment, opening it on first use.
    async fn env(&self) -> Result<Arc<DatabaseEnv>, StorageError> {
        self.env
            .get_or_try_init(|| async {
                let path = self.config.database_path();
                let env = tokio::task::spawn_blocking({
                    let path = path.clone();
                    move || schema::open(&path)
                })
                .await??;
                info!(target: "block_cache", path = %path.display(), "Opened block cache");
                Ok::<_, StorageError>(Arc::new(env))
            })
            .await
            .cloned()
    }

    async fn read<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&RoTx) -> Result<T, StorageError> + Send + 'static,
    {
        let env = self.env().await?;
        tokio::task::spawn_blocking(move || providers::read(env.as_ref(), f)).await?
    }

    async fn write<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&RwTx) -> Result<T, StorageError> + Send + 'static,
    {
        let env = self.env().await?;
        tokio::task::spawn_blocking(move || providers::write(env.as_ref(), f)).await?
    }
}

/// Answers a failed storage operation with the empty value of its result type.
fn or_default<T: Default>(operation: &'static str, result: Result<T, StorageError>) -> T {
    result.unwrap_or_else(|err| {
        report_failure(operation, &err);
        T::default()
    })
}

fn report_failure(operation: &'static str, err: &StorageError) {
    error!(target: "block_cache", operation, %err, "Block cache operation failed");
    Metrics::record_storage_failure(operation);
}

fn valid_number(operation: &'static str, number: impl IntoBlockNumber) -> Option<u64> {
    let block_number = number.into_block_number();
    if block_number.is_none() {
        warn!(target: "block_cache", operation, "Ignoring invalid block number");
    }
    block_number
}

fn valid_range(
    operation: &'static str,
    start: impl IntoBlockNumber,
    end: impl IntoBlockNumber,
) -> Option<(u64, u64)> {
    let start = valid_number(operation, start)?;
    let end = valid_number(operation, end)?;
    if start > end {
        debug!(target: "block_cache", operation, start, end, "Empty block range");
        return None;
    }
    Some((start, end))
}

fn now_millis() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
}
