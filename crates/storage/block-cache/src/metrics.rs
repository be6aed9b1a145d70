/// Counters emitted by the block cache.
#[derive(Debug, Clone)]
pub(crate) struct Metrics;

impl Metrics {
    pub(crate) const BLOCK_CACHE_HITS_TOTAL: &'static str = "ethscope_block_cache_hits_total";
    pub(crate) const BLOCK_CACHE_MISSES_TOTAL: &'static str = "ethscope_block_cache_misses_total";
    pub(crate) const BLOCK_CACHE_BLOCKS_WRITTEN_TOTAL: &'static str =
        "ethscope_block_cache_blocks_written_total";
    pub(crate) const BLOCK_CACHE_ERROR_BLOCKS_RECORDED_TOTAL: &'static str =
        "ethscope_block_cache_error_blocks_recorded_total";
    pub(crate) const BLOCK_CACHE_STORAGE_FAILURES_TOTAL: &'static str =
        "ethscope_block_cache_storage_failures_total";

    pub(crate) fn init() {
        Self::describe();
        Self::zero();
    }

    fn describe() {
        metrics::describe_counter!(
            Self::BLOCK_CACHE_HITS_TOTAL,
            metrics::Unit::Count,
            "Total number of block lookups answered from the cache",
        );

        metrics::describe_counter!(
            Self::BLOCK_CACHE_MISSES_TOTAL,
            metrics::Unit::Count,
            "Total number of block lookups that found nothing cached",
        );

        metrics::describe_counter!(
            Self::BLOCK_CACHE_BLOCKS_WRITTEN_TOTAL,
            metrics::Unit::Count,
            "Total number of blocks written to the cache",
        );

        metrics::describe_counter!(
            Self::BLOCK_CACHE_ERROR_BLOCKS_RECORDED_TOTAL,
            metrics::Unit::Count,
            "Total number of fetch failures recorded in the error ledger",
        );

        metrics::describe_counter!(
            Self::BLOCK_CACHE_STORAGE_FAILURES_TOTAL,
            metrics::Unit::Count,
            "Total number of cache operations that failed in the storage layer",
        );
    }

    fn zero() {
        metrics::counter!(Self::BLOCK_CACHE_HITS_TOTAL).increment(0);
        metrics::counter!(Self::BLOCK_CACHE_MISSES_TOTAL).increment(0);
        metrics::counter!(Self::BLOCK_CACHE_BLOCKS_WRITTEN_TOTAL).increment(0);
        metrics::counter!(Self::BLOCK_CACHE_ERROR_BLOCKS_RECORDED_TOTAL).increment(0);
    }

    pub(crate) fn record_lookup(found: bool) {
        if found {
            metrics::counter!(Self::BLOCK_CACHE_HITS_TOTAL).increment(1);
        } else {
            metrics::counter!(Self::BLOCK_CACHE_MISSES_TOTAL).increment(1);
        }
    }

    pub(crate) fn record_blocks_written(count: usize) {
        metrics::counter!(Self::BLOCK_CACHE_BLOCKS_WRITTEN_TOTAL).increment(count as u64);
    }

    pub(crate) fn record_error_block() {
        metrics::counter!(Self::BLOCK_CACHE_ERROR_BLOCKS_RECORDED_TOTAL).increment(1);
    }

    pub(crate) fn record_storage_failure(operation: &'static str) {
        metrics::counter!(
            Self::BLOCK_CACHE_STORAGE_FAILURES_TOTAL,
            "operation" => operation,
        )
        .increment(1);
    }
}
