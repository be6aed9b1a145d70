//! End-to-end behaviour of the block cache against a real database.

use ethscope_block_cache::{
    BlockCache, CacheConfig, ExportFormat, ImportSummary, SCHEMA_VERSION, TransferError,
};
use rstest::rstest;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;

fn setup_cache() -> (TempDir, BlockCache) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let cache = BlockCache::new(CacheConfig::new(temp_dir.path()));
    (temp_dir, cache)
}

fn block(number: u64, timestamp: u64) -> Value {
    json!({
        "number": format!("{number:#x}"),
        "hash": format!("0x{number:064x}"),
        "timestamp": format!("{timestamp:#x}"),
        "transactions": [],
    })
}

#[tokio::test]
async fn test_upsert_is_idempotent() {
    let (_tmp, cache) = setup_cache();
    cache.cache_block(&block(7, 70)).await;
    cache.cache_block(&block(7, 70)).await;

    assert_eq!(cache.get_all_blocks().await.len(), 1);
    assert_eq!(cache.get_cache_stats().await.total_blocks, 1);
}

#[tokio::test]
async fn test_last_write_wins() {
    let (_tmp, cache) = setup_cache();
    cache.cache_block(&json!({ "number": 7, "hash": "0xold", "timestamp": 70 })).await;
    cache.cache_block(&json!({ "number": 7, "hash": "0xnew", "timestamp": 80 })).await;

    let stored = cache.get_block(7).await.expect("block is cached");
    assert_eq!(stored.hash.as_deref(), Some("0xnew"));
    assert_eq!(stored.timestamp, 80);
    assert_eq!(cache.clear_old_blocks(70).await, 0);
}

#[tokio::test]
async fn test_error_lifecycle() {
    let (_tmp, cache) = setup_cache();
    cache.record_error_block(42, "timeout", "request timed out").await;
    cache.record_error_block(42, "rate_limited", "429").await;

    let errors = cache.get_error_blocks().await;
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_type, "rate_limited");
    assert_eq!(errors[0].retry_count, 0);
    assert!(errors[0].timestamp > 0);

    assert_eq!(cache.record_retry_attempt(42).await, Some(1));
    assert_eq!(cache.record_retry_attempt(43).await, None);

    cache.cache_block(&block(42, 1)).await;
    assert!(cache.get_error_blocks().await.is_empty());
    assert!(cache.get_block(42).await.is_some());
}

#[tokio::test]
async fn test_batch_write_clears_error_records() {
    let (_tmp, cache) = setup_cache();
    for number in [1, 2, 9] {
        cache.record_error_block(number, "timeout", "boom").await;
    }

    let written = cache.cache_blocks(&[block(1, 10), block(2, 20), json!({ "hash": "0x" })]).await;
    assert_eq!(written, 2);

    let remaining: Vec<u64> =
        cache.get_error_blocks().await.iter().map(|record| record.block_number).collect();
    assert_eq!(remaining, vec![9]);
}

#[tokio::test]
async fn test_range_completeness() {
    let (_tmp, cache) = setup_cache();
    let blocks: Vec<Value> = (100..=120).map(|number| block(number, number * 12)).collect();
    assert_eq!(cache.cache_blocks(&blocks).await, 21);

    let in_range = cache.get_blocks_in_range(105, 110).await;
    assert_eq!(
        in_range.iter().map(|b| b.number).collect::<Vec<_>>(),
        (105..=110u64).collect::<Vec<_>>()
    );
    assert_eq!(cache.get_cached_block_numbers(90, 102).await, vec![100, 101, 102]);
    assert!(cache.get_blocks_in_range(110, 105).await.is_empty());
    assert_eq!(cache.get_lowest_block_number().await, Some(100));
    assert_eq!(cache.get_highest_block_number().await, Some(120));
}

#[rstest]
#[case::negative(json!(-1))]
#[case::fractional(json!(1.5))]
#[case::missing(Value::Null)]
#[case::garbage(json!("not-a-number"))]
#[tokio::test]
async fn test_invalid_block_numbers_are_harmless(#[case] number: Value) {
    let (_tmp, cache) = setup_cache();
    cache.cache_block(&json!({ "number": number.clone(), "hash": "0x01" })).await;
    cache.record_error_block(&number, "timeout", "boom").await;
    cache.remove_error_block(&number).await;

    assert!(cache.get_block(&number).await.is_none());
    assert!(cache.get_blocks_in_range(&number, 10).await.is_empty());
    assert!(cache.get_cached_block_numbers(0, &number).await.is_empty());
    assert!(cache.get_error_blocks_in_range(&number, &number).await.is_empty());
    assert!(cache.get_all_blocks().await.is_empty());
    assert!(cache.get_error_blocks().await.is_empty());
}

#[tokio::test]
async fn test_stats_extent() {
    let (_tmp, cache) = setup_cache();
    cache
        .cache_blocks(&[
            block(10, 1_600_000_000),
            block(55, 1_650_000_000),
            block(1000, 1_700_000_000),
        ])
        .await;
    cache.record_error_block(11, "timeout", "boom").await;

    let stats = cache.get_cache_stats().await;
    assert_eq!(stats.total_blocks, 3);
    assert_eq!(stats.oldest_block, Some(10));
    assert_eq!(stats.newest_block, Some(1000));
    assert_eq!(stats.oldest_timestamp.map(|t| t.timestamp()), Some(1_600_000_000));
    assert_eq!(stats.newest_timestamp.map(|t| t.timestamp()), Some(1_700_000_000));
    assert_eq!(stats.cache_size, "150.00 KB");
    assert_eq!(stats.error_blocks, 1);
}

#[tokio::test]
async fn test_empty_cache_stats() {
    let (_tmp, cache) = setup_cache();
    let stats = cache.get_cache_stats().await;
    assert_eq!(stats.total_blocks, 0);
    assert_eq!(stats.oldest_block, None);
    assert_eq!(stats.cache_size, "0 B");
}

#[tokio::test]
async fn test_big_integers_are_stored_as_strings() {
    let (_tmp, cache) = setup_cache();
    cache
        .cache_block(&json!({
            "number": 5,
            "difficulty": 9_007_199_254_740_993u64,
            "gasLimit": 30_000_000,
            "transactions": [{ "hash": "0xaa", "value": u64::MAX, "nested": { "deep": [u64::MAX] } }],
        }))
        .await;

    let stored = serde_json::to_value(cache.get_block(5).await.expect("block is cached")).unwrap();
    assert_eq!(stored["difficulty"], json!("9007199254740993"));
    assert_eq!(stored["gasLimit"], json!("30000000"));
    assert_eq!(stored["transactions"][0]["value"], json!("18446744073709551615"));
    assert_eq!(stored["transactions"][0]["nested"]["deep"][0], json!("18446744073709551615"));
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProviderBlock {
    number: u64,
    hash: &'static str,
    timestamp: u64,
    gas_used: u64,
    total_difficulty: u128,
    transaction_count: u32,
}

#[tokio::test]
async fn test_typed_blocks_store_wide_integers_as_strings() {
    let (_tmp, cache) = setup_cache();
    cache
        .cache_block(&ProviderBlock {
            number: 15_537_393,
            hash: "0x55b1",
            timestamp: 1_663_224_162,
            gas_used: 21_000,
            total_difficulty: 58_750_003_716_598_352_816_469,
            transaction_count: 1,
        })
        .await;

    let stored = cache.get_block(15_537_393).await.expect("typed block is cached");
    assert_eq!(stored.timestamp, 1_663_224_162);

    let encoded = serde_json::to_value(&stored).unwrap();
    assert_eq!(encoded["gasUsed"], json!("21000"));
    assert_eq!(encoded["totalDifficulty"], json!("58750003716598352816469"));
    assert_eq!(encoded["transactionCount"], json!(1));
}

#[rstest]
#[case::json(ExportFormat::Json)]
#[case::zip(ExportFormat::Zip)]
#[tokio::test]
async fn test_export_import_round_trip(#[case] format: ExportFormat) {
    let (_tmp, cache) = setup_cache();
    let blocks: Vec<Value> = [3, 1, 2].iter().map(|number| block(*number, number * 100)).collect();
    cache.cache_blocks(&blocks).await;
    let before = cache.get_all_blocks().await;

    let exported = cache.export_cache(format).await.expect("export succeeds");
    cache.clear_cache().await;
    assert!(cache.get_all_blocks().await.is_empty());

    let summary = cache.import_cache(&exported).await.expect("import succeeds");
    assert_eq!(summary, ImportSummary { imported: 3, skipped: 0 });

    let after = cache.get_all_blocks().await;
    assert_eq!(after.len(), before.len());
    for (restored, original) in after.iter().zip(&before) {
        assert_eq!(restored.number, original.number);
        assert_eq!(restored.hash, original.hash);
        assert_eq!(restored.timestamp, original.timestamp);
    }
}

#[tokio::test]
async fn test_export_of_empty_cache_fails() {
    let (_tmp, cache) = setup_cache();
    assert!(matches!(cache.export_cache(ExportFormat::Json).await, Err(TransferError::Empty)));
}

#[tokio::test]
async fn test_import_rejects_documents_without_blocks() {
    let (_tmp, cache) = setup_cache();
    assert!(matches!(
        cache.import_cache(br#"{"version":1,"timestamp":"2024-01-01T00:00:00Z"}"#).await,
        Err(TransferError::MissingBlocks)
    ));
    assert!(matches!(cache.import_cache(b"").await, Err(TransferError::InvalidJson(_))));
}

#[tokio::test]
async fn test_import_clears_error_records() {
    let (_tmp, cache) = setup_cache();
    cache.record_error_block(8, "timeout", "boom").await;

    let document = json!({ "version": 1, "blocks": [block(8, 1), { "number": "-" }] });
    let summary = cache.import_cache(&serde_json::to_vec(&document).unwrap()).await.unwrap();

    assert_eq!(summary, ImportSummary { imported: 1, skipped: 1 });
    assert!(cache.get_error_blocks().await.is_empty());
}

#[tokio::test]
async fn test_clear_old_blocks() {
    let (_tmp, cache) = setup_cache();
    cache.cache_blocks(&[block(1, 100), block(2, 200), block(3, 300), block(4, 400)]).await;

    assert_eq!(cache.clear_old_blocks(250).await, 2);
    assert_eq!(cache.get_cached_block_numbers(0, 10).await, vec![3, 4]);
    assert_eq!(cache.clear_old_blocks(250).await, 0);
}

#[tokio::test]
async fn test_clear_error_blocks_keeps_blocks() {
    let (_tmp, cache) = setup_cache();
    cache.cache_block(&block(1, 1)).await;
    cache.record_error_block(2, "timeout", "boom").await;

    cache.clear_error_blocks().await;
    assert!(cache.get_error_blocks().await.is_empty());
    assert!(cache.get_block(1).await.is_some());
}

#[tokio::test]
async fn test_error_blocks_by_type() {
    let (_tmp, cache) = setup_cache();
    cache.record_error_block(1, "timeout", "a").await;
    cache.record_error_block(2, "rate_limited", "b").await;
    cache.record_error_block(3, "timeout", "c").await;

    let timeouts = cache.get_error_blocks_by_type("timeout").await;
    assert_eq!(timeouts.iter().map(|r| r.block_number).collect::<Vec<_>>(), vec![1, 3]);
    assert_eq!(cache.get_error_blocks_in_range(2, 3).await.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_use_shares_one_open() {
    let (_tmp, cache) = setup_cache();
    let cache = Arc::new(cache);

    let tasks: Vec<_> = (0..16u64)
        .map(|number| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache.cache_block(&block(number, number)).await;
                cache.get_block(number).await.is_some()
            })
        })
        .collect();

    for task in tasks {
        assert!(task.await.expect("task completes"));
    }
    assert_eq!(cache.get_all_blocks().await.len(), 16);
    assert_eq!(cache.schema_version().await.unwrap(), SCHEMA_VERSION);
}

#[tokio::test]
async fn test_data_survives_reopen() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    {
        let cache = BlockCache::new(CacheConfig::new(temp_dir.path()));
        cache.cache_block(&block(77, 7)).await;
        cache.record_error_block(78, "timeout", "boom").await;
    }

    let cache = BlockCache::new(CacheConfig::new(temp_dir.path()));
    assert_eq!(cache.get_block(77).await.map(|b| b.timestamp), Some(7));
    assert_eq!(cache.get_error_blocks().await.len(), 1);
}
