//! Persistent block cache for the ethscope explorer.
//!
//! [`BlockCache`] stores fetched chain blocks in an MDBX database keyed by block number, next to
//! a ledger of block numbers whose live fetch failed. Callers look a block up in the cache before
//! asking a chain-data provider and write it back after a successful fetch; the cache itself
//! never talks to the network.
//!
//! The database is versioned (see [`SCHEMA_VERSION`]) and upgraded in place on open.
//!
//! ```no_run
//! # async fn demo() {
//! use ethscope_block_cache::{BlockCache, CacheConfig};
//! use serde_json::json;
//!
//! let cache = BlockCache::new(CacheConfig::new("/tmp/ethscope"));
//! cache.cache_block(&json!({ "number": "0x10", "hash": "0xabc", "timestamp": 1700000000 })).await;
//! assert_eq!(cache.get_block(16).await.map(|block| block.timestamp), Some(1_700_000_000));
//! # }
//! ```
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod cache;
pub use cache::BlockCache;

mod config;
pub use config::{CacheConfig, DATABASE_NAME, DEFAULT_AVERAGE_BLOCK_SIZE};

mod error;
pub use error::{BlockRecordError, StorageError, TransferError};

mod metrics;

pub mod models;
pub use models::{BlockTransaction, CachedBlock, ErrorBlock, TransactionRecord};

mod normalize;

mod number;
pub use number::{IntoBlockNumber, MAX_SAFE_INTEGER};

mod providers;

mod schema;
pub use schema::SCHEMA_VERSION;

mod stats;
pub use stats::{CacheStats, format_bytes};

mod transfer;
pub use transfer::{CacheExport, EXPORT_VERSION, ExportFormat, ImportSummary};
