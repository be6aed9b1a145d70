use reth_db_api::DatabaseError;
use thiserror::Error;

/// Errors that may occur while interacting with the block cache database.
///
/// These never cross the public [`BlockCache`](crate::BlockCache) boundary for regular cache
/// operations: the facade logs them and answers with the operation's empty value instead.
#[derive(Debug, Error)]
pub enum StorageError {
    /// DatabaseError
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// The database environment could not be created or opened.
    #[error("Failed to open database: {0}")]
    Open(String),

    /// A schema migration step failed.
    #[error("Migration to schema version {version} failed: {reason}")]
    Migration {
        /// The schema version the failing step migrates to.
        version: u64,
        /// Description of the failure.
        reason: String,
    },

    /// The database was written by a newer schema than this build understands.
    #[error("Unsupported schema version {found}, this build supports up to {supported}")]
    UnsupportedSchema {
        /// Version recorded in the database.
        found: u64,
        /// Latest version known to this build.
        supported: u64,
    },

    /// A stored record could not be encoded or decoded.
    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The blocking task running a database transaction did not complete.
    #[error("Storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Reasons an incoming block payload is refused before it reaches the database.
#[derive(Debug, Error)]
pub enum BlockRecordError {
    /// The payload is not a JSON object.
    #[error("Block payload is not an object")]
    NotAnObject,

    /// The payload has no usable `number` field.
    #[error("Block payload has a missing or invalid block number")]
    InvalidNumber,

    /// The payload could not be converted to JSON.
    #[error("Block payload could not be encoded: {0}")]
    Encoding(#[source] serde_json::Error),

    /// The payload does not have the shape of a block record.
    #[error("Block payload is malformed: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// Errors surfaced by user-initiated export and import.
#[derive(Debug, Error)]
pub enum TransferError {
    /// There are no cached blocks to export.
    #[error("Nothing to export: the block cache is empty")]
    Empty,

    /// The import document is not valid JSON.
    #[error("Import file is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// The import document has no `blocks` array.
    #[error("Import file does not contain a `blocks` array")]
    MissingBlocks,

    /// The archive holds no `.json` member.
    #[error("Archive does not contain a JSON file")]
    NoJsonMember,

    /// The archive holds more than one `.json` member.
    #[error("Archive contains {0} JSON files, expected exactly one")]
    AmbiguousArchive(usize),

    /// The archive could not be read or written.
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Reading or writing archive contents failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The export document could not be encoded.
    #[error("Failed to encode export: {0}")]
    Encoding(#[source] serde_json::Error),

    /// The underlying store failed while exporting or importing.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
