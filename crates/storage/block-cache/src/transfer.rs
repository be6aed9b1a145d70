//! Export and import documents of the block cache.
//!
//! An export is a JSON document `{ "version": 1, "timestamp": <RFC 3339>, "blocks": [...] }`,
//! optionally wrapped in a zip archive holding a single `.json` member. Import accepts either
//! form.

use crate::{error::TransferError, models::CachedBlock};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{Cursor, Read, Write};
use zip::{CompressionMethod, ZipArchive, ZipWriter, write::SimpleFileOptions};

/// Version of the export document layout.
pub const EXPORT_VERSION: u32 = 1;

/// Local file header signature, present at the start of every non-empty zip archive.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
/// End of central directory signature, the first bytes of an empty zip archive.
const EMPTY_ZIP_MAGIC: &[u8] = b"PK\x05\x06";

/// Container of an export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    /// Plain JSON document.
    #[default]
    Json,
    /// Zip archive with the JSON document as its only member.
    Zip,
}

impl ExportFormat {
    /// File extension conventionally used for this format.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Zip => "zip",
        }
    }
}

/// The export document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheExport {
    /// Layout version, [`EXPORT_VERSION`].
    pub version: u32,
    /// Time the export was taken.
    pub timestamp: DateTime<Utc>,
    /// Every cached block, in block-number order.
    pub blocks: Vec<CachedBlock>,
}

impl CacheExport {
    /// Creates an export of `blocks` taken at `timestamp`.
    pub const fn new(blocks: Vec<CachedBlock>, timestamp: DateTime<Utc>) -> Self {
        Self { version: EXPORT_VERSION, timestamp, blocks }
    }

    /// Suggested file name, e.g. `ethscope-blocks-2024-01-31T12-00-00Z.json`.
    pub fn file_name(&self, format: ExportFormat) -> String {
        let stamp = self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true).replace(':', "-");
        format!("ethscope-blocks-{stamp}.{}", format.extension())
    }

    /// Encodes the export in `format`.
    pub fn encode(&self, format: ExportFormat) -> Result<Vec<u8>, TransferError> {
        let json = serde_json::to_vec_pretty(self).map_err(TransferError::Encoding)?;
        match format {
            ExportFormat::Json => Ok(json),
            ExportFormat::Zip => {
                let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
                let options =
                    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
                writer.start_file(self.file_name(ExportFormat::Json), options)?;
                writer.write_all(&json)?;
                Ok(writer.finish()?.into_inner())
            }
        }
    }
}

/// Outcome of an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Blocks written to the cache.
    pub imported: usize,
    /// Entries of the `blocks` array that were not usable blocks.
    pub skipped: usize,
}

/// An import document reduced to the entries of its `blocks` array.
#[derive(Debug)]
pub(crate) struct ImportDocument {
    pub(crate) blocks: Vec<CachedBlock>,
    pub(crate) skipped: usize,
}

impl ImportDocument {
    /// Decodes an import file, unwrapping it first when it is a zip archive.
    pub(crate) fn decode(bytes: &[u8]) -> Result<Self, TransferError> {
        if is_zip(bytes) {
            let json = read_json_member(bytes)?;
            Self::from_json(&json)
        } else {
            Self::from_json(bytes)
        }
    }

    fn from_json(bytes: &[u8]) -> Result<Self, TransferError> {
        let document: Value = serde_json::from_slice(bytes).map_err(TransferError::InvalidJson)?;
        let Some(Value::Array(entries)) = document.get("blocks") else {
            return Err(TransferError::MissingBlocks);
        };

        let total = entries.len();
        let blocks: Vec<CachedBlock> = entries
            .iter()
            .filter_map(|entry| CachedBlock::from_value(entry).ok())
            .collect();
        Ok(Self { skipped: total - blocks.len(), blocks })
    }
}

fn is_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(EMPTY_ZIP_MAGIC)
}

/// Reads the only `.json` member of a zip archive.
fn read_json_member(bytes: &[u8]) -> Result<Vec<u8>, TransferError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let members: Vec<String> = archive
        .file_names()
        .filter(|name| !name.ends_with('/') && name.to_ascii_lowercase().ends_with(".json"))
        .map(str::to_string)
        .collect();

    let name = match members.as_slice() {
        [] => return Err(TransferError::NoJsonMember),
        [name] => name,
        _ => return Err(TransferError::AmbiguousArchive(members.len())),
    };

    let mut member = archive.by_name(name)?;
    let mut json = Vec::new();
    member.read_to_end(&mut json)?;
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_export() -> CacheExport {
        let timestamp = DateTime::from_timestamp(1_706_702_400, 0).unwrap();
        CacheExport::new(
            vec![CachedBlock::new(1, "0x01", 10), CachedBlock::new(2, "0x02", 20)],
            timestamp,
        )
    }

    fn zip_with(members: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, contents) in members {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(contents).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_json_export_layout() {
        let bytes = sample_export().encode(ExportFormat::Json).unwrap();
        let document: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(document["version"], json!(1));
        assert_eq!(document["timestamp"], json!("2024-01-31T12:00:00Z"));
        assert_eq!(document["blocks"][1]["hash"], json!("0x02"));
    }

    #[test]
    fn test_zip_export_is_importable() {
        let bytes = sample_export().encode(ExportFormat::Zip).unwrap();
        assert!(bytes.starts_with(ZIP_MAGIC));

        let document = ImportDocument::decode(&bytes).unwrap();
        assert_eq!(document.blocks, sample_export().blocks);
        assert_eq!(document.skipped, 0);
    }

    #[test]
    fn test_file_name() {
        assert_eq!(
            sample_export().file_name(ExportFormat::Zip),
            "ethscope-blocks-2024-01-31T12-00-00Z.zip"
        );
    }

    #[test]
    fn test_invalid_entries_are_skipped() {
        let bytes = serde_json::to_vec(&json!({
            "version": 1,
            "blocks": [{ "number": 3 }, { "number": -3 }, "junk", { "hash": "0x" }],
        }))
        .unwrap();

        let document = ImportDocument::decode(&bytes).unwrap();
        assert_eq!(document.blocks.len(), 1);
        assert_eq!(document.skipped, 3);
    }

    #[test]
    fn test_rejects_malformed_documents() {
        assert!(matches!(ImportDocument::decode(b"{not json"), Err(TransferError::InvalidJson(_))));
        assert!(matches!(
            ImportDocument::decode(br#"{"version":1}"#),
            Err(TransferError::MissingBlocks)
        ));
        assert!(matches!(
            ImportDocument::decode(br#"{"blocks":{}}"#),
            Err(TransferError::MissingBlocks)
        ));
    }

    #[test]
    fn test_rejects_archives_without_single_json_member() {
        let no_json = zip_with(&[("notes.txt", b"hello")]);
        assert!(matches!(ImportDocument::decode(&no_json), Err(TransferError::NoJsonMember)));

        let empty = zip_with(&[]);
        assert!(matches!(ImportDocument::decode(&empty), Err(TransferError::NoJsonMember)));

        let two = zip_with(&[("a.json", br#"{"blocks":[]}"#), ("b.JSON", br#"{"blocks":[]}"#)]);
        assert!(matches!(ImportDocument::decode(&two), Err(TransferError::AmbiguousArchive(2))));
    }

    #[test]
    fn test_picks_json_member_among_others() {
        let archive = zip_with(&[
            ("readme.txt", b"x"),
            ("dump/cache.json", br#"{"blocks":[{"number":"0x2a"}]}"#),
        ]);
        let document = ImportDocument::decode(&archive).unwrap();
        assert_eq!(document.blocks.iter().map(|b| b.number).collect::<Vec<_>>(), vec![42]);
    }
}
