//! Durable inverted index: on-disk layout, writer and reader.
//!
//! An index directory is owned wholesale by this module. It contains a
//! `CURRENT` marker naming the committed generation and one
//! `gen-NNNNNN/` directory per generation. Each generation is a
//! complete, immutable snapshot:
//!
//! ```text
//! index_dir/
//!   CURRENT              {"generation": 3}
//!   gen-000003/
//!     meta.json          format version, doc count, field statistics
//!     docs.bin           stored-field records, ascending doc id
//!     content.terms      term dictionary + posting lists
//!     image_content.terms
//! ```
//!
//! Readers resolve `CURRENT` and never coordinate with writers; a commit
//! builds the next generation in a staging directory, renames it into
//! place and then swaps `CURRENT` atomically.

pub mod posting;
pub mod reader;
pub mod varint;
pub mod writer;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::document::{Document, TextField};
use crate::error::{CrocusError, Result};

pub use posting::Posting;
pub use reader::IndexReader;
pub use writer::{CommitOutcome, IndexWriter};

/// On-disk format version, bumped on incompatible layout changes.
pub const FORMAT_VERSION: u32 = 1;

/// Name of the generation marker file.
pub const CURRENT_FILE: &str = "CURRENT";
/// Name of the per-generation metadata file.
pub const META_FILE: &str = "meta.json";
/// Name of the stored-field record file.
pub const DOCS_FILE: &str = "docs.bin";

/// Magic header of `docs.bin`.
pub(crate) const DOCS_MAGIC: u32 = u32::from_le_bytes(*b"CRDC");
/// Magic header of `{field}.terms` files.
pub(crate) const TERMS_MAGIC: u32 = u32::from_le_bytes(*b"CRTM");

/// Directory name of a generation.
pub fn generation_dir_name(generation: u64) -> String {
    format!("gen-{generation:06}")
}

/// File name of a full-text field's term dictionary.
pub fn terms_file_name(field: TextField) -> String {
    format!("{}.terms", field.name())
}

/// Contents of the `CURRENT` marker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CurrentMarker {
    /// The committed generation number.
    pub generation: u64,
}

/// Read the `CURRENT` marker, if the index directory has one.
pub fn read_current(index_dir: &Path) -> Result<Option<u64>> {
    let path = index_dir.join(CURRENT_FILE);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let marker: CurrentMarker = serde_json::from_slice(&bytes)
        .map_err(|e| CrocusError::corrupt(CURRENT_FILE, e.to_string()))?;
    Ok(Some(marker.generation))
}

/// Per-field statistics recorded in generation metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldStats {
    /// Field name.
    pub name: String,
    /// Number of documents with at least one token in this field.
    pub doc_count: u64,
    /// Total token count across all documents.
    pub total_tokens: u64,
}

/// Metadata of one committed generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// On-disk format version.
    pub format_version: u32,
    /// Generation number.
    pub generation: u64,
    /// Total number of documents.
    pub doc_count: u64,
    /// Full-text field statistics.
    pub fields: Vec<FieldStats>,
    /// Commit wall-clock time, milliseconds since the Unix epoch.
    pub created_at_ms: u64,
}

impl IndexMetadata {
    /// Statistics for one full-text field, if recorded.
    pub fn field_stats(&self, field: TextField) -> Option<&FieldStats> {
        self.fields.iter().find(|s| s.name == field.name())
    }

    /// Average token count of a full-text field across all documents.
    pub fn avg_field_len(&self, field: TextField) -> f64 {
        if self.doc_count == 0 {
            return 0.0;
        }
        match self.field_stats(field) {
            Some(stats) => stats.total_tokens as f64 / self.doc_count as f64,
            None => 0.0,
        }
    }
}

/// Token counts of each full-text field of one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLengths {
    /// Token count of `content`.
    pub content: u32,
    /// Token count of `image_content`.
    pub image_content: u32,
}

impl FieldLengths {
    /// Token count of the given field.
    pub fn get(&self, field: TextField) -> u32 {
        match field {
            TextField::Content => self.content,
            TextField::ImageContent => self.image_content,
        }
    }
}

/// One stored-field record: the document plus its field-length metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// The document's field values, verbatim.
    pub document: Document,
    /// Token counts feeding length normalization at query time.
    pub field_lengths: FieldLengths,
}

/// Resolved path of a generation directory.
pub fn generation_dir(index_dir: &Path, generation: u64) -> PathBuf {
    index_dir.join(generation_dir_name(generation))
}

/// In-memory posting map built by the writer: term → ordered postings.
pub(crate) type PostingMap = ahash::AHashMap<String, Vec<Posting>>;

/// In-memory posting maps for all full-text fields.
pub(crate) type FieldPostings = HashMap<TextField, PostingMap>;
