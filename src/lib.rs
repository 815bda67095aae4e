//! # Crocus
//!
//! Full-text search over spreadsheet archives.
//!
//! Crocus walks a directory tree of workbooks, extracts native cell text
//! and OCR-recovered image text, commits the result into a durable
//! generation-based inverted index, and answers field-scoped queries
//! with BM25 relevance scoring and highlighted snippets.
//!
//! ## Features
//!
//! - Failure-tolerant extraction: bad files, sheets and images are
//!   skipped and reported, never abort a run
//! - Atomic index commits: readers see complete generations only
//! - Term, phrase and wildcard queries with deterministic ranking
//! - Pluggable decoder and OCR seams for testing and integration

// Core modules
pub mod analysis;
mod config;
pub mod document;
mod error;
pub mod extract;
pub mod index;
pub mod query;
mod service;

// Re-exports for the public API
pub use config::Config;
pub use document::{Document, SheetContent, SheetImage, WorkbookContent, build_documents};
pub use error::{CrocusError, Result};
pub use extract::{
    CalamineDecoder, ContentExtractor, ExtractionOutcome, NoOcr, NullProgress, OcrEngine,
    ProgressObserver, SkippedFile, SpreadsheetDecoder,
};
#[cfg(feature = "ocr-tesseract")]
pub use extract::ocr::TesseractOcr;
pub use index::{CommitOutcome, IndexReader, IndexWriter};
pub use query::SearchResult;
pub use service::{Engine, FileLocation};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
