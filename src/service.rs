//! Service boundary: the engine exposed to API and CLI layers.

use std::sync::Arc;

use log::warn;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use walkdir::WalkDir;

use crate::config::Config;
use crate::document::{Field, TextField, WorkbookContent, build_documents};
use crate::error::Result;
use crate::extract::{
    ContentExtractor, ExtractionOutcome, OcrEngine, ProgressObserver, SpreadsheetDecoder,
    is_spreadsheet_candidate,
};
use crate::index::{CommitOutcome, IndexReader, IndexWriter};
use crate::query::{self, SearchResult};

/// Location of one workbook file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileLocation {
    /// Workbook base name.
    pub filename: String,
    /// Path relative to the content root.
    pub relative_path: String,
}

/// Long-lived engine owning the extraction collaborators and a shared
/// read handle to the index.
///
/// Constructed once at process startup. Queries share one committed
/// [`IndexReader`] behind a `RwLock` cache; a commit invalidates the
/// cache so the next query opens the new generation. Index builds are
/// serialized behind a mutex: single writer, any number of readers.
pub struct Engine {
    config: Config,
    decoder: Arc<dyn SpreadsheetDecoder>,
    ocr: Arc<dyn OcrEngine>,
    write_lock: Mutex<()>,
    reader_cache: RwLock<Option<Arc<IndexReader>>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").field("config", &self.config).finish()
    }
}

impl Engine {
    /// Create an engine with the default collaborators (calamine
    /// decoder, OCR disabled).
    pub fn new(config: Config) -> Self {
        Self::with_collaborators(
            config,
            Arc::new(crate::extract::CalamineDecoder),
            Arc::new(crate::extract::NoOcr),
        )
    }

    /// Create an engine with explicit decoder and OCR collaborators.
    pub fn with_collaborators(
        config: Config,
        decoder: Arc<dyn SpreadsheetDecoder>,
        ocr: Arc<dyn OcrEngine>,
    ) -> Self {
        Engine {
            config,
            decoder,
            ocr,
            write_lock: Mutex::new(()),
            reader_cache: RwLock::new(None),
        }
    }

    /// The engine's configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The shared reader for the committed generation, opened on first
    /// use and cached until the next commit.
    fn reader(&self) -> Result<Arc<IndexReader>> {
        {
            let guard = self.reader_cache.read();
            if let Some(reader) = guard.as_ref() {
                return Ok(Arc::clone(reader));
            }
        }
        let mut guard = self.reader_cache.write();
        if guard.is_none() {
            *guard = Some(Arc::new(IndexReader::open(&self.config.index_dir)?));
        }
        Ok(Arc::clone(guard.as_ref().unwrap()))
    }

    /// Drop the cached reader; the next query reopens the index.
    pub fn refresh(&self) {
        *self.reader_cache.write() = None;
    }

    /// Extract every workbook under the content root.
    ///
    /// File-level failures are collected in the outcome; the call
    /// succeeds as long as the root is walkable.
    pub fn process_directory(
        &self,
        observer: &dyn ProgressObserver,
    ) -> Result<ExtractionOutcome> {
        let extractor = ContentExtractor::with_collaborators(
            &self.config.content_root,
            Arc::clone(&self.decoder),
            Arc::clone(&self.ocr),
        );
        extractor.process_directory(observer)
    }

    /// Build and commit a new index generation from extracted workbooks.
    ///
    /// Replaces the index wholesale and atomically; concurrent queries
    /// see the prior generation until the commit completes.
    pub fn index_content(&self, workbooks: &[WorkbookContent]) -> Result<CommitOutcome> {
        let documents = build_documents(workbooks);
        let _write_guard = self.write_lock.lock();
        let outcome = IndexWriter::new(&self.config.index_dir).commit(&documents)?;
        *self.reader_cache.write() = None;
        Ok(outcome)
    }

    /// Field-scoped search with relevance ranking and highlights.
    pub fn search(
        &self,
        field: &str,
        query: &str,
        limit: Option<i64>,
    ) -> Result<Vec<SearchResult>> {
        let field = Field::parse(field)?;
        let reader = self.reader()?;
        query::search(&reader, field, query, limit)
    }

    /// Search OCR-recovered image text.
    pub fn search_images(&self, query_str: &str) -> Result<Vec<SearchResult>> {
        let reader = self.reader()?;
        query::search(&reader, Field::Text(TextField::ImageContent), query_str, None)
    }

    /// First exact match on `filename`, or `None`.
    ///
    /// Duplicate filenames under different paths resolve to the
    /// lexicographically smallest `relative_path`.
    pub fn get_file_location(&self, filename: &str) -> Result<Option<FileLocation>> {
        let reader = self.reader()?;
        let mut best: Option<FileLocation> = None;
        for (_, record) in reader.records() {
            if record.document.filename != filename {
                continue;
            }
            let candidate = &record.document.relative_path;
            if best
                .as_ref()
                .is_none_or(|b| candidate < &b.relative_path)
            {
                best = Some(FileLocation {
                    filename: record.document.filename.clone(),
                    relative_path: candidate.clone(),
                });
            }
        }
        Ok(best)
    }

    /// All files whose name or relative path contains `needle`.
    ///
    /// Unscored, index scan order, one entry per distinct path.
    pub fn search_by_filename(&self, needle: &str) -> Result<Vec<FileLocation>> {
        let reader = self.reader()?;
        let mut locations: Vec<FileLocation> = Vec::new();
        for (_, record) in reader.records() {
            let doc = &record.document;
            if !doc.filename.contains(needle) && !doc.relative_path.contains(needle) {
                continue;
            }
            if locations.iter().any(|l| l.relative_path == doc.relative_path) {
                continue;
            }
            locations.push(FileLocation {
                filename: doc.filename.clone(),
                relative_path: doc.relative_path.clone(),
            });
        }
        Ok(locations)
    }

    /// List every spreadsheet file under `content_root/<key>`.
    ///
    /// A filesystem lookup independent of the index. Fails softly: a
    /// missing subdirectory yields an empty result.
    pub fn search_by_gene_symbol(&self, key: &str) -> Result<Vec<FileLocation>> {
        if key.is_empty()
            || key.contains(['/', '\\'])
            || key == "."
            || key == ".."
        {
            warn!("rejecting gene symbol key {key:?}");
            return Ok(Vec::new());
        }

        let dir = self.config.content_root.join(key);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut locations = Vec::new();
        for entry in WalkDir::new(&dir) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("cannot read directory entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_spreadsheet_candidate(entry.path()) {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&self.config.content_root)
                .unwrap_or(entry.path());
            let relative_path = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            locations.push(FileLocation {
                filename: entry.file_name().to_string_lossy().into_owned(),
                relative_path,
            });
        }
        locations.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Ok(locations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{SheetContent, SheetImage};
    use crate::error::CrocusError;
    use crate::extract::NullProgress;
    use tempfile::TempDir;

    fn workbook(relative_path: &str, sheet: &str, content: &str) -> WorkbookContent {
        let filename = relative_path.rsplit('/').next().unwrap().to_string();
        WorkbookContent {
            filename,
            relative_path: relative_path.to_string(),
            sheets: vec![SheetContent {
                name: sheet.to_string(),
                cell_text: content.to_string(),
                images: vec![],
            }],
        }
    }

    fn engine(dir: &TempDir) -> Engine {
        let content_root = dir.path().join("content");
        std::fs::create_dir_all(&content_root).unwrap();
        Engine::new(Config::new(content_root, dir.path().join("index")))
    }

    #[test]
    fn test_search_before_indexing_reports_missing_index() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let err = engine.search("content", "anything", None).unwrap_err();
        assert!(matches!(err, CrocusError::IndexMissing { .. }));
    }

    #[test]
    fn test_index_and_search() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        engine
            .index_content(&[workbook("a.xlsx", "Sheet1", "BRCA1 variant")])
            .unwrap();

        let results = engine.search("content", "BRCA1", None).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].relative_path, "a.xlsx");
        assert!(results[0].score > 0.0);
    }

    #[test]
    fn test_commit_invalidates_reader_cache() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        engine
            .index_content(&[workbook("a.xlsx", "Sheet1", "first")])
            .unwrap();
        assert_eq!(engine.search("content", "first", None).unwrap().len(), 1);

        engine
            .index_content(&[workbook("b.xlsx", "Sheet1", "second")])
            .unwrap();
        assert!(engine.search("content", "first", None).unwrap().is_empty());
        assert_eq!(engine.search("content", "second", None).unwrap().len(), 1);
    }

    #[test]
    fn test_get_file_location_tie_break() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        engine
            .index_content(&[
                workbook("z/dup.xlsx", "S", "x"),
                workbook("a/dup.xlsx", "S", "x"),
            ])
            .unwrap();

        let location = engine.get_file_location("dup.xlsx").unwrap().unwrap();
        assert_eq!(location.relative_path, "a/dup.xlsx");

        assert!(engine.get_file_location("missing.xlsx").unwrap().is_none());
    }

    #[test]
    fn test_search_by_filename_substring_and_dedup() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let mut multi_sheet = workbook("genes/report.xlsx", "S1", "x");
        multi_sheet.sheets.push(SheetContent {
            name: "S2".to_string(),
            cell_text: "y".to_string(),
            images: vec![],
        });
        engine
            .index_content(&[multi_sheet, workbook("other.xlsx", "S", "z")])
            .unwrap();

        let locations = engine.search_by_filename("report").unwrap();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].relative_path, "genes/report.xlsx");

        // Substring of the path also matches.
        let locations = engine.search_by_filename("genes/").unwrap();
        assert_eq!(locations.len(), 1);

        let locations = engine.search_by_filename("zzz").unwrap();
        assert!(locations.is_empty());
    }

    #[test]
    fn test_search_images_scoped_to_image_field() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let mut with_image = workbook("b.xlsx", "Data", "control sample");
        with_image.sheets[0].images.push(SheetImage {
            coordinate: "A1".to_string(),
            text: "BRCA1 confirmed".to_string(),
        });
        engine
            .index_content(&[workbook("a.xlsx", "Sheet1", "BRCA1 variant"), with_image])
            .unwrap();

        let results = engine.search_images("BRCA1").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].filename, "b.xlsx");
    }

    #[test]
    fn test_search_by_gene_symbol() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let root = &engine.config().content_root;
        std::fs::create_dir_all(root.join("BRCA1/2024")).unwrap();
        std::fs::write(root.join("BRCA1/first.xlsx"), b"x").unwrap();
        std::fs::write(root.join("BRCA1/2024/second.xls"), b"x").unwrap();
        std::fs::write(root.join("BRCA1/notes.txt"), b"x").unwrap();

        let locations = engine.search_by_gene_symbol("BRCA1").unwrap();
        let paths: Vec<_> = locations.iter().map(|l| l.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["BRCA1/2024/second.xls", "BRCA1/first.xlsx"]);

        assert!(engine.search_by_gene_symbol("TP53").unwrap().is_empty());
        assert!(engine.search_by_gene_symbol("../etc").unwrap().is_empty());
    }

    #[test]
    fn test_process_directory_uses_configured_root() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        // Root exists but holds no spreadsheets.
        let outcome = engine.process_directory(&NullProgress).unwrap();
        assert!(outcome.workbooks.is_empty());
        assert!(outcome.skipped.is_empty());
    }
}
