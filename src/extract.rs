//! Content extraction: walking a directory tree of workbooks and turning
//! each into [`WorkbookContent`].
//!
//! Extraction is failure-tolerant by level: an unreadable file is
//! skipped and reported, a bad sheet is omitted from its workbook, and a
//! failing image contributes no text. None of these abort the run.

pub mod decoder;
pub mod ocr;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};
use walkdir::WalkDir;

use crate::document::{SheetContent, SheetImage, WorkbookContent};
use crate::error::{CrocusError, Result};

pub use decoder::{CalamineDecoder, DecodeMode, DecodedImage, DecodedSheet, SpreadsheetDecoder};
pub use ocr::{NoOcr, OcrEngine};

/// Recognized spreadsheet file extensions (lowercase).
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls"];

/// Prefix of the temporary lock files spreadsheet editors leave behind.
pub const LOCK_FILE_PREFIX: &str = "~$";

/// Observer for extraction progress.
///
/// `processed` counts files finished (extracted or skipped) out of the
/// `total` discovered. Observability only; correctness never depends on
/// it.
pub trait ProgressObserver: Send + Sync {
    /// Called after each file is processed.
    fn on_progress(&self, processed: usize, total: usize) {
        let _ = (processed, total);
    }
}

/// Observer that ignores all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressObserver for NullProgress {}

/// Whether a file name qualifies for extraction.
pub fn is_spreadsheet_candidate(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.starts_with(LOCK_FILE_PREFIX) {
        return false;
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .is_some_and(|ext| SPREADSHEET_EXTENSIONS.contains(&ext.as_str()))
}

/// A file excluded from extraction, with the reason.
#[derive(Debug)]
pub struct SkippedFile {
    /// Path relative to the content root.
    pub relative_path: String,
    /// Why the file was skipped.
    pub error: CrocusError,
}

/// Everything a directory run produced.
#[derive(Debug, Default)]
pub struct ExtractionOutcome {
    /// Successfully extracted workbooks, in discovery order.
    pub workbooks: Vec<WorkbookContent>,
    /// Files that could not be extracted.
    pub skipped: Vec<SkippedFile>,
}

/// Walks a content root and extracts workbook content.
///
/// Collaborators are injected at construction; [`ContentExtractor::new`]
/// wires the calamine decoder with OCR disabled.
pub struct ContentExtractor {
    root: PathBuf,
    decoder: Arc<dyn SpreadsheetDecoder>,
    ocr: Arc<dyn OcrEngine>,
}

impl std::fmt::Debug for ContentExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentExtractor")
            .field("root", &self.root)
            .finish()
    }
}

impl ContentExtractor {
    /// Create an extractor with the default collaborators.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_collaborators(root, Arc::new(CalamineDecoder), Arc::new(NoOcr))
    }

    /// Create an extractor with explicit decoder and OCR collaborators.
    pub fn with_collaborators(
        root: impl Into<PathBuf>,
        decoder: Arc<dyn SpreadsheetDecoder>,
        ocr: Arc<dyn OcrEngine>,
    ) -> Self {
        ContentExtractor {
            root: root.into(),
            decoder,
            ocr,
        }
    }

    /// The content root this extractor walks.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Discover qualifying files under the root, sorted by path.
    ///
    /// Sorting keeps document ids stable across rebuilds from the same
    /// tree. Unreadable directory entries are logged and skipped.
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Err(CrocusError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("content root {} is not a directory", self.root.display()),
            )));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root) {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() && is_spreadsheet_candidate(entry.path()) {
                        files.push(entry.path().to_path_buf());
                    }
                }
                Err(e) => warn!("cannot read directory entry: {e}"),
            }
        }
        files.sort_unstable();
        Ok(files)
    }

    /// Lazily extract workbooks, one file per iteration.
    ///
    /// Each item is either an extracted workbook or the skip report for
    /// one unreadable file. Dropping the iterator abandons the scan
    /// between files; a new call restarts it.
    pub fn workbooks<'a>(
        &'a self,
        observer: &'a dyn ProgressObserver,
    ) -> Result<Workbooks<'a>> {
        let files = self.discover()?;
        let total = files.len();
        Ok(Workbooks {
            extractor: self,
            files: files.into_iter(),
            observer,
            processed: 0,
            total,
        })
    }

    /// Extract every workbook under the root.
    ///
    /// File-level failures are reported in the outcome, never as an
    /// error: the run succeeds as long as the root is walkable.
    pub fn process_directory(
        &self,
        observer: &dyn ProgressObserver,
    ) -> Result<ExtractionOutcome> {
        let mut outcome = ExtractionOutcome::default();
        for item in self.workbooks(observer)? {
            match item {
                Ok(workbook) => outcome.workbooks.push(workbook),
                Err(skipped) => {
                    warn!("skipping {}: {}", skipped.relative_path, skipped.error);
                    outcome.skipped.push(skipped);
                }
            }
        }
        Ok(outcome)
    }

    /// Path relative to the content root, with forward slashes.
    fn relative_path(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let mut parts = Vec::new();
        for component in relative.components() {
            parts.push(component.as_os_str().to_string_lossy().into_owned());
        }
        parts.join("/")
    }

    /// Extract one workbook, tolerating sheet- and image-level failures.
    fn extract_workbook(&self, path: &Path) -> Result<WorkbookContent> {
        let decoded = match self.decoder.decode(path, DecodeMode::ReadOnly) {
            Ok(sheets) => sheets,
            Err(first) => {
                debug!(
                    "read-only decode of {} failed ({first}), retrying with full parse",
                    path.display()
                );
                self.decoder.decode(path, DecodeMode::Full).map_err(|second| {
                    CrocusError::decode(path, format!("{first}; full parse: {second}"))
                })?
            }
        };

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let relative_path = self.relative_path(path);

        let mut sheets = Vec::with_capacity(decoded.len());
        for sheet in decoded {
            sheets.push(self.extract_sheet(path, sheet));
        }

        Ok(WorkbookContent {
            filename,
            relative_path,
            sheets,
        })
    }

    fn extract_sheet(&self, path: &Path, sheet: DecodedSheet) -> SheetContent {
        let cell_text = render_rows(&sheet.rows);

        let mut images = Vec::with_capacity(sheet.images.len());
        for image in sheet.images {
            match self.ocr.recognize(&image.bytes) {
                Ok(text) => images.push(SheetImage {
                    coordinate: image.coordinate,
                    text,
                }),
                Err(e) => {
                    // Local failure: this image contributes no text.
                    warn!(
                        "{}",
                        CrocusError::image(path, &image.coordinate, e.to_string())
                    );
                }
            }
        }

        SheetContent {
            name: sheet.name,
            cell_text,
            images,
        }
    }
}

/// Render the cell grid as tab-joined rows, newline-joined, preserving
/// row and column order.
fn render_rows(rows: &[Vec<String>]) -> String {
    rows.iter()
        .map(|row| row.join("\t"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Lazy workbook iterator returned by [`ContentExtractor::workbooks`].
pub struct Workbooks<'a> {
    extractor: &'a ContentExtractor,
    files: std::vec::IntoIter<PathBuf>,
    observer: &'a dyn ProgressObserver,
    processed: usize,
    total: usize,
}

impl Iterator for Workbooks<'_> {
    type Item = std::result::Result<WorkbookContent, SkippedFile>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.files.next()?;
        let item = self
            .extractor
            .extract_workbook(&path)
            .map_err(|error| SkippedFile {
                relative_path: self.extractor.relative_path(&path),
                error,
            });
        self.processed += 1;
        self.observer.on_progress(self.processed, self.total);
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_spreadsheet_candidate() {
        assert!(is_spreadsheet_candidate(Path::new("report.xlsx")));
        assert!(is_spreadsheet_candidate(Path::new("legacy.XLS")));
        assert!(is_spreadsheet_candidate(Path::new("macro.xlsm")));
        assert!(!is_spreadsheet_candidate(Path::new("~$report.xlsx")));
        assert!(!is_spreadsheet_candidate(Path::new("notes.txt")));
        assert!(!is_spreadsheet_candidate(Path::new("archive.csv")));
        assert!(!is_spreadsheet_candidate(Path::new("noext")));
    }

    #[test]
    fn test_render_rows() {
        let rows = vec![
            vec!["gene".to_string(), "value".to_string()],
            vec!["BRCA1".to_string(), String::new(), "42".to_string()],
        ];
        assert_eq!(render_rows(&rows), "gene\tvalue\nBRCA1\t\t42");
        assert_eq!(render_rows(&[]), "");
    }

    #[test]
    fn test_discover_filters_and_sorts() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("sub")).unwrap();
        std::fs::write(root.join("b.xlsx"), b"x").unwrap();
        std::fs::write(root.join("sub/a.xlsx"), b"x").unwrap();
        std::fs::write(root.join("~$b.xlsx"), b"x").unwrap();
        std::fs::write(root.join("readme.md"), b"x").unwrap();

        let extractor = ContentExtractor::new(root);
        let files = extractor.discover().unwrap();
        assert_eq!(files, vec![root.join("b.xlsx"), root.join("sub/a.xlsx")]);
    }

    #[test]
    fn test_discover_missing_root() {
        let extractor = ContentExtractor::new("/nonexistent/root");
        assert!(extractor.discover().is_err());
    }

    #[test]
    fn test_relative_path_uses_forward_slashes() {
        let extractor = ContentExtractor::new("/data");
        let rel = extractor.relative_path(Path::new("/data/genes/BRCA1/a.xlsx"));
        assert_eq!(rel, "genes/BRCA1/a.xlsx");
    }
}
