//! Shared test collaborators: an in-memory spreadsheet decoder and a
//! fake OCR engine that reads image bytes as UTF-8 text.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use crocus::extract::{
    DecodeMode, DecodedImage, DecodedSheet, OcrEngine, ProgressObserver, SpreadsheetDecoder,
};
use crocus::{CrocusError, Result};

/// Decoder serving canned sheets keyed by file name.
#[derive(Default)]
pub struct FakeDecoder {
    sheets: HashMap<String, Vec<DecodedSheet>>,
    failing: HashSet<String>,
    failing_readonly: HashSet<String>,
}

impl FakeDecoder {
    pub fn new() -> Self {
        FakeDecoder::default()
    }

    /// Serve `sheets` for the given file name.
    pub fn insert(mut self, filename: &str, sheets: Vec<DecodedSheet>) -> Self {
        self.sheets.insert(filename.to_string(), sheets);
        self
    }

    /// Fail decoding in both modes for the given file name.
    pub fn failing(mut self, filename: &str) -> Self {
        self.failing.insert(filename.to_string());
        self
    }

    /// Fail the read-only mode only; the full-parse fallback succeeds.
    pub fn failing_readonly(mut self, filename: &str) -> Self {
        self.failing_readonly.insert(filename.to_string());
        self
    }
}

impl SpreadsheetDecoder for FakeDecoder {
    fn decode(&self, path: &Path, mode: DecodeMode) -> Result<Vec<DecodedSheet>> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if self.failing.contains(&name) {
            return Err(CrocusError::decode(path, "simulated decode failure"));
        }
        if mode == DecodeMode::ReadOnly && self.failing_readonly.contains(&name) {
            return Err(CrocusError::decode(path, "simulated read-only failure"));
        }
        self.sheets
            .get(&name)
            .cloned()
            .ok_or_else(|| CrocusError::decode(path, "unknown file"))
    }
}

/// OCR engine that "recognizes" image bytes as UTF-8 text. Bytes
/// starting with `FAIL` simulate a per-image recognition failure.
pub struct UtfOcr;

impl OcrEngine for UtfOcr {
    fn recognize(&self, image: &[u8]) -> Result<String> {
        if image.starts_with(b"FAIL") {
            return Err(CrocusError::internal("simulated recognition failure"));
        }
        Ok(String::from_utf8_lossy(image).trim().to_string())
    }
}

/// Build a decoded sheet from rows of cells and (coordinate, ocr-text)
/// image pairs; the fake OCR engine recovers the text from the bytes.
pub fn sheet(name: &str, rows: &[&[&str]], images: &[(&str, &str)]) -> DecodedSheet {
    DecodedSheet {
        name: name.to_string(),
        rows: rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect(),
        images: images
            .iter()
            .map(|(coordinate, text)| DecodedImage {
                coordinate: coordinate.to_string(),
                bytes: text.as_bytes().to_vec(),
            })
            .collect(),
    }
}

/// Records every progress callback.
#[derive(Default)]
pub struct CaptureProgress {
    pub events: Mutex<Vec<(usize, usize)>>,
}

impl ProgressObserver for CaptureProgress {
    fn on_progress(&self, processed: usize, total: usize) {
        self.events.lock().unwrap().push((processed, total));
    }
}

/// Create empty placeholder files under `root` so the directory walk
/// discovers them; the fake decoder ignores their contents.
pub fn touch_files(root: &Path, names: &[&str]) {
    for name in names {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, b"placeholder").unwrap();
    }
}
