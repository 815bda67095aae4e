//! Spreadsheet decoder boundary.
//!
//! The decoder is an external capability: given a file path it yields,
//! per sheet, an ordered row grid of cell values and the embedded images
//! with their cell anchors. The default implementation is backed by
//! calamine, which handles both supported input formats transparently.

use std::fmt;
use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Reader, Sheets, open_workbook_auto, open_workbook_auto_from_rs};
use log::warn;

use crate::error::{CrocusError, Result};

/// How a workbook should be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    /// Low-memory first attempt: stream from the file.
    ReadOnly,
    /// Fallback: buffer the whole file and parse from memory.
    Full,
}

/// One embedded image, still undecoded.
#[derive(Clone)]
pub struct DecodedImage {
    /// Cell anchor coordinate, e.g. `B4`.
    pub coordinate: String,
    /// Raw bitmap bytes.
    pub bytes: Vec<u8>,
}

impl fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedImage")
            .field("coordinate", &self.coordinate)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// One decoded sheet: the cell grid plus embedded images.
#[derive(Debug, Clone)]
pub struct DecodedSheet {
    /// Sheet name.
    pub name: String,
    /// Cell values, row-major; missing cells are empty strings.
    pub rows: Vec<Vec<String>>,
    /// Embedded images in discovery order.
    pub images: Vec<DecodedImage>,
}

/// External spreadsheet decoding capability.
///
/// A sheet that cannot be decoded is omitted from the result (and
/// logged); only a workbook that cannot be opened at all is an error.
pub trait SpreadsheetDecoder: Send + Sync {
    /// Decode the workbook at `path`.
    fn decode(&self, path: &Path, mode: DecodeMode) -> Result<Vec<DecodedSheet>>;
}

/// Decoder backed by calamine.
///
/// `open_workbook_auto` dispatches on the actual file content, so both
/// supported input formats go through the same entry point. calamine
/// exposes no drawing layer, so this decoder yields no embedded images;
/// image-bearing decoders implement the same trait.
#[derive(Debug, Default, Clone, Copy)]
pub struct CalamineDecoder;

impl SpreadsheetDecoder for CalamineDecoder {
    fn decode(&self, path: &Path, mode: DecodeMode) -> Result<Vec<DecodedSheet>> {
        if !crate::extract::is_spreadsheet_candidate(path) {
            return Err(CrocusError::unsupported(path));
        }
        match mode {
            DecodeMode::ReadOnly => {
                let workbook = open_workbook_auto(path)
                    .map_err(|e| CrocusError::decode(path, e.to_string()))?;
                read_sheets(path, workbook)
            }
            DecodeMode::Full => {
                let bytes = std::fs::read(path)?;
                let workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
                    .map_err(|e| CrocusError::decode(path, e.to_string()))?;
                read_sheets(path, workbook)
            }
        }
    }
}

fn read_sheets<RS>(path: &Path, mut workbook: Sheets<RS>) -> Result<Vec<DecodedSheet>>
where
    RS: std::io::Read + std::io::Seek,
{
    let names = workbook.sheet_names().to_owned();
    let mut sheets = Vec::with_capacity(names.len());

    for name in names {
        let range = match workbook.worksheet_range(&name) {
            Ok(range) => range,
            Err(e) => {
                warn!("{}", CrocusError::sheet(path, &name, e.to_string()));
                continue;
            }
        };
        let rows = range
            .rows()
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        Data::Empty => String::new(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .collect();
        sheets.push(DecodedSheet {
            name,
            rows,
            images: Vec::new(),
        });
    }

    Ok(sheets)
}
