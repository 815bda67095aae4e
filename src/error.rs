//! Error types for the crocus crate.

use std::path::Path;

use thiserror::Error;

/// Errors produced by extraction, indexing and querying.
///
/// Extraction-level failures (`DecodeFailure`, `SheetProcessingFailure`,
/// `ImageExtractionFailure`) are recovered locally by the extractor and
/// surface only in skip reports and logs. Index- and query-level failures
/// propagate to the caller.
#[derive(Debug, Error)]
pub enum CrocusError {
    /// File extension is not a recognized spreadsheet format.
    #[error("unsupported format: {path}")]
    UnsupportedFormat {
        /// Path of the rejected file.
        path: String,
    },

    /// Workbook could not be decoded even after the full-parse fallback.
    #[error("failed to decode workbook {path}: {reason}")]
    DecodeFailure {
        /// Path of the unreadable workbook.
        path: String,
        /// Underlying decoder message.
        reason: String,
    },

    /// One sheet within an otherwise-good workbook failed to process.
    #[error("failed to process sheet '{sheet}' in {path}: {reason}")]
    SheetProcessingFailure {
        /// Path of the containing workbook.
        path: String,
        /// Name of the failed sheet.
        sheet: String,
        /// Underlying message.
        reason: String,
    },

    /// One embedded image could not be read or recognized.
    #[error("failed to extract image at {coordinate} in {path}: {reason}")]
    ImageExtractionFailure {
        /// Path of the containing workbook.
        path: String,
        /// Cell anchor of the image.
        coordinate: String,
        /// Underlying message.
        reason: String,
    },

    /// No committed index generation exists under the index directory.
    #[error("no index found at {path}")]
    IndexMissing {
        /// Index directory that was probed.
        path: String,
    },

    /// Malformed query string.
    #[error("invalid query syntax: {0}")]
    InvalidQuerySyntax(String),

    /// Explicit result limit was zero or negative.
    #[error("invalid result limit: {0}")]
    InvalidLimit(i64),

    /// An index file failed structural or checksum validation.
    #[error("corrupt index file {file}: {reason}")]
    Corrupt {
        /// Offending file name.
        file: String,
        /// What failed to validate.
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Any other error.
    #[error("{0}")]
    Internal(String),
}

impl CrocusError {
    /// Create an unsupported-format error for the given path.
    pub fn unsupported(path: &Path) -> Self {
        CrocusError::UnsupportedFormat {
            path: path.display().to_string(),
        }
    }

    /// Create a decode failure for the given path.
    pub fn decode(path: &Path, reason: impl Into<String>) -> Self {
        CrocusError::DecodeFailure {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }

    /// Create a sheet processing failure.
    pub fn sheet(path: &Path, sheet: impl Into<String>, reason: impl Into<String>) -> Self {
        CrocusError::SheetProcessingFailure {
            path: path.display().to_string(),
            sheet: sheet.into(),
            reason: reason.into(),
        }
    }

    /// Create an image extraction failure.
    pub fn image(path: &Path, coordinate: impl Into<String>, reason: impl Into<String>) -> Self {
        CrocusError::ImageExtractionFailure {
            path: path.display().to_string(),
            coordinate: coordinate.into(),
            reason: reason.into(),
        }
    }

    /// Create an index-missing error for the given index directory.
    pub fn index_missing(path: &Path) -> Self {
        CrocusError::IndexMissing {
            path: path.display().to_string(),
        }
    }

    /// Create an invalid-query error.
    pub fn invalid_query(reason: impl Into<String>) -> Self {
        CrocusError::InvalidQuerySyntax(reason.into())
    }

    /// Create a corrupt-index error for the given file.
    pub fn corrupt(file: impl Into<String>, reason: impl Into<String>) -> Self {
        CrocusError::Corrupt {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// Create a generic internal error.
    pub fn internal(reason: impl Into<String>) -> Self {
        CrocusError::Internal(reason.into())
    }
}

/// Result type alias using [`CrocusError`].
pub type Result<T> = std::result::Result<T, CrocusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CrocusError::decode(Path::new("a/b.xlsx"), "bad zip");
        assert_eq!(err.to_string(), "failed to decode workbook a/b.xlsx: bad zip");

        let err = CrocusError::InvalidLimit(0);
        assert_eq!(err.to_string(), "invalid result limit: 0");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: CrocusError = io.into();
        assert!(matches!(err, CrocusError::Io(_)));
    }
}
