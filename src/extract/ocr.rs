//! Optical character recognition boundary.
//!
//! The OCR engine is an external capability mapping a bitmap to a string
//! of recognized text, with no guarantee on quality. Calls may block for
//! non-trivial time and may fail per image; the extractor treats every
//! failure as local to that image.

use crate::error::Result;

/// External OCR capability.
pub trait OcrEngine: Send + Sync {
    /// Recognize text in a bitmap. May fail per call.
    fn recognize(&self, image: &[u8]) -> Result<String>;
}

/// OCR disabled: every image contributes no text.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOcr;

impl OcrEngine for NoOcr {
    fn recognize(&self, _image: &[u8]) -> Result<String> {
        Ok(String::new())
    }
}

/// Tesseract-backed OCR via leptess.
///
/// A fresh engine is created per call; leptess handles are not shareable
/// across threads.
#[cfg(feature = "ocr-tesseract")]
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    lang: String,
}

#[cfg(feature = "ocr-tesseract")]
impl TesseractOcr {
    /// Create an engine for the given tesseract language code.
    pub fn new(lang: impl Into<String>) -> Self {
        TesseractOcr { lang: lang.into() }
    }
}

#[cfg(feature = "ocr-tesseract")]
impl Default for TesseractOcr {
    fn default() -> Self {
        TesseractOcr::new("eng")
    }
}

#[cfg(feature = "ocr-tesseract")]
impl OcrEngine for TesseractOcr {
    fn recognize(&self, image: &[u8]) -> Result<String> {
        use crate::error::CrocusError;

        let mut engine = leptess::LepTess::new(None, &self.lang)
            .map_err(|e| CrocusError::internal(format!("tesseract init failed: {e}")))?;
        engine
            .set_image_from_mem(image)
            .map_err(|e| CrocusError::internal(format!("tesseract set_image failed: {e}")))?;
        let text = engine
            .get_utf8_text()
            .map_err(|e| CrocusError::internal(format!("tesseract recognition failed: {e}")))?;
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_ocr_returns_empty_text() {
        let ocr = NoOcr;
        assert_eq!(ocr.recognize(&[1, 2, 3]).unwrap(), "");
    }
}
