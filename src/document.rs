//! Document model: extracted workbook content and the indexable unit.

use serde::{Deserialize, Serialize};

use crate::error::{CrocusError, Result};

/// Name of the full-text field holding native cell text.
pub const FIELD_CONTENT: &str = "content";
/// Name of the full-text field holding OCR-recovered image text.
pub const FIELD_IMAGE_CONTENT: &str = "image_content";
/// Name of the exact-match filename field.
pub const FIELD_FILENAME: &str = "filename";
/// Name of the exact-match relative-path field.
pub const FIELD_RELATIVE_PATH: &str = "relative_path";
/// Name of the exact-match sheet-name field.
pub const FIELD_SHEET_NAME: &str = "sheet_name";

/// A tokenized, scored full-text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextField {
    /// Native cell text.
    Content,
    /// OCR text recovered from embedded images.
    ImageContent,
}

impl TextField {
    /// All full-text fields, in index layout order.
    pub const ALL: [TextField; 2] = [TextField::Content, TextField::ImageContent];

    /// The field name as written in the index layout.
    pub fn name(&self) -> &'static str {
        match self {
            TextField::Content => FIELD_CONTENT,
            TextField::ImageContent => FIELD_IMAGE_CONTENT,
        }
    }
}

/// A stored-verbatim field supporting exact and wildcard matching only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExactField {
    /// Workbook base name.
    Filename,
    /// Path relative to the content root.
    RelativePath,
    /// Sheet name within the workbook.
    SheetName,
}

impl ExactField {
    /// The field name as exposed at the service boundary.
    pub fn name(&self) -> &'static str {
        match self {
            ExactField::Filename => FIELD_FILENAME,
            ExactField::RelativePath => FIELD_RELATIVE_PATH,
            ExactField::SheetName => FIELD_SHEET_NAME,
        }
    }
}

/// Any queryable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// A tokenized full-text field.
    Text(TextField),
    /// A stored-verbatim exact-match field.
    Exact(ExactField),
}

impl Field {
    /// Resolve a field name from the service boundary.
    pub fn parse(name: &str) -> Result<Field> {
        match name {
            FIELD_CONTENT => Ok(Field::Text(TextField::Content)),
            FIELD_IMAGE_CONTENT => Ok(Field::Text(TextField::ImageContent)),
            FIELD_FILENAME => Ok(Field::Exact(ExactField::Filename)),
            FIELD_RELATIVE_PATH => Ok(Field::Exact(ExactField::RelativePath)),
            FIELD_SHEET_NAME => Ok(Field::Exact(ExactField::SheetName)),
            other => Err(CrocusError::invalid_query(format!(
                "unknown field '{other}'"
            ))),
        }
    }
}

/// Text recovered from one embedded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetImage {
    /// Cell anchor coordinate, e.g. `B4`.
    pub coordinate: String,
    /// Recognized text (may be empty if OCR found nothing).
    pub text: String,
}

/// Extracted content of one sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetContent {
    /// Sheet name.
    pub name: String,
    /// Cell grid rendered as tab-joined rows, newline-joined, row-major.
    pub cell_text: String,
    /// Recognized image texts in discovery order. Empty is common.
    pub images: Vec<SheetImage>,
}

/// Extracted content of one workbook.
///
/// Immutable after extraction; consumed by the document builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkbookContent {
    /// Base name of the workbook file.
    pub filename: String,
    /// Path relative to the scanned content root. Stable identifier.
    pub relative_path: String,
    /// Sheets in workbook order.
    pub sheets: Vec<SheetContent>,
}

/// The indexable unit: one document per sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Workbook base name (exact-match key).
    pub filename: String,
    /// Workbook path relative to the content root (exact-match key).
    pub relative_path: String,
    /// Sheet name (exact-match key).
    pub sheet_name: String,
    /// Full-text field: native cell text.
    pub content: String,
    /// Full-text field: OCR texts joined with newlines; empty if no images.
    pub image_content: String,
}

impl Document {
    /// The stored value of an exact-match field.
    pub fn exact_value(&self, field: ExactField) -> &str {
        match field {
            ExactField::Filename => &self.filename,
            ExactField::RelativePath => &self.relative_path,
            ExactField::SheetName => &self.sheet_name,
        }
    }

    /// The stored value of a full-text field.
    pub fn text_value(&self, field: TextField) -> &str {
        match field {
            TextField::Content => &self.content,
            TextField::ImageContent => &self.image_content,
        }
    }
}

/// Build indexable documents from extracted workbooks.
///
/// Pure transform: one document per sheet, `image_content` formed by
/// joining each image's recognized text with a newline separator.
pub fn build_documents(workbooks: &[WorkbookContent]) -> Vec<Document> {
    let mut documents = Vec::new();
    for workbook in workbooks {
        for sheet in &workbook.sheets {
            let image_content = sheet
                .images
                .iter()
                .map(|image| image.text.as_str())
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            documents.push(Document {
                filename: workbook.filename.clone(),
                relative_path: workbook.relative_path.clone(),
                sheet_name: sheet.name.clone(),
                content: sheet.cell_text.clone(),
                image_content,
            });
        }
    }
    documents
}
