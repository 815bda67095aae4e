//! Index reader: opens the committed generation of an index directory.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use byteorder::{ByteOrder, LittleEndian};

use crate::document::TextField;
use crate::error::{CrocusError, Result};
use crate::index::posting::{Posting, decode_postings};
use crate::index::{
    DOCS_FILE, DOCS_MAGIC, FORMAT_VERSION, IndexMetadata, META_FILE, StoredRecord, TERMS_MAGIC,
    generation_dir, read_current, terms_file_name,
};

/// Location of one term's posting bytes inside a dictionary blob.
#[derive(Debug, Clone, Copy)]
struct TermEntry {
    doc_freq: u32,
    offset: usize,
    len: usize,
}

/// One full-text field's term dictionary, loaded from its `.terms` file.
///
/// The file is held in memory as a single checksummed blob; posting
/// lists are decoded on demand from their recorded byte ranges.
#[derive(Debug)]
struct TermDictionary {
    file_name: String,
    blob: Vec<u8>,
    terms: AHashMap<String, TermEntry>,
}

impl TermDictionary {
    fn load(dir: &Path, field: TextField) -> Result<Self> {
        let file_name = terms_file_name(field);
        let blob = read_checksummed(&dir.join(&file_name), &file_name, TERMS_MAGIC)?;

        let mut terms = AHashMap::new();
        let mut pos = 8; // magic + term count
        let term_count = LittleEndian::read_u32(&blob[4..8]);

        for _ in 0..term_count {
            let term_len = read_len(&blob, &mut pos, &file_name)? as usize;
            let term_bytes = slice_at(&blob, pos, term_len, &file_name)?;
            let term = std::str::from_utf8(term_bytes)
                .map_err(|_| CrocusError::corrupt(&file_name, "term is not valid UTF-8"))?
                .to_string();
            pos += term_len;

            let doc_freq = read_len(&blob, &mut pos, &file_name)?;
            let postings_len = read_len(&blob, &mut pos, &file_name)? as usize;
            slice_at(&blob, pos, postings_len, &file_name)?;
            terms.insert(
                term,
                TermEntry {
                    doc_freq,
                    offset: pos,
                    len: postings_len,
                },
            );
            pos += postings_len;
        }

        if pos != blob.len() {
            return Err(CrocusError::corrupt(
                &file_name,
                "trailing bytes after term dictionary",
            ));
        }

        Ok(TermDictionary {
            file_name,
            blob,
            terms,
        })
    }

    fn doc_freq(&self, term: &str) -> u32 {
        self.terms.get(term).map(|e| e.doc_freq).unwrap_or(0)
    }

    fn postings(&self, term: &str) -> Result<Option<Vec<Posting>>> {
        let Some(entry) = self.terms.get(term) else {
            return Ok(None);
        };
        let bytes = &self.blob[entry.offset..entry.offset + entry.len];
        let postings = decode_postings(bytes, entry.doc_freq)
            .map_err(|e| CrocusError::corrupt(&self.file_name, e.to_string()))?;
        Ok(Some(postings))
    }
}

/// A transient, read-only handle to one committed index generation.
///
/// The generation is immutable, so any number of readers may be open
/// concurrently without coordination. Opening resolves `CURRENT`,
/// validates checksums and loads stored records and term dictionaries.
#[derive(Debug)]
pub struct IndexReader {
    index_dir: PathBuf,
    meta: IndexMetadata,
    records: Vec<StoredRecord>,
    dictionaries: HashMap<TextField, TermDictionary>,
}

impl IndexReader {
    /// Open the current generation under `index_dir`.
    ///
    /// Returns [`CrocusError::IndexMissing`] when the directory does not
    /// exist or holds no committed generation.
    pub fn open(index_dir: &Path) -> Result<Self> {
        let generation = match read_current(index_dir) {
            Ok(Some(generation)) => generation,
            Ok(None) => return Err(CrocusError::index_missing(index_dir)),
            Err(CrocusError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CrocusError::index_missing(index_dir));
            }
            Err(e) => return Err(e),
        };

        let dir = generation_dir(index_dir, generation);
        let meta_bytes = fs::read(dir.join(META_FILE))?;
        let meta: IndexMetadata = serde_json::from_slice(&meta_bytes)
            .map_err(|e| CrocusError::corrupt(META_FILE, e.to_string()))?;
        if meta.format_version != FORMAT_VERSION {
            return Err(CrocusError::corrupt(
                META_FILE,
                format!(
                    "format version {} is not supported (expected {})",
                    meta.format_version, FORMAT_VERSION
                ),
            ));
        }

        let records = load_records(&dir)?;
        if records.len() as u64 != meta.doc_count {
            return Err(CrocusError::corrupt(
                DOCS_FILE,
                format!(
                    "stored {} documents but metadata says {}",
                    records.len(),
                    meta.doc_count
                ),
            ));
        }

        let mut dictionaries = HashMap::new();
        for field in TextField::ALL {
            dictionaries.insert(field, TermDictionary::load(&dir, field)?);
        }

        Ok(IndexReader {
            index_dir: index_dir.to_path_buf(),
            meta,
            records,
            dictionaries,
        })
    }

    /// The index directory this reader was opened on.
    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    /// The committed generation number.
    pub fn generation(&self) -> u64 {
        self.meta.generation
    }

    /// Generation metadata.
    pub fn metadata(&self) -> &IndexMetadata {
        &self.meta
    }

    /// Total number of documents.
    pub fn doc_count(&self) -> u64 {
        self.records.len() as u64
    }

    /// The stored record of one document.
    pub fn record(&self, doc_id: u64) -> Option<&StoredRecord> {
        self.records.get(doc_id as usize)
    }

    /// All stored records in ascending doc-id order.
    pub fn records(&self) -> impl Iterator<Item = (u64, &StoredRecord)> {
        self.records
            .iter()
            .enumerate()
            .map(|(id, record)| (id as u64, record))
    }

    /// Number of documents containing `term` in `field`.
    pub fn doc_freq(&self, field: TextField, term: &str) -> u32 {
        self.dictionaries[&field].doc_freq(term)
    }

    /// The posting list of `term` in `field`, or `None` if absent.
    pub fn postings(&self, field: TextField, term: &str) -> Result<Option<Vec<Posting>>> {
        let Some(postings) = self.dictionaries[&field].postings(term)? else {
            return Ok(None);
        };
        // No orphan postings: every posting must reference a stored record.
        if let Some(p) = postings.iter().find(|p| p.doc_id >= self.doc_count()) {
            return Err(CrocusError::corrupt(
                terms_file_name(field),
                format!("posting references unknown document {}", p.doc_id),
            ));
        }
        Ok(Some(postings))
    }

    /// Average token count of a full-text field across all documents.
    pub fn avg_field_len(&self, field: TextField) -> f64 {
        self.meta.avg_field_len(field)
    }
}

/// Read a file, verify its magic header and CRC32 footer, and return the
/// blob without the trailing checksum.
fn read_checksummed(path: &Path, file_name: &str, magic: u32) -> Result<Vec<u8>> {
    let mut blob = fs::read(path)?;
    if blob.len() < 12 {
        return Err(CrocusError::corrupt(file_name, "file too short"));
    }
    let stored_crc = LittleEndian::read_u32(&blob[blob.len() - 4..]);
    blob.truncate(blob.len() - 4);
    if crc32fast::hash(&blob) != stored_crc {
        return Err(CrocusError::corrupt(file_name, "checksum mismatch"));
    }
    if LittleEndian::read_u32(&blob[..4]) != magic {
        return Err(CrocusError::corrupt(file_name, "bad magic"));
    }
    Ok(blob)
}

fn load_records(dir: &Path) -> Result<Vec<StoredRecord>> {
    let blob = read_checksummed(&dir.join(DOCS_FILE), DOCS_FILE, DOCS_MAGIC)?;
    let doc_count = LittleEndian::read_u32(&blob[4..8]);

    let mut records = Vec::with_capacity(doc_count as usize);
    let mut pos = 8;
    for expected_id in 0..doc_count as u64 {
        if pos + 12 > blob.len() {
            return Err(CrocusError::corrupt(DOCS_FILE, "truncated record header"));
        }
        let doc_id = LittleEndian::read_u64(&blob[pos..pos + 8]);
        pos += 8;
        if doc_id != expected_id {
            return Err(CrocusError::corrupt(
                DOCS_FILE,
                format!("record out of order: expected {expected_id}, found {doc_id}"),
            ));
        }
        let len = LittleEndian::read_u32(&blob[pos..pos + 4]) as usize;
        pos += 4;
        let payload = slice_at(&blob, pos, len, DOCS_FILE)?;
        let record: StoredRecord = serde_json::from_slice(payload)
            .map_err(|e| CrocusError::corrupt(DOCS_FILE, e.to_string()))?;
        records.push(record);
        pos += len;
    }

    if pos != blob.len() {
        return Err(CrocusError::corrupt(
            DOCS_FILE,
            "trailing bytes after records",
        ));
    }
    Ok(records)
}

fn read_len(blob: &[u8], pos: &mut usize, file_name: &str) -> Result<u32> {
    if *pos + 4 > blob.len() {
        return Err(CrocusError::corrupt(file_name, "truncated length field"));
    }
    let value = LittleEndian::read_u32(&blob[*pos..*pos + 4]);
    *pos += 4;
    Ok(value)
}

fn slice_at<'a>(blob: &'a [u8], pos: usize, len: usize, file_name: &str) -> Result<&'a [u8]> {
    blob.get(pos..pos + len)
        .ok_or_else(|| CrocusError::corrupt(file_name, "range out of bounds"))
}
