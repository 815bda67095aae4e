//! Index writer: builds a complete generation and commits it atomically.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use byteorder::{LittleEndian, WriteBytesExt};
use log::{info, warn};

use crate::analysis;
use crate::document::{Document, TextField};
use crate::error::Result;
use crate::index::posting::{Posting, encode_postings};
use crate::index::{
    CURRENT_FILE, CurrentMarker, DOCS_FILE, DOCS_MAGIC, FORMAT_VERSION, FieldLengths, FieldPostings,
    FieldStats, IndexMetadata, META_FILE, PostingMap, StoredRecord, TERMS_MAGIC, generation_dir,
    read_current, terms_file_name,
};

/// Outcome of a successful commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitOutcome {
    /// The generation that became current.
    pub generation: u64,
    /// Number of documents in the generation.
    pub doc_count: u64,
}

/// Writes complete index generations.
///
/// A writer run replaces the index directory's content wholesale: it
/// tokenizes every document, builds per-field posting lists in memory,
/// writes the new generation into a staging directory inside the index
/// directory, renames it into place and then swaps the `CURRENT` marker.
/// Concurrent readers observe either the prior generation or the new
/// one, never a mix. Two writers must not run against the same index
/// directory at once; the service layer serializes them.
#[derive(Debug)]
pub struct IndexWriter {
    index_dir: PathBuf,
}

impl IndexWriter {
    /// Create a writer for the given index directory.
    pub fn new(index_dir: impl Into<PathBuf>) -> Self {
        IndexWriter {
            index_dir: index_dir.into(),
        }
    }

    /// Build a new generation from `documents` and commit it.
    ///
    /// All-or-nothing: on any error the index directory is left with the
    /// prior generation unchanged (or empty on first build).
    pub fn commit(&self, documents: &[Document]) -> Result<CommitOutcome> {
        fs::create_dir_all(&self.index_dir)?;

        let prior = read_current(&self.index_dir)?;
        let generation = prior.unwrap_or(0) + 1;

        let build = analyze_documents(documents);

        // Stage the complete generation, then rename it into place.
        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&self.index_dir)?;

        write_meta(staging.path(), generation, &build)?;
        write_docs(staging.path(), &build.records)?;
        for field in TextField::ALL {
            write_terms(staging.path(), field, &build.postings[&field])?;
        }

        let gen_dir = generation_dir(&self.index_dir, generation);
        if gen_dir.exists() {
            // Leftover from a run that died between staging and the
            // CURRENT swap; it was never visible to readers.
            fs::remove_dir_all(&gen_dir)?;
        }
        fs::rename(staging.keep(), &gen_dir)?;

        self.swap_current(generation)?;
        self.remove_stale_generations(generation);

        info!(
            "committed generation {} ({} documents) to {}",
            generation,
            build.records.len(),
            self.index_dir.display()
        );

        Ok(CommitOutcome {
            generation,
            doc_count: build.records.len() as u64,
        })
    }

    /// Atomically point `CURRENT` at the new generation.
    fn swap_current(&self, generation: u64) -> Result<()> {
        let marker = serde_json::to_vec_pretty(&CurrentMarker { generation })?;
        let tmp = self.index_dir.join(format!("{CURRENT_FILE}.tmp"));
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&marker)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, self.index_dir.join(CURRENT_FILE))?;
        Ok(())
    }

    /// Delete generation directories other than the current one.
    ///
    /// Failures are logged, not propagated: the new generation is already
    /// committed and a stale directory is only wasted space.
    fn remove_stale_generations(&self, current: u64) {
        let entries = match fs::read_dir(&self.index_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("cannot list {}: {e}", self.index_dir.display());
                return;
            }
        };
        let keep = super::generation_dir_name(current);
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with("gen-") && name != keep {
                if let Err(e) = fs::remove_dir_all(entry.path()) {
                    warn!("cannot remove stale generation {name}: {e}");
                }
            }
        }
    }
}

/// Everything derived from the input documents in one analysis pass.
struct GenerationBuild {
    records: Vec<StoredRecord>,
    postings: FieldPostings,
    stats: Vec<FieldStats>,
}

/// Tokenize documents and build stored records plus posting maps.
///
/// Document ids are assigned by input order, which makes a rebuild from
/// the same inputs produce the same stored set.
fn analyze_documents(documents: &[Document]) -> GenerationBuild {
    let mut records = Vec::with_capacity(documents.len());
    let mut postings: FieldPostings = TextField::ALL
        .iter()
        .map(|&field| (field, PostingMap::default()))
        .collect();
    let mut stats: Vec<FieldStats> = TextField::ALL
        .iter()
        .map(|&field| FieldStats {
            name: field.name().to_string(),
            doc_count: 0,
            total_tokens: 0,
        })
        .collect();

    for (doc_id, document) in documents.iter().enumerate() {
        let doc_id = doc_id as u64;
        let mut lengths = FieldLengths::default();

        for (field_idx, &field) in TextField::ALL.iter().enumerate() {
            let tokens = analysis::tokenize(document.text_value(field));
            let token_count = tokens.len() as u32;
            match field {
                TextField::Content => lengths.content = token_count,
                TextField::ImageContent => lengths.image_content = token_count,
            }
            if token_count > 0 {
                stats[field_idx].doc_count += 1;
                stats[field_idx].total_tokens += token_count as u64;
            }

            let map = postings.get_mut(&field).unwrap();
            for token in tokens {
                let list = map.entry(token.text).or_default();
                match list.last_mut() {
                    Some(last) if last.doc_id == doc_id => {
                        last.term_freq += 1;
                        last.positions.push(token.position);
                    }
                    _ => list.push(Posting {
                        doc_id,
                        term_freq: 1,
                        positions: vec![token.position],
                    }),
                }
            }
        }

        records.push(StoredRecord {
            document: document.clone(),
            field_lengths: lengths,
        });
    }

    GenerationBuild {
        records,
        postings,
        stats,
    }
}

fn write_meta(dir: &Path, generation: u64, build: &GenerationBuild) -> Result<()> {
    let created_at_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    let meta = IndexMetadata {
        format_version: FORMAT_VERSION,
        generation,
        doc_count: build.records.len() as u64,
        fields: build.stats.clone(),
        created_at_ms,
    };
    write_synced(&dir.join(META_FILE), &serde_json::to_vec_pretty(&meta)?)
}

/// Write stored-field records: magic, count, then per record a doc id,
/// a length prefix and the JSON payload; CRC32 of everything at the end.
fn write_docs(dir: &Path, records: &[StoredRecord]) -> Result<()> {
    let mut buf = Vec::new();
    buf.write_u32::<LittleEndian>(DOCS_MAGIC)?;
    buf.write_u32::<LittleEndian>(records.len() as u32)?;
    for (doc_id, record) in records.iter().enumerate() {
        let payload = serde_json::to_vec(record)?;
        buf.write_u64::<LittleEndian>(doc_id as u64)?;
        buf.write_u32::<LittleEndian>(payload.len() as u32)?;
        buf.extend_from_slice(&payload);
    }
    append_crc(&mut buf)?;
    write_synced(&dir.join(DOCS_FILE), &buf)
}

/// Write one field's term dictionary with inline posting lists.
///
/// Terms are sorted bytewise so a rebuild from the same inputs is
/// byte-identical apart from metadata timestamps.
fn write_terms(dir: &Path, field: TextField, map: &PostingMap) -> Result<()> {
    let mut terms: Vec<&String> = map.keys().collect();
    terms.sort_unstable();

    let mut buf = Vec::new();
    buf.write_u32::<LittleEndian>(TERMS_MAGIC)?;
    buf.write_u32::<LittleEndian>(terms.len() as u32)?;

    let mut posting_buf = Vec::new();
    for term in terms {
        let postings = &map[term];
        posting_buf.clear();
        encode_postings(postings, &mut posting_buf)?;

        buf.write_u32::<LittleEndian>(term.len() as u32)?;
        buf.extend_from_slice(term.as_bytes());
        buf.write_u32::<LittleEndian>(postings.len() as u32)?;
        buf.write_u32::<LittleEndian>(posting_buf.len() as u32)?;
        buf.extend_from_slice(&posting_buf);
    }
    append_crc(&mut buf)?;
    write_synced(&dir.join(terms_file_name(field)), &buf)
}

fn append_crc(buf: &mut Vec<u8>) -> Result<()> {
    let crc = crc32fast::hash(buf);
    buf.write_u32::<LittleEndian>(crc)?;
    Ok(())
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::read_current;
    use tempfile::TempDir;

    fn doc(filename: &str, sheet: &str, content: &str) -> Document {
        Document {
            filename: filename.to_string(),
            relative_path: filename.to_string(),
            sheet_name: sheet.to_string(),
            content: content.to_string(),
            image_content: String::new(),
        }
    }

    #[test]
    fn test_first_commit_creates_generation_one() {
        let dir = TempDir::new().unwrap();
        let writer = IndexWriter::new(dir.path());
        let outcome = writer.commit(&[doc("a.xlsx", "Sheet1", "hello")]).unwrap();

        assert_eq!(outcome.generation, 1);
        assert_eq!(outcome.doc_count, 1);
        assert_eq!(read_current(dir.path()).unwrap(), Some(1));
        assert!(dir.path().join("gen-000001").join(META_FILE).exists());
        assert!(dir.path().join("gen-000001").join(DOCS_FILE).exists());
        assert!(dir.path().join("gen-000001").join("content.terms").exists());
    }

    #[test]
    fn test_recommit_replaces_generation() {
        let dir = TempDir::new().unwrap();
        let writer = IndexWriter::new(dir.path());
        writer.commit(&[doc("a.xlsx", "Sheet1", "one")]).unwrap();
        let outcome = writer.commit(&[doc("b.xlsx", "Sheet1", "two")]).unwrap();

        assert_eq!(outcome.generation, 2);
        assert_eq!(read_current(dir.path()).unwrap(), Some(2));
        assert!(dir.path().join("gen-000002").exists());
        assert!(!dir.path().join("gen-000001").exists());
    }

    #[test]
    fn test_commit_empty_document_set() {
        let dir = TempDir::new().unwrap();
        let writer = IndexWriter::new(dir.path());
        let outcome = writer.commit(&[]).unwrap();
        assert_eq!(outcome.doc_count, 0);
        assert_eq!(read_current(dir.path()).unwrap(), Some(1));
    }

    #[test]
    fn test_analyze_assigns_ids_in_input_order() {
        let documents = vec![
            doc("a.xlsx", "S1", "alpha beta"),
            doc("b.xlsx", "S1", "beta gamma beta"),
        ];
        let build = analyze_documents(&documents);

        assert_eq!(build.records.len(), 2);
        let beta = &build.postings[&TextField::Content]["beta"];
        assert_eq!(beta.len(), 2);
        assert_eq!(beta[0].doc_id, 0);
        assert_eq!(beta[0].term_freq, 1);
        assert_eq!(beta[1].doc_id, 1);
        assert_eq!(beta[1].term_freq, 2);
        assert_eq!(beta[1].positions, vec![0, 2]);
    }

    #[test]
    fn test_analyze_tracks_field_lengths() {
        let mut d = doc("a.xlsx", "S1", "one two three");
        d.image_content = "ocr text".to_string();
        let build = analyze_documents(&[d]);
        assert_eq!(build.records[0].field_lengths.content, 3);
        assert_eq!(build.records[0].field_lengths.image_content, 2);
    }
}
