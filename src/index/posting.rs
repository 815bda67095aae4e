//! Posting lists: per-term document entries with frequencies and positions.

use crate::error::{CrocusError, Result};
use crate::index::varint;

/// One posting: a document containing the term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    /// Internal document id.
    pub doc_id: u64,
    /// Number of occurrences of the term in this document's field.
    pub term_freq: u32,
    /// Token positions of each occurrence, ascending.
    pub positions: Vec<u32>,
}

/// Encode a posting list into `buf`.
///
/// Layout per posting: doc-id delta, term frequency, then position
/// deltas, all varint. Postings must be ordered by ascending doc id;
/// that ordering is what makes the delta encoding valid and scans
/// deterministic.
pub fn encode_postings(postings: &[Posting], buf: &mut Vec<u8>) -> Result<()> {
    let mut prev_doc = 0u64;
    for (i, posting) in postings.iter().enumerate() {
        if i > 0 && posting.doc_id <= prev_doc {
            return Err(CrocusError::internal(
                "posting list not ordered by ascending doc id",
            ));
        }
        if posting.term_freq as usize != posting.positions.len() {
            return Err(CrocusError::internal(
                "posting term frequency does not match position count",
            ));
        }

        let delta = if i == 0 {
            posting.doc_id
        } else {
            posting.doc_id - prev_doc
        };
        varint::append_u64(buf, delta);
        varint::append_u32(buf, posting.term_freq);

        let mut prev_pos = 0u32;
        for (j, &pos) in posting.positions.iter().enumerate() {
            let pos_delta = if j == 0 { pos } else { pos - prev_pos };
            varint::append_u32(buf, pos_delta);
            prev_pos = pos;
        }
        prev_doc = posting.doc_id;
    }
    Ok(())
}

/// Decode a posting list of `doc_freq` entries from `bytes`.
pub fn decode_postings(bytes: &[u8], doc_freq: u32) -> Result<Vec<Posting>> {
    let mut postings = Vec::with_capacity(doc_freq as usize);
    let mut pos = 0usize;
    let mut prev_doc = 0u64;

    for i in 0..doc_freq {
        let delta = varint::read_u64(bytes, &mut pos)?;
        let doc_id = if i == 0 { delta } else { prev_doc + delta };
        let term_freq = varint::read_u32(bytes, &mut pos)?;

        let mut positions = Vec::with_capacity(term_freq as usize);
        let mut prev_pos = 0u32;
        for j in 0..term_freq {
            let pos_delta = varint::read_u32(bytes, &mut pos)?;
            let position = if j == 0 { pos_delta } else { prev_pos + pos_delta };
            positions.push(position);
            prev_pos = position;
        }

        postings.push(Posting {
            doc_id,
            term_freq,
            positions,
        });
        prev_doc = doc_id;
    }

    if pos != bytes.len() {
        return Err(CrocusError::internal("trailing bytes after posting list"));
    }
    Ok(postings)
}
