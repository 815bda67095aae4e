//! Query engine: parsing, evaluation, scoring and highlighting.

pub mod highlight;
pub mod parser;
pub mod scorer;

use ahash::AHashMap;
use serde::Serialize;

use crate::document::{ExactField, Field, TextField};
use crate::error::{CrocusError, Result};
use crate::index::posting::Posting;
use crate::index::reader::IndexReader;

pub use parser::ParsedQuery;
pub use scorer::Bm25;

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    /// Workbook base name.
    pub filename: String,
    /// Workbook path relative to the content root.
    pub relative_path: String,
    /// Sheet name.
    pub sheet_name: String,
    /// Relevance score; zero for unscored (exact/wildcard) matches.
    pub score: f64,
    /// Highlighted snippet; empty when no match positions are recoverable.
    pub highlight: String,
}

/// Execute a query against the committed generation behind `reader`.
///
/// Results are ordered by descending score, ties broken by ascending
/// document id, and truncated to `limit` when one is given. An explicit
/// limit of zero or less is [`CrocusError::InvalidLimit`].
pub fn search(
    reader: &IndexReader,
    field: Field,
    raw: &str,
    limit: Option<i64>,
) -> Result<Vec<SearchResult>> {
    let limit = validate_limit(limit)?;
    let parsed = parser::parse(field, raw)?;

    let mut results = match (&parsed, field) {
        (ParsedQuery::Terms(terms), Field::Text(text_field)) => {
            search_text(reader, text_field, terms, false)?
        }
        (ParsedQuery::Phrase(terms), Field::Text(text_field)) => {
            search_text(reader, text_field, terms, true)?
        }
        (_, Field::Exact(exact_field)) => search_exact(reader, exact_field, &parsed),
        // The parser only produces term/phrase queries for full-text
        // fields and exact/wildcard queries for exact-match fields.
        _ => {
            return Err(CrocusError::internal(
                "query shape does not match target field",
            ));
        }
    };

    if let Some(limit) = limit {
        results.truncate(limit);
    }
    Ok(results)
}

fn validate_limit(limit: Option<i64>) -> Result<Option<usize>> {
    match limit {
        None => Ok(None),
        Some(n) if n <= 0 => Err(CrocusError::InvalidLimit(n)),
        Some(n) => Ok(Some(n as usize)),
    }
}

/// Scored candidate prior to stored-field resolution.
struct ScoredHit {
    doc_id: u64,
    score: f64,
}

/// Evaluate a term or phrase query over one full-text field.
fn search_text(
    reader: &IndexReader,
    field: TextField,
    terms: &[String],
    phrase: bool,
) -> Result<Vec<SearchResult>> {
    // Every term must have a posting list, or nothing matches.
    let unique_terms: Vec<&String> = {
        let mut seen = Vec::new();
        for term in terms {
            if !seen.contains(&term) {
                seen.push(term);
            }
        }
        seen
    };

    let mut lists: Vec<(u32, Vec<Posting>)> = Vec::with_capacity(unique_terms.len());
    for term in &unique_terms {
        match reader.postings(field, term.as_str())? {
            Some(postings) => lists.push((reader.doc_freq(field, term.as_str()), postings)),
            None => return Ok(Vec::new()),
        }
    }

    let candidates = intersect(&lists);
    let bm25 = Bm25::new(reader.doc_count(), reader.avg_field_len(field));

    let mut hits = Vec::new();
    for (doc_id, per_term) in candidates {
        if phrase {
            let ordered: Vec<&Posting> = terms
                .iter()
                .map(|term| {
                    let idx = unique_terms.iter().position(|u| *u == term).unwrap();
                    per_term[idx]
                })
                .collect();
            if !phrase_occurs(&ordered) {
                continue;
            }
        }

        let field_len = reader
            .record(doc_id)
            .map(|r| r.field_lengths.get(field))
            .unwrap_or(0);
        let score: f64 = per_term
            .iter()
            .zip(&lists)
            .map(|(posting, (doc_freq, _))| bm25.score(posting.term_freq, *doc_freq, field_len))
            .sum();
        hits.push(ScoredHit { doc_id, score });
    }

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.doc_id.cmp(&b.doc_id))
    });

    let highlight_terms: Vec<String> = terms.to_vec();
    Ok(hits
        .into_iter()
        .filter_map(|hit| {
            let record = reader.record(hit.doc_id)?;
            let text = record.document.text_value(field);
            Some(SearchResult {
                filename: record.document.filename.clone(),
                relative_path: record.document.relative_path.clone(),
                sheet_name: record.document.sheet_name.clone(),
                score: hit.score,
                highlight: highlight::snippet(text, &highlight_terms),
            })
        })
        .collect())
}

/// Intersect posting lists: documents containing every term, ascending
/// doc id, with each document's posting for every term.
fn intersect<'a>(lists: &'a [(u32, Vec<Posting>)]) -> Vec<(u64, Vec<&'a Posting>)> {
    if lists.is_empty() {
        return Vec::new();
    }

    let maps: Vec<AHashMap<u64, &Posting>> = lists
        .iter()
        .map(|(_, postings)| postings.iter().map(|p| (p.doc_id, p)).collect())
        .collect();

    // Drive from the rarest list; postings are already id-ordered.
    let (driver_idx, _) = lists
        .iter()
        .enumerate()
        .min_by_key(|(_, (_, postings))| postings.len())
        .unwrap();

    let mut out = Vec::new();
    'docs: for posting in &lists[driver_idx].1 {
        let doc_id = posting.doc_id;
        let mut per_term = Vec::with_capacity(lists.len());
        for map in &maps {
            match map.get(&doc_id) {
                Some(p) => per_term.push(*p),
                None => continue 'docs,
            }
        }
        out.push((doc_id, per_term));
    }
    out
}

/// Whether the exact token sequence occurs, given each query position's
/// posting within one document.
fn phrase_occurs(ordered: &[&Posting]) -> bool {
    let first = &ordered[0].positions;
    'starts: for &start in first {
        for (offset, posting) in ordered.iter().enumerate().skip(1) {
            let want = start + offset as u32;
            if posting.positions.binary_search(&want).is_err() {
                continue 'starts;
            }
        }
        return true;
    }
    false
}

/// Evaluate an exact or wildcard query over a stored-verbatim field.
///
/// Unscored by design: results carry score zero, no highlight, and are
/// returned in index scan order (ascending doc id).
fn search_exact(
    reader: &IndexReader,
    field: ExactField,
    parsed: &ParsedQuery,
) -> Vec<SearchResult> {
    reader
        .records()
        .filter(|(_, record)| {
            let value = record.document.exact_value(field);
            match parsed {
                ParsedQuery::Exact(q) => value == q,
                ParsedQuery::Prefix(p) => value.starts_with(p.as_str()),
                ParsedQuery::Suffix(s) => value.ends_with(s.as_str()),
                _ => false,
            }
        })
        .map(|(_, record)| SearchResult {
            filename: record.document.filename.clone(),
            relative_path: record.document.relative_path.clone(),
            sheet_name: record.document.sheet_name.clone(),
            score: 0.0,
            highlight: String::new(),
        })
        .collect()
}
