//! Query string parsing.
//!
//! The grammar is small and fixed:
//!
//! - bare terms: every term must occur in the target full-text field
//! - `"quoted phrase"`: the exact token sequence must occur
//! - `term*` / `*term`: prefix/suffix wildcard, exact-match fields only
//! - anything else against an exact-match field: verbatim equality

use crate::analysis::tokenize_terms;
use crate::document::Field;
use crate::error::{CrocusError, Result};

/// A parsed query, ready for evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedQuery {
    /// All terms required in the target full-text field.
    Terms(Vec<String>),
    /// Exact token sequence required in the target full-text field.
    Phrase(Vec<String>),
    /// Stored value must start with the pattern (exact-match fields).
    Prefix(String),
    /// Stored value must end with the pattern (exact-match fields).
    Suffix(String),
    /// Stored value must equal the query verbatim (exact-match fields).
    Exact(String),
}

/// Parse a raw query string against the target field.
pub fn parse(field: Field, raw: &str) -> Result<ParsedQuery> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CrocusError::invalid_query("empty query"));
    }

    if let Some(inner) = quoted(trimmed) {
        return parse_phrase(field, inner);
    }

    if trimmed.contains('*') {
        return parse_wildcard(field, trimmed);
    }

    match field {
        Field::Text(_) => {
            let terms = tokenize_terms(trimmed);
            if terms.is_empty() {
                return Err(CrocusError::invalid_query(
                    "query contains no searchable terms",
                ));
            }
            Ok(ParsedQuery::Terms(terms))
        }
        Field::Exact(_) => Ok(ParsedQuery::Exact(trimmed.to_string())),
    }
}

/// Strip a balanced pair of double quotes, if present.
///
/// An unbalanced quote is not a phrase; it falls through to term
/// parsing, where tokenization drops the quote character.
fn quoted(raw: &str) -> Option<&str> {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        Some(&raw[1..raw.len() - 1])
    } else {
        None
    }
}

fn parse_phrase(field: Field, inner: &str) -> Result<ParsedQuery> {
    if !matches!(field, Field::Text(_)) {
        return Err(CrocusError::invalid_query(
            "phrase queries apply to full-text fields only",
        ));
    }
    let terms = tokenize_terms(inner);
    if terms.is_empty() {
        return Err(CrocusError::invalid_query("empty phrase"));
    }
    Ok(ParsedQuery::Phrase(terms))
}

fn parse_wildcard(field: Field, raw: &str) -> Result<ParsedQuery> {
    if !matches!(field, Field::Exact(_)) {
        return Err(CrocusError::invalid_query(
            "wildcards apply to exact-match fields only",
        ));
    }
    let stars = raw.matches('*').count();
    if stars != 1 {
        return Err(CrocusError::invalid_query(
            "exactly one leading or trailing '*' is supported",
        ));
    }

    if let Some(prefix) = raw.strip_suffix('*') {
        if prefix.is_empty() {
            return Err(CrocusError::invalid_query("wildcard pattern is empty"));
        }
        return Ok(ParsedQuery::Prefix(prefix.to_string()));
    }
    if let Some(suffix) = raw.strip_prefix('*') {
        if suffix.is_empty() {
            return Err(CrocusError::invalid_query("wildcard pattern is empty"));
        }
        return Ok(ParsedQuery::Suffix(suffix.to_string()));
    }
    Err(CrocusError::invalid_query(
        "'*' must be leading or trailing",
    ))
}
