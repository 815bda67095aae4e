//! Snippet highlighting.
//!
//! A snippet is a bounded window of the matched field's stored text
//! around the first matched token, with every matched token inside the
//! window wrapped in `**` markers. When nothing matches (e.g. the hit
//! came from a field with no recoverable positions) the snippet is an
//! empty string, never an error.

use crate::analysis::tokenize;

/// Target snippet width in bytes, before markers.
const SNIPPET_WIDTH: usize = 200;

/// Render a highlight snippet of `text` for the given query terms.
///
/// `terms` must already be analyzed (lowercase tokens), as produced by
/// the query parser.
pub fn snippet(text: &str, terms: &[String]) -> String {
    let tokens = tokenize(text);
    let matched: Vec<_> = tokens
        .iter()
        .filter(|t| terms.iter().any(|q| *q == t.text))
        .collect();
    let Some(first) = matched.first() else {
        return String::new();
    };

    // Window around the first match, clamped to char boundaries.
    let half = SNIPPET_WIDTH / 2;
    let mut window_start = first.start.saturating_sub(half);
    let mut window_end = usize::min(text.len(), first.end + half);
    while window_start > 0 && !text.is_char_boundary(window_start) {
        window_start -= 1;
    }
    while window_end < text.len() && !text.is_char_boundary(window_end) {
        window_end += 1;
    }

    let mut out = String::new();
    if window_start > 0 {
        out.push_str("...");
    }

    let mut cursor = window_start;
    for token in &matched {
        if token.start < window_start || token.end > window_end {
            continue;
        }
        if token.start < cursor {
            continue;
        }
        out.push_str(&text[cursor..token.start]);
        out.push_str("**");
        out.push_str(&text[token.start..token.end]);
        out.push_str("**");
        cursor = token.end;
    }
    out.push_str(&text[cursor..window_end]);

    if window_end < text.len() {
        out.push_str("...");
    }

    // Tabs and newlines from the cell grid read poorly in a one-line
    // snippet; flatten them to single spaces.
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
