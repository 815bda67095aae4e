//! Text analysis.
//!
//! A single fixed pipeline turns field text into lowercase word tokens:
//! the text is split on non-alphanumeric boundaries and each token keeps
//! its ordinal position (for phrase matching) and byte offsets (for
//! snippet rendering). The same pipeline runs at index and query time,
//! so a token written to the index is always findable by the same input.

/// A single token produced by [`tokenize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Lowercased token text.
    pub text: String,
    /// Ordinal position within the field (0-based).
    pub position: u32,
    /// Byte offset of the token start in the original text.
    pub start: usize,
    /// Byte offset one past the token end in the original text.
    pub end: usize,
}

/// Tokenize text into lowercase alphanumeric tokens.
///
/// Splits on any character that is not alphanumeric (Unicode-aware).
/// Empty input produces no tokens.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut start = None;

    for (idx, ch) in text.char_indices() {
        if ch.is_alphanumeric() {
            if start.is_none() {
                start = Some(idx);
            }
        } else if let Some(s) = start.take() {
            push_token(&mut tokens, text, s, idx);
        }
    }
    if let Some(s) = start {
        push_token(&mut tokens, text, s, text.len());
    }

    tokens
}

/// Tokenize and return only the token texts, for query-side use.
pub fn tokenize_terms(text: &str) -> Vec<String> {
    tokenize(text).into_iter().map(|t| t.text).collect()
}

fn push_token(tokens: &mut Vec<Token>, text: &str, start: usize, end: usize) {
    let position = tokens.len() as u32;
    tokens.push(Token {
        text: text[start..end].to_lowercase(),
        position,
        start,
        end,
    });
}
