//! BM25 relevance scoring.

/// BM25 scorer over one full-text field.
///
/// Collection-level statistics are fixed at construction; per-document
/// inputs are the term frequency and the document's field length. The
/// function is fully deterministic, so equal inputs always produce the
/// same ranking.
#[derive(Debug, Clone, Copy)]
pub struct Bm25 {
    k1: f64,
    b: f64,
    doc_count: u64,
    avg_field_len: f64,
}

impl Bm25 {
    /// Term-frequency saturation parameter.
    pub const K1: f64 = 1.2;
    /// Length-normalization parameter.
    pub const B: f64 = 0.75;

    /// Create a scorer for a collection of `doc_count` documents whose
    /// target field averages `avg_field_len` tokens.
    pub fn new(doc_count: u64, avg_field_len: f64) -> Self {
        Bm25 {
            k1: Self::K1,
            b: Self::B,
            doc_count,
            avg_field_len,
        }
    }

    /// Inverse document frequency of a term contained in `doc_freq`
    /// documents. Always positive for doc_freq ≥ 1.
    pub fn idf(&self, doc_freq: u32) -> f64 {
        let n = self.doc_count as f64;
        let df = doc_freq as f64;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    /// One term's contribution to a document's score.
    pub fn score(&self, term_freq: u32, doc_freq: u32, field_len: u32) -> f64 {
        let tf = term_freq as f64;
        let norm = if self.avg_field_len > 0.0 {
            1.0 - self.b + self.b * (field_len as f64 / self.avg_field_len)
        } else {
            1.0
        };
        self.idf(doc_freq) * (tf * (self.k1 + 1.0)) / (tf + self.k1 * norm)
    }
}
