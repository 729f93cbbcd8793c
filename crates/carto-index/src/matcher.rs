//! Autocomplete matching.
//!
//! A candidate phrase read from the store is compared against one spelling of a query
//! window. The result is an exact match, a word-boundary or prefix autocomplete, or a
//! rejection:
//!
//! - `dt` vs `dt`: exact
//! - `dt` vs `dt taco`: autocomplete (whole word, more words follow)
//! - `dt` vs `dtown party bus`: autocomplete only while `dt` is still being typed and was
//!   typed as-is; a replacement output such as `dt` from `district` never prefix-expands

/// How a candidate matched.
///
/// Ordered so that sorting ascending puts exact matches first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchKind {
    /// Token-for-token equal.
    Exact,
    /// The query is a word-boundary or character prefix of the candidate.
    Autocomplete,
}

/// One query spelling being matched.
#[derive(Debug, Clone, Copy)]
pub struct MatchQuery<'a> {
    /// Query tokens.
    pub tokens: &'a [String],
    /// True if the final token is raw input rather than a replacement output.
    pub final_raw: bool,
    /// True if the final token ran to the end of the query text.
    pub open_prefix: bool,
    /// True if autocomplete is enabled for this window.
    pub autocomplete: bool,
}

/// A successful classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhraseMatch {
    /// Exact or autocomplete.
    pub kind: MatchKind,
    /// Query characters over candidate characters, in `(0, 1]`.
    pub coverage: f64,
}

/// Classifies `candidate` against `query`. Returns `None` when rejected.
pub fn classify(query: &MatchQuery<'_>, candidate: &[String]) -> Option<PhraseMatch> {
    let n = query.tokens.len();
    if n == 0 || candidate.is_empty() {
        return None;
    }

    if query.tokens == candidate {
        return Some(PhraseMatch {
            kind: MatchKind::Exact,
            coverage: 1.0,
        });
    }

    if !query.autocomplete || n > candidate.len() {
        return None;
    }
    if query.tokens[..n - 1] != candidate[..n - 1] {
        return None;
    }

    let last = &query.tokens[n - 1];
    let target = &candidate[n - 1];
    let whole_word = last == target;
    let prefix = query.open_prefix && query.final_raw && target.starts_with(last.as_str());
    if !whole_word && !prefix {
        return None;
    }

    Some(PhraseMatch {
        kind: MatchKind::Autocomplete,
        coverage: char_count(query.tokens) as f64 / char_count(candidate) as f64,
    })
}

/// Share of query terms matched, in `[0, 1]`.
pub fn relevance(matched: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    matched.min(total) as f64 / total as f64
}

/// Total characters across tokens.
fn char_count(tokens: &[String]) -> usize {
    tokens.iter().map(|t| t.chars().count()).sum()
}
