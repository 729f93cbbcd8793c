//! Token normalization and abbreviation replacement.
//!
//! Query text and indexed names go through the same pipeline:
//! 1. NFD decomposition, dropping combining marks (`Café` -> `Cafe`)
//! 2. Lowercasing
//! 3. Tokenizing: letters and digits build tokens, `'` and `.` vanish without splitting
//!    (`St.` -> `st`, `O'Brien` -> `obrien`), anything else is a delimiter
//!
//! Each token records whether a delimiter followed it. A final token without one is an
//! open prefix: the user may still be typing it.

use std::{
    collections::{BTreeMap, BTreeSet},
    mem,
};

use tracing::warn;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Upper bound on spellings produced for one phrase.
pub const MAX_VARIANTS: usize = 16;

/// A normalized token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Normalized text.
    pub text: String,
    /// True if a delimiter followed the token in the source text.
    pub boundary: bool,
}

/// The tokens of one piece of text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenizedText {
    /// Tokens in source order.
    pub tokens: Vec<Token>,
}

impl TokenizedText {
    /// Returns true if the final token ran to the end of the text.
    pub fn open_prefix(&self) -> bool {
        self.tokens.last().is_some_and(|t| !t.boundary)
    }

    /// Returns true if there are no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns the token texts.
    pub fn words(&self) -> Vec<String> {
        self.tokens.iter().map(|t| t.text.clone()).collect()
    }

    /// Keeps at most `max` tokens. A truncated text is never an open prefix.
    pub fn truncate(&mut self, max: usize) {
        if self.tokens.len() > max {
            self.tokens.truncate(max);
            if let Some(last) = self.tokens.last_mut() {
                last.boundary = true;
            }
        }
    }
}

/// Returns true for characters removed without splitting a token.
fn is_elided(c: char) -> bool {
    matches!(c, '\'' | '.' | '\u{2019}')
}

/// Normalizes and tokenizes `text`.
pub fn tokenize(text: &str) -> TokenizedText {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for c in text.nfd() {
        if is_combining_mark(c) || is_elided(c) {
            continue;
        }
        if c.is_alphanumeric() {
            current.extend(c.to_lowercase().filter(|l| !is_combining_mark(*l)));
        } else if !current.is_empty() {
            tokens.push(Token {
                text: mem::take(&mut current),
                boundary: true,
            });
        }
    }

    if !current.is_empty() {
        tokens.push(Token {
            text: current,
            boundary: false,
        });
    }

    TokenizedText { tokens }
}

/// One spelling of a phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseVariant {
    /// Token texts.
    pub tokens: Vec<String>,
    /// Per token: true if the token is a replacement output rather than raw input.
    pub replaced: Vec<bool>,
}

impl PhraseVariant {
    /// Creates a variant where every token is raw.
    pub fn raw(tokens: Vec<String>) -> Self {
        let replaced = vec![false; tokens.len()];
        Self { tokens, replaced }
    }

    /// Returns true if the final token is raw input. An empty variant has no raw token.
    pub fn final_is_raw(&self) -> bool {
        self.replaced.last().is_some_and(|r| !r)
    }
}

/// Bidirectional abbreviation map built from `geocoder_tokens`.
#[derive(Debug, Clone, Default)]
pub struct TokenReplacer {
    /// Token -> every counterpart it can be replaced with.
    map: BTreeMap<String, BTreeSet<String>>,
}

impl TokenReplacer {
    /// Builds a replacer. Both sides of each entry are normalized; entries that do not
    /// normalize to exactly one token on each side are skipped.
    pub fn new(entries: &BTreeMap<String, String>) -> Self {
        let mut map: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (from, to) in entries {
            let (Some(long), Some(short)) = (single_token(from), single_token(to)) else {
                warn!(from = %from, to = %to, "skipping token replacement that is not one token per side");
                continue;
            };
            if long == short {
                continue;
            }
            map.entry(long.clone()).or_default().insert(short.clone());
            map.entry(short).or_default().insert(long);
        }
        Self { map }
    }

    /// Returns true if no replacements are configured.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the counterparts of `token`.
    pub fn counterparts(&self, token: &str) -> impl Iterator<Item = &str> {
        self.map.get(token).into_iter().flatten().map(String::as_str)
    }

    /// Returns every spelling of `tokens` reachable by replacing any subset of tokens with a
    /// counterpart. The original spelling comes first; duplicates are dropped and at most
    /// [`MAX_VARIANTS`] are returned.
    pub fn variants(&self, tokens: &[String]) -> Vec<PhraseVariant> {
        let mut variants = vec![PhraseVariant::raw(tokens.to_vec())];

        for (i, token) in tokens.iter().enumerate() {
            let counterparts: Vec<&str> = self.counterparts(token).collect();
            if counterparts.is_empty() {
                continue;
            }
            let existing = variants.len();
            for v in 0..existing {
                for &replacement in &counterparts {
                    if variants.len() >= MAX_VARIANTS {
                        return variants;
                    }
                    let mut variant = variants[v].clone();
                    variant.tokens[i] = replacement.to_string();
                    variant.replaced[i] = true;
                    if !variants.iter().any(|seen| seen.tokens == variant.tokens) {
                        variants.push(variant);
                    }
                }
            }
        }

        variants
    }
}

/// Normalizes `text` and returns its token if there is exactly one.
fn single_token(text: &str) -> Option<String> {
    let mut tokens = tokenize(text).tokens;
    if tokens.len() == 1 {
        tokens.pop().map(|t| t.text)
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn words(text: &str) -> Vec<String> {
        tokenize(text).words()
    }

    fn replacer(pairs: &[(&str, &str)]) -> TokenReplacer {
        let entries = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        TokenReplacer::new(&entries)
    }

    fn spellings(variants: &[PhraseVariant]) -> Vec<String> {
        variants.iter().map(|v| v.tokens.join(" ")).collect()
    }

    #[test]
    fn lowercases_and_strips_diacritics() {
        assert_eq!(words("Café Zürich"), ["cafe", "zurich"]);
        assert_eq!(words("ÅNGSTRÖM"), ["angstrom"]);
    }

    #[test]
    fn apostrophes_and_periods_do_not_split() {
        assert_eq!(words("O'Brien St."), ["obrien", "st"]);
        assert_eq!(words("C. C Mar"), ["c", "c", "mar"]);
        assert_eq!(words("Mc\u{2019}Donald"), ["mcdonald"]);
    }

    #[test]
    fn punctuation_splits() {
        assert_eq!(words("21-69 Quincy/Lane, #4"), ["21", "69", "quincy", "lane", "4"]);
    }

    #[test]
    fn boundaries_track_trailing_delimiters() {
        let text = tokenize("dt");
        assert!(text.open_prefix());

        for closed in ["dt ", "dt/", "dt,"] {
            let text = tokenize(closed);
            assert_eq!(text.words(), ["dt"]);
            assert!(!text.open_prefix(), "{closed:?} should be closed");
        }

        let text = tokenize("main st");
        assert!(text.tokens[0].boundary);
        assert!(!text.tokens[1].boundary);
    }

    #[test]
    fn degenerate_input_is_empty() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  ,/ -").is_empty());
        assert!(!tokenize("").open_prefix());
    }

    #[test]
    fn truncate_closes_the_text() {
        let mut text = tokenize("a b c d");
        text.truncate(2);
        assert_eq!(text.words(), ["a", "b"]);
        assert!(!text.open_prefix());

        let mut text = tokenize("a b");
        text.truncate(5);
        assert!(text.open_prefix());
    }

    #[test]
    fn replacement_is_bidirectional() {
        let r = replacer(&[("Street", "St")]);
        assert_eq!(r.counterparts("street").collect::<Vec<_>>(), ["st"]);
        assert_eq!(r.counterparts("st").collect::<Vec<_>>(), ["street"]);
        assert_eq!(r.counterparts("road").count(), 0);
    }

    #[test]
    fn multi_token_entries_are_skipped() {
        let r = replacer(&[("Saint Louis", "StL"), ("", "x"), ("Road", "Rd")]);
        assert_eq!(r.counterparts("stl").count(), 0);
        assert_eq!(r.counterparts("x").count(), 0);
        assert_eq!(r.counterparts("rd").collect::<Vec<_>>(), ["road"]);
    }

    #[test]
    fn variants_start_with_original() {
        let r = replacer(&[("Street", "St")]);
        let variants = r.variants(&words("Main Street"));
        assert_eq!(spellings(&variants), ["main street", "main st"]);
        assert_eq!(variants[0].replaced, [false, false]);
        assert_eq!(variants[1].replaced, [false, true]);
        assert!(variants[0].final_is_raw());
        assert!(!variants[1].final_is_raw());
    }

    #[test]
    fn variants_cover_every_subset() {
        let r = replacer(&[("North", "N"), ("Street", "St")]);
        let variants = r.variants(&words("North Main Street"));
        assert_eq!(
            spellings(&variants),
            [
                "north main street",
                "n main street",
                "north main st",
                "n main st"
            ]
        );
    }

    #[test]
    fn variants_are_capped() {
        let pairs: Vec<(String, String)> = (0..6)
            .map(|i| (format!("long{i}"), format!("s{i}")))
            .collect();
        let entries = pairs.into_iter().collect();
        let r = TokenReplacer::new(&entries);
        let tokens: Vec<String> = (0..6).map(|i| format!("long{i}")).collect();
        let variants = r.variants(&tokens);
        assert_eq!(variants.len(), MAX_VARIANTS);
        assert_eq!(variants[0].tokens, tokens);
    }

    #[test]
    fn no_replacements_yield_only_original() {
        let r = TokenReplacer::default();
        assert!(r.is_empty());
        let variants = r.variants(&words("district taco"));
        assert_eq!(spellings(&variants), ["district taco"]);
    }
}
