//! Query planning.
//!
//! A tokenized query is split per index into the phrase windows worth looking up. For
//! `2 frosted flakes street` against an address index the house number `2` is set aside and
//! the windows are every contiguous run of `frosted flakes street`. Only windows that end at
//! the last query token may autocomplete.

use std::ops::Range;

/// A house number found in the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HouseNumber {
    /// Position in the query tokens.
    pub position: usize,
    /// The number as typed.
    pub text: String,
}

/// One contiguous run of query tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Window {
    /// Token positions covered.
    pub span: Range<usize>,
    /// True if the final token may prefix-match.
    pub autocomplete: bool,
    /// True if the final token ran to the end of the query text.
    pub open_prefix: bool,
}

impl Window {
    /// The window's tokens.
    pub fn tokens<'a>(&self, words: &'a [String]) -> &'a [String] {
        &words[self.span.clone()]
    }
}

/// The lookups planned for one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IndexPlan {
    /// House number, for address indexes.
    pub number: Option<HouseNumber>,
    /// Windows, longest first.
    pub windows: Vec<Window>,
}

/// Plans the windows for one index.
///
/// `open_prefix` says whether the query text ended mid-token. `autocomplete` is the query
/// option; it applies only to windows that end at the last query token.
pub(crate) fn plan(
    words: &[String],
    address: bool,
    open_prefix: bool,
    autocomplete: bool,
) -> IndexPlan {
    let number = if address { house_number(words) } else { None };
    let names = match &number {
        Some(number) if number.position == 0 => 1..words.len(),
        Some(_) => 0..words.len() - 1,
        None => 0..words.len(),
    };

    let mut windows = Vec::new();
    for len in (1..=names.len()).rev() {
        for start in names.start..=names.end - len {
            let end = start + len;
            let at_end = end == words.len();
            windows.push(Window {
                span: start..end,
                autocomplete: autocomplete && at_end,
                open_prefix: open_prefix && at_end,
            });
        }
    }

    IndexPlan { number, windows }
}

/// Finds the house number: a leading all-digit token, else a trailing one. A query of one
/// token is always a name.
fn house_number(words: &[String]) -> Option<HouseNumber> {
    if words.len() < 2 {
        return None;
    }
    let last = words.len() - 1;
    [0, last]
        .into_iter()
        .find(|&position| is_number(&words[position]))
        .map(|position| HouseNumber {
            position,
            text: words[position].clone(),
        })
}

/// True for a non-empty run of ASCII digits.
fn is_number(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}
