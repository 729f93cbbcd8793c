//! Phrase encoding.
//!
//! A phrase is an ordered token sequence. It is reduced to a 64-bit identifier with SipHash
//! 2-4 under a fixed all-zero key, so ids are stable across processes and restarts. The id
//! space is bounded, and distinct phrases may collide.

use std::{fmt, hash::Hasher};

use serde::{Deserialize, Serialize};
use siphasher::sip::SipHasher24;

/// Identifier of an encoded phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PhraseId(u64);

impl PhraseId {
    /// Wraps a raw identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PhraseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Encodes a token sequence as a phrase id.
///
/// Tokens are fed separated by a single space, so `["main", "st"]` and `["main st"]`
/// encode the same. The empty sequence has a well-defined id.
pub fn encode_phrase<S: AsRef<str>>(tokens: &[S]) -> PhraseId {
    let mut hasher = SipHasher24::new();
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 {
            hasher.write(b" ");
        }
        hasher.write(token.as_ref().as_bytes());
    }
    PhraseId(hasher.finish())
}
