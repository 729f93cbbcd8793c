//! Candidates, results, and their ordering.

use std::{cmp::Ordering, ops::Range};

use carto_index::MatchKind;
use serde::Serialize;
use serde_json::{Map, Value};

/// A feature that matched some window of the query, before verification.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Candidate {
    /// Position of the index in the geocoder.
    pub index: usize,
    /// Feature id within the index.
    pub feature: u64,
    /// Exact or autocomplete.
    pub kind: MatchKind,
    /// Share of the candidate phrase the query typed.
    pub coverage: f64,
    /// Query tokens the phrase matched.
    pub window: Range<usize>,
}

impl Candidate {
    /// True if `self` is a better match for the same feature than `other`.
    pub fn beats(&self, other: &Self) -> bool {
        self.strength(other).is_lt()
    }

    /// Orders two matches of the same feature: longer window, then exact, then coverage,
    /// then earlier window. `Less` is stronger.
    fn strength(&self, other: &Self) -> Ordering {
        other
            .window
            .len()
            .cmp(&self.window.len())
            .then(self.kind.cmp(&other.kind))
            .then(other.coverage.total_cmp(&self.coverage))
            .then(self.window.start.cmp(&other.window.start))
    }

    /// Order used to pick which candidates get verified.
    pub fn preliminary_cmp(&self, other: &Self) -> Ordering {
        self.strength(other)
            .then(self.index.cmp(&other.index))
            .then(self.feature.cmp(&other.feature))
    }
}

/// A verified, labeled result.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Scored {
    /// The candidate this came from.
    pub candidate: Candidate,
    /// Matched query terms over total query terms.
    pub relevance: f64,
    /// The public result.
    pub feature: GeocodeFeature,
}

impl Scored {
    /// Final result order: relevance, match kind, coverage, index order, feature id.
    pub fn result_cmp(&self, other: &Self) -> Ordering {
        other
            .relevance
            .total_cmp(&self.relevance)
            .then(self.candidate.kind.cmp(&other.candidate.kind))
            .then(other.candidate.coverage.total_cmp(&self.candidate.coverage))
            .then(self.candidate.index.cmp(&other.candidate.index))
            .then(self.candidate.feature.cmp(&other.candidate.feature))
    }
}

/// One geocoding result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeocodeFeature {
    /// `<index>.<feature id>`, e.g. `poi.2`.
    pub id: String,
    /// Rendered label.
    pub place_name: String,
    /// Matched query terms over total query terms, in `[0, 1]`.
    pub relevance: f64,
    /// Display name of the matched feature.
    pub text: String,
    /// House number, when the query named one the feature carries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// `[lon, lat]`, when the feature has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center: Option<[f64; 2]>,
    /// The feature's properties.
    pub properties: Map<String, Value>,
}

/// Results of one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GeocodeResponse {
    /// Normalized query tokens.
    pub query: Vec<String>,
    /// Results, best first.
    pub features: Vec<GeocodeFeature>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn candidate(index: usize, feature: u64, kind: MatchKind, coverage: f64) -> Candidate {
        Candidate {
            index,
            feature,
            kind,
            coverage,
            window: 0..1,
        }
    }

    fn scored(candidate: Candidate, relevance: f64) -> Scored {
        Scored {
            feature: GeocodeFeature {
                id: format!("i{}.{}", candidate.index, candidate.feature),
                place_name: String::new(),
                relevance,
                text: String::new(),
                address: None,
                center: None,
                properties: Map::new(),
            },
            candidate,
            relevance,
        }
    }

    #[test]
    fn longer_windows_beat_exactness() {
        let short = candidate(0, 1, MatchKind::Exact, 1.0);
        let long = Candidate {
            window: 0..2,
            ..candidate(0, 1, MatchKind::Autocomplete, 0.5)
        };
        assert!(long.beats(&short));
        assert!(!short.beats(&long));
    }

    #[test]
    fn exact_beats_autocomplete_and_equal_does_not_beat() {
        let exact = candidate(0, 1, MatchKind::Exact, 1.0);
        let auto = candidate(0, 1, MatchKind::Autocomplete, 0.9);
        assert!(exact.beats(&auto));
        assert!(!exact.beats(&exact.clone()));
    }

    #[test]
    fn result_order_is_total() {
        let mut results = vec![
            scored(candidate(1, 1, MatchKind::Exact, 1.0), 1.0),
            scored(candidate(0, 3, MatchKind::Autocomplete, 0.6), 1.0),
            scored(candidate(0, 2, MatchKind::Exact, 1.0), 1.0),
            scored(candidate(0, 9, MatchKind::Exact, 1.0), 0.5),
            scored(candidate(0, 4, MatchKind::Autocomplete, 0.8), 1.0),
        ];
        results.sort_by(Scored::result_cmp);
        let ids: Vec<&str> = results.iter().map(|r| r.feature.id.as_str()).collect();
        assert_eq!(ids, ["i0.2", "i1.1", "i0.4", "i0.3", "i0.9"]);
    }

    #[test]
    fn feature_serializes_without_empty_address() {
        let result = scored(candidate(0, 2, MatchKind::Exact, 1.0), 1.0).feature;
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["id"], json!("i0.2"));
        assert!(value.get("address").is_none());
        assert!(value.get("center").is_none());
    }
}
