//! The match chain: one record per administrative level, anchored on the matched feature.

use std::collections::{BTreeMap, BTreeSet};

use carto_index::{Feature, tokenize};
use carto_template::{Path, Scope};

/// Administrative levels, broadest first.
pub const LEVELS: [&str; 9] = [
    "country",
    "region",
    "postcode",
    "district",
    "place",
    "locality",
    "neighborhood",
    "address",
    "poi",
];

/// A matched feature plus the records that contain it.
///
/// As a template [`Scope`]:
/// - `{{level}}` and `{{level.name}}` are the level's name in the chain's language
/// - `{{level.number}}` is the house number, on the anchor only
/// - `{{level.id}}` is the feature id
/// - `{{level.properties.key}}` and `{{level.key}}` are scalar properties
///
/// A path whose head is not a level resolves against the anchor, so `{{name}}` works in any
/// index. A known level that is missing from the chain resolves to nothing.
#[derive(Debug)]
pub(crate) struct MatchChain<'a> {
    /// Level of the matched feature.
    anchor_level: &'a str,
    /// The matched feature.
    anchor: &'a Feature,
    /// House number from the query, when the anchor carries it.
    number: Option<&'a str>,
    /// Resolved context records by level.
    context: BTreeMap<String, Feature>,
    /// Levels that count as level names in paths.
    levels: &'a BTreeSet<String>,
    /// Requested language.
    language: Option<&'a str>,
}

impl<'a> MatchChain<'a> {
    /// Creates a chain with no context records.
    pub fn new(
        anchor_level: &'a str,
        anchor: &'a Feature,
        levels: &'a BTreeSet<String>,
        language: Option<&'a str>,
    ) -> Self {
        Self {
            anchor_level,
            anchor,
            number: None,
            context: BTreeMap::new(),
            levels,
            language,
        }
    }

    /// Sets the matched house number.
    pub fn with_number(mut self, number: Option<&'a str>) -> Self {
        self.number = number;
        self
    }

    /// Adds a context record. The anchor's own level is never replaced.
    pub fn insert(&mut self, level: &str, feature: Feature) {
        if level != self.anchor_level {
            self.context.insert(level.to_string(), feature);
        }
    }

    /// The anchor's display name.
    pub fn anchor_name(&self) -> &str {
        self.anchor.name(self.language)
    }

    /// Normalized tokens of the context records' names, in the chain's language and the
    /// default.
    pub fn context_tokens(&self) -> BTreeSet<String> {
        let mut tokens = BTreeSet::new();
        for feature in self.context.values() {
            tokens.extend(tokenize(feature.text()).words());
            tokens.extend(tokenize(feature.name(self.language)).words());
        }
        tokens
    }

    /// Resolves `field` on one record of the chain.
    fn field(&self, feature: &Feature, is_anchor: bool, field: &[String]) -> Option<String> {
        match field {
            [] => Some(feature.name(self.language).to_string()),
            [name] if name == "name" => Some(feature.name(self.language).to_string()),
            [name] if name == "number" => self.number.filter(|_| is_anchor).map(str::to_string),
            [name] if name == "id" => Some(feature.id.to_string()),
            [properties, key] if properties == "properties" => feature.property_text(key),
            [key] => feature.property_text(key),
            _ => None,
        }
    }
}

impl Scope for MatchChain<'_> {
    fn resolve(&self, path: &Path) -> Option<String> {
        let head = path.head()?;
        if head == self.anchor_level {
            return self.field(self.anchor, true, path.tail());
        }
        if let Some(feature) = self.context.get(head) {
            return self.field(feature, false, path.tail());
        }
        if self.levels.contains(head) {
            return None;
        }
        self.field(self.anchor, true, path.segments())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn feature(id: u64, properties: serde_json::Value) -> Feature {
        Feature::from_value(json!({"id": id, "properties": properties})).unwrap()
    }

    fn levels() -> BTreeSet<String> {
        LEVELS.iter().map(|l| (*l).to_string()).collect()
    }

    fn get(chain: &MatchChain<'_>, path: &str) -> Option<String> {
        chain.resolve(&Path::parse(path))
    }

    #[test]
    fn anchor_fields() {
        let anchor = feature(
            7,
            json!({"carmen:text": "Quincy Lane,Quincy La", "carmen:addressnumber": ["2169"]}),
        );
        let levels = levels();
        let chain = MatchChain::new("address", &anchor, &levels, None).with_number(Some("2169"));

        assert_eq!(get(&chain, "address.name").as_deref(), Some("Quincy Lane"));
        assert_eq!(get(&chain, "address").as_deref(), Some("Quincy Lane"));
        assert_eq!(get(&chain, "address.number").as_deref(), Some("2169"));
        assert_eq!(get(&chain, "address.id").as_deref(), Some("7"));
        assert_eq!(get(&chain, "name").as_deref(), Some("Quincy Lane"));
        assert_eq!(get(&chain, "number").as_deref(), Some("2169"));
    }

    #[test]
    fn context_levels_and_missing_levels() {
        let anchor = feature(
            1,
            json!({"carmen:text": "Shake Shack", "address": "C. C Mar Shopping"}),
        );
        let levels = levels();
        let mut chain = MatchChain::new("poi", &anchor, &levels, None);
        chain.insert("place", feature(1, json!({"carmen:text": "New York"})));

        assert_eq!(get(&chain, "place.name").as_deref(), Some("New York"));
        assert_eq!(get(&chain, "place.number"), None);
        assert_eq!(get(&chain, "country.name"), None);
        assert_eq!(
            get(&chain, "poi.properties.address").as_deref(),
            Some("C. C Mar Shopping")
        );
        assert_eq!(get(&chain, "poi.address").as_deref(), Some("C. C Mar Shopping"));
        assert_eq!(get(&chain, "poi.properties.missing"), None);
    }

    #[test]
    fn language_names_fall_back_to_default() {
        let anchor = feature(
            2,
            json!({"carmen:text": "Frosted Flakes Street", "carmen:text_zh": "Frosted Flakes St"}),
        );
        let place = feature(1, json!({"carmen:text": "New York"}));
        let levels = levels();

        let mut chain = MatchChain::new("address", &anchor, &levels, Some("zh"));
        chain.insert("place", place);
        assert_eq!(get(&chain, "address.name").as_deref(), Some("Frosted Flakes St"));
        assert_eq!(get(&chain, "place.name").as_deref(), Some("New York"));
        assert_eq!(chain.anchor_name(), "Frosted Flakes St");
    }

    #[test]
    fn anchor_level_is_not_replaced_by_context() {
        let anchor = feature(1, json!({"carmen:text": "District"}));
        let levels = levels();
        let mut chain = MatchChain::new("poi", &anchor, &levels, None);
        chain.insert("poi", feature(9, json!({"carmen:text": "Other"})));
        assert_eq!(get(&chain, "poi.name").as_deref(), Some("District"));
    }

    #[test]
    fn context_tokens_skip_the_anchor() {
        let anchor = feature(1, json!({"carmen:text": "Main Street"}));
        let levels = levels();
        let mut chain = MatchChain::new("address", &anchor, &levels, Some("de"));
        chain.insert(
            "place",
            feature(1, json!({"carmen:text": "Munich", "carmen:text_de": "München"})),
        );

        let tokens = chain.context_tokens();
        assert_eq!(
            tokens,
            BTreeSet::from(["munchen".to_string(), "munich".to_string()])
        );
    }
}
