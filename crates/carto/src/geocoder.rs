//! The geocoder: query text in, labeled features out.
//!
//! A query moves through four stages:
//! 1. Tokenizing: normalize the text and plan the phrase windows per index
//! 2. Candidate lookup: encode every window spelling, drop keys the dictionary cache rules
//!    out, fetch grids for the rest
//! 3. Classifying: compare each grid phrase with the spelling that found it, keeping the
//!    best match per feature
//! 4. Scoring: verify the strongest candidates against their match chain, render labels,
//!    and order the results
//!
//! Store lookups never fail a query. A lookup that errors or times out is logged and
//! dropped, and the query answers with what it has.

use std::{
    borrow::Cow,
    collections::{BTreeMap, BTreeSet, HashMap, btree_map, hash_map},
    fmt,
    path::Path,
    sync::Arc,
    time::Duration,
};

use carto_config::{Config, Settings};
use carto_index::{
    Feature, MatchQuery, PhraseId, PhraseIndex, PhraseVariant, StoreError, TileStore, classify,
    encode_phrase, relevance, tokenize,
};
use carto_template::{HelperRegistry, Template};
use tracing::debug;

use crate::{
    GeocodeError, GeocodeFeature, GeocodeOptions, GeocodeResponse,
    chain::{LEVELS, MatchChain},
    label::{IndexLabels, render_label},
    lookup::bounded,
    query::{IndexPlan, plan},
    rank::{Candidate, Scored},
};

/// An index and its compiled label templates.
#[derive(Debug)]
struct Source {
    /// The built index.
    index: Arc<PhraseIndex>,
    /// Index-level templates.
    labels: IndexLabels,
}

/// One phrase key to fetch.
#[derive(Debug)]
struct Lookup {
    /// Position of the index.
    index: usize,
    /// Position of the window in the index's plan.
    window: usize,
    /// The spelling that produced the key.
    variant: PhraseVariant,
    /// Encoded spelling.
    key: PhraseId,
}

/// State shared by the stages of one query.
#[derive(Debug)]
struct Query<'q> {
    /// Normalized query tokens.
    words: Vec<String>,
    /// Windows per index, aligned with the geocoder's indexes.
    plans: Vec<IndexPlan>,
    /// Requested language.
    language: Option<&'q str>,
}

/// A candidate whose feature record was found.
#[derive(Debug)]
struct Verified<'a> {
    /// The match.
    candidate: Candidate,
    /// The matched feature.
    anchor: Feature,
    /// Label template, if the index or record has one.
    template: Option<Cow<'a, Template>>,
}

/// Answers queries against a set of built indexes.
///
/// Indexes are searched in the order given; that order breaks ties between otherwise equal
/// results and decides which index supplies a level of the match chain when several share
/// it.
pub struct Geocoder {
    /// Limits and timeouts.
    settings: Settings,
    /// Indexes in configuration order.
    indexes: Vec<Source>,
    /// Grids, features, and context.
    store: Arc<dyn TileStore>,
    /// Template helpers.
    helpers: HelperRegistry,
    /// Every level name a template path may start with.
    levels: BTreeSet<String>,
}

impl fmt::Debug for Geocoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.indexes.iter().map(|s| s.index.name()).collect();
        f.debug_struct("Geocoder")
            .field("settings", &self.settings)
            .field("indexes", &names)
            .field("helpers", &self.helpers)
            .finish_non_exhaustive()
    }
}

impl Geocoder {
    /// Creates a geocoder over built indexes whose grids and features live in `store`.
    ///
    /// Fails if an index-level label template does not parse.
    pub fn new(
        settings: Settings,
        indexes: Vec<Arc<PhraseIndex>>,
        store: Arc<dyn TileStore>,
    ) -> Result<Self, GeocodeError> {
        let mut levels: BTreeSet<String> = LEVELS.iter().map(|l| (*l).to_string()).collect();
        let mut sources = Vec::with_capacity(indexes.len());
        for index in indexes {
            levels.insert(index.level().to_string());
            let labels = IndexLabels::compile(index.config())?;
            sources.push(Source { index, labels });
        }

        Ok(Self {
            settings,
            indexes: sources,
            store,
            helpers: HelperRegistry::with_builtins(),
            levels,
        })
    }

    /// Reopens every index in `config` from dictionary caches saved in `cache_dir`.
    pub fn open(
        config: &Config,
        cache_dir: &Path,
        store: Arc<dyn TileStore>,
    ) -> Result<Self, GeocodeError> {
        let indexes = config
            .indexes
            .iter()
            .map(|index| PhraseIndex::open(index.clone(), cache_dir).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(config.settings.clone(), indexes, store)
    }

    /// Registers a template helper, replacing any helper with the same name.
    pub fn with_helper<F>(mut self, name: impl Into<String>, helper: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.helpers.register(name, helper);
        self
    }

    /// Geocoder settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Indexes in search order.
    pub fn indexes(&self) -> impl Iterator<Item = &PhraseIndex> {
        self.indexes.iter().map(|s| s.index.as_ref())
    }

    /// Geocodes `query`.
    ///
    /// Text with no tokens answers with no features. Fails only on invalid options.
    pub async fn geocode(
        &self,
        query: &str,
        options: &GeocodeOptions,
    ) -> Result<GeocodeResponse, GeocodeError> {
        let limits = options.limits(&self.settings)?;
        let mut text = tokenize(query);
        text.truncate(self.settings.max_query_tokens);
        if text.is_empty() {
            debug!(query, "query has no tokens");
            return Ok(GeocodeResponse::default());
        }

        let words = text.words();
        let plans = self
            .indexes
            .iter()
            .map(|s| {
                plan(
                    &words,
                    s.index.config().address,
                    text.open_prefix(),
                    options.autocomplete,
                )
            })
            .collect();
        let query = Query {
            words,
            plans,
            language: options.language.as_deref(),
        };

        let mut candidates = self.candidates(&query).await;
        let found = candidates.len();
        candidates.sort_by(Candidate::preliminary_cmp);
        candidates.truncate(limits.verify);

        let mut results = self.verify(&query, candidates).await;
        results.sort_by(Scored::result_cmp);
        results.truncate(limits.results);
        debug!(query = %query.words.join(" "), found, results = results.len(), "geocoded");

        Ok(GeocodeResponse {
            query: query.words,
            features: results.into_iter().map(|s| s.feature).collect(),
        })
    }

    /// Per-lookup timeout.
    fn timeout(&self) -> Duration {
        Duration::from_millis(self.settings.lookup_timeout_ms)
    }

    /// Lists the keys worth fetching: every spelling of every window the cache may hold.
    fn lookups(&self, query: &Query<'_>) -> Vec<Lookup> {
        let mut lookups = Vec::new();
        let mut filtered = 0_usize;
        for (index, (source, plan)) in self.indexes.iter().zip(&query.plans).enumerate() {
            for (window, span) in plan.windows.iter().enumerate() {
                for variant in source.index.variants(span.tokens(&query.words)) {
                    let key = encode_phrase(&variant.tokens);
                    if source.index.may_contain(key) {
                        lookups.push(Lookup {
                            index,
                            window,
                            variant,
                            key,
                        });
                    } else {
                        filtered += 1;
                    }
                }
            }
        }
        debug!(lookups = lookups.len(), filtered, "planned phrase lookups");
        lookups
    }

    /// Fetches grids and keeps the best match per feature.
    async fn candidates(&self, query: &Query<'_>) -> Vec<Candidate> {
        let lookups = self.lookups(query);
        let fetched = bounded(
            lookups.iter().map(|lookup| async move {
                let name = self.indexes[lookup.index].index.name();
                let grids = self.store.get_grids(name, lookup.key).await?;
                Ok::<_, StoreError>((lookup, grids))
            }),
            self.settings.concurrency,
            self.timeout(),
            "grids",
        )
        .await;

        let mut best: HashMap<(usize, u64), Candidate> = HashMap::new();
        for (lookup, grids) in fetched {
            let window = &query.plans[lookup.index].windows[lookup.window];
            let spelling = MatchQuery {
                tokens: &lookup.variant.tokens,
                final_raw: lookup.variant.final_is_raw(),
                open_prefix: window.open_prefix,
                autocomplete: window.autocomplete,
            };
            for grid in grids {
                let Some(found) = classify(&spelling, &grid.phrase) else {
                    continue;
                };
                let candidate = Candidate {
                    index: lookup.index,
                    feature: grid.feature,
                    kind: found.kind,
                    coverage: found.coverage,
                    window: window.span.clone(),
                };
                match best.entry((lookup.index, grid.feature)) {
                    hash_map::Entry::Occupied(mut slot) => {
                        if candidate.beats(slot.get()) {
                            slot.insert(candidate);
                        }
                    }
                    hash_map::Entry::Vacant(slot) => {
                        slot.insert(candidate);
                    }
                }
            }
        }
        best.into_values().collect()
    }

    /// Fetches, resolves, labels, and scores candidates.
    async fn verify(&self, query: &Query<'_>, candidates: Vec<Candidate>) -> Vec<Scored> {
        let anchors = self.anchors(&candidates).await;
        let verified: Vec<Verified<'_>> = candidates
            .into_iter()
            .zip(anchors)
            .filter_map(|(candidate, anchor)| {
                let anchor = anchor?;
                let source = &self.indexes[candidate.index];
                let template = source
                    .labels
                    .select(source.index.config(), &anchor, query.language);
                Some(Verified {
                    candidate,
                    anchor,
                    template,
                })
            })
            .collect();

        let contexts = self.contexts(query, &verified).await;
        verified
            .into_iter()
            .zip(contexts)
            .map(|(verified, context)| self.score(query, verified, context))
            .collect()
    }

    /// Fetches the feature record of each candidate, aligned with `candidates`.
    async fn anchors(&self, candidates: &[Candidate]) -> Vec<Option<Feature>> {
        let fetched = bounded(
            candidates.iter().enumerate().map(|(i, candidate)| async move {
                let name = self.indexes[candidate.index].index.name();
                let feature = self.store.get_feature(name, candidate.feature).await?;
                Ok::<_, StoreError>((i, feature))
            }),
            self.settings.concurrency,
            self.timeout(),
            "feature",
        )
        .await;

        let mut anchors = vec![None; candidates.len()];
        for (i, feature) in fetched {
            if feature.is_none() {
                let candidate = &candidates[i];
                debug!(
                    index = self.indexes[candidate.index].index.name(),
                    id = candidate.feature,
                    "grid entry names a missing feature"
                );
            }
            anchors[i] = feature;
        }
        anchors
    }

    /// Levels to resolve for one candidate.
    ///
    /// Those the template references, or every configured level when query tokens fall
    /// outside the matched window and might name the chain.
    fn chain_levels(&self, query: &Query<'_>, verified: &Verified<'_>) -> BTreeSet<&str> {
        let candidate = &verified.candidate;
        let anchor_level = self.indexes[candidate.index].index.level();
        let number = query.plans[candidate.index]
            .number
            .as_ref()
            .map(|n| n.position);
        let whole_chain = !unmatched(query.words.len(), candidate, number).is_empty();
        let referenced = verified
            .template
            .as_deref()
            .map(Template::levels)
            .unwrap_or_default();

        self.indexes
            .iter()
            .map(|s| s.index.level())
            .filter(|level| *level != anchor_level)
            .filter(|level| whole_chain || referenced.contains(*level))
            .collect()
    }

    /// Resolves the match chain of each verified candidate, aligned with `verified`.
    ///
    /// When several indexes share a level, the earliest index with a result supplies it.
    async fn contexts(
        &self,
        query: &Query<'_>,
        verified: &[Verified<'_>],
    ) -> Vec<BTreeMap<String, Feature>> {
        let mut tasks = Vec::new();
        for (i, item) in verified.iter().enumerate() {
            let Some(center) = item.anchor.center() else {
                continue;
            };
            let levels = self.chain_levels(query, item);
            for (position, source) in self.indexes.iter().enumerate() {
                if levels.contains(source.index.level()) {
                    tasks.push((i, position, center));
                }
            }
        }

        let found = bounded(
            tasks.into_iter().map(|(i, position, center)| async move {
                let name = self.indexes[position].index.name();
                let feature = self.store.context(name, center).await?;
                Ok::<_, StoreError>((i, position, feature))
            }),
            self.settings.concurrency,
            self.timeout(),
            "context",
        )
        .await;

        let mut chains: Vec<BTreeMap<String, (usize, Feature)>> =
            vec![BTreeMap::new(); verified.len()];
        for (i, position, feature) in found {
            let Some(feature) = feature else {
                continue;
            };
            let level = self.indexes[position].index.level().to_string();
            match chains[i].entry(level) {
                btree_map::Entry::Occupied(mut slot) => {
                    if position < slot.get().0 {
                        slot.insert((position, feature));
                    }
                }
                btree_map::Entry::Vacant(slot) => {
                    slot.insert((position, feature));
                }
            }
        }

        chains
            .into_iter()
            .map(|chain| {
                chain
                    .into_iter()
                    .map(|(level, (_, feature))| (level, feature))
                    .collect()
            })
            .collect()
    }

    /// Scores and labels one verified candidate.
    fn score(
        &self,
        query: &Query<'_>,
        verified: Verified<'_>,
        context: BTreeMap<String, Feature>,
    ) -> Scored {
        let Verified {
            candidate,
            anchor,
            template,
        } = verified;
        let source = &self.indexes[candidate.index];
        let number = query.plans[candidate.index]
            .number
            .as_ref()
            .filter(|n| anchor.has_address_number(&n.text));

        let mut chain =
            MatchChain::new(source.index.level(), &anchor, &self.levels, query.language)
                .with_number(number.map(|n| n.text.as_str()));
        for (level, feature) in context {
            chain.insert(&level, feature);
        }

        let mut matched = candidate.window.len() + usize::from(number.is_some());
        let rest = unmatched(query.words.len(), &candidate, number.map(|n| n.position));
        if !rest.is_empty() {
            let names = chain.context_tokens();
            matched += rest
                .iter()
                .filter(|&&position| names.contains(&query.words[position]))
                .count();
        }
        let relevance = relevance(matched, query.words.len());

        let place_name = render_label(
            template.as_deref(),
            &chain,
            &self.helpers,
            chain.anchor_name(),
        );
        let feature = GeocodeFeature {
            id: format!("{}.{}", source.index.name(), anchor.id),
            place_name,
            relevance,
            text: chain.anchor_name().to_string(),
            address: number.map(|n| n.text.clone()),
            center: anchor.center(),
            properties: anchor.properties.clone(),
        };

        Scored {
            candidate,
            relevance,
            feature,
        }
    }
}

/// Query positions outside the candidate's window, skipping the house number.
fn unmatched(total: usize, candidate: &Candidate, number: Option<usize>) -> Vec<usize> {
    (0..total)
        .filter(|position| !candidate.window.contains(position) && Some(*position) != number)
        .collect()
}
