//! Species lookup orchestration.
//!
//! Resolves a free-text query into one merged `SpeciesRecord`:
//! taxonomy suggestion → detail fetch → best-effort encyclopedia summary
//! tried over several name variants → occurrence image collection.
//! Each call runs sequentially; the encyclopedia chain exits on the first
//! usable summary rather than fanning out.

use std::future::Future;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use wildwatch_model::{
    PageSummary, QueryError, SpeciesCandidate, SpeciesDetails, SpeciesQuery, SpeciesRecord,
    NOT_AVAILABLE, NO_DESCRIPTION,
};
use wildwatch_sources::{EncyclopediaProvider, SourceError, TaxonomyProvider};

/// Errors from species lookup.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Search query is empty")]
    EmptyQuery,

    #[error("No species found for \"{query}\". Try using the scientific name or check spelling.")]
    NotFound { query: String },

    #[error("Failed to fetch species information. Please try again or use the scientific name.")]
    Upstream(#[source] SourceError),

    #[error("Lookup superseded by a newer search")]
    Cancelled,
}

impl From<QueryError> for LookupError {
    fn from(_: QueryError) -> Self {
        Self::EmptyQuery
    }
}

/// Tunables for the lookup pipeline.
#[derive(Debug, Clone)]
pub struct LookupConfig {
    /// Suggestions requested from the taxonomy service
    pub suggest_limit: usize,
    /// Occurrence records fetched for media
    pub occurrence_limit: usize,
    /// Maximum images kept after deduplication
    pub image_cap: usize,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            suggest_limit: 5,
            occurrence_limit: 12,
            image_cap: 6,
        }
    }
}

/// Resolves species queries against a taxonomy and an encyclopedia provider.
pub struct SpeciesLookupResolver<T, E> {
    taxonomy: T,
    encyclopedia: E,
    config: LookupConfig,
}

impl<T, E> SpeciesLookupResolver<T, E>
where
    T: TaxonomyProvider + Sync,
    E: EncyclopediaProvider + Sync,
{
    pub fn new(taxonomy: T, encyclopedia: E, config: LookupConfig) -> Self {
        Self {
            taxonomy,
            encyclopedia,
            config,
        }
    }

    /// Parse raw user input and resolve it. Empty input fails before any
    /// network call is made.
    pub async fn resolve_text(&self, input: &str) -> Result<SpeciesRecord, LookupError> {
        let query = SpeciesQuery::parse(input)?;
        self.resolve(&query).await
    }

    /// Resolve a validated query into a merged species record.
    pub async fn resolve(&self, query: &SpeciesQuery) -> Result<SpeciesRecord, LookupError> {
        let suggestions = self
            .taxonomy
            .suggest(query.as_str(), self.config.suggest_limit)
            .await
            .map_err(LookupError::Upstream)?;

        // First suggestion is authoritative; the service's own ranking is
        // trusted as-is.
        let best = suggestions
            .into_iter()
            .next()
            .ok_or_else(|| LookupError::NotFound {
                query: query.as_str().to_string(),
            })?;

        tracing::debug!(key = best.key, provider = self.taxonomy.name(), "matched suggestion");

        let details = self
            .taxonomy
            .details(best.key)
            .await
            .map_err(LookupError::Upstream)?;

        let summary = self.find_summary(&details, &best, query).await;

        // Image enrichment is best-effort: an empty gallery is a valid
        // outcome, not a failure.
        let images = match self
            .taxonomy
            .occurrence_images(best.key, self.config.occurrence_limit)
            .await
        {
            Ok(groups) => dedup_images(groups, self.config.image_cap),
            Err(err) => {
                tracing::warn!(error = %err, "occurrence media fetch failed, continuing without images");
                Vec::new()
            }
        };

        Ok(assemble_record(query, &best, &details, summary, images))
    }

    /// Resolve, aborting with `LookupError::Cancelled` when the token fires.
    /// A caller starting a new search cancels the old token so the stale
    /// result never lands (last write wins).
    pub async fn resolve_with_cancel(
        &self,
        query: &SpeciesQuery,
        cancel: CancellationToken,
    ) -> Result<SpeciesRecord, LookupError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(LookupError::Cancelled),
            result = self.resolve(query) => result,
        }
    }

    /// Try the encyclopedia over name variants in order, stopping at the
    /// first usable summary. All misses are silent.
    async fn find_summary(
        &self,
        details: &SpeciesDetails,
        best: &SpeciesCandidate,
        query: &SpeciesQuery,
    ) -> Option<PageSummary> {
        let variants = name_variants(details, best, query);

        first_ok(
            variants,
            |title| async move {
                match self.encyclopedia.summary(&title).await {
                    Ok(found) => found,
                    Err(err) => {
                        tracing::debug!(error = %err, "encyclopedia attempt failed");
                        None
                    }
                }
            },
            PageSummary::is_usable,
        )
        .await
    }
}

/// Try candidates in order, returning the first produced value that
/// passes the `usable` predicate. Sequential with early exit: later
/// attempts are never started once one succeeds.
pub async fn first_ok<I, T, F, Fut, P>(candidates: I, mut attempt: F, mut usable: P) -> Option<T>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Option<T>>,
    P: FnMut(&T) -> bool,
{
    for candidate in candidates {
        if let Some(value) = attempt(candidate).await {
            if usable(&value) {
                return Some(value);
            }
        }
    }
    None
}

/// Encyclopedia title variants, most specific first: detail record names,
/// then the suggestion's canonical name, then the raw query. Blank and
/// already-seen names are skipped.
fn name_variants(
    details: &SpeciesDetails,
    best: &SpeciesCandidate,
    query: &SpeciesQuery,
) -> Vec<String> {
    let raw = [
        details.canonical_name.as_deref(),
        details.scientific_name.as_deref(),
        best.canonical_name.as_deref(),
        Some(query.as_str()),
    ];

    let mut variants: Vec<String> = Vec::new();
    for name in raw.into_iter().flatten() {
        let name = name.trim();
        if !name.is_empty() && !variants.iter().any(|v| v == name) {
            variants.push(name.to_string());
        }
    }
    variants
}

/// Flatten per-record media groups, deduplicate by URL preserving
/// first-seen order, and truncate to the cap.
pub fn dedup_images(groups: Vec<Vec<String>>, cap: usize) -> Vec<String> {
    let mut images: Vec<String> = Vec::new();
    for url in groups.into_iter().flatten() {
        if !images.iter().any(|seen| seen == &url) {
            images.push(url);
        }
        if images.len() == cap {
            break;
        }
    }
    images
}

fn or_na(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Merge details (authoritative), suggestion fields (fallback) and the
/// best-effort enrichment into the final view model.
fn assemble_record(
    query: &SpeciesQuery,
    best: &SpeciesCandidate,
    details: &SpeciesDetails,
    summary: Option<PageSummary>,
    images: Vec<String>,
) -> SpeciesRecord {
    let scientific_name = or_na(
        details
            .canonical_name
            .as_deref()
            .or(details.scientific_name.as_deref())
            .or(best.scientific_name.as_deref()),
    );

    let common_name = or_na(
        details
            .vernacular_name
            .as_deref()
            .or_else(|| best.vernacular_names.first().map(String::as_str)),
    );

    let link_title = details
        .canonical_name
        .as_deref()
        .unwrap_or(query.as_str())
        .replace(' ', "_");

    let source_url = summary
        .as_ref()
        .and_then(|s| s.page_url().map(str::to_string))
        .or_else(|| Some(format!("https://en.wikipedia.org/wiki/{}", link_title)));

    let thumbnail_url = summary
        .as_ref()
        .and_then(|s| s.thumbnail_url().map(str::to_string));

    let description = summary
        .as_ref()
        .and_then(|s| s.extract.clone())
        .unwrap_or_else(|| NO_DESCRIPTION.to_string());

    SpeciesRecord {
        scientific_name,
        common_name,
        kingdom: or_na(details.kingdom.as_deref()),
        phylum: or_na(details.phylum.as_deref()),
        class: or_na(details.class.as_deref()),
        order: or_na(details.order.as_deref()),
        family: or_na(details.family.as_deref()),
        genus: or_na(details.genus.as_deref()),
        taxonomic_status: or_na(details.taxonomic_status.as_deref()),
        rank: or_na(details.rank.as_deref().or(best.rank.as_deref())),
        description,
        thumbnail_url,
        source_url,
        images,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory taxonomy provider with canned responses and call counters.
    #[derive(Default)]
    struct FakeTaxonomy {
        suggestions: Vec<SpeciesCandidate>,
        details: Option<SpeciesDetails>,
        image_groups: Option<Vec<Vec<String>>>,
        fail_details: bool,
        calls: AtomicUsize,
    }

    impl FakeTaxonomy {
        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TaxonomyProvider for FakeTaxonomy {
        async fn suggest(
            &self,
            _name: &str,
            _limit: usize,
        ) -> Result<Vec<SpeciesCandidate>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.suggestions.clone())
        }

        async fn details(&self, _key: i64) -> Result<SpeciesDetails, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_details {
                return Err(SourceError::Status {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            Ok(self.details.clone().unwrap_or_default())
        }

        async fn occurrence_images(
            &self,
            _key: i64,
            _limit: usize,
        ) -> Result<Vec<Vec<String>>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.image_groups {
                Some(groups) => Ok(groups.clone()),
                None => Err(SourceError::Connection("offline".to_string())),
            }
        }

        fn name(&self) -> &'static str {
            "fake-taxonomy"
        }
    }

    /// Encyclopedia fake that replays responses keyed by title, recording
    /// the order in which titles were tried.
    #[derive(Default)]
    struct FakeEncyclopedia {
        responses: Vec<(String, Option<PageSummary>)>,
        tried: Mutex<Vec<String>>,
    }

    impl EncyclopediaProvider for FakeEncyclopedia {
        async fn summary(&self, title: &str) -> Result<Option<PageSummary>, SourceError> {
            self.tried.lock().unwrap().push(title.to_string());
            Ok(self
                .responses
                .iter()
                .find(|(t, _)| t == title)
                .and_then(|(_, summary)| summary.clone()))
        }

        fn name(&self) -> &'static str {
            "fake-encyclopedia"
        }
    }

    fn candidate(key: i64, canonical: &str) -> SpeciesCandidate {
        SpeciesCandidate {
            key,
            canonical_name: Some(canonical.to_string()),
            scientific_name: Some(format!("{} Linnaeus", canonical)),
            vernacular_names: vec![],
            rank: Some("SPECIES".to_string()),
        }
    }

    fn lion_details() -> SpeciesDetails {
        SpeciesDetails {
            canonical_name: Some("Panthera leo".to_string()),
            scientific_name: Some("Panthera leo (Linnaeus, 1758)".to_string()),
            vernacular_name: Some("Lion".to_string()),
            kingdom: Some("Animalia".to_string()),
            phylum: Some("Chordata".to_string()),
            class: Some("Mammalia".to_string()),
            order: Some("Carnivora".to_string()),
            family: Some("Felidae".to_string()),
            genus: Some("Panthera".to_string()),
            taxonomic_status: Some("ACCEPTED".to_string()),
            rank: Some("SPECIES".to_string()),
        }
    }

    fn summary(extract: &str, kind: &str) -> PageSummary {
        PageSummary {
            extract: Some(extract.to_string()),
            kind: Some(kind.to_string()),
            ..Default::default()
        }
    }

    fn resolver(
        taxonomy: FakeTaxonomy,
        encyclopedia: FakeEncyclopedia,
    ) -> SpeciesLookupResolver<FakeTaxonomy, FakeEncyclopedia> {
        SpeciesLookupResolver::new(taxonomy, encyclopedia, LookupConfig::default())
    }

    #[tokio::test]
    async fn test_empty_query_fails_without_network() {
        let lookup = resolver(FakeTaxonomy::default(), FakeEncyclopedia::default());

        let err = lookup.resolve_text("   ").await.unwrap_err();
        assert!(matches!(err, LookupError::EmptyQuery));
        assert_eq!(lookup.taxonomy.call_count(), 0);
    }

    #[tokio::test]
    async fn test_no_suggestions_is_not_found_with_query() {
        let lookup = resolver(FakeTaxonomy::default(), FakeEncyclopedia::default());

        let err = lookup.resolve_text("snarkodon").await.unwrap_err();
        match err {
            LookupError::NotFound { ref query } => assert_eq!(query, "snarkodon"),
            ref other => panic!("expected NotFound, got {:?}", other),
        }
        assert!(err.to_string().contains("snarkodon"));
        assert!(err.to_string().contains("scientific name"));
    }

    #[tokio::test]
    async fn test_first_suggestion_wins() {
        let taxonomy = FakeTaxonomy {
            suggestions: vec![
                candidate(1, "Panthera leo"),
                candidate(2, "Panthera tigris"),
                candidate(3, "Panthera onca"),
            ],
            details: Some(lion_details()),
            image_groups: Some(vec![]),
            ..Default::default()
        };
        let lookup = resolver(taxonomy, FakeEncyclopedia::default());

        let record = lookup.resolve_text("panthera").await.unwrap();
        assert_eq!(record.scientific_name, "Panthera leo");
    }

    #[tokio::test]
    async fn test_details_failure_is_upstream() {
        let taxonomy = FakeTaxonomy {
            suggestions: vec![candidate(1, "Panthera leo")],
            fail_details: true,
            ..Default::default()
        };
        let lookup = resolver(taxonomy, FakeEncyclopedia::default());

        let err = lookup.resolve_text("lion").await.unwrap_err();
        assert!(matches!(err, LookupError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_fallback_skips_disambiguation() {
        let taxonomy = FakeTaxonomy {
            suggestions: vec![candidate(1, "Panthera leo")],
            details: Some(lion_details()),
            image_groups: Some(vec![]),
            ..Default::default()
        };
        let encyclopedia = FakeEncyclopedia {
            responses: vec![
                (
                    "Panthera leo".to_string(),
                    Some(summary("Lion may refer to:", "disambiguation")),
                ),
                (
                    "Panthera leo (Linnaeus, 1758)".to_string(),
                    Some(summary("The lion is a large cat.", "standard")),
                ),
            ],
            ..Default::default()
        };
        let lookup = resolver(taxonomy, encyclopedia);

        let record = lookup.resolve_text("lion").await.unwrap();
        assert_eq!(record.description, "The lion is a large cat.");

        let tried = lookup.encyclopedia.tried.lock().unwrap().clone();
        assert_eq!(
            tried,
            vec![
                "Panthera leo".to_string(),
                "Panthera leo (Linnaeus, 1758)".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_fallback_stops_at_first_usable() {
        let taxonomy = FakeTaxonomy {
            suggestions: vec![candidate(1, "Panthera leo")],
            details: Some(lion_details()),
            image_groups: Some(vec![]),
            ..Default::default()
        };
        let encyclopedia = FakeEncyclopedia {
            responses: vec![(
                "Panthera leo".to_string(),
                Some(summary("The lion is a large cat.", "standard")),
            )],
            ..Default::default()
        };
        let lookup = resolver(taxonomy, encyclopedia);

        lookup.resolve_text("lion").await.unwrap();
        assert_eq!(lookup.encyclopedia.tried.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_all_variants_miss_uses_sentinel() {
        let taxonomy = FakeTaxonomy {
            suggestions: vec![candidate(1, "Panthera leo")],
            details: Some(lion_details()),
            image_groups: Some(vec![]),
            ..Default::default()
        };
        let lookup = resolver(taxonomy, FakeEncyclopedia::default());

        let record = lookup.resolve_text("lion").await.unwrap();
        assert_eq!(record.description, NO_DESCRIPTION);
        // Constructed deep link still present without a summary.
        assert_eq!(
            record.source_url.as_deref(),
            Some("https://en.wikipedia.org/wiki/Panthera_leo")
        );
    }

    #[tokio::test]
    async fn test_image_dedup_preserves_first_seen_order() {
        let taxonomy = FakeTaxonomy {
            suggestions: vec![candidate(1, "Panthera leo")],
            details: Some(lion_details()),
            image_groups: Some(vec![
                vec!["x".to_string(), "y".to_string()],
                vec!["x".to_string()],
                vec!["z".to_string()],
            ]),
            ..Default::default()
        };
        let lookup = resolver(taxonomy, FakeEncyclopedia::default());

        let record = lookup.resolve_text("lion").await.unwrap();
        assert_eq!(record.images, vec!["x", "y", "z"]);
    }

    #[tokio::test]
    async fn test_image_failure_tolerated() {
        let taxonomy = FakeTaxonomy {
            suggestions: vec![candidate(1, "Panthera leo")],
            details: Some(lion_details()),
            image_groups: None, // provider errors
            ..Default::default()
        };
        let lookup = resolver(taxonomy, FakeEncyclopedia::default());

        let record = lookup.resolve_text("lion").await.unwrap();
        assert!(record.images.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_resolve() {
        let taxonomy = FakeTaxonomy {
            suggestions: vec![candidate(1, "Panthera leo")],
            details: Some(lion_details()),
            image_groups: Some(vec![]),
            ..Default::default()
        };
        let lookup = resolver(taxonomy, FakeEncyclopedia::default());

        let cancel = CancellationToken::new();
        cancel.cancel();

        let query = SpeciesQuery::parse("lion").unwrap();
        let err = lookup.resolve_with_cancel(&query, cancel).await.unwrap_err();
        assert!(matches!(err, LookupError::Cancelled));
    }

    #[test]
    fn test_dedup_images_cap() {
        let groups = vec![vec![
            "a".to_string(),
            "b".to_string(),
            "a".to_string(),
            "c".to_string(),
            "d".to_string(),
        ]];
        assert_eq!(dedup_images(groups, 3), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_name_variants_order_and_dedup() {
        let details = SpeciesDetails {
            canonical_name: Some("Panthera leo".to_string()),
            scientific_name: Some("Panthera leo".to_string()),
            ..Default::default()
        };
        let best = candidate(1, "Panthera leo");
        let query = SpeciesQuery::parse("lion").unwrap();

        let variants = name_variants(&details, &best, &query);
        assert_eq!(variants, vec!["Panthera leo".to_string(), "lion".to_string()]);
    }

    #[tokio::test]
    async fn test_first_ok_combinator() {
        let tried = Mutex::new(Vec::new());
        let result = first_ok(
            vec![1, 2, 3, 4],
            |n| {
                tried.lock().unwrap().push(n);
                async move { if n % 2 == 0 { Some(n * 10) } else { None } }
            },
            |v| *v > 20,
        )
        .await;

        assert_eq!(result, Some(40));
        // 2 produced a value that failed the predicate, so 3 and 4 ran too.
        assert_eq!(*tried.lock().unwrap(), vec![1, 2, 3, 4]);
    }
}
