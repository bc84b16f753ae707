//! Multi-stage result enhancement pipeline and deep-search fan-out.
//!
//! `process_search` oversamples raw results from the provider, then runs
//! categorize → tag → difficulty → re-score → summarize → sort/truncate →
//! aggregate. `deep_search` fans out up to five query variants with bounded
//! concurrency and settle-all semantics, deduplicates by URL, and runs the
//! same enhancement over the union.

pub mod classify;
pub mod score;
pub mod summarize;

use std::collections::HashSet;
use std::sync::Arc;

use futures::StreamExt;

use crate::error::{Result, SearchError};
use crate::provider::{SearchProvider, MAX_FANOUT};
use crate::types::{
    EnhancedResponse, ProcessedResult, RawResult, SearchContext, SearchOptions,
};

/// Results returned to the caller after enhancement.
const MAX_RESULTS: usize = 10;
/// Maximum query variants issued by a deep search.
const MAX_VARIANTS: usize = 5;

/// The enhancement pipeline over a pluggable provider.
#[derive(Debug)]
pub struct ResultProcessor<P> {
    provider: Arc<P>,
    oversample: usize,
    concurrency: usize,
}

impl<P: SearchProvider> ResultProcessor<P> {
    /// Create a processor that oversamples `oversample` raw results per
    /// provider call, with the default fan-out concurrency.
    pub fn new(provider: Arc<P>, oversample: usize) -> Self {
        Self {
            provider,
            oversample: oversample.max(MAX_RESULTS),
            concurrency: MAX_FANOUT,
        }
    }

    /// Override how many fan-out calls may be in flight at once.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Run a single provider call through the full enhancement pipeline.
    ///
    /// # Errors
    ///
    /// Propagates the provider error from the single underlying call.
    pub async fn process_search(
        &self,
        query: &str,
        context: &SearchContext,
        options: &SearchOptions,
    ) -> Result<EnhancedResponse> {
        let options = SearchOptions {
            count: self.oversample,
            ..options.clone()
        };
        let response = self.provider.search(query, &options).await?;
        Ok(enhance(query, context, response.results))
    }

    /// Fan-out deep search: up to five query variants, at most three in
    /// flight, settle-all. A failing or empty branch is logged and dropped;
    /// the union is deduplicated by URL (first occurrence wins) and then
    /// enhanced. A fully failing fan-out yields an empty response with a
    /// "no results" summary rather than an error.
    pub async fn deep_search(
        &self,
        query: &str,
        context: &SearchContext,
        options: &SearchOptions,
    ) -> Result<EnhancedResponse> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::Validation("query must not be empty".into()));
        }
        let variants = query_variants(query, context);
        let options = SearchOptions {
            count: self.oversample,
            ..options.clone()
        };

        let outcomes: Vec<_> = futures::stream::iter(variants.iter().map(|variant| {
            let options = options.clone();
            async move {
                let outcome = self.provider.search(variant, &options).await;
                (variant.clone(), outcome)
            }
        }))
        .buffered(self.concurrency)
        .collect()
        .await;

        let mut combined: Vec<RawResult> = Vec::new();
        for (variant, outcome) in outcomes {
            match outcome {
                Ok(response) => {
                    tracing::debug!(
                        count = response.results.len(),
                        "deep search branch returned results"
                    );
                    combined.extend(response.results);
                }
                Err(err) => {
                    tracing::warn!(variant = %variant, error = %err, "deep search branch failed");
                }
            }
        }

        let deduped = dedup_by_url(combined);
        Ok(enhance(query, context, deduped))
    }
}

/// Build up to five deep-search query variants: the original, a
/// context-prefixed form, and tutorial/documentation/examples suffixes.
pub(crate) fn query_variants(query: &str, context: &SearchContext) -> Vec<String> {
    let mut variants: Vec<String> = Vec::with_capacity(MAX_VARIANTS);
    let mut push = |candidate: String| {
        if !variants.contains(&candidate) && variants.len() < MAX_VARIANTS {
            variants.push(candidate);
        }
    };

    push(query.to_string());
    let prefix = context
        .language
        .as_deref()
        .or(context.framework.as_deref())
        .or(context.domain.as_deref());
    if let Some(prefix) = prefix {
        push(format!("{prefix} {query}"));
    }
    push(format!("{query} tutorial"));
    push(format!("{query} documentation"));
    push(format!("{query} examples"));
    variants
}

/// Deduplicate raw results by URL, keeping the first occurrence.
pub(crate) fn dedup_by_url(results: Vec<RawResult>) -> Vec<RawResult> {
    let mut seen: HashSet<String> = HashSet::new();
    results
        .into_iter()
        .filter(|r| seen.insert(r.url.clone()))
        .collect()
}

/// Run pipeline stages 2–8 over a set of raw results.
///
/// 1. Classify each result (ordered rule table)
/// 2. Tag from keyword dictionaries plus context
/// 3. Bucket difficulty from title markers
/// 4. Re-score with context boosts
/// 5. Extract key points and a per-result summary
/// 6. Sort descending by score, truncate to ten
/// 7. Build the aggregate summary, follow-ups, histogram, and insights
pub(crate) fn enhance(
    query: &str,
    context: &SearchContext,
    raw: Vec<RawResult>,
) -> EnhancedResponse {
    let mut processed: Vec<ProcessedResult> = raw
        .into_iter()
        .map(|r| {
            let category = classify::categorize(&r);
            let tags = classify::tags_for(&r, context);
            let difficulty = classify::difficulty_of(&r.title);
            let score = score::enhance_score(
                r.score,
                category,
                &tags,
                r.age.as_deref(),
                query,
                context,
            );
            let key_points = summarize::key_points(&r.description);
            let summary = summarize::result_summary(category, &r.title);
            ProcessedResult {
                title: r.title,
                url: r.url,
                description: r.description,
                age: r.age,
                thumbnail: r.thumbnail,
                category,
                tags,
                difficulty,
                score,
                key_points,
                summary,
            }
        })
        .collect();

    processed.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    processed.truncate(MAX_RESULTS);

    let summary = summarize::aggregate_summary(query, context, &processed);
    let follow_up_queries = summarize::follow_up_queries(query, context, &processed);
    let category_counts = summarize::category_histogram(&processed);
    let insights = summarize::derive_insights(&processed);

    EnhancedResponse {
        query: query.to_string(),
        results: processed,
        summary,
        follow_up_queries,
        category_counts,
        insights,
    }
}
