//! Top-level search service: gating, caching, enhancement, and evidence
//! surfaces behind one facade.
//!
//! Every collaborator is injected at construction: the provider is a
//! [`SearchProvider`] implementation, counters live behind the
//! [`CounterStore`] seam, and the cache, rate limiter, and quota manager
//! are plain values owned by the service. Nothing here touches global
//! state, so two services in one process stay fully independent.
//!
//! Request flow for a standard search: quota gate, rate-limit gate, cache
//! lookup, provider call through the enhancement pipeline, then cache fill
//! and usage accounting. A cache hit short-circuits before any usage is
//! recorded.

use std::sync::Arc;

use crate::cache::{CacheStats, ResponseCache};
use crate::config::ServiceConfig;
use crate::error::{Result, SearchError};
use crate::processor::{self, ResultProcessor};
use crate::provider::{self as provider_api, HttpSearchProvider, SearchProvider};
use crate::quota::{QuotaDecision, QuotaManager, UpgradeSuggestion, UsageStats};
use crate::rate_limit::{RateDecision, RateLimiter};
use crate::reasoning::{ReasoningOptions, ReasoningService};
use crate::store::{CounterStore, MemoryStore};
use crate::types::{
    AugmentedInsight, EnhancedResponse, FactCheckResult, ReasoningResult, SearchContext,
    SearchKind, SearchOptions, SearchResponse, Tier,
};

/// The search orchestration facade.
pub struct SearchService<P> {
    provider: Arc<P>,
    store: Arc<dyn CounterStore>,
    cache: Arc<ResponseCache>,
    limiter: Arc<RateLimiter>,
    quotas: Arc<QuotaManager>,
    processor: ResultProcessor<P>,
    reasoning: ReasoningService<P>,
    config: ServiceConfig,
}

fn require_query(query: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Err(SearchError::Validation("query must not be empty".into()));
    }
    Ok(())
}

impl SearchService<HttpSearchProvider> {
    /// Build a service over the HTTP provider with an in-process counter
    /// store.
    ///
    /// # Errors
    ///
    /// [`SearchError::Config`] when the configuration is invalid.
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let provider = Arc::new(HttpSearchProvider::new(&config)?);
        Ok(Self::with_parts(
            provider,
            Arc::new(MemoryStore::new()),
            config,
        ))
    }
}

impl<P: SearchProvider> SearchService<P> {
    /// Build a service from an explicit provider and counter store.
    pub fn with_parts(
        provider: Arc<P>,
        store: Arc<dyn CounterStore>,
        config: ServiceConfig,
    ) -> Self {
        let cache = Arc::new(ResponseCache::new(config.cache_capacity));
        let limiter = Arc::new(RateLimiter::new(config.rate_window));
        let quotas = Arc::new(QuotaManager::new(Arc::clone(&store)));
        let processor = ResultProcessor::new(Arc::clone(&provider), config.oversample_count)
            .with_concurrency(config.max_concurrency);
        let reasoning = ReasoningService::with_options(
            Arc::clone(&provider),
            ReasoningOptions {
                concurrency: config.max_concurrency,
                ..Default::default()
            },
        );
        Self {
            provider,
            store,
            cache,
            limiter,
            quotas,
            processor,
            reasoning,
            config,
        }
    }

    /// Run a standard search for `user`.
    ///
    /// # Errors
    ///
    /// [`SearchError::QuotaExceeded`] when a daily or monthly limit is hit,
    /// [`SearchError::RateLimited`] when the request window is exhausted,
    /// plus anything the provider call itself can return.
    pub async fn search(
        &self,
        user: &str,
        query: &str,
        context: &SearchContext,
        options: &SearchOptions,
    ) -> Result<EnhancedResponse> {
        require_query(query)?;
        self.gate(user, SearchKind::Standard, 1)?;

        if let Some(cached) = self.cache.get(query, options) {
            tracing::debug!(user, "serving search from cache");
            return Ok(cached);
        }

        let response = self.processor.process_search(query, context, options).await?;
        self.cache.set(query, options, response.clone());
        self.quotas.record_usage(user, SearchKind::Standard);
        self.limiter.consume(user);

        if let Some(suggestion) = self.quotas.suggest_upgrade(user) {
            tracing::info!(user, to = %suggestion.to, reason = %suggestion.reason, "upgrade suggested");
        }
        Ok(response)
    }

    /// Run a fan-out deep search for `user`. Tier-gated; the rate window
    /// must absorb the actual number of fan-out calls up front.
    pub async fn deep_search(
        &self,
        user: &str,
        query: &str,
        context: &SearchContext,
        options: &SearchOptions,
    ) -> Result<EnhancedResponse> {
        require_query(query)?;
        let calls = processor::query_variants(query, context).len() as u32;
        self.gate(user, SearchKind::Deep, calls)?;

        let response = self.processor.deep_search(query, context, options).await?;
        self.quotas.record_usage(user, SearchKind::Deep);
        self.limiter.consume_n(user, calls);
        Ok(response)
    }

    /// Run several independent queries for `user` with bounded concurrency.
    /// Tier-gated; each query's outcome is reported independently.
    pub async fn batch_search(
        &self,
        user: &str,
        queries: &[String],
        options: &SearchOptions,
    ) -> Result<Vec<Result<SearchResponse>>> {
        let n = u32::try_from(queries.len())
            .map_err(|_| SearchError::Validation("too many queries in batch".into()))?;
        self.gate(user, SearchKind::Batch, n)?;

        let outcomes = provider_api::batch_search(
            self.provider.as_ref(),
            queries,
            options,
            self.config.max_concurrency,
        )
        .await;
        for outcome in &outcomes {
            if outcome.is_ok() {
                self.quotas.record_usage(user, SearchKind::Batch);
            }
        }
        self.limiter.consume_n(user, n);
        Ok(outcomes)
    }

    /// Gather trust-scored evidence sources for a topic. Accounted as a
    /// standard search.
    pub async fn search_for_reasoning(
        &self,
        user: &str,
        topic: &str,
        context: &SearchContext,
    ) -> Result<Vec<ReasoningResult>> {
        require_query(topic)?;
        self.gate(user, SearchKind::Standard, 1)?;
        let sources = self.reasoning.search_for_reasoning(topic, context).await?;
        self.quotas.record_usage(user, SearchKind::Standard);
        self.limiter.consume(user);
        Ok(sources)
    }

    /// Augment an insight with evidence and a confidence figure. Accounted
    /// as a standard search.
    pub async fn augment_insight(
        &self,
        user: &str,
        insight: &str,
        context: &SearchContext,
    ) -> Result<AugmentedInsight> {
        require_query(insight)?;
        self.gate(user, SearchKind::Standard, 1)?;
        let augmented = self.reasoning.augment_insight(insight, context).await?;
        self.quotas.record_usage(user, SearchKind::Standard);
        self.limiter.consume(user);
        Ok(augmented)
    }

    /// Check a claim against gathered evidence. Accounted as a standard
    /// search.
    pub async fn fact_check_claim(&self, user: &str, claim: &str) -> Result<FactCheckResult> {
        require_query(claim)?;
        self.gate(user, SearchKind::Standard, 1)?;
        let outcome = self.reasoning.fact_check_claim(claim).await?;
        self.quotas.record_usage(user, SearchKind::Standard);
        self.limiter.consume(user);
        Ok(outcome)
    }

    /// Quota then rate-limit gate, in that order.
    fn gate(&self, user: &str, kind: SearchKind, calls: u32) -> Result<()> {
        match self.quotas.can_search(user, kind) {
            QuotaDecision { allowed: true, .. } => {}
            QuotaDecision {
                reason,
                upgrade_required,
                ..
            } => {
                return Err(SearchError::QuotaExceeded {
                    reason: reason.unwrap_or_else(|| "quota exhausted".into()),
                    upgrade_required,
                });
            }
        }
        let tier = self.quotas.tier_of(user);
        match self.limiter.check_batch(user, calls, tier) {
            RateDecision { allowed: true, .. } => Ok(()),
            RateDecision { reset_in, .. } => Err(SearchError::RateLimited {
                retry_after_secs: reset_in.as_secs(),
            }),
        }
    }

    /// Assign a subscription tier to a user.
    pub fn set_tier(&self, user: &str, tier: Tier) {
        self.quotas.set_tier(user, tier);
    }

    /// Whether `user` could run a search of `kind` right now, without
    /// consuming anything.
    pub fn check_quota(&self, user: &str, kind: SearchKind) -> QuotaDecision {
        self.quotas.can_search(user, kind)
    }

    /// Record one consumed search for `user` outside the normal flow, e.g.
    /// when a caller performs work through a provider handle of its own.
    pub fn record_usage(&self, user: &str, kind: SearchKind) {
        self.quotas.record_usage(user, kind);
        self.limiter.consume(user);
    }

    /// Today's usage against the user's daily limit.
    pub fn usage_stats(&self, user: &str) -> UsageStats {
        self.quotas.usage_stats(user)
    }

    /// Upgrade recommendation for a user, if their usage warrants one.
    pub fn suggest_upgrade(&self, user: &str) -> Option<UpgradeSuggestion> {
        self.quotas.suggest_upgrade(user)
    }

    /// Cache hit/miss statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Invalidate cached responses whose key matches `pattern`. Returns how
    /// many entries were removed.
    pub fn invalidate_cache(&self, pattern: &regex::Regex) -> usize {
        self.cache.invalidate_pattern(pattern)
    }

    /// Spawn the background maintenance tasks: the cache sweeper, the
    /// rate-window cleanup, and the counter-store sweep that drops expired
    /// period keys. Handles are returned so callers can abort them on
    /// shutdown.
    pub fn spawn_maintenance(&self) -> Vec<tokio::task::JoinHandle<()>> {
        let store = Arc::clone(&self.store);
        let interval = self.config.rate_cleanup_interval;
        let store_sweep = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                store.sweep();
            }
        });
        vec![
            self.cache.spawn_sweeper(self.config.cache_sweep_interval),
            self.limiter.spawn_cleanup(self.config.rate_cleanup_interval),
            store_sweep,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RawResult, SearchResponse};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingProvider {
        calls: AtomicUsize,
    }

    impl CountingProvider {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl SearchProvider for CountingProvider {
        async fn search(&self, query: &str, _options: &SearchOptions) -> Result<SearchResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(SearchResponse {
                query: query.to_string(),
                altered: None,
                results: vec![RawResult {
                    title: format!("Result for {query}"),
                    url: format!("https://example.com/{}", query.replace(' ', "-")),
                    description: "A description long enough for key points.".into(),
                    age: None,
                    thumbnail: None,
                    score: 100.0,
                }],
                total: Some(1),
            })
        }
    }

    fn make_service(provider: Arc<CountingProvider>) -> SearchService<CountingProvider> {
        SearchService::with_parts(
            provider,
            Arc::new(MemoryStore::new()),
            ServiceConfig::new("test-token"),
        )
    }

    #[tokio::test]
    async fn search_hits_provider_then_cache() {
        let provider = Arc::new(CountingProvider::new());
        let service = make_service(Arc::clone(&provider));
        let context = SearchContext::default();
        let options = SearchOptions::default();

        let first = service
            .search("alice", "rust async", &context, &options)
            .await
            .expect("first search succeeds");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        let second = service
            .search("alice", "rust async", &context, &options)
            .await
            .expect("second search succeeds");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1, "served from cache");
        assert_eq!(first, second);

        let stats = service.cache_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn cache_hits_do_not_consume_quota() {
        let provider = Arc::new(CountingProvider::new());
        let service = make_service(provider);
        let context = SearchContext::default();
        let options = SearchOptions::default();

        for _ in 0..5 {
            service
                .search("alice", "same query", &context, &options)
                .await
                .expect("should succeed");
        }
        assert_eq!(service.usage_stats("alice").used, 1, "only the miss counts");
    }

    #[tokio::test]
    async fn deep_search_denied_on_free_tier() {
        let provider = Arc::new(CountingProvider::new());
        let service = make_service(provider);

        let err = service
            .deep_search(
                "free-user",
                "rust",
                &SearchContext::default(),
                &SearchOptions::default(),
            )
            .await
            .expect_err("free tier has no deep search");
        match err {
            SearchError::QuotaExceeded {
                upgrade_required, ..
            } => assert!(upgrade_required),
            other => panic!("expected QuotaExceeded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn deep_search_allowed_on_pro_tier() {
        let provider = Arc::new(CountingProvider::new());
        let service = make_service(Arc::clone(&provider));
        service.set_tier("pro-user", Tier::Pro);

        let response = service
            .deep_search(
                "pro-user",
                "rust channels",
                &SearchContext::default(),
                &SearchOptions::default(),
            )
            .await
            .expect("pro tier has deep search");
        assert!(!response.results.is_empty());
        assert!(provider.calls.load(Ordering::SeqCst) > 1, "fan-out issued");
    }

    #[tokio::test]
    async fn batch_search_requires_enterprise() {
        let provider = Arc::new(CountingProvider::new());
        let service = make_service(Arc::clone(&provider));
        let queries = vec!["a".to_string(), "b".to_string()];

        service.set_tier("pro-user", Tier::Pro);
        assert!(service
            .batch_search("pro-user", &queries, &SearchOptions::default())
            .await
            .is_err());

        service.set_tier("ent-user", Tier::Enterprise);
        let outcomes = service
            .batch_search("ent-user", &queries, &SearchOptions::default())
            .await
            .expect("enterprise has batch search");
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.is_ok()));
        assert_eq!(service.usage_stats("ent-user").used, 2);
    }

    #[tokio::test]
    async fn rate_limit_surfaces_retry_after() {
        let provider = Arc::new(CountingProvider::new());
        let service = SearchService::with_parts(
            provider,
            Arc::new(MemoryStore::new()),
            ServiceConfig {
                rate_window: Duration::from_secs(3600),
                ..ServiceConfig::new("test-token")
            },
        );
        // Exhaust the 50-request free window without touching daily quota
        // counters (the quota daily limit is also 50, so drain via limiter).
        service.limiter.consume_n("alice", 50);

        let err = service
            .search(
                "alice",
                "rust",
                &SearchContext::default(),
                &SearchOptions::default(),
            )
            .await
            .expect_err("window is full");
        match err {
            SearchError::RateLimited { retry_after_secs } => {
                assert!(retry_after_secs <= 3600);
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn quota_denial_precedes_rate_limit() {
        let provider = Arc::new(CountingProvider::new());
        let service = make_service(provider);
        for _ in 0..50 {
            service.quotas.record_usage("alice", SearchKind::Standard);
        }

        let err = service
            .search(
                "alice",
                "rust",
                &SearchContext::default(),
                &SearchOptions::default(),
            )
            .await
            .expect_err("daily quota exhausted");
        assert!(matches!(err, SearchError::QuotaExceeded { .. }));
    }

    #[tokio::test]
    async fn reasoning_surfaces_account_usage() {
        let provider = Arc::new(CountingProvider::new());
        let service = make_service(provider);

        let outcome = service
            .fact_check_claim("alice", "rust prevents data races")
            .await
            .expect("fact check succeeds");
        assert_eq!(outcome.claim, "rust prevents data races");
        assert_eq!(service.usage_stats("alice").used, 1);
    }

    #[tokio::test]
    async fn maintenance_tasks_spawn_and_abort() {
        let provider = Arc::new(CountingProvider::new());
        let service = make_service(provider);
        let handles = service.spawn_maintenance();
        assert_eq!(handles.len(), 3);
        for handle in handles {
            handle.abort();
        }
    }

    #[tokio::test]
    async fn deep_search_charges_the_actual_fanout_width() {
        let provider = Arc::new(CountingProvider::new());
        let service = make_service(Arc::clone(&provider));
        service.set_tier("pro-user", Tier::Pro);

        service
            .deep_search(
                "pro-user",
                "rust channels",
                &SearchContext::default(),
                &SearchOptions::default(),
            )
            .await
            .expect("pro tier has deep search");

        // No context fields set, so the fan-out is the original query plus
        // the three suffix variants.
        let issued = provider.calls.load(Ordering::SeqCst) as u32;
        assert_eq!(issued, 4);
        let decision = service.limiter.check("pro-user", Tier::Pro);
        assert_eq!(decision.remaining, 500 - issued);
    }

    #[tokio::test]
    async fn blank_deep_search_is_rejected_without_charging() {
        let provider = Arc::new(CountingProvider::new());
        let service = make_service(Arc::clone(&provider));
        service.set_tier("pro-user", Tier::Pro);

        let err = service
            .deep_search(
                "pro-user",
                "   ",
                &SearchContext::default(),
                &SearchOptions::default(),
            )
            .await
            .expect_err("blank query is invalid");
        assert!(matches!(err, SearchError::Validation(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(service.usage_stats("pro-user").used, 0);
        assert_eq!(service.limiter.check("pro-user", Tier::Pro).remaining, 500);
    }
}
