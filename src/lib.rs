//! # arbor-search
//!
//! Tier-aware web search orchestration over an external search provider.
//!
//! This crate wraps a subscription web-search API with the plumbing a
//! multi-tenant caller needs: per-user quotas and rate limiting, a
//! content-aware response cache, a multi-stage result enhancement pipeline,
//! and evidence surfaces for reasoning and fact-checking workflows.
//!
//! ## Design
//!
//! - One HTTP provider client behind a [`SearchProvider`] trait, so tests
//!   and alternative backends plug in without touching the orchestration
//! - TTL + LRU response cache keyed by query and options, with shorter
//!   lifetimes for news and fresh queries
//! - Calendar quotas (daily/monthly per tier) separate from the
//!   burst-oriented rate-limit window
//! - Deep search fans out query variants with bounded concurrency and
//!   settle-all semantics: failing branches degrade, never abort
//! - Every collaborator is injected at construction; nothing is global
//!
//! ## Security
//!
//! - The subscription token never appears in logs or error messages
//! - Query text is logged only at trace level
//! - Provider error bodies are truncated before they reach callers
//!
//! # Examples
//!
//! ```no_run
//! # async fn example() -> arbor_search::Result<()> {
//! let config = arbor_search::ServiceConfig::new("subscription-token");
//! let service = arbor_search::SearchService::new(config)?;
//! let response = service
//!     .search(
//!         "user-1",
//!         "rust async channels",
//!         &arbor_search::SearchContext::default(),
//!         &arbor_search::SearchOptions::default(),
//!     )
//!     .await?;
//! for result in &response.results {
//!     println!("{}: {}", result.title, result.url);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod processor;
pub mod provider;
pub mod quota;
pub mod rate_limit;
pub mod reasoning;
pub mod service;
pub mod store;
pub mod types;

pub use cache::{CacheStats, ResponseCache};
pub use config::ServiceConfig;
pub use error::{Result, SearchError};
pub use processor::ResultProcessor;
pub use provider::{HttpSearchProvider, SearchProvider};
pub use quota::{QuotaDecision, QuotaManager, TierQuota, UpgradeSuggestion, UsageRecord, UsageStats};
pub use rate_limit::{RateDecision, RateLimiter};
pub use reasoning::{ReasoningOptions, ReasoningService};
pub use service::SearchService;
pub use store::{CounterStore, MemoryStore};
pub use types::{
    AugmentedInsight, Category, Difficulty, EnhancedResponse, Evidence, FactCheckResult,
    Freshness, ProcessedResult, RawResult, ReasoningResult, ResultKind, SafeLevel, SearchContext,
    SearchInsights, SearchKind, SearchOptions, SearchResponse, Tier,
};
