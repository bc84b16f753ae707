//! Core types shared across the search orchestration pipeline.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Safe-search filtering level requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafeLevel {
    /// No filtering.
    Off,
    /// Default filtering.
    Moderate,
    /// Aggressive filtering.
    Strict,
}

impl SafeLevel {
    /// Wire value for the provider's `safesearch` query parameter.
    pub fn as_param(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Moderate => "moderate",
            Self::Strict => "strict",
        }
    }
}

/// Which vertical to request from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    /// Standard web results.
    Web,
    /// News articles.
    News,
    /// Image results.
    Images,
}

impl ResultKind {
    /// Wire value for the provider's `result_filter` query parameter.
    pub fn as_param(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::News => "news",
            Self::Images => "images",
        }
    }
}

/// Recency window requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    /// Past 24 hours.
    Day,
    /// Past week.
    Week,
    /// Past month.
    Month,
    /// Past year.
    Year,
}

impl Freshness {
    /// Wire value for the provider's `freshness` query parameter.
    pub fn as_param(&self) -> &'static str {
        match self {
            Self::Day => "pd",
            Self::Week => "pw",
            Self::Month => "pm",
            Self::Year => "py",
        }
    }
}

/// Options for a single search call. Immutable per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Maximum number of raw results to request.
    pub count: usize,
    /// Pagination offset.
    pub offset: usize,
    /// Two-letter search language code (e.g. "en").
    pub language: Option<String>,
    /// Two-letter country code (e.g. "US").
    pub country: Option<String>,
    /// Safe-search level.
    pub safe: SafeLevel,
    /// Result vertical.
    pub kind: ResultKind,
    /// Recency filter, if any.
    pub freshness: Option<Freshness>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            count: 10,
            offset: 0,
            language: None,
            country: None,
            safe: SafeLevel::Moderate,
            kind: ResultKind::Web,
            freshness: None,
        }
    }
}

/// Caller-supplied context that steers classification, tagging, and scoring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchContext {
    /// Programming language the caller is working in, if any.
    pub language: Option<String>,
    /// Framework or library of interest.
    pub framework: Option<String>,
    /// Domain to prefer via a `site:` restriction.
    pub domain: Option<String>,
}

/// A single raw result from the provider, normalized into a uniform shape
/// with a baseline relevance score attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResult {
    /// Result page title.
    pub title: String,
    /// Result URL.
    pub url: String,
    /// Provider-supplied description snippet.
    pub description: String,
    /// Human-readable age string from the provider (e.g. "3 hours ago").
    pub age: Option<String>,
    /// Thumbnail image URL, if any.
    pub thumbnail: Option<String>,
    /// Baseline relevance score (position + term/recency/domain boosts).
    pub score: f64,
}

/// A normalized provider response before enhancement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// The query as issued.
    pub query: String,
    /// Provider-altered query, when spell correction kicked in.
    pub altered: Option<String>,
    /// Raw results in provider order, baseline-scored.
    pub results: Vec<RawResult>,
    /// Total result estimate from the provider, if reported.
    pub total: Option<u64>,
}

/// Content category assigned by the classifier. Rule order matters:
/// documentation wins over tutorial wins over code, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Official docs / API reference pages.
    Documentation,
    /// How-to guides and walkthroughs.
    Tutorial,
    /// Code hosting, examples, and samples.
    Code,
    /// News articles and blog posts.
    News,
    /// Utilities, playgrounds, converters.
    Tool,
    /// Everything else.
    General,
}

impl Category {
    /// All categories in classifier precedence order.
    pub fn all() -> &'static [Category] {
        &[
            Self::Documentation,
            Self::Tutorial,
            Self::Code,
            Self::News,
            Self::Tool,
            Self::General,
        ]
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Documentation => "documentation",
            Self::Tutorial => "tutorial",
            Self::Code => "code",
            Self::News => "news",
            Self::Tool => "tool",
            Self::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Difficulty bucket derived from title markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Intro/basics material.
    Beginner,
    /// Neither clearly introductory nor clearly advanced.
    Intermediate,
    /// Deep dives and expert material.
    Advanced,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        };
        f.write_str(s)
    }
}

/// A raw result after the enhancement pipeline has run over it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedResult {
    /// Result page title.
    pub title: String,
    /// Result URL.
    pub url: String,
    /// Provider description snippet.
    pub description: String,
    /// Age string from the provider, if any.
    pub age: Option<String>,
    /// Thumbnail URL, if any.
    pub thumbnail: Option<String>,
    /// Assigned content category.
    pub category: Category,
    /// Language/framework/level tags.
    pub tags: Vec<String>,
    /// Difficulty bucket.
    pub difficulty: Difficulty,
    /// Enhanced relevance score (baseline plus context boosts).
    pub score: f64,
    /// Up to three key sentences extracted from the description.
    pub key_points: Vec<String>,
    /// One-line category-templated summary.
    pub summary: String,
}

/// Derived aggregate insights across a processed result set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchInsights {
    /// Most frequent tags across the result set.
    pub trending_topics: Vec<String>,
    /// One suggested action per category present.
    pub recommended_actions: Vec<String>,
    /// Suggested progression ordered beginner → intermediate → advanced.
    pub learning_path: Vec<String>,
}

/// The enhanced response returned to callers: top results plus aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedResponse {
    /// The original query.
    pub query: String,
    /// Top results, sorted descending by enhanced score, at most ten.
    pub results: Vec<ProcessedResult>,
    /// One-paragraph aggregate summary.
    pub summary: String,
    /// Up to five suggested follow-up queries.
    pub follow_up_queries: Vec<String>,
    /// How many results landed in each category.
    pub category_counts: BTreeMap<Category, usize>,
    /// Derived insights.
    pub insights: SearchInsights,
}

/// Which kind of search a caller is requesting, for quota feature gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    /// Single-query search.
    Standard,
    /// Fan-out deep search.
    Deep,
    /// Multi-query batch search.
    Batch,
}

/// Subscription tier. Limits grow strictly with tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Free tier.
    Free,
    /// Pro tier.
    Pro,
    /// Enterprise tier.
    Enterprise,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Free => "free",
            Self::Pro => "pro",
            Self::Enterprise => "enterprise",
        };
        f.write_str(s)
    }
}

/// A processed result reshaped for evidence/reasoning callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningResult {
    /// Result page title.
    pub title: String,
    /// Result URL.
    pub url: String,
    /// Description snippet.
    pub snippet: String,
    /// URL host with any leading "www." stripped.
    pub domain: String,
    /// Heuristic source reliability, 0–100.
    pub trust_score: u8,
    /// Key facts extracted from the snippet.
    pub key_facts: Vec<String>,
    /// Related concepts (tags) for follow-up exploration.
    pub related_concepts: Vec<String>,
    /// Relevance normalized to 0.0–1.0.
    pub relevance: f64,
}

/// An insight after evidence augmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AugmentedInsight {
    /// The insight text being augmented.
    pub insight: String,
    /// Confidence 0–100 derived from facts, trust, and contradictions.
    pub confidence: u8,
    /// Supporting sources, strongest first.
    pub sources: Vec<ReasoningResult>,
    /// Statements from sources that overlap the insight.
    pub factual_basis: Vec<String>,
    /// Sentences carrying contrast markers against the insight.
    pub contradictions: Vec<String>,
    /// Set when confidence or factual basis is too thin.
    pub needs_more_research: bool,
}

/// A single piece of evidence considered during fact checking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// Source title.
    pub title: String,
    /// Source URL.
    pub url: String,
    /// Stance toward the claim, 0.0 (refuting) to 1.0 (supporting).
    pub stance: f64,
}

/// The outcome of checking a claim against search evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCheckResult {
    /// The claim that was checked.
    pub claim: String,
    /// True when the supporting share of evidence exceeds 60%.
    pub is_supported: bool,
    /// Supporting share as a 0–100 percentage.
    pub confidence: u8,
    /// Evidence with stance above the supporting threshold.
    pub supporting: Vec<Evidence>,
    /// Evidence with stance below the contradicting threshold.
    pub contradicting: Vec<Evidence>,
    /// Everything in between.
    pub neutral: Vec<Evidence>,
}
