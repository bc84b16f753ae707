//! Provider client: normalizes the external web-search API into
//! [`SearchResponse`] values with a baseline relevance score.
//!
//! A single GET against the provider endpoint with the standard query
//! parameters and a subscription-token header. Non-2xx responses surface as
//! [`SearchError::Provider`] with the status attached; an empty query is
//! rejected before any network call.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;

use crate::config::ServiceConfig;
use crate::error::{Result, SearchError};
use crate::types::{Freshness, RawResult, ResultKind, SearchContext, SearchOptions, SearchResponse};

/// Hard cap on simultaneous outbound calls during any fan-out.
pub const MAX_FANOUT: usize = 3;

/// Hosts treated as authoritative reference sources. Used for the baseline
/// relevance boost here and for trust scoring in the reasoning layer.
pub const TRUSTED_DOMAINS: &[&str] = &[
    "developer.mozilla.org",
    "doc.rust-lang.org",
    "docs.rs",
    "docs.python.org",
    "stackoverflow.com",
    "github.com",
    "wikipedia.org",
    "w3.org",
    "nodejs.org",
    "kubernetes.io",
];

/// A pluggable search backend.
///
/// The orchestration layers (processor, reasoning, service) are generic over
/// this trait so tests can substitute an in-memory provider. All
/// implementations must be `Send + Sync` for concurrent fan-out.
pub trait SearchProvider: Send + Sync {
    /// Perform one search call and return normalized, baseline-scored
    /// results.
    ///
    /// # Errors
    ///
    /// [`SearchError::Validation`] for an empty query,
    /// [`SearchError::Provider`] for a non-2xx upstream response,
    /// [`SearchError::Http`] for transport failures.
    fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> impl Future<Output = Result<SearchResponse>> + Send;
}

// ── Wire format ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse {
    #[serde(default)]
    pub web: Option<ApiWeb>,
    #[serde(default)]
    pub query: Option<ApiQuery>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiWeb {
    #[serde(default)]
    pub results: Vec<ApiResult>,
    #[serde(default, rename = "totalResults")]
    pub total_results: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiQuery {
    #[serde(default)]
    pub original: Option<String>,
    #[serde(default)]
    pub altered: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<ApiThumbnail>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiThumbnail {
    #[serde(default)]
    pub src: Option<String>,
}

// ── HTTP implementation ──────────────────────────────────────────────────

/// HTTP client for the external web-search provider.
#[derive(Debug, Clone)]
pub struct HttpSearchProvider {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl HttpSearchProvider {
    /// Build a provider client from configuration.
    ///
    /// # Errors
    ///
    /// [`SearchError::Config`] when the configuration is invalid,
    /// [`SearchError::Http`] when the HTTP client cannot be constructed.
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| SearchError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            token: config.api_token.clone(),
        })
    }

    async fn fetch(&self, query: &str, options: &SearchOptions) -> Result<SearchResponse> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::Validation("query must not be empty".into()));
        }

        let mut params: Vec<(&str, String)> = vec![
            ("q", query.to_string()),
            ("count", options.count.to_string()),
            ("offset", options.offset.to_string()),
            ("safesearch", options.safe.as_param().to_string()),
            ("result_filter", options.kind.as_param().to_string()),
        ];
        if let Some(ref lang) = options.language {
            params.push(("search_lang", lang.clone()));
        }
        if let Some(ref country) = options.country {
            params.push(("country", country.clone()));
        }
        if let Some(freshness) = options.freshness {
            params.push(("freshness", freshness.as_param().to_string()));
        }

        tracing::trace!(count = options.count, "issuing provider search");
        let response = self
            .client
            .get(&self.endpoint)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", &self.token)
            .query(&params)
            .send()
            .await
            .map_err(|e| SearchError::Http(format!("provider request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message: String = body.chars().take(256).collect();
            return Err(SearchError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let api: ApiResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Http(format!("failed to decode provider response: {e}")))?;
        Ok(map_response(query, api))
    }
}

impl SearchProvider for HttpSearchProvider {
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResponse> {
        self.fetch(query, options).await
    }
}

/// Map the provider wire body into a normalized, baseline-scored response.
pub(crate) fn map_response(query: &str, api: ApiResponse) -> SearchResponse {
    let (raw_results, total) = match api.web {
        Some(web) => (web.results, web.total_results),
        None => (Vec::new(), None),
    };
    let results = raw_results
        .into_iter()
        .filter(|r| !r.url.is_empty())
        .enumerate()
        .map(|(position, r)| {
            let score = baseline_score(position, &r.title, &r.description, r.age.as_deref(), &r.url, query);
            RawResult {
                title: r.title,
                url: r.url,
                description: r.description,
                age: r.age,
                thumbnail: r.thumbnail.and_then(|t| t.src),
                score,
            }
        })
        .collect();
    let altered = api.query.and_then(|q| match q.altered {
        Some(alt) if q.original.as_deref() != Some(alt.as_str()) => Some(alt),
        Some(_) | None => None,
    });
    SearchResponse {
        query: query.to_string(),
        altered,
        results,
        total,
    }
}

/// Baseline relevance score for a raw result.
///
/// `100 - position`, then boosted: +10 per query term in the title, +5 per
/// term in the description, +5 for hour-fresh age, +3 for day-fresh age,
/// +15 when the host is on the trusted-domain allowlist.
pub(crate) fn baseline_score(
    position: usize,
    title: &str,
    description: &str,
    age: Option<&str>,
    url: &str,
    query: &str,
) -> f64 {
    let mut score = 100.0 - position as f64;
    let title_lower = title.to_lowercase();
    let description_lower = description.to_lowercase();

    for term in query.to_lowercase().split_whitespace() {
        if title_lower.contains(term) {
            score += 10.0;
        }
        if description_lower.contains(term) {
            score += 5.0;
        }
    }
    if let Some(age) = age {
        let age_lower = age.to_lowercase();
        if age_lower.contains("hour") {
            score += 5.0;
        } else if age_lower.contains("day") {
            score += 3.0;
        }
    }
    if host_of(url).is_some_and(|host| is_trusted_domain(&host)) {
        score += 15.0;
    }
    score
}

/// Extract the URL host with any leading "www." stripped.
pub(crate) fn host_of(raw_url: &str) -> Option<String> {
    let parsed = url::Url::parse(raw_url).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}

/// Whether a host belongs to the authoritative allowlist (exact match or
/// subdomain).
pub(crate) fn is_trusted_domain(host: &str) -> bool {
    TRUSTED_DOMAINS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")))
}

// ── Convenience entry points over any provider ───────────────────────────

/// Search the news vertical.
pub async fn search_news<P: SearchProvider>(
    provider: &P,
    query: &str,
    options: &SearchOptions,
) -> Result<SearchResponse> {
    let options = SearchOptions {
        kind: ResultKind::News,
        ..options.clone()
    };
    provider.search(query, &options).await
}

/// Search restricted to the past week.
pub async fn search_recent<P: SearchProvider>(
    provider: &P,
    query: &str,
    options: &SearchOptions,
) -> Result<SearchResponse> {
    let options = SearchOptions {
        freshness: Some(Freshness::Week),
        ..options.clone()
    };
    provider.search(query, &options).await
}

/// Run several queries with at most `concurrency` in flight, settle-all:
/// each query's outcome is reported independently and a failing query never
/// aborts the others. Output order matches input order.
pub async fn batch_search<P: SearchProvider>(
    provider: &P,
    queries: &[String],
    options: &SearchOptions,
    concurrency: usize,
) -> Vec<Result<SearchResponse>> {
    use futures::StreamExt;

    futures::stream::iter(queries.iter().map(|q| provider.search(q, options)))
        .buffered(concurrency.max(1))
        .collect()
        .await
}

/// Prepend context terms and a `site:` restriction to the query, then
/// delegate to a plain search.
pub async fn context_search<P: SearchProvider>(
    provider: &P,
    query: &str,
    context: &SearchContext,
    options: &SearchOptions,
) -> Result<SearchResponse> {
    provider
        .search(&contextualize_query(query, context), options)
        .await
}

/// Build the context-augmented query string.
pub(crate) fn contextualize_query(query: &str, context: &SearchContext) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(4);
    if let Some(ref language) = context.language {
        parts.push(language);
    }
    if let Some(ref framework) = context.framework {
        parts.push(framework);
    }
    parts.push(query);
    let mut combined = parts.join(" ");
    if let Some(ref domain) = context.domain {
        combined.push_str(&format!(" site:{domain}"));
    }
    combined
}
