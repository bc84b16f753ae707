//! Evidence gathering for reasoning workflows: trust-scored sources,
//! insight augmentation, and claim fact-checking.
//!
//! Everything here degrades rather than fails: a timed-out or failing
//! branch is logged and dropped, and an insight or claim with no usable
//! evidence gets a neutral low-confidence outcome instead of an error.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Utc};
use futures::StreamExt;

use crate::error::{Result, SearchError};
use crate::processor::{classify, summarize};
use crate::provider::{host_of, is_trusted_domain, SearchProvider, MAX_FANOUT};
use crate::types::{
    AugmentedInsight, Category, Evidence, FactCheckResult, RawResult, ReasoningResult,
    SearchContext, SearchOptions,
};

/// Baseline trust for any source.
const TRUST_BASE: u8 = 50;
/// Trust added for an allowlisted authoritative domain.
const TRUST_DOMAIN_BOOST: u8 = 30;
/// Trust added for documentation-classified sources.
const TRUST_DOC_BOOST: u8 = 20;
/// Trust added for tutorial-classified sources.
const TRUST_TUTORIAL_BOOST: u8 = 10;
/// Score treated as full relevance when normalizing to 0.0-1.0.
const RELEVANCE_CEILING: f64 = 200.0;

/// Snippet terms counted as supporting a claim.
const SUPPORT_TERMS: &[&str] = &["confirmed", "verified", "proven", "accurate", "supported", "correct"];
/// Snippet terms counted as refuting a claim.
const REFUTE_TERMS: &[&str] = &["false", "debunked", "myth", "incorrect", "misleading", "hoax"];
/// Contrast markers that flag a sentence as a potential contradiction.
const CONTRAST_MARKERS: &[&str] = &["however", "but ", "contrary", "although", "despite", "not "];

/// Stance above which evidence counts as supporting.
const SUPPORT_THRESHOLD: f64 = 0.6;
/// Stance below which evidence counts as contradicting.
const CONTRADICT_THRESHOLD: f64 = 0.4;

/// Tunables for evidence gathering.
#[derive(Debug, Clone)]
pub struct ReasoningOptions {
    /// Maximum sources returned per gathering pass.
    pub max_results: usize,
    /// Per-branch deadline. A branch past it is cancelled and dropped.
    pub timeout: Duration,
    /// Sources below this normalized relevance are discarded.
    pub min_relevance: f64,
    /// Maximum simultaneous provider calls during evidence gathering.
    pub concurrency: usize,
}

impl Default for ReasoningOptions {
    fn default() -> Self {
        Self {
            max_results: 5,
            timeout: Duration::from_secs(10),
            min_relevance: 0.6,
            concurrency: MAX_FANOUT,
        }
    }
}

/// Evidence gathering over a pluggable provider.
#[derive(Debug)]
pub struct ReasoningService<P> {
    provider: Arc<P>,
    options: ReasoningOptions,
}

impl<P: SearchProvider> ReasoningService<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self::with_options(provider, ReasoningOptions::default())
    }

    pub fn with_options(provider: Arc<P>, options: ReasoningOptions) -> Self {
        Self { provider, options }
    }

    /// Gather trust-scored, relevance-filtered sources for a topic.
    ///
    /// Fans out evidence-oriented query variants with bounded concurrency,
    /// races each branch against the configured deadline, deduplicates the
    /// union by URL, and keeps the strongest sources.
    pub async fn search_for_reasoning(
        &self,
        topic: &str,
        context: &SearchContext,
    ) -> Result<Vec<ReasoningResult>> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(SearchError::Validation("topic must not be empty".into()));
        }
        let variants = evidence_variants(topic, context);
        let raw = self.gather(&variants).await;
        let mut sources: Vec<ReasoningResult> = raw
            .into_iter()
            .map(|r| to_reasoning_result(&r, context))
            .filter(|s| s.relevance >= self.options.min_relevance)
            .collect();
        sources.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sources.truncate(self.options.max_results);
        Ok(sources)
    }

    /// Augment an insight with supporting evidence, contradictions, and a
    /// confidence figure. An insight with no usable sources comes back at
    /// neutral confidence and flagged for more research.
    pub async fn augment_insight(
        &self,
        insight: &str,
        context: &SearchContext,
    ) -> Result<AugmentedInsight> {
        let insight = insight.trim();
        if insight.is_empty() {
            return Err(SearchError::Validation("insight must not be empty".into()));
        }
        let sources = self.search_for_reasoning(insight, context).await?;
        if sources.is_empty() {
            return Ok(AugmentedInsight {
                insight: insight.to_string(),
                confidence: TRUST_BASE,
                sources,
                factual_basis: Vec::new(),
                contradictions: Vec::new(),
                needs_more_research: true,
            });
        }

        let factual_basis = factual_basis(insight, &sources);
        let contradictions = contradictions(&sources);

        let avg_trust: f64 = sources.iter().map(|s| f64::from(s.trust_score)).sum::<f64>()
            / sources.len() as f64;
        let mut confidence = 50.0;
        confidence += (factual_basis.len() as f64 * 10.0).min(30.0);
        confidence += (avg_trust - 50.0) / 2.0;
        confidence -= contradictions.len() as f64 * 15.0;
        if sources.len() >= 3 {
            confidence += 10.0;
        }
        let confidence = confidence.clamp(0.0, 100.0).round() as u8;
        let needs_more_research = confidence < 70 || factual_basis.len() < 2;

        Ok(AugmentedInsight {
            insight: insight.to_string(),
            confidence,
            sources,
            factual_basis,
            contradictions,
            needs_more_research,
        })
    }

    /// Check a claim against gathered evidence and bucket it by stance.
    ///
    /// No evidence at all yields an unsupported outcome at zero confidence,
    /// never an error.
    pub async fn fact_check_claim(&self, claim: &str) -> Result<FactCheckResult> {
        let claim = claim.trim();
        if claim.is_empty() {
            return Err(SearchError::Validation("claim must not be empty".into()));
        }
        let variants = vec![
            claim.to_string(),
            format!("{claim} fact check"),
            format!("is it true that {claim}"),
        ];
        let raw = self.gather(&variants).await;

        let claim_lower = claim.to_lowercase();
        let mut supporting = Vec::new();
        let mut contradicting = Vec::new();
        let mut neutral = Vec::new();
        for result in &raw {
            let evidence = Evidence {
                title: result.title.clone(),
                url: result.url.clone(),
                stance: stance_of(&result.description, &claim_lower),
            };
            if evidence.stance > SUPPORT_THRESHOLD {
                supporting.push(evidence);
            } else if evidence.stance < CONTRADICT_THRESHOLD {
                contradicting.push(evidence);
            } else {
                neutral.push(evidence);
            }
        }

        let total = supporting.len() + contradicting.len() + neutral.len();
        let (is_supported, confidence) = if total == 0 {
            (false, 0)
        } else {
            let ratio = supporting.len() as f64 / total as f64;
            (ratio > SUPPORT_THRESHOLD, (ratio * 100.0).round() as u8)
        };

        Ok(FactCheckResult {
            claim: claim.to_string(),
            is_supported,
            confidence,
            supporting,
            contradicting,
            neutral,
        })
    }

    /// Settle-all fan-out with per-branch deadlines, deduplicated by URL.
    async fn gather(&self, variants: &[String]) -> Vec<RawResult> {
        let options = SearchOptions::default();
        let deadline = self.options.timeout;
        let outcomes: Vec<_> = futures::stream::iter(variants.iter().map(|variant| {
            let options = options.clone();
            async move {
                let outcome =
                    tokio::time::timeout(deadline, self.provider.search(variant, &options)).await;
                (variant.clone(), outcome)
            }
        }))
        .buffered(self.options.concurrency.max(1))
        .collect()
        .await;

        let mut combined = Vec::new();
        for (variant, outcome) in outcomes {
            match outcome {
                Ok(Ok(response)) => combined.extend(response.results),
                Ok(Err(err)) => {
                    tracing::warn!(variant = %variant, error = %err, "evidence branch failed");
                }
                Err(_) => {
                    tracing::warn!(variant = %variant, "evidence branch timed out");
                }
            }
        }
        let mut seen = std::collections::HashSet::new();
        combined.retain(|r| seen.insert(r.url.clone()));
        combined
    }
}

/// Evidence-oriented query variants: the topic itself, a site restriction
/// when the caller named a domain, research/evidence phrasings, and a
/// current-year variant.
fn evidence_variants(topic: &str, context: &SearchContext) -> Vec<String> {
    let mut variants = vec![topic.to_string()];
    if let Some(ref domain) = context.domain {
        variants.push(format!("{topic} site:{domain}"));
    }
    variants.push(format!("{topic} research study"));
    variants.push(format!("{topic} evidence data"));
    variants.push(format!("{topic} {}", Utc::now().year()));
    variants
}

fn to_reasoning_result(result: &RawResult, context: &SearchContext) -> ReasoningResult {
    let domain = host_of(&result.url).unwrap_or_default();
    let category = classify::categorize(result);

    let mut trust = u16::from(TRUST_BASE);
    if is_trusted_domain(&domain) {
        trust += u16::from(TRUST_DOMAIN_BOOST);
    }
    match category {
        Category::Documentation => trust += u16::from(TRUST_DOC_BOOST),
        Category::Tutorial => trust += u16::from(TRUST_TUTORIAL_BOOST),
        _ => {}
    }
    if let Some(age) = result.age.as_deref().map(str::to_lowercase) {
        if age.contains("hour") {
            trust += 10;
        } else if age.contains("day") {
            trust += 5;
        }
    }
    let trust_score = trust.min(100) as u8;

    ReasoningResult {
        title: result.title.clone(),
        url: result.url.clone(),
        snippet: result.description.clone(),
        domain,
        trust_score,
        key_facts: summarize::key_points(&result.description),
        related_concepts: classify::tags_for(result, context),
        relevance: (result.score / RELEVANCE_CEILING).clamp(0.0, 1.0),
    }
}

/// Key facts sharing at least two meaningful words (longer than three
/// characters) with the insight.
fn factual_basis(insight: &str, sources: &[ReasoningResult]) -> Vec<String> {
    let insight_words: Vec<String> = insight
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 3)
        .map(String::from)
        .collect();

    let mut basis = Vec::new();
    for source in sources {
        for fact in &source.key_facts {
            let fact_lower = fact.to_lowercase();
            let overlap = insight_words
                .iter()
                .filter(|w| fact_lower.contains(w.as_str()))
                .count();
            if overlap >= 2 && !basis.contains(fact) {
                basis.push(fact.clone());
            }
        }
    }
    basis
}

/// Key facts carrying a contrast marker.
fn contradictions(sources: &[ReasoningResult]) -> Vec<String> {
    let mut found = Vec::new();
    for source in sources {
        for fact in &source.key_facts {
            let fact_lower = fact.to_lowercase();
            if CONTRAST_MARKERS.iter().any(|m| fact_lower.contains(m)) && !found.contains(fact) {
                found.push(fact.clone());
            }
        }
    }
    found
}

/// Stance of a snippet toward a claim: neutral 0.5, shifted by supporting
/// and refuting terms and by a verbatim claim mention, clamped to [0, 1].
/// Terms and the claim match on word boundaries, so "incorrect" never
/// fires the "correct" term.
fn stance_of(snippet: &str, claim_lower: &str) -> f64 {
    let snippet_lower = snippet.to_lowercase();
    let words = words_of(&snippet_lower);
    let mut stance = 0.5_f64;
    for term in SUPPORT_TERMS {
        if words.contains(term) {
            stance += 0.1;
        }
    }
    for term in REFUTE_TERMS {
        if words.contains(term) {
            stance -= 0.1;
        }
    }
    let claim_words = words_of(claim_lower);
    if !claim_words.is_empty()
        && words
            .windows(claim_words.len())
            .any(|w| w == claim_words.as_slice())
    {
        stance += 0.2;
    }
    stance.clamp(0.0, 1.0)
}

fn words_of(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}
