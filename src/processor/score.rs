//! Context-aware re-scoring on top of the provider baseline.
//!
//! The baseline score already encodes position, term overlap, freshness,
//! and domain trust. This pass adds what only the caller's context and the
//! classifier know: language fit, intent match, and recency demand.

use crate::types::{Category, SearchContext};

/// Boost when the result carries the caller's language tag.
const LANGUAGE_MATCH_BOOST: f64 = 20.0;
/// Boost when the category matches the query's intent.
const INTENT_MATCH_BOOST: f64 = 15.0;
/// Boost for fresh results against "latest"-style queries.
const RECENCY_BOOST: f64 = 10.0;

/// Query substrings that signal tutorial-seeking intent.
const TUTORIAL_INTENT: &[&str] = &["how to", "tutorial", "learn", "guide"];
/// Query substrings that signal documentation-seeking intent.
const DOC_INTENT: &[&str] = &["docs", "documentation", "api", "reference"];
/// Query substrings that signal a demand for recent material.
const RECENCY_INTENT: &[&str] = &["latest", "newest", "recent", "current"];

/// Re-score a classified result for the caller's query and context.
pub fn enhance_score(
    baseline: f64,
    category: Category,
    tags: &[String],
    age: Option<&str>,
    query: &str,
    context: &SearchContext,
) -> f64 {
    let mut score = baseline;
    let query_lower = query.to_lowercase();

    if let Some(ref language) = context.language {
        if tags.iter().any(|t| t == &language.to_lowercase()) {
            score += LANGUAGE_MATCH_BOOST;
        }
    }

    let tutorial_seeking = TUTORIAL_INTENT.iter().any(|m| query_lower.contains(m));
    let doc_seeking = DOC_INTENT.iter().any(|m| query_lower.contains(m));
    if (tutorial_seeking && category == Category::Tutorial)
        || (doc_seeking && category == Category::Documentation)
    {
        score += INTENT_MATCH_BOOST;
    }

    if RECENCY_INTENT.iter().any(|m| query_lower.contains(m)) {
        let fresh = age
            .map(str::to_lowercase)
            .is_some_and(|a| a.contains("hour") || a.contains("day"));
        if fresh {
            score += RECENCY_BOOST;
        }
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_match_boost_applies() {
        let context = SearchContext {
            language: Some("Rust".into()),
            ..Default::default()
        };
        let tags = vec!["rust".to_string()];
        let score = enhance_score(100.0, Category::General, &tags, None, "traits", &context);
        assert!((score - 120.0).abs() < f64::EPSILON);
    }

    #[test]
    fn no_language_boost_without_tag() {
        let context = SearchContext {
            language: Some("python".into()),
            ..Default::default()
        };
        let tags = vec!["rust".to_string()];
        let score = enhance_score(100.0, Category::General, &tags, None, "traits", &context);
        assert!((score - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn tutorial_intent_boosts_tutorials_only() {
        let context = SearchContext::default();
        let tutorial = enhance_score(
            100.0,
            Category::Tutorial,
            &[],
            None,
            "how to use channels",
            &context,
        );
        let general = enhance_score(
            100.0,
            Category::General,
            &[],
            None,
            "how to use channels",
            &context,
        );
        assert!((tutorial - 115.0).abs() < f64::EPSILON);
        assert!((general - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn doc_intent_boosts_documentation() {
        let score = enhance_score(
            100.0,
            Category::Documentation,
            &[],
            None,
            "tokio api reference",
            &SearchContext::default(),
        );
        assert!((score - 115.0).abs() < f64::EPSILON);
    }

    #[test]
    fn recency_boost_needs_fresh_age() {
        let fresh = enhance_score(
            100.0,
            Category::News,
            &[],
            Some("4 hours ago"),
            "latest rust release",
            &SearchContext::default(),
        );
        let stale = enhance_score(
            100.0,
            Category::News,
            &[],
            Some("2 years ago"),
            "latest rust release",
            &SearchContext::default(),
        );
        assert!((fresh - 110.0).abs() < f64::EPSILON);
        assert!((stale - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn boosts_stack() {
        let context = SearchContext {
            language: Some("rust".into()),
            ..Default::default()
        };
        let tags = vec!["rust".to_string()];
        let score = enhance_score(
            100.0,
            Category::Tutorial,
            &tags,
            Some("an hour ago"),
            "latest rust tutorial",
            &context,
        );
        // 100 + 20 language + 15 intent + 10 recency.
        assert!((score - 145.0).abs() < f64::EPSILON);
    }
}
