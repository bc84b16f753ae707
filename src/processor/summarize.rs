//! Key-point extraction, per-result summaries, and aggregate insights.

use std::collections::BTreeMap;

use crate::types::{Category, Difficulty, ProcessedResult, SearchContext, SearchInsights};

/// Maximum key points extracted per result.
const MAX_KEY_POINTS: usize = 3;
/// Sentences shorter than this are noise, not key points.
const MIN_SENTENCE_LEN: usize = 10;
/// Maximum suggested follow-up queries.
const MAX_FOLLOW_UPS: usize = 5;
/// Maximum trending topics reported.
const MAX_TRENDING: usize = 5;

/// Extract up to three leading sentences of at least ten characters.
pub fn key_points(description: &str) -> Vec<String> {
    description
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| s.len() >= MIN_SENTENCE_LEN)
        .take(MAX_KEY_POINTS)
        .map(String::from)
        .collect()
}

/// One-line category-templated summary for a single result.
pub fn result_summary(category: Category, title: &str) -> String {
    match category {
        Category::Documentation => format!("Official documentation: {title}"),
        Category::Tutorial => format!("Step-by-step guide: {title}"),
        Category::Code => format!("Code and examples: {title}"),
        Category::News => format!("Recent coverage: {title}"),
        Category::Tool => format!("Utility: {title}"),
        Category::General => format!("Resource: {title}"),
    }
}

/// Count results per category.
pub fn category_histogram(results: &[ProcessedResult]) -> BTreeMap<Category, usize> {
    let mut counts = BTreeMap::new();
    for result in results {
        *counts.entry(result.category).or_insert(0) += 1;
    }
    counts
}

/// One-paragraph aggregate summary: result count, dominant category, and
/// the language-specific share when the caller named a language.
pub fn aggregate_summary(
    query: &str,
    context: &SearchContext,
    results: &[ProcessedResult],
) -> String {
    if results.is_empty() {
        return format!("No results found for \"{query}\".");
    }
    let counts = category_histogram(results);
    let (dominant, dominant_count) = counts
        .iter()
        .max_by_key(|(_, count)| **count)
        .map(|(c, n)| (*c, *n))
        .unwrap_or((Category::General, 0));

    let mut summary = format!(
        "Found {} results for \"{query}\", mostly {} ({} of {}).",
        results.len(),
        dominant,
        dominant_count,
        results.len(),
    );
    if let Some(ref language) = context.language {
        let lang_tag = language.to_lowercase();
        let lang_count = results
            .iter()
            .filter(|r| r.tags.iter().any(|t| t == &lang_tag))
            .count();
        if lang_count > 0 {
            summary.push_str(&format!(" {lang_count} cover {language} specifically."));
        }
    }
    summary
}

/// Up to five follow-up queries derived from context, categories present,
/// and difficulty levels. The original query itself is never suggested.
pub fn follow_up_queries(
    query: &str,
    context: &SearchContext,
    results: &[ProcessedResult],
) -> Vec<String> {
    let mut suggestions: Vec<String> = Vec::new();
    let mut push = |candidate: String| {
        if candidate != query && !suggestions.contains(&candidate) {
            suggestions.push(candidate);
        }
    };

    if let Some(ref language) = context.language {
        push(format!("{query} {language}"));
    }
    if let Some(ref framework) = context.framework {
        push(format!("{query} {framework}"));
    }

    let counts = category_histogram(results);
    if counts.contains_key(&Category::Tutorial) {
        push(format!("{query} tutorial"));
    }
    if counts.contains_key(&Category::Documentation) {
        push(format!("{query} documentation"));
    }
    if counts.contains_key(&Category::Code) {
        push(format!("{query} examples"));
    }

    let has_beginner = results.iter().any(|r| r.difficulty == Difficulty::Beginner);
    let has_advanced = results.iter().any(|r| r.difficulty == Difficulty::Advanced);
    if has_beginner {
        push(format!("{query} for beginners"));
    }
    if has_advanced {
        push(format!("advanced {query}"));
    }

    suggestions.truncate(MAX_FOLLOW_UPS);
    suggestions
}

/// Derive trending topics, per-category actions, and a learning path.
pub fn derive_insights(results: &[ProcessedResult]) -> SearchInsights {
    if results.is_empty() {
        return SearchInsights::default();
    }

    // Trending topics: most frequent tags, ties broken alphabetically.
    let mut tag_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for result in results {
        for tag in &result.tags {
            *tag_counts.entry(tag).or_insert(0) += 1;
        }
    }
    let mut ranked: Vec<(&str, usize)> = tag_counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    let trending_topics = ranked
        .into_iter()
        .take(MAX_TRENDING)
        .map(|(tag, _)| tag.to_string())
        .collect();

    // One recommended action per category present, in precedence order.
    let counts = category_histogram(results);
    let recommended_actions = Category::all()
        .iter()
        .filter(|c| counts.contains_key(c))
        .map(|c| match c {
            Category::Documentation => "Read the official documentation for authoritative details".to_string(),
            Category::Tutorial => "Follow a tutorial to build working knowledge".to_string(),
            Category::Code => "Study the example code and adapt it".to_string(),
            Category::News => "Check recent coverage for current developments".to_string(),
            Category::Tool => "Try the available tools hands-on".to_string(),
            Category::General => "Skim the general resources for background".to_string(),
        })
        .collect();

    // Learning path ordered by whichever difficulty buckets are populated.
    let mut learning_path = Vec::new();
    if results.iter().any(|r| r.difficulty == Difficulty::Beginner) {
        learning_path.push("Start with the beginner material".to_string());
    }
    if results.iter().any(|r| r.difficulty == Difficulty::Intermediate) {
        learning_path.push("Work through the intermediate resources".to_string());
    }
    if results.iter().any(|r| r.difficulty == Difficulty::Advanced) {
        learning_path.push("Finish with the advanced deep dives".to_string());
    }

    SearchInsights {
        trending_topics,
        recommended_actions,
        learning_path,
    }
}
