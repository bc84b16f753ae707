//! Data-driven result classification, tagging, and difficulty bucketing.
//!
//! Categories are assigned by an ordered rule table: documentation wins
//! over tutorial, tutorial over code, and so on down to the general
//! fallback. Tags come from keyword dictionaries matched against the title
//! and description, plus caller-supplied context.

use crate::types::{Category, Difficulty, RawResult, SearchContext};

/// URL/title substrings that mark official documentation. Path markers
/// carry their leading slash so that unrelated words ("preferences") do
/// not match.
const DOC_MARKERS: &[&str] = &[
    "/docs",
    "docs.",
    "documentation",
    "/reference",
    "/api",
    "/manual",
];

/// Title substrings that mark how-to material.
const TUTORIAL_MARKERS: &[&str] = &["how to", "tutorial", "guide", "walkthrough", "step by step"];

/// Hosts that primarily serve code.
const CODE_HOSTS: &[&str] = &[
    "github.com",
    "gitlab.com",
    "bitbucket.org",
    "codepen.io",
    "stackblitz.com",
];

/// Title substrings that signal example code.
const CODE_MARKERS: &[&str] = &["example", "sample", "snippet"];

/// URL substrings that mark news/blog content.
const NEWS_URL_MARKERS: &[&str] = &["/blog", "/news", "medium.com", "dev.to", "substack.com"];

/// Title/description substrings that signal a utility.
const TOOL_MARKERS: &[&str] = &[
    "tool",
    "generator",
    "converter",
    "playground",
    "formatter",
    "validator",
    "checker",
];

/// Title substrings that mark introductory material.
const BEGINNER_MARKERS: &[&str] = &["beginner", "intro", "basics", "getting started"];

/// Title substrings that mark expert material.
const ADVANCED_MARKERS: &[&str] = &["advanced", "expert", "deep dive"];

/// Programming-language keyword → tag dictionary.
const LANGUAGE_TAGS: &[(&str, &str)] = &[
    ("rust", "rust"),
    ("python", "python"),
    ("javascript", "javascript"),
    ("typescript", "typescript"),
    ("java", "java"),
    ("golang", "go"),
    ("kotlin", "kotlin"),
    ("swift", "swift"),
    ("ruby", "ruby"),
    ("php", "php"),
];

/// Framework/library keyword → tag dictionary.
const FRAMEWORK_TAGS: &[(&str, &str)] = &[
    ("react", "react"),
    ("vue", "vue"),
    ("angular", "angular"),
    ("django", "django"),
    ("flask", "flask"),
    ("rails", "rails"),
    ("spring", "spring"),
    ("tokio", "tokio"),
    ("axum", "axum"),
    ("actix", "actix"),
    ("express", "express"),
    ("laravel", "laravel"),
];

/// One entry in the ordered classification table.
struct CategoryRule {
    category: Category,
    matches: fn(&RawResult) -> bool,
}

/// Ordered classification rules. The first match wins.
const CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        category: Category::Documentation,
        matches: |r| {
            let url = r.url.to_lowercase();
            let title = r.title.to_lowercase();
            DOC_MARKERS
                .iter()
                .any(|m| url.contains(m) || title.contains(m))
        },
    },
    CategoryRule {
        category: Category::Tutorial,
        matches: |r| {
            let title = r.title.to_lowercase();
            TUTORIAL_MARKERS.iter().any(|m| title.contains(m))
        },
    },
    CategoryRule {
        category: Category::Code,
        matches: |r| {
            let title = r.title.to_lowercase();
            let host = crate::provider::host_of(&r.url).unwrap_or_default();
            CODE_HOSTS.iter().any(|h| host == *h || host.ends_with(&format!(".{h}")))
                || CODE_MARKERS.iter().any(|m| title.contains(m))
        },
    },
    CategoryRule {
        category: Category::News,
        matches: |r| {
            let url = r.url.to_lowercase();
            let recent = r
                .age
                .as_deref()
                .map(str::to_lowercase)
                .is_some_and(|a| a.contains("minute") || a.contains("hour") || a.contains("day"));
            recent || NEWS_URL_MARKERS.iter().any(|m| url.contains(m))
        },
    },
    CategoryRule {
        category: Category::Tool,
        matches: |r| {
            let title = r.title.to_lowercase();
            let description = r.description.to_lowercase();
            TOOL_MARKERS
                .iter()
                .any(|m| title.contains(m) || description.contains(m))
        },
    },
];

/// Assign a category by walking the ordered rule table.
pub fn categorize(result: &RawResult) -> Category {
    CATEGORY_RULES
        .iter()
        .find(|rule| (rule.matches)(result))
        .map_or(Category::General, |rule| rule.category)
}

/// Derive tags from the keyword dictionaries, the caller's context, and
/// level markers in the title. Order is stable; duplicates are dropped.
pub fn tags_for(result: &RawResult, context: &SearchContext) -> Vec<String> {
    let text = format!(
        "{} {}",
        result.title.to_lowercase(),
        result.description.to_lowercase()
    );
    let words: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let mut tags: Vec<String> = Vec::new();
    let mut push = |tag: &str| {
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    };

    for (keyword, tag) in LANGUAGE_TAGS.iter().chain(FRAMEWORK_TAGS) {
        if words.contains(keyword) {
            push(tag);
        }
    }
    if let Some(ref language) = context.language {
        push(&language.to_lowercase());
    }
    if let Some(ref framework) = context.framework {
        push(&framework.to_lowercase());
    }

    let title = result.title.to_lowercase();
    if BEGINNER_MARKERS.iter().any(|m| title.contains(m)) {
        push("beginner");
    }
    if ADVANCED_MARKERS.iter().any(|m| title.contains(m)) {
        push("advanced");
    }
    tags
}

/// Bucket difficulty from title markers; intermediate when neither side
/// matches.
pub fn difficulty_of(title: &str) -> Difficulty {
    let title = title.to_lowercase();
    if BEGINNER_MARKERS.iter().any(|m| title.contains(m)) {
        Difficulty::Beginner
    } else if ADVANCED_MARKERS.iter().any(|m| title.contains(m)) {
        Difficulty::Advanced
    } else {
        Difficulty::Intermediate
    }
}
