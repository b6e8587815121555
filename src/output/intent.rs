//! Search intent classification
//!
//! Each page is assigned a coarse intent from its schema.org types, title and
//! URL. The report uses it for the intent mix and to spot pages competing for
//! the same query (same intent, same title and H1).

use crate::crawler::PageRecord;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Cannibalization groups kept in the report
const CANNIBALIZATION_LIMIT: usize = 8;

const TRANSACTIONAL_TERMS: &[&str] = &["buy", "pricing", "price", "shop", "deal", "coupon", "order"];
const COMMERCIAL_TERMS: &[&str] = &["review", "vs", "versus", "comparison", "best", "top"];
const INFORMATIONAL_TERMS: &[&str] = &["how to", "guide", "tutorial", "what is", "learn"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SearchIntent {
    Transactional,
    Commercial,
    Informational,
    Local,
}

impl SearchIntent {
    pub fn label(self) -> &'static str {
        match self {
            SearchIntent::Transactional => "Transactional",
            SearchIntent::Commercial => "Commercial",
            SearchIntent::Informational => "Informational",
            SearchIntent::Local => "Local",
        }
    }
}

impl fmt::Display for SearchIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntentCount {
    pub intent: SearchIntent,
    pub count: usize,
}

/// Pages that share an intent, a title and an H1
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CannibalizationGroup {
    pub intent: SearchIntent,
    pub urls: Vec<String>,
}

fn contains_any(haystack: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| haystack.contains(term))
}

/// Classifies a page by schema type first, then by title and URL wording
///
/// Matching is by substring, so `top` also matches `desktop`.
///
/// # Example
///
/// ```
/// use sitegauge::output::{classify_intent, SearchIntent};
///
/// let intent = classify_intent("Pizza delivery near me", "https://example.com/", &[]);
/// assert_eq!(intent, SearchIntent::Local);
/// ```
pub fn classify_intent(title: &str, url: &str, schema_types: &[String]) -> SearchIntent {
    let title = title.to_lowercase();
    let url = url.to_lowercase();
    let has_type = |name: &str| schema_types.iter().any(|t| t.eq_ignore_ascii_case(name));

    if has_type("product") {
        return SearchIntent::Transactional;
    }
    if has_type("localbusiness") {
        return SearchIntent::Local;
    }
    if ["faqpage", "howto", "article", "blogposting", "newsarticle"]
        .iter()
        .any(|name| has_type(name))
    {
        return SearchIntent::Informational;
    }

    if title.contains("near me") || url.contains("near-me") {
        return SearchIntent::Local;
    }
    if contains_any(&format!("{} {}", title, url), TRANSACTIONAL_TERMS) {
        return SearchIntent::Transactional;
    }
    if contains_any(&title, COMMERCIAL_TERMS) {
        return SearchIntent::Commercial;
    }
    if contains_any(&title, INFORMATIONAL_TERMS) {
        return SearchIntent::Informational;
    }

    SearchIntent::Informational
}

fn page_intent(page: &PageRecord) -> SearchIntent {
    classify_intent(&page.title, page.url.as_str(), &page.schema_types)
}

/// Pages per intent, most common first
pub fn intent_mix(pages: &[PageRecord]) -> Vec<IntentCount> {
    let mut mix: Vec<IntentCount> = Vec::new();

    for page in pages {
        let intent = page_intent(page);
        match mix.iter_mut().find(|entry| entry.intent == intent) {
            Some(entry) => entry.count += 1,
            None => mix.push(IntentCount { intent, count: 1 }),
        }
    }

    mix.sort_by(|a, b| b.count.cmp(&a.count));
    mix
}

/// Lower-cases, keeps ASCII letters, digits and spaces, and collapses runs of
/// whitespace
fn fold_text(text: &str) -> String {
    let kept: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Groups pages likely to compete for the same query
///
/// Pages with neither a title nor an H1 are skipped.
pub fn cannibalization(pages: &[PageRecord]) -> Vec<CannibalizationGroup> {
    let mut index: HashMap<(SearchIntent, String), usize> = HashMap::new();
    let mut groups: Vec<CannibalizationGroup> = Vec::new();

    for page in pages {
        let title = fold_text(&page.title);
        let h1 = fold_text(&page.h1_text);
        if title.is_empty() && h1.is_empty() {
            continue;
        }

        let intent = page_intent(page);
        let slot = *index
            .entry((intent, format!("{}|{}", title, h1)))
            .or_insert_with(|| {
                groups.push(CannibalizationGroup {
                    intent,
                    urls: Vec::new(),
                });
                groups.len() - 1
            });
        groups[slot].urls.push(page.url.to_string());
    }

    groups.retain(|g| g.urls.len() > 1);
    groups.truncate(CANNIBALIZATION_LIMIT);
    groups
}
