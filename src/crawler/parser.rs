//! HTML parser for extracting links and page fields
//!
//! This module handles parsing HTML content to extract:
//! - Same-origin links to follow (from `<a>` tags)
//! - Title, meta description and crawler meta tags
//! - Heading and word counts
//! - Canonical, hreflang alternates and schema.org types (JSON-LD and microdata)

use crate::crawler::fetcher::HreflangLink;
use crate::robots::MetaDirectives;
use crate::url::{canonicalize, same_origin};
use scraper::{ElementRef, Html, Node, Selector};
use serde_json::Value;
use std::collections::HashSet;
use url::Url;

/// Nesting depth at which JSON-LD traversal stops
const MAX_SCHEMA_DEPTH: usize = 8;

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedPage {
    pub title: String,
    pub description: String,
    /// Character count of the meta description, 0 when absent
    pub description_length: usize,
    pub meta: MetaDirectives,
    pub h1_count: usize,
    pub h1_text: String,
    pub word_count: usize,
    pub canonical: String,
    pub hreflang: Vec<HreflangLink>,
    pub schema_types: Vec<String>,
    /// Canonical same-origin links in document order, deduplicated
    pub internal_links: Vec<Url>,
}

/// Parses HTML content and extracts the fields the audit needs
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags resolving to the same origin as `base_url`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - Fragment-only links
///
/// # Example
///
/// ```
/// use sitegauge::crawler::extract_page;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let page = extract_page(html, &base_url);
/// assert_eq!(page.title, "Test");
/// assert_eq!(page.internal_links.len(), 1);
/// ```
pub fn extract_page(html: &str, base_url: &Url) -> ExtractedPage {
    let document = Html::parse_document(html);
    let meta = extract_meta(&document);

    ExtractedPage {
        title: extract_title(&document),
        description_length: meta.description.chars().count(),
        description: meta.description,
        meta: meta.directives,
        h1_count: count(&document, "h1"),
        h1_text: extract_h1_text(&document),
        word_count: count_words(&document),
        canonical: extract_canonical(&document, base_url),
        hreflang: extract_hreflang(&document, base_url),
        schema_types: extract_schema_types(&document),
        internal_links: extract_links(&document, base_url),
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn count(document: &Html, css: &str) -> usize {
    selector(css).map_or(0, |s| document.select(&s).count())
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> String {
    selector("title")
        .and_then(|s| {
            document
                .select(&s)
                .next()
                .map(|element| element.text().collect::<String>().trim().to_string())
        })
        .unwrap_or_default()
}

fn extract_h1_text(document: &Html) -> String {
    let Some(s) = selector("h1") else {
        return String::new();
    };

    document
        .select(&s)
        .flat_map(|element| element.text())
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

struct MetaFields {
    description: String,
    directives: MetaDirectives,
}

/// Reads `<meta name=...>` tags, matching names case-insensitively
fn extract_meta(document: &Html) -> MetaFields {
    let mut fields = MetaFields {
        description: String::new(),
        directives: MetaDirectives::default(),
    };
    let Some(s) = selector("meta[name][content]") else {
        return fields;
    };

    for element in document.select(&s) {
        let name = element.value().attr("name").unwrap_or("").to_lowercase();
        let content = element.value().attr("content").unwrap_or("").trim();
        let slot = match name.as_str() {
            "description" => &mut fields.description,
            "robots" => &mut fields.directives.robots,
            "googlebot" => &mut fields.directives.googlebot,
            "bingbot" => &mut fields.directives.bingbot,
            _ => continue,
        };
        if slot.is_empty() {
            *slot = content.to_string();
        }
    }

    fields
}

fn has_rel(element: &ElementRef<'_>, token: &str) -> bool {
    element
        .value()
        .attr("rel")
        .map_or(false, |rel| {
            rel.split_whitespace().any(|t| t.eq_ignore_ascii_case(token))
        })
}

fn extract_canonical(document: &Html, base_url: &Url) -> String {
    let Some(s) = selector("link[rel][href]") else {
        return String::new();
    };

    document
        .select(&s)
        .filter(|element| has_rel(element, "canonical"))
        .find_map(|element| element.value().attr("href"))
        .and_then(|href| base_url.join(href.trim()).ok())
        .map(|url| url.to_string())
        .unwrap_or_default()
}

fn extract_hreflang(document: &Html, base_url: &Url) -> Vec<HreflangLink> {
    let Some(s) = selector("link[rel][hreflang][href]") else {
        return Vec::new();
    };

    document
        .select(&s)
        .filter(|element| has_rel(element, "alternate"))
        .filter_map(|element| {
            let lang = element.value().attr("hreflang")?.trim().to_lowercase();
            let href = base_url.join(element.value().attr("href")?.trim()).ok()?;
            Some(HreflangLink {
                lang,
                href: href.to_string(),
            })
        })
        .collect()
}

/// Counts whitespace-separated words in visible body text
///
/// Text inside `script`, `style`, `noscript` and `template` is skipped.
fn count_words(document: &Html) -> usize {
    let Some(body) = selector("body").and_then(|s| document.select(&s).next()) else {
        return 0;
    };

    body.descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text) => {
                let hidden = node.ancestors().any(|a| {
                    a.value().as_element().map_or(false, |e| {
                        matches!(e.name(), "script" | "style" | "noscript" | "template")
                    })
                });
                (!hidden).then(|| text.split_whitespace().count())
            }
            _ => None,
        })
        .sum()
}

/// Reduces a type IRI to its local name
///
/// `http://schema.org/Product` and `https://schema.org/#Product` both become
/// `Product`; plain names are returned unchanged.
pub fn normalize_schema_type(raw: &str) -> String {
    let value = raw.trim();
    let local = if value.contains('/') {
        value.rsplit('/').next()
    } else if value.contains('#') {
        value.rsplit('#').next()
    } else {
        None
    };

    match local.map(|l| l.trim_start_matches('#')) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => value.to_string(),
    }
}

/// Collects schema.org types from JSON-LD blocks and microdata `itemtype`s
fn extract_schema_types(document: &Html) -> Vec<String> {
    let mut types = Vec::new();

    if let Some(s) = selector("script[type]") {
        for element in document.select(&s) {
            let kind = element.value().attr("type").unwrap_or("");
            if !kind.trim().eq_ignore_ascii_case("application/ld+json") {
                continue;
            }
            let raw = element.text().collect::<String>();
            match serde_json::from_str::<Value>(&raw) {
                Ok(value) => collect_types(&value, 0, &mut types),
                Err(e) => tracing::debug!("Ignoring malformed JSON-LD block: {}", e),
            }
        }
    }

    if let Some(s) = selector("[itemscope][itemtype]") {
        for element in document.select(&s) {
            let item_types = element.value().attr("itemtype").unwrap_or("");
            types.extend(item_types.split_whitespace().map(str::to_string));
        }
    }

    let mut seen = HashSet::new();
    types
        .iter()
        .map(|t| normalize_schema_type(t))
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

fn collect_types(value: &Value, depth: usize, out: &mut Vec<String>) {
    if depth > MAX_SCHEMA_DEPTH {
        return;
    }

    match value {
        Value::Array(items) => {
            for item in items {
                collect_types(item, depth + 1, out);
            }
        }
        Value::Object(map) => {
            match map.get("@type") {
                Some(Value::String(t)) => out.push(t.clone()),
                Some(Value::Array(ts)) => {
                    out.extend(ts.iter().filter_map(|t| t.as_str().map(str::to_string)))
                }
                _ => {}
            }
            for (key, child) in map {
                if key != "@type" {
                    collect_types(child, depth + 1, out);
                }
            }
        }
        _ => {}
    }
}

/// Extracts canonical same-origin links from `<a>` tags
fn extract_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let Some(a_selector) = selector("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&a_selector) {
        // Skip if it has the download attribute
        if element.value().attr("download").is_some() {
            continue;
        }

        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if let Some(url) = resolve_link(href, base_url) {
            if seen.insert(url.to_string()) {
                links.push(url);
            }
        }
    }

    links
}

/// Resolves a link href to a canonical same-origin URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only anchors
/// - Invalid or non-HTTP(S) URLs
/// - URLs on another origin
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let url = canonicalize(href, base_url).ok()?;
    same_origin(&url, base_url).then_some(url)
}
