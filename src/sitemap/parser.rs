//! Sitemap XML parsing
//!
//! Documents are read with `scraper`'s lenient parser, which is enough to pull
//! `<loc>` text out of both `<urlset>` and `<sitemapindex>` documents.

use scraper::{Html, Selector};

/// The `<loc>` entries of one sitemap document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SitemapDocument {
    pub locs: Vec<String>,
    /// True for `<sitemapindex>` documents, whose entries are child sitemaps
    pub is_index: bool,
}

/// Parses a sitemap or sitemap index
///
/// # Examples
///
/// ```
/// use sitegauge::sitemap::parse_sitemap;
///
/// let doc = parse_sitemap("<urlset><url><loc> https://x.com/a </loc></url></urlset>");
/// assert_eq!(doc.locs, vec!["https://x.com/a".to_string()]);
/// assert!(!doc.is_index);
/// ```
pub fn parse_sitemap(xml: &str) -> SitemapDocument {
    // CDATA sections are comments to an HTML parser
    let cleaned = xml.replace("<![CDATA[", "").replace("]]>", "");
    let document = Html::parse_document(&cleaned);

    let locs = match Selector::parse("loc") {
        Ok(selector) => document
            .select(&selector)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|loc| !loc.is_empty())
            .collect(),
        Err(_) => Vec::new(),
    };

    let is_index = Selector::parse("sitemapindex")
        .map(|selector| document.select(&selector).next().is_some())
        .unwrap_or(false);

    SitemapDocument { locs, is_index }
}

/// Extracts the raw `<loc>` values of a sitemap document
pub fn parse_sitemap_locs(xml: &str) -> Vec<String> {
    parse_sitemap(xml).locs
}

/// Returns true when an index entry names a child sitemap we can follow
pub fn is_child_sitemap(loc: &str) -> bool {
    let path = loc.split(['?', '#']).next().unwrap_or(loc);
    path.to_ascii_lowercase().ends_with(".xml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_urlset() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
                <url><loc>https://example.com/page1</loc><lastmod>2024-01-01</lastmod></url>
                <url><loc>https://example.com/page2</loc></url>
            </urlset>"#;

        let doc = parse_sitemap(xml);
        assert!(!doc.is_index);
        assert_eq!(
            doc.locs,
            vec!["https://example.com/page1", "https://example.com/page2"]
        );
    }

    #[test]
    fn test_parse_sitemap_index() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
                <sitemap><loc>https://example.com/sitemap1.xml</loc></sitemap>
                <sitemap><loc>https://example.com/sitemap2.xml</loc></sitemap>
            </sitemapindex>"#;

        let doc = parse_sitemap(xml);
        assert!(doc.is_index);
        assert_eq!(doc.locs.len(), 2);
    }

    #[test]
    fn test_parse_cdata_and_whitespace() {
        let xml = "<urlset><url><loc>\n  <![CDATA[https://example.com/a]]>\n</loc></url></urlset>";
        assert_eq!(parse_sitemap_locs(xml), vec!["https://example.com/a"]);
    }

    #[test]
    fn test_parse_empty_and_garbage() {
        assert!(parse_sitemap_locs("").is_empty());
        assert!(parse_sitemap_locs("<html><body>Not found</body></html>").is_empty());
        assert!(parse_sitemap_locs("<urlset><url><loc>   </loc></url></urlset>").is_empty());
    }

    #[test]
    fn test_is_child_sitemap() {
        assert!(is_child_sitemap("https://example.com/posts.xml"));
        assert!(is_child_sitemap("https://example.com/POSTS.XML?page=2"));
        assert!(!is_child_sitemap("https://example.com/posts.xml.gz"));
        assert!(!is_child_sitemap("https://example.com/about"));
    }
}
