use crate::UrlError;
use url::Url;

/// Path suffixes that serve the same document as their directory
const DIRECTORY_INDEX_FILES: &[&str] = &["index.html", "index.htm", "default.html", "default.htm"];

/// Canonicalizes a URL into the identity key used for deduplication
///
/// # Canonicalization Steps
///
/// 1. Resolve `raw` against `base` (absolute input ignores the base)
/// 2. Reject anything that is not HTTP or HTTPS
/// 3. Remove the fragment
/// 4. Strip trailing slashes unless the path is exactly `/`
///
/// The function is pure and idempotent: canonicalizing an already canonical URL
/// returns it unchanged.
///
/// # Examples
///
/// ```
/// use sitegauge::url::canonicalize;
/// use url::Url;
///
/// let base = Url::parse("https://x.com/").unwrap();
/// let url = canonicalize("/a/#top", &base).unwrap();
/// assert_eq!(url.as_str(), "https://x.com/a");
/// ```
pub fn canonicalize(raw: &str, base: &Url) -> Result<Url, UrlError> {
    let mut url = base.join(raw.trim()).map_err(|e| UrlError::InvalidUrl {
        raw: raw.to_string(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::UnsupportedScheme(url.scheme().to_string()));
    }

    url.set_fragment(None);

    let trimmed = strip_trailing_slashes(url.path());
    if trimmed.len() != url.path().len() {
        url.set_path(&trimmed);
    }

    Ok(url)
}

/// Canonicalizes an already-parsed URL
pub fn canonicalize_url(url: &Url) -> Result<Url, UrlError> {
    canonicalize(url.as_str(), url)
}

/// Builds the stricter comparison key used for cross-source membership checks
///
/// On top of canonicalization this lower-cases the host, drops a leading `www.`,
/// and folds directory index documents (`index.html`, `default.htm`, ...) into
/// their directory. The port and scheme are not part of the key.
///
/// # Examples
///
/// ```
/// use sitegauge::url::compare_key;
/// use url::Url;
///
/// let a = Url::parse("https://WWW.Example.com/blog/index.html").unwrap();
/// let b = Url::parse("http://example.com/blog/").unwrap();
/// assert_eq!(compare_key(&a), compare_key(&b));
/// ```
pub fn compare_key(url: &Url) -> String {
    let host = url.host_str().map(normalize_host).unwrap_or_default();
    let path = normalize_compare_path(url.path());

    match url.query() {
        Some(query) => format!("{}{}?{}", host, path, query),
        None => format!("{}{}", host, path),
    }
}

/// Lower-cases a host name and removes a leading `www.`
pub fn normalize_host(host: &str) -> String {
    let lowered = host.to_lowercase();
    match lowered.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => lowered,
    }
}

/// Counts the non-empty path segments of a URL
///
/// `https://x.com/` has depth 0, `https://x.com/a/b` has depth 2.
pub fn path_depth(url: &Url) -> usize {
    url.path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).count())
        .unwrap_or(0)
}

/// Returns true when both URLs share scheme, host and port
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}

/// Returns true when both URLs point at the same host once `www.` is ignored
pub fn same_site_host(a: &Url, b: &Url) -> bool {
    match (a.host_str(), b.host_str()) {
        (Some(x), Some(y)) => normalize_host(x) == normalize_host(y),
        _ => false,
    }
}

/// Path plus query string, the form robots.txt rules are matched against
pub fn path_and_query(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

fn strip_trailing_slashes(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn normalize_compare_path(path: &str) -> String {
    let lowered = path.to_ascii_lowercase();
    let mut folded = path;

    for index in DIRECTORY_INDEX_FILES {
        if lowered.ends_with(&format!("/{}", index)) {
            folded = &path[..path.len() - index.len()];
            break;
        }
    }

    if folded.is_empty() {
        return "/".to_string();
    }
    strip_trailing_slashes(folded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://x.com/").unwrap()
    }

    #[test]
    fn test_trailing_slash_collapses() {
        let a = canonicalize("https://x.com/a/", &base()).unwrap();
        let b = canonicalize("https://x.com/a", &base()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "https://x.com/a");
    }

    #[test]
    fn test_root_slash_preserved() {
        let url = canonicalize("https://x.com/", &base()).unwrap();
        assert_eq!(url.as_str(), "https://x.com/");

        let bare = canonicalize("https://x.com", &base()).unwrap();
        assert_eq!(bare.as_str(), "https://x.com/");
    }

    #[test]
    fn test_fragment_removed() {
        let url = canonicalize("https://x.com/page#section", &base()).unwrap();
        assert_eq!(url.as_str(), "https://x.com/page");
    }

    #[test]
    fn test_relative_resolution() {
        let base = Url::parse("https://x.com/blog/post").unwrap();
        let url = canonicalize("../about/", &base).unwrap();
        assert_eq!(url.as_str(), "https://x.com/about");
    }

    #[test]
    fn test_query_kept() {
        let url = canonicalize("/search/?q=rust#r", &base()).unwrap();
        assert_eq!(url.as_str(), "https://x.com/search?q=rust");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "https://x.com/a/",
            "https://x.com/a//",
            "https://x.com/",
            "https://x.com/a/b/?x=1#frag",
            "/relative/path/",
        ];
        for input in inputs {
            let once = canonicalize(input, &base()).unwrap();
            let twice = canonicalize(once.as_str(), &base()).unwrap();
            assert_eq!(once, twice, "not idempotent for {}", input);
        }
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let result = canonicalize("mailto:someone@x.com", &base());
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));

        let result = canonicalize("javascript:void(0)", &base());
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_malformed() {
        let result = canonicalize("https://exa mple.com/", &base());
        assert!(matches!(result, Err(UrlError::InvalidUrl { .. })));
    }

    #[test]
    fn test_compare_key_strips_www_and_case() {
        let a = Url::parse("https://WWW.X.com/Page").unwrap();
        let b = Url::parse("https://x.com/Page/").unwrap();
        assert_eq!(compare_key(&a), compare_key(&b));
        assert_eq!(compare_key(&a), "x.com/Page");
    }

    #[test]
    fn test_compare_key_folds_index_documents() {
        let root = Url::parse("https://x.com/index.html").unwrap();
        assert_eq!(compare_key(&root), "x.com/");

        let nested = Url::parse("https://x.com/docs/Default.HTM").unwrap();
        assert_eq!(compare_key(&nested), "x.com/docs");

        let not_index = Url::parse("https://x.com/myindex.html").unwrap();
        assert_eq!(compare_key(&not_index), "x.com/myindex.html");
    }

    #[test]
    fn test_compare_key_idempotent_through_canonicalize() {
        let url = Url::parse("https://www.x.com/a/index.html?b=2#x").unwrap();
        let key = compare_key(&url);
        let canonical = canonicalize_url(&url).unwrap();
        assert_eq!(compare_key(&canonical), key);
        assert_eq!(key, "x.com/a?b=2");
    }

    #[test]
    fn test_path_depth() {
        assert_eq!(path_depth(&Url::parse("https://x.com/").unwrap()), 0);
        assert_eq!(path_depth(&Url::parse("https://x.com/a").unwrap()), 1);
        assert_eq!(path_depth(&Url::parse("https://x.com/a/b/").unwrap()), 2);
    }

    #[test]
    fn test_same_origin() {
        let a = Url::parse("https://x.com/a").unwrap();
        let b = Url::parse("https://x.com/b?c").unwrap();
        let c = Url::parse("http://x.com/a").unwrap();
        let d = Url::parse("https://x.com:8443/a").unwrap();
        assert!(same_origin(&a, &b));
        assert!(!same_origin(&a, &c));
        assert!(!same_origin(&a, &d));
    }

    #[test]
    fn test_same_site_host_ignores_www() {
        let a = Url::parse("https://www.x.com/").unwrap();
        let b = Url::parse("https://x.com/page").unwrap();
        let c = Url::parse("https://y.com/").unwrap();
        assert!(same_site_host(&a, &b));
        assert!(!same_site_host(&a, &c));
    }

    #[test]
    fn test_path_and_query() {
        let plain = Url::parse("https://x.com/search").unwrap();
        let query = Url::parse("https://x.com/search?q=shoes#top").unwrap();
        assert_eq!(path_and_query(&plain), "/search");
        assert_eq!(path_and_query(&query), "/search?q=shoes");
    }
}
