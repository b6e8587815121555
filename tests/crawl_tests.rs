//! Integration tests for the auditor
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! audit cycle end-to-end through the bundled HTTP fetcher.

use sitegauge::clock::SystemClock;
use sitegauge::config::{
    Config, CrawlerConfig, OutputConfig, RobotsConfig, SiteConfig, UserAgentConfig,
};
use sitegauge::crawler::{
    Coordinator, FetchError, HttpFetcher, PageFetcher, PageSource, PageStatus,
};
use sitegauge::output::{generate_markdown_report, indexability_reasons, IndexabilityReason};
use sitegauge::storage::{MemoryStorage, SnapshotStore, SqliteStorage};
use sitegauge::Diagnostic;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration auditing `site_url`
fn create_test_config(site_url: &str, db_path: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_pages: 10,
            max_depth: 3,
            seed_link_sample: 5,
            fetch_timeout_ms: 2_000,
            respect_robots: false,
        },
        robots: RobotsConfig::default(),
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.to_string(),
            summary_path: "./test_summary.md".to_string(),
        },
        site: SiteConfig {
            url: site_url.to_string(),
            known_links: vec![],
        },
        ai_agents: vec![],
    }
}

fn http_fetcher() -> HttpFetcher {
    let config = create_test_config("http://localhost/", "./unused.db");
    HttpFetcher::from_config(&config.user_agent, Duration::from_secs(2))
        .expect("Failed to build fetcher")
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body.to_string())
        .insert_header("content-type", "text/html; charset=utf-8")
}

async fn mount_get(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Mounts a small site: a home page, three product pages listed in the
/// sitemap, an about page and a link to a missing page.
async fn mount_site(server: &MockServer) {
    let base = server.uri();

    mount_get(
        server,
        "/robots.txt",
        ResponseTemplate::new(200)
            .set_body_string("User-agent: *\nAllow: /\n\nUser-agent: GPTBot\nDisallow: /\n"),
    )
    .await;

    mount_get(
        server,
        "/sitemap.xml",
        ResponseTemplate::new(200).set_body_string(format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
                <url><loc>{base}/products/123</loc></url>
                <url><loc>{base}/products/456</loc></url>
                <url><loc>{base}/products/789</loc></url>
                <url><loc>https://elsewhere.example/products/1</loc></url>
            </urlset>"#
        )),
    )
    .await;

    mount_get(
        server,
        "/",
        html(&format!(
            r#"<html><head>
                <title>Home</title>
                <meta name="description" content="The home page of the test site, with enough text to be a normal description.">
                <meta name="robots" content="index, follow, noai">
                <link rel="canonical" href="{base}/">
            </head><body>
                <h1>Welcome</h1>
                <a href="/products/123">Product</a>
                <a href="/about">About</a>
                <a href="/missing">Broken</a>
                <a href="https://elsewhere.example/">Elsewhere</a>
                <a href="mailto:team@example.com">Mail</a>
            </body></html>"#
        )),
    )
    .await;

    for id in ["123", "456", "789"] {
        mount_get(
            server,
            &format!("/products/{}", id),
            html(&format!(
                r#"<html><head><title>Product {id}</title>
                    <link rel="canonical" href="{base}/products/{id}"></head>
                    <body><h1>Product {id}</h1><p>A short product blurb.</p>
                    <a href="/">Home</a></body></html>"#
            )),
        )
        .await;
    }

    mount_get(
        server,
        "/about",
        html(r#"<html><head><title>About us</title></head><body><h1>About</h1></body></html>"#),
    )
    .await;

    mount_get(server, "/missing", ResponseTemplate::new(404)).await;
}

#[tokio::test]
async fn test_full_audit_single_site() {
    // Start a mock server
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    let base_url = mock_server.uri();

    let config = create_test_config(&format!("{}/", base_url), "./unused.db");
    let mut coordinator = Coordinator::new(
        config,
        Arc::new(http_fetcher()),
        Box::new(MemoryStorage::new()),
        Arc::new(SystemClock),
    );

    let report = coordinator.run().await.expect("Audit failed");

    // Seed, three sitemap products, about and the missing page
    assert_eq!(report.pages.len(), 6);
    assert_eq!(report.source_tally.seed, 1);
    assert_eq!(report.source_tally.sitemap, 3);
    assert_eq!(report.source_tally.discovered, 2);
    assert_eq!(report.source_tally.total(), report.pages.len());

    // Nothing outside the audited host
    let seed = Url::parse(&base_url).unwrap();
    for page in &report.pages {
        assert_eq!(page.url.host_str(), seed.host_str());
        assert_eq!(page.url.port(), seed.port());
    }

    // Sitemap membership and provenance
    let product = report
        .pages
        .iter()
        .find(|p| p.url.path() == "/products/123")
        .expect("product page crawled");
    assert_eq!(product.source, PageSource::Sitemap);
    assert!(product.in_sitemap);
    assert_eq!(product.depth, 0);

    // The 404 is recorded as data, not as a fetch failure
    let missing = report
        .pages
        .iter()
        .find(|p| p.url.path() == "/missing")
        .expect("missing page crawled");
    assert_eq!(missing.status, PageStatus::Code(404));
    assert!(indexability_reasons(missing).contains(&IndexabilityReason::StatusError));
    assert_eq!(missing.discovered_from.as_ref(), Some(&seed));

    // Product pages form one template with missing descriptions
    let products = report
        .clusters
        .iter()
        .find(|c| c.key.contains("Product {#}"))
        .expect("product cluster");
    assert_eq!(products.count, 3);
    assert_eq!(products.missing_description, 3);
    assert!(report
        .alerts
        .iter()
        .any(|a| a == "Template issue: 3 pages missing meta descriptions."));

    // Home links to one product
    assert_eq!(report.inbound[product.url.as_str()], 1);

    // noai on the seed blocks every agent, GPTBot is also blocked by robots.txt
    assert_eq!(report.ai_visibility.len(), 5);
    assert!(report.ai_visibility.iter().all(|v| !v.allowed && v.blocked_by_meta));
    let gptbot = report
        .ai_visibility
        .iter()
        .find(|v| v.user_agent_token == "GPTBot")
        .unwrap();
    assert!(gptbot.blocked_by_robots);

    assert!(!report
        .diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::RobotsUnavailable { .. })));
}

#[tokio::test]
async fn test_audit_without_robots_or_sitemap() {
    let mock_server = MockServer::start().await;
    mount_get(
        &mock_server,
        "/",
        html("<html><head><title>Lonely</title></head><body><h1>Hi</h1></body></html>"),
    )
    .await;

    let config = create_test_config(&format!("{}/", mock_server.uri()), "./unused.db");
    let mut coordinator = Coordinator::new(
        config,
        Arc::new(http_fetcher()),
        Box::new(MemoryStorage::new()),
        Arc::new(SystemClock),
    );

    let report = coordinator.run().await.expect("Audit failed");

    assert_eq!(report.pages.len(), 1);
    assert!(report
        .diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::RobotsUnavailable { .. })));
    assert!(report
        .diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::SitemapUnavailable { .. })));
    // robots.txt missing means allow-all
    assert!(report
        .ai_visibility
        .iter()
        .all(|v| v.allowed && !v.blocked_by_robots));
}

#[tokio::test]
async fn test_snapshots_persist_between_runs() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("audit.db");
    let summary_path = temp_dir.path().join("summary.md");

    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    let site_url = format!("{}/", mock_server.uri());

    for _ in 0..2 {
        let config = create_test_config(&site_url, db_path.to_str().unwrap());
        let storage = SqliteStorage::new(&db_path).expect("Failed to open storage");
        let mut coordinator = Coordinator::new(
            config,
            Arc::new(http_fetcher()),
            Box::new(storage),
            Arc::new(SystemClock),
        )
        .with_config_hash("test-hash");

        let report = coordinator.run().await.expect("Audit failed");
        generate_markdown_report(&report, &summary_path).expect("Failed to write summary");
    }

    let storage = SqliteStorage::new(&db_path).expect("Failed to reopen storage");
    let origin = Url::parse(&site_url).unwrap().origin().ascii_serialization();
    let history = storage.load_history(&origin).unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[0].taken_at >= history[1].taken_at);

    let run = storage.latest_run(&origin).unwrap().expect("run recorded");
    assert_eq!(run.pages_crawled, 6);
    assert_eq!(run.config_hash, "test-hash");

    let summary = std::fs::read_to_string(&summary_path).expect("summary written");
    assert!(summary.contains(&origin));
}

#[tokio::test]
async fn test_http_fetcher_extracts_fields() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_get(
        &mock_server,
        "/page",
        html(&format!(
            r#"<html><head>
                <title>  Field   Test </title>
                <meta name="Description" content="twelve chars">
                <link rel="canonical" href="/canonical">
                <link rel="alternate" hreflang="de" href="{base_url}/de">
                <script type="application/ld+json">{{"@type": "Product"}}</script>
            </head><body>
                <h1>One</h1><h1>Two</h1>
                <a href="/next">Next</a>
                <a href="/next#part">Next again</a>
            </body></html>"#
        ))
        .insert_header("x-robots-tag", "noindex"),
    )
    .await;

    let fetcher = http_fetcher();
    let url = Url::parse(&format!("{}/page", base_url)).unwrap();
    let page = fetcher.fetch_page(&url).await.expect("fetch failed");

    assert_eq!(page.status, 200);
    assert_eq!(page.description_length, 12);
    assert_eq!(page.description, "twelve chars");
    assert_eq!(page.h1_count, 2);
    assert_eq!(page.h1_text, "One Two");
    assert_eq!(page.canonical, format!("{}/canonical", base_url));
    assert!(page.noindex);
    assert!(page.content_type.starts_with("text/html"));
    assert_eq!(page.schema_types, vec!["Product".to_string()]);
    assert_eq!(page.hreflang.len(), 1);
    assert_eq!(page.internal_links.len(), 1);
    assert_eq!(page.internal_links[0].path(), "/next");
}

#[tokio::test]
async fn test_fetch_text_rejects_error_status() {
    let mock_server = MockServer::start().await;
    let fetcher = http_fetcher();
    let url = Url::parse(&format!("{}/robots.txt", mock_server.uri())).unwrap();

    assert!(fetcher.fetch_text(&url).await.is_err());
}

#[tokio::test]
async fn test_slow_response_is_a_timeout() {
    let mock_server = MockServer::start().await;
    mount_get(
        &mock_server,
        "/slow",
        html("<html><title>Slow</title></html>").set_delay(Duration::from_secs(2)),
    )
    .await;

    let config = create_test_config("http://localhost/", "./unused.db");
    let timeout = Duration::from_millis(200);
    let fetcher = HttpFetcher::from_config(&config.user_agent, timeout).expect("fetcher");
    let url = Url::parse(&format!("{}/slow", mock_server.uri())).unwrap();

    match fetcher.fetch_page(&url).await {
        Err(FetchError::Timeout(after)) => assert_eq!(after, timeout),
        other => panic!("expected a timeout, got {:?}", other),
    }
}
