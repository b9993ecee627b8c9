//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run complete
//! crawls against them, inspecting the resulting SQLite ledger.

use resource_audit::config::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use resource_audit::crawler::{crawl, CrawlRequest};
use resource_audit::output::{format_markdown_summary, generate_summary};
use resource_audit::state::{CrawlStatus, DiscoveryPath, ResourceType};
use resource_audit::storage::{Ledger, ResourceRecord, SqliteLedger};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing to `db_path`
fn create_test_config(db_path: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_concurrent_pages: 2,
            navigation_timeout_secs: 10,
            network_idle_timeout_secs: 5,
            probe_timeout_secs: 5,
            navigation_retries: 0,
            scroll_timeout_secs: 5,
            viewport_height_px: 200, // Two scroll steps per page
            ..CrawlerConfig::default()
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.to_string_lossy().to_string(),
            report_path: "./test_report.md".to_string(),
        },
    }
}

fn setup() -> (TempDir, Config) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&dir.path().join("crawl.db"));
    (dir, config)
}

fn open(config: &Config) -> SqliteLedger {
    SqliteLedger::new(Path::new(&config.output.database_path)).expect("Failed to open ledger")
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><body>{}</body></html>", body))
        .insert_header("content-type", "text/html")
}

fn find<'a>(resources: &'a [ResourceRecord], url: &str) -> &'a ResourceRecord {
    resources
        .iter()
        .find(|r| r.url == url)
        .unwrap_or_else(|| panic!("No resource recorded for {}", url))
}

fn log_messages(ledger: &SqliteLedger, crawl_id: i64) -> Vec<String> {
    ledger
        .get_logs(crawl_id)
        .unwrap()
        .into_iter()
        .map(|l| l.message)
        .collect()
}

#[tokio::test]
async fn test_single_page_crawl_records_resources() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<img src="/logo.png"><a href="/about">About</a>"#))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/png"))
        .mount(&mock_server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/about"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;
    // The image was requested by the page itself, so it is never probed
    Mock::given(method("HEAD"))
        .and(path("/logo.png"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (_dir, config) = setup();
    let request = CrawlRequest::new(base.clone()).with_max_pages(1);
    let crawl_id = crawl(&config, request).await.expect("Crawl failed");

    let ledger = open(&config);
    let record = ledger.get_crawl(crawl_id).unwrap();
    assert_eq!(record.status, CrawlStatus::Completed);
    assert!(record.finished_at.is_some());

    let resources = ledger.get_resources(crawl_id).unwrap();

    // The server URI has no trailing slash; rows name the page as it was given
    let document = find(&resources, &format!("{}/", base));
    assert_eq!(document.resource_type, ResourceType::Document);
    assert_eq!(document.status_code, 200);
    assert_eq!(document.source_page_url.as_deref(), Some(base.as_str()));
    assert_eq!(document.discovered_via, DiscoveryPath::Passive);
    assert!(resources
        .iter()
        .all(|r| r.source_page_url.as_deref() == Some(base.as_str())));

    let image = find(&resources, &format!("{}/logo.png", base));
    assert_eq!(image.resource_type, ResourceType::Image);
    assert_eq!(image.status_code, 200);
    assert_eq!(image.discovered_via, DiscoveryPath::Passive);
    assert_eq!(
        resources
            .iter()
            .filter(|r| r.url.ends_with("/logo.png"))
            .count(),
        1
    );

    let link = find(&resources, &format!("{}/about", base));
    assert_eq!(link.resource_type, ResourceType::Link);
    assert_eq!(link.status_code, 200);
    assert_eq!(link.discovered_via, DiscoveryPath::Structural);

    // Budget of one: the linked page is probed but never visited
    let logs = log_messages(&ledger, crawl_id);
    assert_eq!(
        logs.first().map(String::as_str),
        Some(
            format!(
                "Starting crawl for {} (Max pages: 1, Filter: None, Sitemap: false)",
                base
            )
            .as_str()
        )
    );
    assert!(logs.contains(&format!("Processing {}", base)));
    assert!(!logs.contains(&format!("Processing {}/about", base)));
    assert!(logs.contains(&"Checking status of 2 resources found on page...".to_string()));
    assert_eq!(logs.last().map(String::as_str), Some("Crawl completed."));

    let summary = generate_summary(&ledger, crawl_id).unwrap();
    assert_eq!(summary.total_resources, 3);
    assert_eq!(summary.broken_resources, 0);
    assert!(format_markdown_summary(&summary).contains("# Resource Audit Report"));
}

#[tokio::test]
async fn test_head_rejection_falls_back_to_get() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<a href="/no-head">A</a><a href="/missing">B</a>"#,
        ))
        .mount(&mock_server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/no-head"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/no-head"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;
    // /missing is unmounted, so both HEAD and GET return 404

    let (_dir, config) = setup();
    let crawl_id = crawl(&config, CrawlRequest::new(base.clone()).with_max_pages(1))
        .await
        .unwrap();

    let ledger = open(&config);
    let resources = ledger.get_resources(crawl_id).unwrap();

    assert_eq!(find(&resources, &format!("{}/no-head", base)).status_code, 200);
    assert_eq!(find(&resources, &format!("{}/missing", base)).status_code, 404);

    let counts = ledger.count_resources_by_status(crawl_id).unwrap();
    assert_eq!(counts, vec![(200, 2), (404, 1)]);
}

#[tokio::test]
async fn test_follows_same_hostname_links_only() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let port = url::Url::parse(&base).unwrap().port().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(&format!(
            r#"<a href="/page2">Two</a><a href="/page2#top">Two again</a>
               <a href="http://localhost:{}/elsewhere">Other host</a>"#,
            port
        )))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(html(r#"<a href="/">Home</a>"#))
        .mount(&mock_server)
        .await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let (_dir, config) = setup();
    let crawl_id = crawl(&config, CrawlRequest::new(base.clone()).with_max_pages(5))
        .await
        .unwrap();

    let ledger = open(&config);
    let logs = log_messages(&ledger, crawl_id);

    assert!(logs.contains(&format!("Processing {}", base)));
    assert!(logs.contains(&format!("Processing {}/page2", base)));
    assert!(logs.contains(&"Found 1 new pages to crawl.".to_string()));
    assert!(!logs.iter().any(|l| l.contains("Processing http://localhost")));
    assert_eq!(
        logs.iter().filter(|l| l.starts_with("Processing ")).count(),
        2
    );

    let resources = ledger.get_resources(crawl_id).unwrap();
    let page2 = resources
        .iter()
        .find(|r| {
            r.url == format!("{}/page2", base) && r.resource_type == ResourceType::Document
        })
        .expect("page2 document not recorded");
    assert_eq!(page2.source_page_url.as_deref(), Some(page2.url.as_str()));
}

#[tokio::test]
async fn test_sitemap_seeds_filtered_by_keyword() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    let sitemap = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>{base}/</loc></url>
  <url><loc>{base}/blog/first-post</loc></url>
  <url><loc>{base}/about</loc></url>
</urlset>"#
    );

    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(sitemap)
                .insert_header("content-type", "application/xml"),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/blog/first-post"))
        .respond_with(html("<p>Hello</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html("<p>About</p>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (_dir, config) = setup();
    let sitemap_url = format!("{}/sitemap.xml", base);
    let request = CrawlRequest::new(sitemap_url.clone())
        .with_max_pages(10)
        .with_keyword("blog")
        .from_sitemap();
    let crawl_id = crawl(&config, request).await.unwrap();

    let ledger = open(&config);
    assert_eq!(
        ledger.get_crawl(crawl_id).unwrap().status,
        CrawlStatus::Completed
    );

    let logs = log_messages(&ledger, crawl_id);
    assert!(logs.contains(&format!(
        "Starting crawl for {} (Max pages: 10, Filter: blog, Sitemap: true)",
        sitemap_url
    )));
    assert!(logs.contains(&format!("Loading sitemap from {}...", sitemap_url)));
    assert!(logs.contains(&"Found 3 URLs in sitemap.".to_string()));
    assert!(logs.contains(&"Filtered to 1 URLs matching 'blog'".to_string()));
    assert!(logs.contains(&format!("Processing {}/blog/first-post", base)));
    assert!(logs.contains(&"Filtering links by keyword: blog".to_string()));
}

#[tokio::test]
async fn test_sitemap_failure_fails_crawl() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let (_dir, config) = setup();
    let request = CrawlRequest::new(format!("{}/sitemap.xml", mock_server.uri())).from_sitemap();
    let crawl_id = crawl(&config, request).await.unwrap();

    let ledger = open(&config);
    let record = ledger.get_crawl(crawl_id).unwrap();
    assert_eq!(record.status, CrawlStatus::Failed);
    assert!(record.finished_at.is_some());

    let logs = log_messages(&ledger, crawl_id);
    assert!(logs.last().unwrap().starts_with("Crawl failed: "));
    assert!(!logs.iter().any(|l| l.starts_with("Processing ")));
    assert!(ledger.get_resources(crawl_id).unwrap().is_empty());
}

#[tokio::test]
async fn test_unreachable_page_recorded_as_failed() {
    // Reserve a port, then close it so connections are refused
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let root = format!("http://127.0.0.1:{}", port);

    let (_dir, config) = setup();
    let crawl_id = crawl(&config, CrawlRequest::new(root.clone()))
        .await
        .unwrap();

    let ledger = open(&config);
    // A page failure does not fail the crawl
    assert_eq!(
        ledger.get_crawl(crawl_id).unwrap().status,
        CrawlStatus::Completed
    );

    let resources = ledger.get_resources(crawl_id).unwrap();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].url, root);
    assert_eq!(resources[0].resource_type, ResourceType::Document);
    assert_eq!(resources[0].status_code, 0);
    assert_eq!(resources[0].source_page_url.as_deref(), Some(root.as_str()));

    let logs = log_messages(&ledger, crawl_id);
    assert!(logs.contains(&format!("Failed to process {}", root)));
    assert_eq!(logs.last().map(String::as_str), Some("Crawl completed."));
}

#[tokio::test]
async fn test_failed_subresource_logged() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let dead_script = format!("http://127.0.0.1:{}/app.js", port);

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(&format!(r#"<script src="{}"></script>"#, dead_script)))
        .mount(&mock_server)
        .await;

    let (_dir, config) = setup();
    let crawl_id = crawl(&config, CrawlRequest::new(mock_server.uri()).with_max_pages(1))
        .await
        .unwrap();

    let ledger = open(&config);
    let resources = ledger.get_resources(crawl_id).unwrap();
    let script = find(&resources, &dead_script);
    assert_eq!(script.status_code, 0);
    assert_eq!(script.resource_type, ResourceType::Script);
    assert_eq!(script.discovered_via, DiscoveryPath::Passive);

    let logs = log_messages(&ledger, crawl_id);
    assert!(logs
        .iter()
        .any(|l| l.starts_with(&format!("Resource failed: {} (", dead_script))));
}

#[tokio::test]
async fn test_invalid_root_url_fails_crawl() {
    let (_dir, config) = setup();
    let crawl_id = crawl(&config, CrawlRequest::new("ftp://example.com/"))
        .await
        .unwrap();

    let ledger = open(&config);
    assert_eq!(
        ledger.get_crawl(crawl_id).unwrap().status,
        CrawlStatus::Failed
    );
    assert!(log_messages(&ledger, crawl_id)
        .last()
        .unwrap()
        .starts_with("Crawl failed: "));
}
