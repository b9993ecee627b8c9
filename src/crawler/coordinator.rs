//! Crawl orchestration
//!
//! This module owns a crawl from creation to its final status:
//! - Creating the crawl record
//! - Choosing seeds (the root URL, or a sitemap optionally filtered by keyword)
//! - Driving the traversal with the page visit handler
//! - Recording the terminal status and the closing log entry

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, HttpBrowser};
use crate::crawler::recorder::CrawlRecorder;
use crate::crawler::scheduler::PageRequest;
use crate::crawler::sitemap::{HttpSitemapLoader, SitemapSource};
use crate::crawler::traversal::{FrontierTraversal, Traversal, TraversalSummary};
use crate::crawler::visit::{PageVisitHandler, SettleOptions};
use crate::state::CrawlStatus;
use crate::storage::{best_effort, with_ledger, SharedLedger};
use crate::url::KeywordFilter;
use crate::{Result, UrlError};
use std::sync::Arc;
use url::Url;

/// Default page budget for a crawl
pub const DEFAULT_MAX_PAGES: usize = 100;

/// Parameters of one crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    /// Page URL, or sitemap URL when `is_sitemap` is set
    pub root_url: String,
    pub max_pages: usize,
    /// Case-insensitive pattern restricting seeds and enqueued links
    pub keyword: Option<String>,
    pub is_sitemap: bool,
}

impl CrawlRequest {
    pub fn new(root_url: impl Into<String>) -> Self {
        Self {
            root_url: root_url.into(),
            max_pages: DEFAULT_MAX_PAGES,
            keyword: None,
            is_sitemap: false,
        }
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn from_sitemap(mut self) -> Self {
        self.is_sitemap = true;
        self
    }

    fn start_message(&self) -> String {
        format!(
            "Starting crawl for {} (Max pages: {}, Filter: {}, Sitemap: {})",
            self.root_url,
            self.max_pages,
            self.keyword.as_deref().unwrap_or("None"),
            self.is_sitemap
        )
    }
}

/// Runs crawls against a ledger
pub struct CrawlOrchestrator {
    ledger: SharedLedger,
    traversal: Arc<dyn Traversal>,
    sitemaps: Arc<dyn SitemapSource>,
    settle: SettleOptions,
}

impl CrawlOrchestrator {
    pub fn new(
        ledger: SharedLedger,
        traversal: Arc<dyn Traversal>,
        sitemaps: Arc<dyn SitemapSource>,
        settle: SettleOptions,
    ) -> Self {
        Self {
            ledger,
            traversal,
            sitemaps,
            settle,
        }
    }

    /// Builds an orchestrator with the HTTP page engine and sitemap loader
    ///
    /// # Example
    ///
    /// ```no_run
    /// use resource_audit::config::load_config;
    /// use resource_audit::crawler::{CrawlOrchestrator, CrawlRequest};
    /// use resource_audit::storage::open_ledger;
    /// use std::path::Path;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = load_config(Path::new("config.toml"))?;
    /// let ledger = open_ledger(Path::new(&config.output.database_path))?;
    /// let orchestrator = CrawlOrchestrator::from_config(&config, ledger)?;
    ///
    /// let crawl_id = orchestrator
    ///     .run(&CrawlRequest::new("https://example.com").with_max_pages(10), None)
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_config(config: &Config, ledger: SharedLedger) -> Result<Self> {
        let client = build_http_client(&config.user_agent, &config.crawler)?;
        let browser = Arc::new(HttpBrowser::with_client(client.clone(), &config.crawler));

        Ok(Self::new(
            ledger,
            Arc::new(FrontierTraversal::new(browser, &config.crawler)),
            Arc::new(HttpSitemapLoader::new(client)),
            SettleOptions::from_config(&config.crawler),
        ))
    }

    pub fn ledger(&self) -> &SharedLedger {
        &self.ledger
    }

    /// Creates a `pending` crawl record for `root_url`
    pub fn create_crawl(&self, root_url: &str) -> Result<i64> {
        Ok(with_ledger(&self.ledger, |l| l.create_crawl(root_url))?)
    }

    /// Runs one crawl to its terminal status
    ///
    /// Without a `crawl_id` a new crawl record is created first. Everything
    /// that goes wrong after that point is recorded against the crawl (status
    /// `failed` plus a `Crawl failed: ...` log entry) rather than returned.
    ///
    /// # Returns
    ///
    /// * `Ok(crawl_id)` - The crawl reached `completed` or `failed`
    /// * `Err(AuditError)` - The crawl record could not be created
    pub async fn run(&self, request: &CrawlRequest, crawl_id: Option<i64>) -> Result<i64> {
        let crawl_id = match crawl_id {
            Some(id) => id,
            None => self.create_crawl(&request.root_url)?,
        };

        let recorder = CrawlRecorder::new(Arc::clone(&self.ledger), crawl_id);
        tracing::info!("Crawl {}: {}", crawl_id, request.start_message());
        recorder.log(request.start_message());

        match self.drive(request, &recorder).await {
            Ok(summary) => {
                best_effort(
                    "mark crawl completed",
                    recorder.set_status(CrawlStatus::Completed),
                );
                recorder.log("Crawl completed.");
                tracing::info!(
                    "Crawl {} completed ({} pages processed, {} failed)",
                    crawl_id,
                    summary.processed,
                    summary.failed
                );
            }
            Err(e) => {
                tracing::error!("Crawl {} failed: {}", crawl_id, e);
                best_effort("mark crawl failed", recorder.set_status(CrawlStatus::Failed));
                recorder.log(format!("Crawl failed: {}", e));
            }
        }

        Ok(crawl_id)
    }

    async fn drive(&self, request: &CrawlRequest, recorder: &CrawlRecorder) -> Result<TraversalSummary> {
        let keyword = KeywordFilter::from_optional(request.keyword.as_deref())?;
        let root = parse_root(&request.root_url)?;

        let seeds = if request.is_sitemap {
            recorder.log(format!("Loading sitemap from {}...", request.root_url));
            self.sitemap_seeds(&root.url, keyword.as_ref(), recorder).await?
        } else {
            vec![root]
        };

        best_effort("mark crawl running", recorder.set_status(CrawlStatus::Running));

        let handler = Arc::new(PageVisitHandler::new(
            recorder.clone(),
            keyword,
            self.settle.clone(),
        ));
        self.traversal
            .visit(seeds, handler, request.max_pages)
            .await
    }

    async fn sitemap_seeds(
        &self,
        sitemap_url: &Url,
        keyword: Option<&KeywordFilter>,
        recorder: &CrawlRecorder,
    ) -> Result<Vec<PageRequest>> {
        let urls = self.sitemaps.load(sitemap_url).await?;
        recorder.log(format!("Found {} URLs in sitemap.", urls.len()));

        let urls = match keyword {
            Some(filter) => {
                let filtered = filter.filter_urls(urls);
                recorder.log(format!(
                    "Filtered to {} URLs matching '{}'",
                    filtered.len(),
                    filter.keyword()
                ));
                filtered
            }
            None => urls,
        };

        Ok(urls
            .iter()
            .filter_map(|u| match PageRequest::parse(u) {
                Ok(seed) => Some(seed),
                Err(e) => {
                    tracing::warn!("Skipping sitemap entry {}: {}", u, e);
                    None
                }
            })
            .collect())
    }
}

/// Parses the crawl's root URL, accepting only HTTP(S)
fn parse_root(root_url: &str) -> Result<PageRequest> {
    let root = PageRequest::parse(root_url)?;
    let scheme = root.url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(UrlError::InvalidScheme(scheme.to_string()).into());
    }
    Ok(root)
}
