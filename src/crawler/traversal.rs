//! Bounded-parallel page traversal
//!
//! The traversal engine admits pages from the frontier under the crawl's
//! page budget, opens each through the [`Browser`], and hands the open page
//! to a [`PageHandler`]. Pages that cannot be opened (after retries) or whose
//! handler fails go to the handler's failure callback instead.

use crate::config::CrawlerConfig;
use crate::crawler::discovery::extract_links;
use crate::crawler::engine::{Browser, PageSession};
use crate::crawler::scheduler::{Frontier, PageRequest};
use crate::url::{same_hostname, KeywordFilter};
use crate::{AuditError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Per-page callbacks driven by a traversal
#[async_trait]
pub trait PageHandler: Send + Sync {
    /// Processes one open page
    async fn handle_page(
        &self,
        page: &dyn PageSession,
        request: &PageRequest,
        context: &VisitContext,
    ) -> Result<()>;

    /// Called once for each page that could not be processed
    async fn handle_failure(&self, request: &PageRequest, error: &AuditError);
}

/// Drives page visits for one crawl
#[async_trait]
pub trait Traversal: Send + Sync {
    /// Visits `seeds` and every page enqueued from them, admitting at most
    /// `max_pages` visits in total
    async fn visit(
        &self,
        seeds: Vec<PageRequest>,
        handler: Arc<dyn PageHandler>,
        max_pages: usize,
    ) -> Result<TraversalSummary>;
}

/// Outcome counts for one traversal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalSummary {
    pub processed: usize,
    pub failed: usize,
}

/// What a page handler can do to the traversal it runs in
pub struct VisitContext {
    frontier: Arc<Frontier>,
}

impl VisitContext {
    pub fn new(frontier: Arc<Frontier>) -> Self {
        Self { frontier }
    }

    /// Enqueues the page's links that share its hostname
    ///
    /// With a filter, only links whose full URL matches it are considered.
    /// Links already seen in this crawl and links beyond the remaining budget
    /// are not added.
    ///
    /// # Returns
    ///
    /// The number of pages newly added to the frontier
    pub async fn enqueue_links(
        &self,
        page: &dyn PageSession,
        filter: Option<&KeywordFilter>,
    ) -> usize {
        let html = page.content().await;
        let origin = page.base_url();

        let links = extract_links(&html, origin)
            .into_iter()
            .filter(|link| same_hostname(link, origin))
            .filter(|link| filter.map_or(true, |f| f.matches(link.as_str())))
            .map(PageRequest::from_url);

        self.frontier.enqueue(links)
    }

    /// Page visits the budget can still admit
    pub fn remaining_budget(&self) -> usize {
        self.frontier.budget().remaining()
    }
}

/// Traversal over an in-memory frontier with a fixed number of concurrent visits
pub struct FrontierTraversal {
    browser: Arc<dyn Browser>,
    max_concurrent_pages: usize,
    navigation_retries: u32,
    navigation_timeout: Duration,
}

impl FrontierTraversal {
    pub fn new(browser: Arc<dyn Browser>, config: &CrawlerConfig) -> Self {
        Self {
            browser,
            max_concurrent_pages: config.max_concurrent_pages.max(1),
            navigation_retries: config.navigation_retries,
            navigation_timeout: config.navigation_timeout(),
        }
    }
}

#[async_trait]
impl Traversal for FrontierTraversal {
    async fn visit(
        &self,
        seeds: Vec<PageRequest>,
        handler: Arc<dyn PageHandler>,
        max_pages: usize,
    ) -> Result<TraversalSummary> {
        let frontier = Arc::new(Frontier::new(max_pages));
        let seeded = frontier.enqueue(seeds);
        tracing::debug!("Traversal seeded with {} pages (budget {})", seeded, max_pages);

        let context = Arc::new(VisitContext::new(Arc::clone(&frontier)));
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_pages));
        let mut visits = JoinSet::new();
        let mut summary = TraversalSummary::default();

        loop {
            while let Some(request) = frontier.next_admitted() {
                let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                    break;
                };

                let visit = PageVisit {
                    browser: Arc::clone(&self.browser),
                    handler: Arc::clone(&handler),
                    context: Arc::clone(&context),
                    retries: self.navigation_retries,
                    timeout: self.navigation_timeout,
                };
                let handler = Arc::clone(&handler);
                visits.spawn(async move {
                    // A panicking visit still gets its failure row
                    let outcome = match tokio::spawn(visit.run(request.clone())).await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            tracing::error!("Page task for {} aborted: {}", request.as_str(), e);
                            handler.handle_failure(&request, &AuditError::Join(e)).await;
                            false
                        }
                    };
                    drop(permit);
                    outcome
                });
            }

            match visits.join_next().await {
                Some(Ok(true)) => summary.processed += 1,
                Some(Ok(false)) => summary.failed += 1,
                Some(Err(e)) => {
                    tracing::error!("Page task aborted: {}", e);
                    summary.failed += 1;
                }
                None => break,
            }
        }

        tracing::info!(
            "Traversal finished: {} pages processed, {} failed",
            summary.processed,
            summary.failed
        );

        Ok(summary)
    }
}

/// Everything one page task needs
struct PageVisit {
    browser: Arc<dyn Browser>,
    handler: Arc<dyn PageHandler>,
    context: Arc<VisitContext>,
    retries: u32,
    timeout: Duration,
}

impl PageVisit {
    /// Returns true if the handler processed the page
    async fn run(self, request: PageRequest) -> bool {
        let page = match self.open(&request.url).await {
            Ok(page) => page,
            Err(e) => {
                self.handler.handle_failure(&request, &e).await;
                return false;
            }
        };

        let result = self
            .handler
            .handle_page(page.as_ref(), &request, &self.context)
            .await;
        page.close().await;

        match result {
            Ok(()) => true,
            Err(e) => {
                self.handler.handle_failure(&request, &e).await;
                false
            }
        }
    }

    async fn open(&self, url: &Url) -> Result<Box<dyn PageSession>> {
        let mut attempt = 0;

        loop {
            let error = match tokio::time::timeout(self.timeout, self.browser.open(url)).await {
                Ok(Ok(page)) => return Ok(page),
                Ok(Err(e)) => e,
                Err(_) => AuditError::Navigation {
                    url: url.to_string(),
                    message: format!("timed out after {}s", self.timeout.as_secs()),
                },
            };

            if attempt >= self.retries {
                return Err(error);
            }
            attempt += 1;
            tracing::warn!(
                "Navigation to {} failed ({}), retry {}/{}",
                url,
                error,
                attempt,
                self.retries
            );
        }
    }
}
