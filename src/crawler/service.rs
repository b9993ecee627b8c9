//! Start and query surface for crawls

use crate::crawler::coordinator::{CrawlOrchestrator, CrawlRequest};
use crate::storage::{with_ledger, CrawlRecord, LogRecord, ResourceRecord};
use crate::Result;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// A crawl running in the background
pub struct StartedCrawl {
    pub crawl_id: i64,
    handle: JoinHandle<Result<i64>>,
}

impl StartedCrawl {
    /// Waits for the crawl to reach its terminal status
    pub async fn wait(self) -> Result<i64> {
        self.handle.await?
    }
}

/// Starts crawls in the background and reads back their records
#[derive(Clone)]
pub struct CrawlService {
    orchestrator: Arc<CrawlOrchestrator>,
}

impl CrawlService {
    pub fn new(orchestrator: CrawlOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// Creates the crawl record and starts the crawl on a background task
    ///
    /// Returns as soon as the crawl ID exists; the crawl itself keeps running
    /// after this returns.
    pub fn start_crawl(&self, request: CrawlRequest) -> Result<StartedCrawl> {
        let crawl_id = self.orchestrator.create_crawl(&request.root_url)?;

        let orchestrator = Arc::clone(&self.orchestrator);
        let handle = tokio::spawn(async move { orchestrator.run(&request, Some(crawl_id)).await });

        tracing::info!("Started crawl {}", crawl_id);
        Ok(StartedCrawl { crawl_id, handle })
    }

    /// Lists every crawl, newest first
    pub fn list_crawls(&self) -> Result<Vec<CrawlRecord>> {
        Ok(with_ledger(self.orchestrator.ledger(), |l| l.list_crawls())?)
    }

    pub fn crawl(&self, crawl_id: i64) -> Result<CrawlRecord> {
        Ok(with_ledger(self.orchestrator.ledger(), |l| {
            l.get_crawl(crawl_id)
        })?)
    }

    /// A crawl's progress log, oldest first
    pub fn crawl_logs(&self, crawl_id: i64) -> Result<Vec<LogRecord>> {
        Ok(with_ledger(self.orchestrator.ledger(), |l| {
            l.get_logs(crawl_id)
        })?)
    }

    /// Every resource recorded for a crawl, in recording order
    pub fn crawl_resources(&self, crawl_id: i64) -> Result<Vec<ResourceRecord>> {
        Ok(with_ledger(self.orchestrator.ledger(), |l| {
            l.get_resources(crawl_id)
        })?)
    }

    /// Resource counts per status code, ascending by code
    pub fn status_counts(&self, crawl_id: i64) -> Result<Vec<(u16, u64)>> {
        Ok(with_ledger(self.orchestrator.ledger(), |l| {
            l.count_resources_by_status(crawl_id)
        })?)
    }
}
