//! Crawler module for page traversal and resource auditing
//!
//! This module contains the core crawling logic, including:
//! - The page engine interface and its HTTP implementation
//! - Frontier, page budget and bounded-parallel traversal
//! - Passive capture, structural discovery and status probes per page
//! - Sitemap loading
//! - Overall crawl orchestration and the start/query service

mod coordinator;
mod discovery;
mod engine;
mod fetcher;
mod recorder;
mod scheduler;
mod service;
mod sitemap;
mod traversal;
mod verifier;
mod visit;

pub use coordinator::{CrawlOrchestrator, CrawlRequest, DEFAULT_MAX_PAGES};
pub use discovery::{extract_links, needs_probe, scan_structure, Candidate, CaptureSet};
pub use engine::{
    Browser, FailedRequestEvent, NetworkListener, PageSession, ProbeMethod, ResponseEvent,
};
pub use fetcher::{build_http_client, describe_request_error, HttpBrowser, HttpPage};
pub use recorder::CrawlRecorder;
pub use scheduler::{Frontier, PageBudget, PageRequest};
pub use service::{CrawlService, StartedCrawl};
pub use sitemap::{HttpSitemapLoader, SitemapSource};
pub use traversal::{FrontierTraversal, PageHandler, Traversal, TraversalSummary, VisitContext};
pub use verifier::verify;
pub use visit::{PageVisitHandler, SettleOptions};

use crate::config::Config;
use crate::storage::open_ledger;
use std::path::Path;

/// Runs a complete crawl and waits for it to finish
///
/// This is the main entry point for the CLI. It will:
/// 1. Open the ledger database named in the configuration
/// 2. Build the HTTP page engine and sitemap loader
/// 3. Start the crawl in the background
/// 4. Wait for the crawl to reach its terminal status
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `request` - What to crawl
///
/// # Returns
///
/// * `Ok(crawl_id)` - The crawl ran to `completed` or `failed`
/// * `Err(AuditError)` - The ledger could not be opened or the crawl could not be created
pub async fn crawl(config: &Config, request: CrawlRequest) -> crate::Result<i64> {
    let ledger = open_ledger(Path::new(&config.output.database_path))?;
    let service = CrawlService::new(CrawlOrchestrator::from_config(config, ledger)?);

    let started = service.start_crawl(request)?;
    started.wait().await
}
