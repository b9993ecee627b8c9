//! Output module for crawl summaries and reports
//!
//! This module handles:
//! - Building a summary of one crawl from the ledger
//! - Generating markdown reports
//! - Printing statistics and record listings to the terminal

mod listing;
mod markdown;
pub mod stats;
mod summary;

pub use listing::{
    format_crawls, format_logs, format_resources, print_crawls, print_logs, print_resources,
};
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{load_statistics, print_statistics, status_label, CrawlStatistics};
pub use summary::{BrokenResource, CrawlSummary, OutputError, OutputResult};

use crate::state::DiscoveryPath;
use crate::storage::Ledger;
use chrono::DateTime;

/// Generates a crawl summary from the ledger
///
/// # Arguments
///
/// * `ledger` - The ledger containing crawl data
/// * `crawl_id` - The crawl to summarize
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Successfully generated summary
/// * `Err(OutputError)` - The crawl does not exist or the ledger could not be read
pub fn generate_summary(ledger: &dyn Ledger, crawl_id: i64) -> OutputResult<CrawlSummary> {
    let crawl = ledger.get_crawl(crawl_id)?;
    let resources = ledger.get_resources(crawl_id)?;
    let log_entries = ledger.get_logs(crawl_id)?.len() as u64;

    // Calculate duration if finished
    let duration_seconds = match (
        DateTime::parse_from_rfc3339(&crawl.created_at),
        crawl.finished_at.as_deref().map(DateTime::parse_from_rfc3339),
    ) {
        (Ok(started), Some(Ok(finished))) => {
            Some((finished - started).num_seconds().max(0) as u64)
        }
        _ => None,
    };

    let stats = CrawlStatistics::from_resources(&resources);

    let mut by_discovery: Vec<(DiscoveryPath, u64)> =
        stats.by_discovery.iter().map(|(p, c)| (*p, *c)).collect();
    by_discovery.sort_by_key(|(path, _)| path.to_db_string());

    let broken = resources
        .iter()
        .filter(|r| r.is_broken())
        .map(|r| BrokenResource {
            url: r.url.clone(),
            resource_type: r.resource_type,
            status_code: r.status_code,
            source_page_url: r.source_page_url.clone(),
        })
        .collect();

    Ok(CrawlSummary {
        crawl_id: crawl.id,
        root_url: crawl.root_url,
        created_at: crawl.created_at,
        finished_at: crawl.finished_at,
        duration_seconds,
        status: crawl.status.to_db_string().to_string(),
        total_resources: stats.total_resources,
        unique_urls: stats.unique_urls,
        pages_visited: stats.pages_visited,
        pages_failed: stats.pages_failed,
        broken_resources: stats.broken_resources,
        by_status: stats.status_breakdown(),
        by_type: stats.type_breakdown(),
        by_discovery,
        broken,
        log_entries,
    })
}
