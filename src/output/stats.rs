//! Statistics generation from the crawl ledger
//!
//! This module provides functionality for extracting and displaying
//! per-crawl resource statistics from the storage layer.

use crate::state::{DiscoveryPath, ResourceType};
use crate::storage::{Ledger, ResourceRecord, StorageResult};
use std::collections::{HashMap, HashSet};

/// Resource statistics for one crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlStatistics {
    /// Total number of resource rows
    pub total_resources: u64,

    /// Number of distinct resource URLs
    pub unique_urls: u64,

    /// Distinct source pages that produced at least one row
    pub pages_visited: u64,

    /// Pages that could not be processed at all
    pub pages_failed: u64,

    /// Rows with status 0 or 400 and above
    pub broken_resources: u64,

    /// Count of rows by status code
    pub by_status: HashMap<u16, u64>,

    /// Count of rows by resource type
    pub by_type: HashMap<ResourceType, u64>,

    /// Count of rows by discovery path
    pub by_discovery: HashMap<DiscoveryPath, u64>,
}

impl CrawlStatistics {
    /// Tallies a crawl's resource rows
    pub fn from_resources(resources: &[ResourceRecord]) -> Self {
        let mut stats = Self::default();
        let mut urls = HashSet::new();
        let mut pages = HashSet::new();

        for resource in resources {
            stats.total_resources += 1;
            urls.insert(resource.url.as_str());

            if resource.discovered_via == DiscoveryPath::Navigation {
                stats.pages_failed += 1;
            } else if let Some(page) = &resource.source_page_url {
                pages.insert(page.as_str());
            }
            if resource.is_broken() {
                stats.broken_resources += 1;
            }

            *stats.by_status.entry(resource.status_code).or_insert(0) += 1;
            *stats.by_type.entry(resource.resource_type).or_insert(0) += 1;
            *stats.by_discovery.entry(resource.discovered_via).or_insert(0) += 1;
        }

        stats.unique_urls = urls.len() as u64;
        stats.pages_visited = pages.len() as u64;
        stats
    }

    /// Status codes with their counts, ascending by code
    pub fn status_breakdown(&self) -> Vec<(u16, u64)> {
        let mut counts: Vec<_> = self.by_status.iter().map(|(s, c)| (*s, *c)).collect();
        counts.sort_by_key(|(status, _)| *status);
        counts
    }

    /// Resource types with their counts, most common first
    pub fn type_breakdown(&self) -> Vec<(ResourceType, u64)> {
        let mut counts: Vec<_> = self.by_type.iter().map(|(t, c)| (*t, *c)).collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.to_db_string().cmp(b.0.to_db_string())));
        counts
    }
}

/// Loads statistics for one crawl from the ledger
///
/// # Arguments
///
/// * `ledger` - The ledger to query
/// * `crawl_id` - The crawl to summarize
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query the ledger
pub fn load_statistics(ledger: &dyn Ledger, crawl_id: i64) -> StorageResult<CrawlStatistics> {
    let resources = ledger.get_resources(crawl_id)?;
    Ok(CrawlStatistics::from_resources(&resources))
}

/// Label for a status code class
pub fn status_label(status: u16) -> &'static str {
    match status {
        0 => "no response",
        100..=199 => "informational",
        200..=299 => "ok",
        300..=399 => "redirect",
        400..=499 => "client error",
        500..=599 => "server error",
        _ => "unknown",
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Resources recorded: {}", stats.total_resources);
    println!("  Unique URLs: {}", stats.unique_urls);
    println!("  Pages visited: {}", stats.pages_visited);
    println!("  Pages failed: {}", stats.pages_failed);
    println!();

    println!("Resources by Status:");
    for (status, count) in stats.status_breakdown() {
        let percentage = if stats.total_resources > 0 {
            (count as f64 / stats.total_resources as f64) * 100.0
        } else {
            0.0
        };
        println!(
            "  {:>3} {:<14} {} ({:.1}%)",
            status,
            status_label(status),
            count,
            percentage
        );
    }
    println!();

    println!("Resources by Type:");
    for (resource_type, count) in stats.type_breakdown() {
        println!("  {}: {}", resource_type, count);
    }
    println!();

    let healthy = stats.total_resources - stats.broken_resources;
    let healthy_rate = if stats.total_resources > 0 {
        (healthy as f64 / stats.total_resources as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Healthy: {:.1}% ({} / {} resources responded below 400)",
        healthy_rate, healthy, stats.total_resources
    );
}
