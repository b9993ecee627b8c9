//! Crawl summary types
//!
//! This module defines the summary data structure the report writers
//! consume and the errors they can raise.

use crate::state::{DiscoveryPath, ResourceType};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// A resource that returned an error status or no response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenResource {
    pub url: String,
    pub resource_type: ResourceType,
    pub status_code: u16,
    pub source_page_url: Option<String>,
}

/// Summary statistics for one crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    // Crawl metadata
    pub crawl_id: i64,
    pub root_url: String,
    pub created_at: String,
    pub finished_at: Option<String>,
    pub duration_seconds: Option<u64>,
    pub status: String,

    // Overall statistics
    pub total_resources: u64,
    pub unique_urls: u64,
    pub pages_visited: u64,
    pub pages_failed: u64,
    pub broken_resources: u64,

    /// Resource counts per status code, ascending by code
    pub by_status: Vec<(u16, u64)>,

    /// Resource counts per type, descending by count
    pub by_type: Vec<(ResourceType, u64)>,

    /// Resource counts per discovery path
    pub by_discovery: Vec<(DiscoveryPath, u64)>,

    // Broken resources in recording order
    pub broken: Vec<BrokenResource>,

    pub log_entries: u64,
}

impl CrawlSummary {
    /// Creates a new empty crawl summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the share of resources that responded below 400, as a percentage
    pub fn healthy_rate(&self) -> f64 {
        if self.total_resources == 0 {
            return 0.0;
        }
        let healthy = self.total_resources - self.broken_resources;
        (healthy as f64 / self.total_resources as f64) * 100.0
    }

    /// Returns the share of broken resources, as a percentage
    pub fn broken_rate(&self) -> f64 {
        if self.total_resources == 0 {
            return 0.0;
        }
        (self.broken_resources as f64 / self.total_resources as f64) * 100.0
    }
}
