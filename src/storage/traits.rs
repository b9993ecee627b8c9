//! Ledger trait and error types
//!
//! This module defines the trait interface for ledger backends and
//! associated error types.

use crate::state::CrawlStatus;
use crate::storage::{CrawlRecord, LogRecord, NewResource, ResourceRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Crawl not found: {0}")]
    CrawlNotFound(i64),

    #[error("Invalid crawl status transition: {from} -> {to}")]
    InvalidTransition { from: CrawlStatus, to: CrawlStatus },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Ledger lock poisoned")]
    LockPoisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable record of crawls, the resources they observed and their progress logs
///
/// The write side (`create_crawl`, `set_crawl_status`, `append_resource`,
/// `append_log`) is what a running crawl uses. The read side serves the
/// query surface and is never consulted by the crawl itself.
pub trait Ledger {
    // ===== Crawl Lifecycle =====

    /// Creates a new crawl in `pending` status
    ///
    /// # Returns
    ///
    /// The ID of the newly created crawl
    fn create_crawl(&mut self, root_url: &str) -> StorageResult<i64>;

    /// Gets a crawl by ID
    fn get_crawl(&self, crawl_id: i64) -> StorageResult<CrawlRecord>;

    /// Moves a crawl to a new status
    ///
    /// Fails with `InvalidTransition` if the move is not forward along
    /// `pending -> running -> {completed, failed}`. Terminal statuses also
    /// record a finish timestamp.
    fn set_crawl_status(&mut self, crawl_id: i64, status: CrawlStatus) -> StorageResult<()>;

    /// Lists all crawls, newest first
    fn list_crawls(&self) -> StorageResult<Vec<CrawlRecord>>;

    // ===== Resources =====

    /// Appends one resource observation
    ///
    /// # Returns
    ///
    /// The ID of the new resource row
    fn append_resource(&mut self, crawl_id: i64, resource: &NewResource) -> StorageResult<i64>;

    /// Gets every resource recorded for a crawl, in insertion order
    fn get_resources(&self, crawl_id: i64) -> StorageResult<Vec<ResourceRecord>>;

    /// Counts a crawl's resources grouped by status code, ascending
    fn count_resources_by_status(&self, crawl_id: i64) -> StorageResult<Vec<(u16, u64)>>;

    // ===== Logs =====

    /// Appends a progress message
    fn append_log(&mut self, crawl_id: i64, message: &str) -> StorageResult<i64>;

    /// Gets a crawl's log entries, oldest first
    fn get_logs(&self, crawl_id: i64) -> StorageResult<Vec<LogRecord>>;
}
