//! Storage module for persisting the crawl audit trail
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Crawl lifecycle records
//! - Append-only resource observations and progress logs
//! - The best-effort write policy used while a crawl is running

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteLedger;
pub use traits::{Ledger, StorageError, StorageResult};

use crate::state::{CrawlStatus, DiscoveryPath, ResourceType};
use crate::AuditError;

use std::path::Path;
use std::sync::{Arc, Mutex};

/// Ledger handle shared between concurrently processed pages
pub type SharedLedger = Arc<Mutex<dyn Ledger + Send>>;

/// Initializes or opens a ledger database and wraps it for sharing
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SharedLedger)` - Successfully initialized ledger
/// * `Err(AuditError)` - Failed to initialize ledger
pub fn open_ledger(path: &Path) -> Result<SharedLedger, AuditError> {
    Ok(share(SqliteLedger::new(path)?))
}

/// Wraps a ledger for sharing between tasks
pub fn share<L: Ledger + Send + 'static>(ledger: L) -> SharedLedger {
    Arc::new(Mutex::new(ledger))
}

/// Runs a closure against the shared ledger
///
/// A poisoned lock surfaces as `StorageError::LockPoisoned` instead of a panic.
pub fn with_ledger<T>(
    ledger: &SharedLedger,
    f: impl FnOnce(&mut (dyn Ledger + Send)) -> StorageResult<T>,
) -> StorageResult<T> {
    let mut guard = ledger.lock().map_err(|_| StorageError::LockPoisoned)?;
    f(&mut *guard)
}

/// Best-effort write: logs a failed ledger operation and carries on
///
/// Persistence failures during a crawl must never abort the page visit or the
/// crawl, so callers route every in-crawl write through here and inspect the
/// `Option` only when they need the written ID.
pub fn best_effort<T>(what: &str, result: StorageResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!("Failed to {}: {}", what, e);
            None
        }
    }
}

/// Represents a crawl in the database
#[derive(Debug, Clone)]
pub struct CrawlRecord {
    pub id: i64,
    pub root_url: String,
    pub created_at: String,
    pub finished_at: Option<String>,
    pub status: CrawlStatus,
}

/// A resource observation about to be appended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewResource {
    pub url: String,
    pub resource_type: ResourceType,
    /// HTTP status; 0 means the request could not be completed
    pub status_code: u16,
    pub source_page_url: Option<String>,
    pub discovered_via: DiscoveryPath,
}

impl NewResource {
    /// A resource observed on `source_page`
    pub fn observed(
        url: impl Into<String>,
        resource_type: ResourceType,
        status_code: u16,
        source_page: &str,
        discovered_via: DiscoveryPath,
    ) -> Self {
        Self {
            url: url.into(),
            resource_type,
            status_code,
            source_page_url: Some(source_page.to_string()),
            discovered_via,
        }
    }

    /// The row written for a page that could not be processed at all
    ///
    /// The failed URL doubles as its own source page.
    pub fn failed_page(url: &str) -> Self {
        Self {
            url: url.to_string(),
            resource_type: ResourceType::Document,
            status_code: 0,
            source_page_url: Some(url.to_string()),
            discovered_via: DiscoveryPath::Navigation,
        }
    }
}

/// Represents a stored resource observation
#[derive(Debug, Clone)]
pub struct ResourceRecord {
    pub id: i64,
    pub crawl_id: i64,
    pub url: String,
    pub resource_type: ResourceType,
    pub status_code: u16,
    pub source_page_url: Option<String>,
    pub discovered_via: DiscoveryPath,
    pub recorded_at: String,
}

impl ResourceRecord {
    /// Returns true for network failures and HTTP error statuses
    pub fn is_broken(&self) -> bool {
        self.status_code == 0 || self.status_code >= 400
    }
}

/// Represents a progress log entry
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub id: i64,
    pub crawl_id: i64,
    pub message: String,
    pub created_at: String,
}
