//! Ledger writes scoped to one crawl

use crate::state::CrawlStatus;
use crate::storage::{best_effort, with_ledger, NewResource, SharedLedger, StorageResult};

/// Writes logs, resources and status changes for a single crawl
#[derive(Clone)]
pub struct CrawlRecorder {
    ledger: SharedLedger,
    crawl_id: i64,
}

impl CrawlRecorder {
    pub fn new(ledger: SharedLedger, crawl_id: i64) -> Self {
        Self { ledger, crawl_id }
    }

    pub fn crawl_id(&self) -> i64 {
        self.crawl_id
    }

    /// Appends a progress message to the crawl log
    ///
    /// A message that cannot be stored is reported through tracing and
    /// otherwise dropped.
    pub fn log(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        tracing::debug!(crawl_id = self.crawl_id, "{}", message);
        best_effort(
            "append log",
            with_ledger(&self.ledger, |l| l.append_log(self.crawl_id, message)),
        );
    }

    /// Appends one resource observation
    pub fn resource(&self, resource: &NewResource) -> StorageResult<i64> {
        with_ledger(&self.ledger, |l| l.append_resource(self.crawl_id, resource))
    }

    /// Moves the crawl to `status`
    pub fn set_status(&self, status: CrawlStatus) -> StorageResult<()> {
        with_ledger(&self.ledger, |l| l.set_crawl_status(self.crawl_id, status))
    }
}
