//! SQLite ledger implementation
//!
//! This module provides a SQLite-based implementation of the Ledger trait.

use crate::state::{CrawlStatus, DiscoveryPath, ResourceType};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Ledger, StorageError, StorageResult};
use crate::storage::{CrawlRecord, LogRecord, NewResource, ResourceRecord};
use crate::AuditError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite ledger backend
pub struct SqliteLedger {
    conn: Connection,
}

impl SqliteLedger {
    /// Creates a new SqliteLedger instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteLedger)` - Successfully opened/created database
    /// * `Err(AuditError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, AuditError> {
        let conn = Connection::open(path)?;

        // Configure SQLite for concurrent appends from page tasks
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, AuditError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn crawl_from_row(row: &Row<'_>) -> rusqlite::Result<CrawlRecord> {
    Ok(CrawlRecord {
        id: row.get(0)?,
        root_url: row.get(1)?,
        created_at: row.get(2)?,
        finished_at: row.get(3)?,
        status: CrawlStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(CrawlStatus::Failed),
    })
}

fn resource_from_row(row: &Row<'_>) -> rusqlite::Result<ResourceRecord> {
    Ok(ResourceRecord {
        id: row.get(0)?,
        crawl_id: row.get(1)?,
        url: row.get(2)?,
        resource_type: ResourceType::from_db_string(&row.get::<_, String>(3)?),
        status_code: row.get(4)?,
        source_page_url: row.get(5)?,
        discovered_via: DiscoveryPath::from_db_string(&row.get::<_, String>(6)?)
            .unwrap_or(DiscoveryPath::Passive),
        recorded_at: row.get(7)?,
    })
}

impl Ledger for SqliteLedger {
    // ===== Crawl Lifecycle =====

    fn create_crawl(&mut self, root_url: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO crawls (root_url, created_at, status) VALUES (?1, ?2, ?3)",
            params![root_url, now, CrawlStatus::Pending.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_crawl(&self, crawl_id: i64) -> StorageResult<CrawlRecord> {
        self.conn
            .query_row(
                "SELECT id, root_url, created_at, finished_at, status FROM crawls WHERE id = ?1",
                params![crawl_id],
                crawl_from_row,
            )
            .optional()?
            .ok_or(StorageError::CrawlNotFound(crawl_id))
    }

    fn set_crawl_status(&mut self, crawl_id: i64, status: CrawlStatus) -> StorageResult<()> {
        let current = self.get_crawl(crawl_id)?.status;
        if !current.can_transition_to(status) {
            return Err(StorageError::InvalidTransition {
                from: current,
                to: status,
            });
        }

        let finished_at = status.is_terminal().then(|| Utc::now().to_rfc3339());
        self.conn.execute(
            "UPDATE crawls SET status = ?1, finished_at = COALESCE(?2, finished_at) WHERE id = ?3",
            params![status.to_db_string(), finished_at, crawl_id],
        )?;
        Ok(())
    }

    fn list_crawls(&self) -> StorageResult<Vec<CrawlRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, root_url, created_at, finished_at, status FROM crawls ORDER BY id DESC",
        )?;

        let crawls = stmt
            .query_map([], crawl_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(crawls)
    }

    // ===== Resources =====

    fn append_resource(&mut self, crawl_id: i64, resource: &NewResource) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO resources
             (crawl_id, url, type, status_code, source_page_url, discovered_via, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                crawl_id,
                resource.url,
                resource.resource_type.to_db_string(),
                resource.status_code,
                resource.source_page_url,
                resource.discovered_via.to_db_string(),
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_resources(&self, crawl_id: i64) -> StorageResult<Vec<ResourceRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, crawl_id, url, type, status_code, source_page_url, discovered_via, recorded_at
             FROM resources WHERE crawl_id = ?1 ORDER BY id ASC",
        )?;

        let resources = stmt
            .query_map(params![crawl_id], resource_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(resources)
    }

    fn count_resources_by_status(&self, crawl_id: i64) -> StorageResult<Vec<(u16, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT status_code, COUNT(*) FROM resources WHERE crawl_id = ?1
             GROUP BY status_code ORDER BY status_code ASC",
        )?;

        let counts = stmt
            .query_map(params![crawl_id], |row| {
                Ok((row.get::<_, u16>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(counts)
    }

    // ===== Logs =====

    fn append_log(&mut self, crawl_id: i64, message: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO logs (crawl_id, message, created_at) VALUES (?1, ?2, ?3)",
            params![crawl_id, message, now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_logs(&self, crawl_id: i64) -> StorageResult<Vec<LogRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, crawl_id, message, created_at FROM logs WHERE crawl_id = ?1 ORDER BY id ASC",
        )?;

        let logs = stmt
            .query_map(params![crawl_id], |row| {
                Ok(LogRecord {
                    id: row.get(0)?,
                    crawl_id: row.get(1)?,
                    message: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(logs)
    }
}
