//! Plain-text listings of ledger records for the command line

use crate::output::stats::status_label;
use crate::storage::{CrawlRecord, LogRecord, ResourceRecord};

/// Formats crawls one per line, as returned by the ledger
pub fn format_crawls(crawls: &[CrawlRecord]) -> String {
    let mut out = String::new();
    for crawl in crawls {
        out.push_str(&format!(
            "{:>5}  {:<10} {}  {}",
            crawl.id, crawl.status, crawl.created_at, crawl.root_url
        ));
        if let Some(finished) = &crawl.finished_at {
            out.push_str(&format!("  (finished {})", finished));
        }
        out.push('\n');
    }
    out
}

/// Formats log entries oldest first, one per line
pub fn format_logs(logs: &[LogRecord]) -> String {
    logs.iter()
        .map(|log| format!("[{}] {}\n", log.created_at, log.message))
        .collect()
}

/// Formats resource rows, optionally keeping only the broken ones
pub fn format_resources(resources: &[ResourceRecord], broken_only: bool) -> String {
    let mut out = String::new();
    for resource in resources
        .iter()
        .filter(|r| !broken_only || r.is_broken())
    {
        out.push_str(&format!(
            "{:>3} {:<13} {:<10} {:<10} {}",
            resource.status_code,
            status_label(resource.status_code),
            resource.resource_type,
            resource.discovered_via,
            resource.url
        ));
        if let Some(page) = &resource.source_page_url {
            if page != &resource.url {
                out.push_str(&format!("  <- {}", page));
            }
        }
        out.push('\n');
    }
    out
}

pub fn print_crawls(crawls: &[CrawlRecord]) {
    if crawls.is_empty() {
        println!("No crawls recorded.");
        return;
    }
    print!("{}", format_crawls(crawls));
}

pub fn print_logs(logs: &[LogRecord]) {
    print!("{}", format_logs(logs));
}

pub fn print_resources(resources: &[ResourceRecord], broken_only: bool) {
    print!("{}", format_resources(resources, broken_only));
}
