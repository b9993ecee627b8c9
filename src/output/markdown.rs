//! Markdown report generation
//!
//! This module generates human-readable markdown reports of a crawl,
//! including status and type breakdowns and the list of broken resources.

use crate::output::stats::status_label;
use crate::output::summary::{CrawlSummary, OutputResult};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Broken resources listed before the report truncates
const MAX_BROKEN_LISTED: usize = 200;

/// Writes a markdown report for a crawl
///
/// # Arguments
///
/// * `summary` - The crawl summary data
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown report
/// * `Err(OutputError)` - Failed to write report
pub fn generate_markdown_summary(summary: &CrawlSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl summary as markdown
pub fn format_markdown_summary(summary: &CrawlSummary) -> String {
    let mut md = String::new();

    md.push_str("# Resource Audit Report\n\n");

    // Crawl metadata
    md.push_str("## Crawl Information\n\n");
    md.push_str(&format!("- **Crawl ID**: {}\n", summary.crawl_id));
    md.push_str(&format!("- **Root URL**: {}\n", summary.root_url));
    md.push_str(&format!("- **Started**: {}\n", summary.created_at));
    if let Some(finished) = &summary.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished));
    }
    if let Some(duration) = summary.duration_seconds {
        md.push_str(&format!(
            "- **Duration**: {} seconds ({:.2} minutes)\n",
            duration,
            duration as f64 / 60.0
        ));
    }
    md.push_str(&format!("- **Status**: {}\n", summary.status));
    md.push_str(&format!("- **Log Entries**: {}\n\n", summary.log_entries));

    // Overall statistics
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!(
        "- **Resources Recorded**: {}\n",
        summary.total_resources
    ));
    md.push_str(&format!("- **Unique URLs**: {}\n", summary.unique_urls));
    md.push_str(&format!("- **Pages Visited**: {}\n", summary.pages_visited));
    md.push_str(&format!("- **Pages Failed**: {}\n", summary.pages_failed));
    md.push_str(&format!(
        "- **Broken Resources**: {}\n",
        summary.broken_resources
    ));
    md.push_str(&format!(
        "- **Healthy Rate**: {:.2}%\n\n",
        summary.healthy_rate()
    ));

    if !summary.by_status.is_empty() {
        md.push_str("## Status Breakdown\n\n");
        md.push_str("| Status | Class | Count |\n");
        md.push_str("|--------|-------|-------|\n");
        for (status, count) in &summary.by_status {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                status,
                status_label(*status),
                count
            ));
        }
        md.push('\n');
    }

    if !summary.by_type.is_empty() {
        md.push_str("## Resource Types\n\n");
        md.push_str("| Type | Count |\n");
        md.push_str("|------|-------|\n");
        for (resource_type, count) in &summary.by_type {
            md.push_str(&format!("| {} | {} |\n", resource_type, count));
        }
        md.push('\n');
    }

    if !summary.by_discovery.is_empty() {
        md.push_str("## Discovery\n\n");
        for (path, count) in &summary.by_discovery {
            md.push_str(&format!("- **{}**: {}\n", path, count));
        }
        md.push('\n');
    }

    // Broken resources
    if !summary.broken.is_empty() {
        md.push_str("## Broken Resources\n\n");
        md.push_str("| Status | Type | URL | Found On |\n");
        md.push_str("|--------|------|-----|----------|\n");

        for broken in summary.broken.iter().take(MAX_BROKEN_LISTED) {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                broken.status_code,
                broken.resource_type,
                broken.url,
                broken.source_page_url.as_deref().unwrap_or("-")
            ));
        }
        if summary.broken.len() > MAX_BROKEN_LISTED {
            md.push_str(&format!(
                "\n... and {} more\n",
                summary.broken.len() - MAX_BROKEN_LISTED
            ));
        }
        md.push('\n');
    }

    md
}
