use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Resource-Audit
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Default page budget when a crawl request does not name one
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: usize,

    /// Maximum number of page visits processed in parallel
    #[serde(rename = "max-concurrent-pages", default = "default_max_concurrent_pages")]
    pub max_concurrent_pages: usize,

    /// Timeout for loading a page document (seconds)
    #[serde(rename = "navigation-timeout-secs", default = "default_timeout_secs")]
    pub navigation_timeout_secs: u64,

    /// Upper bound on the wait for a page's network activity to settle (seconds)
    #[serde(rename = "network-idle-timeout-secs", default = "default_timeout_secs")]
    pub network_idle_timeout_secs: u64,

    /// Timeout for a single HEAD or GET verification probe (seconds)
    #[serde(rename = "probe-timeout-secs", default = "default_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// How many times a page whose navigation failed is retried
    #[serde(rename = "navigation-retries", default = "default_navigation_retries")]
    pub navigation_retries: u32,

    /// Scroll increment used to trigger lazy-loaded content (pixels)
    #[serde(rename = "scroll-step-px", default = "default_scroll_step_px")]
    pub scroll_step_px: u64,

    /// Maximum number of scroll increments per page
    #[serde(rename = "max-scroll-steps", default = "default_max_scroll_steps")]
    pub max_scroll_steps: u32,

    /// Time cap for the whole scroll loop (seconds)
    #[serde(rename = "scroll-timeout-secs", default = "default_timeout_secs")]
    pub scroll_timeout_secs: u64,

    /// Height of the simulated viewport (pixels)
    #[serde(rename = "viewport-height-px", default = "default_viewport_height_px")]
    pub viewport_height_px: u64,
}

impl CrawlerConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn network_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.network_idle_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn scroll_timeout(&self) -> Duration {
        Duration::from_secs(self.scroll_timeout_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            max_concurrent_pages: default_max_concurrent_pages(),
            navigation_timeout_secs: default_timeout_secs(),
            network_idle_timeout_secs: default_timeout_secs(),
            probe_timeout_secs: default_timeout_secs(),
            navigation_retries: default_navigation_retries(),
            scroll_step_px: default_scroll_step_px(),
            max_scroll_steps: default_max_scroll_steps(),
            scroll_timeout_secs: default_timeout_secs(),
            viewport_height_px: default_viewport_height_px(),
        }
    }
}

fn default_max_pages() -> usize {
    100
}

fn default_max_concurrent_pages() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_navigation_retries() -> u32 {
    3
}

fn default_scroll_step_px() -> u64 {
    100
}

fn default_max_scroll_steps() -> u32 {
    500
}

fn default_viewport_height_px() -> u64 {
    800
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the user agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Default path for markdown crawl reports
    #[serde(rename = "report-path")]
    pub report_path: String,
}
