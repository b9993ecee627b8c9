//! Per-page visit handling
//!
//! For every admitted page the handler:
//! 1. Attaches a passive capture listener that records each response and
//!    failed request the page produces
//! 2. Scrolls to the bottom to trigger lazy content, then waits for the
//!    network to settle
//! 3. Enqueues same-hostname links under the budget and keyword filter
//! 4. Scans the settled markup and probes every HTTP(S) candidate the page
//!    did not already request

use crate::config::CrawlerConfig;
use crate::crawler::discovery::{needs_probe, scan_structure, CaptureSet};
use crate::crawler::engine::{FailedRequestEvent, NetworkListener, PageSession, ResponseEvent};
use crate::crawler::recorder::CrawlRecorder;
use crate::crawler::scheduler::PageRequest;
use crate::crawler::traversal::{PageHandler, VisitContext};
use crate::crawler::verifier::verify;
use crate::state::DiscoveryPath;
use crate::storage::{best_effort, NewResource};
use crate::url::KeywordFilter;
use crate::{AuditError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// How long a page is given to settle before it is scanned
#[derive(Debug, Clone)]
pub struct SettleOptions {
    pub scroll_step_px: u64,
    pub max_scroll_steps: u32,
    /// Pause between scroll steps
    pub scroll_interval: Duration,
    pub scroll_timeout: Duration,
    pub network_idle_timeout: Duration,
}

impl SettleOptions {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            scroll_step_px: config.scroll_step_px.max(1),
            max_scroll_steps: config.max_scroll_steps,
            scroll_interval: Duration::from_millis(100),
            scroll_timeout: config.scroll_timeout(),
            network_idle_timeout: config.network_idle_timeout(),
        }
    }
}

impl Default for SettleOptions {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}

/// Records what a page requests while it is open
struct PassiveCapture {
    recorder: CrawlRecorder,
    source_page: String,
    captured: Arc<CaptureSet>,
}

impl NetworkListener for PassiveCapture {
    fn on_response(&self, event: &ResponseEvent) {
        self.captured.insert(&event.url);
        tracing::debug!("{} {} ({})", event.status, event.url, event.resource_type);

        let resource = NewResource::observed(
            event.url.clone(),
            event.resource_type,
            event.status,
            &self.source_page,
            DiscoveryPath::Passive,
        );
        best_effort("record resource", self.recorder.resource(&resource));
    }

    fn on_request_failed(&self, event: &FailedRequestEvent) {
        self.captured.insert(&event.url);

        let resource = NewResource::observed(
            event.url.clone(),
            event.resource_type,
            0,
            &self.source_page,
            DiscoveryPath::Passive,
        );
        if self.recorder.resource(&resource).is_ok() {
            self.recorder.log(format!(
                "Resource failed: {} ({})",
                event.url,
                event.reason.as_deref().unwrap_or("unknown")
            ));
        }
    }
}

/// Page handler that audits every resource a page uses
pub struct PageVisitHandler {
    recorder: CrawlRecorder,
    keyword: Option<KeywordFilter>,
    settle: SettleOptions,
}

impl PageVisitHandler {
    pub fn new(recorder: CrawlRecorder, keyword: Option<KeywordFilter>, settle: SettleOptions) -> Self {
        Self {
            recorder,
            keyword,
            settle,
        }
    }

    /// Scrolls until the bottom is reached and the page stops growing
    async fn trigger_lazy_content(&self, page: &dyn PageSession) {
        let step = self.settle.scroll_step_px;
        let scroll = async {
            let mut scrolled = 0u64;
            let mut last_height = page.scroll_height().await;

            for _ in 0..self.settle.max_scroll_steps {
                page.scroll_by(step).await;
                scrolled = scrolled.saturating_add(step);

                let height = page.scroll_height().await;
                if scrolled >= height && height == last_height {
                    break;
                }
                last_height = height;

                if !self.settle.scroll_interval.is_zero() {
                    tokio::time::sleep(self.settle.scroll_interval).await;
                }
            }
        };

        if tokio::time::timeout(self.settle.scroll_timeout, scroll)
            .await
            .is_err()
        {
            tracing::warn!(
                "Stopped scrolling {} after {}s",
                page.url(),
                self.settle.scroll_timeout.as_secs()
            );
        }
    }
}

#[async_trait]
impl PageHandler for PageVisitHandler {
    async fn handle_page(
        &self,
        page: &dyn PageSession,
        request: &PageRequest,
        context: &VisitContext,
    ) -> Result<()> {
        let page_url = request.as_str().to_string();
        tracing::info!("Processing {}", page_url);
        self.recorder.log(format!("Processing {}", page_url));

        let captured = Arc::new(CaptureSet::new());
        page.observe(Arc::new(PassiveCapture {
            recorder: self.recorder.clone(),
            source_page: page_url.clone(),
            captured: Arc::clone(&captured),
        }));

        self.trigger_lazy_content(page).await;

        if !page
            .wait_for_network_idle(self.settle.network_idle_timeout)
            .await
        {
            tracing::debug!("Network still busy on {}, continuing", page_url);
        }

        if let Some(filter) = &self.keyword {
            self.recorder
                .log(format!("Filtering links by keyword: {}", filter.keyword()));
        }
        let enqueued = context.enqueue_links(page, self.keyword.as_ref()).await;
        if enqueued > 0 {
            self.recorder
                .log(format!("Found {} new pages to crawl.", enqueued));
        }

        let html = page.content().await;
        let candidates = scan_structure(&html, page.base_url());
        self.recorder.log(format!(
            "Checking status of {} resources found on page...",
            candidates.len()
        ));

        for candidate in candidates {
            if !needs_probe(&candidate, &captured) {
                continue;
            }

            let status = verify(page, &candidate.url).await;
            let resource = NewResource::observed(
                candidate.url,
                candidate.resource_type,
                status,
                &page_url,
                DiscoveryPath::Structural,
            );
            best_effort("record resource", self.recorder.resource(&resource));
        }

        tracing::debug!(
            "Finished {} ({} requests captured)",
            page_url,
            captured.len()
        );
        Ok(())
    }

    async fn handle_failure(&self, request: &PageRequest, error: &AuditError) {
        let url = request.as_str();
        tracing::error!("Request {} failed: {}", url, error);
        self.recorder.log(format!("Failed to process {}", url));
        best_effort(
            "record failed page",
            self.recorder.resource(&NewResource::failed_page(url)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::engine::ProbeMethod;
    use crate::crawler::scheduler::Frontier;
    use crate::state::ResourceType;
    use crate::storage::{share, with_ledger, ResourceRecord, SharedLedger, SqliteLedger};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use url::Url;

    /// A page that replays scripted network events and probe answers
    struct ScriptedPage {
        url: Url,
        html: String,
        passive: Vec<ResponseEvent>,
        failures: Vec<FailedRequestEvent>,
        probes: HashMap<String, u16>,
        probed: Mutex<Vec<String>>,
        scrolls: Mutex<u32>,
        height: u64,
    }

    impl ScriptedPage {
        fn new(html: &str) -> Self {
            Self {
                url: Url::parse("https://example.com/").unwrap(),
                html: html.to_string(),
                passive: Vec::new(),
                failures: Vec::new(),
                probes: HashMap::new(),
                probed: Mutex::new(Vec::new()),
                scrolls: Mutex::new(0),
                height: 300,
            }
        }
    }

    #[async_trait]
    impl PageSession for ScriptedPage {
        fn url(&self) -> &Url {
            &self.url
        }
        fn base_url(&self) -> &Url {
            &self.url
        }
        fn observe(&self, listener: Arc<dyn NetworkListener>) {
            for event in &self.passive {
                listener.on_response(event);
            }
            for event in &self.failures {
                listener.on_request_failed(event);
            }
        }
        async fn scroll_height(&self) -> u64 {
            self.height
        }
        async fn scroll_by(&self, _pixels: u64) {
            *self.scrolls.lock().unwrap() += 1;
        }
        async fn wait_for_network_idle(&self, _timeout: Duration) -> bool {
            true
        }
        async fn content(&self) -> String {
            self.html.clone()
        }
        async fn fetch(&self, url: &str, method: ProbeMethod) -> Result<u16> {
            if method == ProbeMethod::Head {
                self.probed.lock().unwrap().push(url.to_string());
            }
            self.probes
                .get(url)
                .copied()
                .ok_or_else(|| AuditError::Navigation {
                    url: url.to_string(),
                    message: "connection failed".to_string(),
                })
        }
        async fn close(&self) {}
    }

    fn fast_settle() -> SettleOptions {
        SettleOptions {
            scroll_step_px: 100,
            max_scroll_steps: 50,
            scroll_interval: Duration::ZERO,
            scroll_timeout: Duration::from_secs(5),
            network_idle_timeout: Duration::from_secs(5),
        }
    }

    fn setup(keyword: Option<&str>) -> (SharedLedger, PageVisitHandler) {
        let ledger = share(SqliteLedger::new_in_memory().unwrap());
        let crawl_id = with_ledger(&ledger, |l| l.create_crawl("https://example.com/")).unwrap();
        let keyword = keyword.map(|k| KeywordFilter::new(k).unwrap());
        let handler = PageVisitHandler::new(
            CrawlRecorder::new(ledger.clone(), crawl_id),
            keyword,
            fast_settle(),
        );
        (ledger, handler)
    }

    fn resources(ledger: &SharedLedger) -> Vec<ResourceRecord> {
        with_ledger(ledger, |l| l.get_resources(1)).unwrap()
    }

    fn logs(ledger: &SharedLedger) -> Vec<String> {
        with_ledger(ledger, |l| l.get_logs(1))
            .unwrap()
            .into_iter()
            .map(|l| l.message)
            .collect()
    }

    fn context() -> VisitContext {
        VisitContext::new(Arc::new(Frontier::new(10)))
    }

    fn request() -> PageRequest {
        PageRequest::parse("https://example.com/").unwrap()
    }

    #[tokio::test]
    async fn test_passive_capture_suppresses_structural_probe() {
        let (ledger, handler) = setup(None);
        let mut page = ScriptedPage::new(
            r#"<img src="/logo.png"><script src="/app.js"></script>"#,
        );
        page.passive.push(ResponseEvent {
            url: "https://example.com/logo.png".to_string(),
            resource_type: ResourceType::Image,
            status: 200,
        });
        page.probes
            .insert("https://example.com/app.js".to_string(), 200);

        handler.handle_page(&page, &request(), &context()).await.unwrap();

        assert_eq!(
            *page.probed.lock().unwrap(),
            vec!["https://example.com/app.js".to_string()]
        );
        let rows = resources(&ledger);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].discovered_via, DiscoveryPath::Passive);
        assert_eq!(rows[1].discovered_via, DiscoveryPath::Structural);
        assert_eq!(rows[1].resource_type, ResourceType::Script);
        assert!(rows
            .iter()
            .all(|r| r.source_page_url.as_deref() == Some("https://example.com/")));
    }

    #[tokio::test]
    async fn test_passive_duplicates_all_recorded() {
        let (ledger, handler) = setup(None);
        let mut page = ScriptedPage::new("");
        for _ in 0..2 {
            page.passive.push(ResponseEvent {
                url: "https://example.com/poll".to_string(),
                resource_type: ResourceType::Fetch,
                status: 200,
            });
        }

        handler.handle_page(&page, &request(), &context()).await.unwrap();
        assert_eq!(resources(&ledger).len(), 2);
    }

    #[tokio::test]
    async fn test_failed_request_recorded_and_logged() {
        let (ledger, handler) = setup(None);
        let mut page = ScriptedPage::new("");
        page.failures.push(FailedRequestEvent {
            url: "https://cdn.example.net/font.woff2".to_string(),
            resource_type: ResourceType::Font,
            reason: None,
        });

        handler.handle_page(&page, &request(), &context()).await.unwrap();

        let rows = resources(&ledger);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status_code, 0);
        assert!(logs(&ledger)
            .contains(&"Resource failed: https://cdn.example.net/font.woff2 (unknown)".to_string()));
    }

    #[tokio::test]
    async fn test_unreachable_candidate_recorded_as_zero() {
        let (ledger, handler) = setup(None);
        let page = ScriptedPage::new(r#"<img src="https://gone.invalid/x.png">"#);

        handler.handle_page(&page, &request(), &context()).await.unwrap();

        let rows = resources(&ledger);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status_code, 0);
        assert_eq!(rows[0].resource_type, ResourceType::Image);
    }

    #[tokio::test]
    async fn test_progress_log_sequence() {
        let (ledger, handler) = setup(Some("docs"));
        let mut page = ScriptedPage::new(
            r#"<a href="/docs/a">a</a><a href="/blog">b</a><a href="mailto:x@example.com">m</a>"#,
        );
        page.probes
            .insert("https://example.com/docs/a".to_string(), 200);
        page.probes.insert("https://example.com/blog".to_string(), 404);

        handler.handle_page(&page, &request(), &context()).await.unwrap();

        assert_eq!(
            logs(&ledger),
            vec![
                "Processing https://example.com/".to_string(),
                "Filtering links by keyword: docs".to_string(),
                "Found 1 new pages to crawl.".to_string(),
                "Checking status of 3 resources found on page...".to_string(),
            ]
        );
        assert_eq!(resources(&ledger).len(), 2);
    }

    #[tokio::test]
    async fn test_no_new_pages_no_found_log() {
        let (ledger, handler) = setup(None);
        let page = ScriptedPage::new("<p>nothing here</p>");

        handler.handle_page(&page, &request(), &context()).await.unwrap();

        assert!(!logs(&ledger).iter().any(|m| m.starts_with("Found")));
    }

    #[tokio::test]
    async fn test_scrolls_until_bottom() {
        let (_, handler) = setup(None);
        let page = ScriptedPage::new("");

        handler.handle_page(&page, &request(), &context()).await.unwrap();
        assert_eq!(*page.scrolls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_failure_writes_document_row() {
        let (ledger, handler) = setup(None);
        let request = PageRequest::parse("https://example.com/broken").unwrap();
        let error = AuditError::Navigation {
            url: request.url.to_string(),
            message: "connection failed".to_string(),
        };

        handler.handle_failure(&request, &error).await;

        let rows = resources(&ledger);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].url, "https://example.com/broken");
        assert_eq!(rows[0].resource_type, ResourceType::Document);
        assert_eq!(rows[0].status_code, 0);
        assert_eq!(
            rows[0].source_page_url.as_deref(),
            Some("https://example.com/broken")
        );
        assert_eq!(
            logs(&ledger),
            vec!["Failed to process https://example.com/broken".to_string()]
        );
    }

    #[tokio::test]
    async fn test_rows_name_page_as_requested() {
        let (ledger, handler) = setup(None);
        let mut page = ScriptedPage::new("");
        page.passive.push(ResponseEvent {
            url: "https://example.com/".to_string(),
            resource_type: ResourceType::Document,
            status: 200,
        });
        let request = PageRequest::parse("https://example.com").unwrap();

        handler
            .handle_page(&page, &request, &context())
            .await
            .unwrap();

        let rows = resources(&ledger);
        assert_eq!(rows[0].url, "https://example.com/");
        assert_eq!(rows[0].source_page_url.as_deref(), Some("https://example.com"));
        assert_eq!(logs(&ledger)[0], "Processing https://example.com");
    }

    #[tokio::test]
    async fn test_failure_row_uses_url_as_requested() {
        let (ledger, handler) = setup(None);
        let request = PageRequest::parse("http://127.0.0.1:9").unwrap();
        let error = AuditError::Navigation {
            url: request.url.to_string(),
            message: "connection refused".to_string(),
        };

        handler.handle_failure(&request, &error).await;

        let rows = resources(&ledger);
        assert_eq!(rows[0].url, "http://127.0.0.1:9");
        assert_eq!(rows[0].source_page_url.as_deref(), Some("http://127.0.0.1:9"));
    }

    #[tokio::test]
    async fn test_failure_for_unknown_crawl_does_not_panic() {
        let ledger = share(SqliteLedger::new_in_memory().unwrap());
        let handler = PageVisitHandler::new(
            CrawlRecorder::new(ledger.clone(), 404),
            None,
            fast_settle(),
        );
        let request = PageRequest::parse("https://example.com/broken").unwrap();
        let error = AuditError::Navigation {
            url: request.url.to_string(),
            message: "connection failed".to_string(),
        };

        handler.handle_failure(&request, &error).await;

        assert!(with_ledger(&ledger, |l| l.get_resources(404))
            .unwrap()
            .is_empty());
    }
}
