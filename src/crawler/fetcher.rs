//! HTTP page engine
//!
//! This module implements the page engine over plain HTTP, including:
//! - Building the shared HTTP client with the configured user agent
//! - Loading page documents (following redirects)
//! - Requesting the sub-resources a browser would load eagerly
//! - Deferring lazy images and frames until the page is scrolled to the bottom
//! - Reporting every request's outcome to the attached network listener
//! - Status probes through the page's cookie-sharing client
//!
//! No script runs on these pages. Resources that only in-page code would
//! request are left to the structural scan.

use crate::config::{Config, CrawlerConfig, UserAgentConfig};
use crate::crawler::discovery::{document_base, resolve_reference};
use crate::crawler::engine::{
    Browser, FailedRequestEvent, NetworkListener, PageSession, ProbeMethod, ResponseEvent,
};
use crate::state::ResourceType;
use crate::{AuditError, Result};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `crawler` - Timeouts for page loads
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use resource_audit::config::{CrawlerConfig, UserAgentConfig};
/// use resource_audit::crawler::build_http_client;
///
/// let user_agent = UserAgentConfig {
///     crawler_name: "ResourceAudit".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&user_agent, &CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    crawler: &CrawlerConfig,
) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(crawler.navigation_timeout())
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Short failure text for a request that produced no response
pub fn describe_request_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "timed out".to_string()
    } else if error.is_connect() {
        "connection failed".to_string()
    } else if error.is_redirect() {
        "too many redirects".to_string()
    } else if error.is_builder() {
        "invalid request".to_string()
    } else {
        error.to_string()
    }
}

/// Page engine that loads documents over HTTP
pub struct HttpBrowser {
    client: Client,
    probe_timeout: Duration,
    viewport_height: u64,
}

impl HttpBrowser {
    /// Creates a browser from the crawler configuration
    pub fn new(config: &Config) -> Result<Self> {
        let client = build_http_client(&config.user_agent, &config.crawler)?;
        Ok(Self::with_client(client, &config.crawler))
    }

    /// Creates a browser around an existing client
    pub fn with_client(client: Client, crawler: &CrawlerConfig) -> Self {
        Self {
            client,
            probe_timeout: crawler.probe_timeout(),
            viewport_height: crawler.viewport_height_px,
        }
    }
}

#[async_trait]
impl Browser for HttpBrowser {
    async fn open(&self, url: &Url) -> Result<Box<dyn PageSession>> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| AuditError::Navigation {
                url: url.to_string(),
                message: describe_request_error(&e),
            })?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let html = response.text().await.map_err(|e| AuditError::Navigation {
            url: url.to_string(),
            message: format!("failed to read body: {}", describe_request_error(&e)),
        })?;

        tracing::debug!("Loaded {} (HTTP {}, {} bytes)", final_url, status, html.len());

        let requests = plan_requests(&html, &final_url);
        let page = HttpPage::new(
            url.clone(),
            final_url,
            html,
            self.client.clone(),
            self.probe_timeout,
            self.viewport_height,
        );

        page.shared.emit(NetworkEvent::Response(ResponseEvent {
            url: url.to_string(),
            resource_type: ResourceType::Document,
            status,
        }));

        let mut lazy = Vec::new();
        for request in requests {
            if request.lazy {
                lazy.push(request);
            } else {
                page.shared.spawn_request(request);
            }
        }
        if let Ok(mut deferred) = page.lazy.lock() {
            *deferred = lazy;
        }

        Ok(Box::new(page))
    }
}

/// A sub-resource request the page will issue
#[derive(Debug, Clone, PartialEq, Eq)]
struct PlannedRequest {
    url: Url,
    resource_type: ResourceType,
    lazy: bool,
}

/// Selectors for everything a browser fetches without running scripts
const EAGER_SOURCES: &[(&str, &str, ResourceType)] = &[
    ("img[src]", "src", ResourceType::Image),
    ("script[src]", "src", ResourceType::Script),
    ("link[rel~=\"stylesheet\"][href]", "href", ResourceType::Stylesheet),
    ("iframe[src]", "src", ResourceType::Document),
    ("video[src]", "src", ResourceType::Media),
    ("audio[src]", "src", ResourceType::Media),
    ("video source[src], audio source[src]", "src", ResourceType::Media),
    ("embed[src]", "src", ResourceType::Media),
    ("object[data]", "data", ResourceType::Object),
    ("video[poster]", "poster", ResourceType::Image),
];

/// Lists the sub-resource requests a browser would issue for `html`
///
/// Each URL is requested once per page, in document order of first
/// appearance.
fn plan_requests(html: &str, page_url: &Url) -> Vec<PlannedRequest> {
    let document = Html::parse_document(html);
    let base = document_base(&document, page_url);
    let mut seen = HashSet::new();
    let mut planned = Vec::new();

    for (selector, attr, resource_type) in EAGER_SOURCES {
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };

        for element in document.select(&selector) {
            if !element_loads(&element) {
                continue;
            }
            let Some(url) = element
                .value()
                .attr(attr)
                .and_then(|raw| resolve_reference(raw, &base))
            else {
                continue;
            };
            if !matches!(url.scheme(), "http" | "https") || !seen.insert(url.to_string()) {
                continue;
            }
            planned.push(PlannedRequest {
                url,
                resource_type: *resource_type,
                lazy: element.value().attr("loading") == Some("lazy"),
            });
        }
    }

    if let Ok(selector) = Selector::parse("link[rel~=\"preload\"][href]") {
        for element in document.select(&selector) {
            let Some(url) = element
                .value()
                .attr("href")
                .and_then(|raw| resolve_reference(raw, &base))
            else {
                continue;
            };
            if !matches!(url.scheme(), "http" | "https") || !seen.insert(url.to_string()) {
                continue;
            }
            planned.push(PlannedRequest {
                url,
                resource_type: preload_type(element.value().attr("as")),
                lazy: false,
            });
        }
    }

    planned
}

/// Media with `preload="none"` is not fetched until played
fn element_loads(element: &ElementRef<'_>) -> bool {
    let media = match element.value().name() {
        "video" | "audio" => Some(*element),
        "source" => element
            .parent()
            .and_then(ElementRef::wrap)
            .filter(|parent| matches!(parent.value().name(), "video" | "audio")),
        _ => None,
    };

    media.map_or(true, |m| m.value().attr("preload") != Some("none"))
}

fn preload_type(destination: Option<&str>) -> ResourceType {
    match destination {
        Some("font") => ResourceType::Font,
        Some("script") => ResourceType::Script,
        Some("style") => ResourceType::Stylesheet,
        Some("image") => ResourceType::Image,
        Some("fetch") => ResourceType::Fetch,
        Some("audio") | Some("video") | Some("track") => ResourceType::Media,
        Some("document") => ResourceType::Document,
        _ => ResourceType::Other,
    }
}

enum NetworkEvent {
    Response(ResponseEvent),
    Failed(FailedRequestEvent),
}

impl NetworkEvent {
    fn deliver(&self, listener: &dyn NetworkListener) {
        match self {
            Self::Response(event) => listener.on_response(event),
            Self::Failed(event) => listener.on_request_failed(event),
        }
    }
}

/// Listener slot; events wait in `buffered` until a listener is attached
#[derive(Default)]
struct EventHub {
    listener: Option<Arc<dyn NetworkListener>>,
    buffered: Vec<NetworkEvent>,
    closed: bool,
}

/// State shared between a page and its request tasks
struct PageShared {
    client: Client,
    hub: Mutex<EventHub>,
    in_flight: watch::Sender<usize>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl PageShared {
    fn emit(&self, event: NetworkEvent) {
        let Ok(mut hub) = self.hub.lock() else {
            return;
        };
        if hub.closed {
            return;
        }
        match hub.listener.clone() {
            Some(listener) => event.deliver(listener.as_ref()),
            None => hub.buffered.push(event),
        }
    }

    fn spawn_request(self: &Arc<Self>, request: PlannedRequest) {
        self.in_flight.send_modify(|n| *n += 1);

        let shared = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let url = request.url.to_string();
            let event = match shared.client.get(request.url).send().await {
                Ok(response) => NetworkEvent::Response(ResponseEvent {
                    url,
                    resource_type: request.resource_type,
                    status: response.status().as_u16(),
                }),
                Err(e) => NetworkEvent::Failed(FailedRequestEvent {
                    url,
                    resource_type: request.resource_type,
                    reason: Some(describe_request_error(&e)),
                }),
            };

            shared.emit(event);
            shared.in_flight.send_modify(|n| *n = n.saturating_sub(1));
        });

        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.retain(|task| !task.is_finished());
            tasks.push(handle);
        }
    }
}

/// A page loaded by [`HttpBrowser`]
pub struct HttpPage {
    url: Url,
    final_url: Url,
    html: String,
    shared: Arc<PageShared>,
    lazy: Mutex<Vec<PlannedRequest>>,
    scrolled: Mutex<u64>,
    viewport_height: u64,
    probe_timeout: Duration,
}

impl HttpPage {
    fn new(
        url: Url,
        final_url: Url,
        html: String,
        client: Client,
        probe_timeout: Duration,
        viewport_height: u64,
    ) -> Self {
        let (in_flight, _) = watch::channel(0usize);
        Self {
            url,
            final_url,
            html,
            shared: Arc::new(PageShared {
                client,
                hub: Mutex::new(EventHub::default()),
                in_flight,
                tasks: Mutex::new(Vec::new()),
            }),
            lazy: Mutex::new(Vec::new()),
            scrolled: Mutex::new(0),
            viewport_height,
            probe_timeout,
        }
    }

    fn release_lazy_requests(&self) {
        let deferred = match self.lazy.lock() {
            Ok(mut lazy) => std::mem::take(&mut *lazy),
            Err(_) => return,
        };
        if !deferred.is_empty() {
            tracing::debug!("Loading {} lazy resources on {}", deferred.len(), self.url);
        }
        for request in deferred {
            self.shared.spawn_request(request);
        }
    }
}

#[async_trait]
impl PageSession for HttpPage {
    fn url(&self) -> &Url {
        &self.url
    }

    fn base_url(&self) -> &Url {
        &self.final_url
    }

    fn observe(&self, listener: Arc<dyn NetworkListener>) {
        let Ok(mut hub) = self.shared.hub.lock() else {
            return;
        };
        if hub.closed {
            return;
        }
        for event in std::mem::take(&mut hub.buffered) {
            event.deliver(listener.as_ref());
        }
        hub.listener = Some(listener);
    }

    async fn scroll_height(&self) -> u64 {
        self.viewport_height
    }

    async fn scroll_by(&self, pixels: u64) {
        let reached_bottom = match self.scrolled.lock() {
            Ok(mut scrolled) => {
                *scrolled = scrolled.saturating_add(pixels);
                *scrolled >= self.viewport_height
            }
            Err(_) => false,
        };
        if reached_bottom {
            self.release_lazy_requests();
        }
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> bool {
        let mut in_flight = self.shared.in_flight.subscribe();
        tokio::time::timeout(timeout, in_flight.wait_for(|n| *n == 0))
            .await
            .map(|idle| idle.is_ok())
            .unwrap_or(false)
    }

    async fn content(&self) -> String {
        self.html.clone()
    }

    async fn fetch(&self, url: &str, method: ProbeMethod) -> Result<u16> {
        let request = match method {
            ProbeMethod::Head => self.shared.client.head(url),
            ProbeMethod::Get => self.shared.client.get(url),
        };

        let response = request
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|source| AuditError::Http {
                url: url.to_string(),
                source,
            })?;

        Ok(response.status().as_u16())
    }

    async fn close(&self) {
        if let Ok(mut hub) = self.shared.hub.lock() {
            hub.closed = true;
            hub.listener = None;
            hub.buffered.clear();
        }
        if let Ok(mut tasks) = self.shared.tasks.lock() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "TestCrawler".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }

    fn base() -> Url {
        Url::parse("https://example.com/docs/index.html").unwrap()
    }

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&create_test_config(), &CrawlerConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_plan_eager_requests() {
        let html = r#"
            <html><head>
              <link rel="stylesheet" href="/site.css">
              <script src="app.js"></script>
            </head><body>
              <img src="logo.png">
              <iframe src="https://video.example.net/embed/1"></iframe>
              <a href="/not-requested">link</a>
            </body></html>
        "#;

        let planned = plan_requests(html, &base());
        let urls: Vec<_> = planned.iter().map(|p| p.url.as_str()).collect();

        assert_eq!(
            urls,
            vec![
                "https://example.com/docs/logo.png",
                "https://example.com/docs/app.js",
                "https://example.com/site.css",
                "https://video.example.net/embed/1",
            ]
        );
        assert!(planned.iter().all(|p| !p.lazy));
        assert_eq!(planned[3].resource_type, ResourceType::Document);
    }

    #[test]
    fn test_lazy_images_are_deferred() {
        let html = r#"<img src="/a.png"><img src="/b.png" loading="lazy">"#;
        let planned = plan_requests(html, &base());

        assert_eq!(planned.len(), 2);
        assert!(!planned[0].lazy);
        assert!(planned[1].lazy);
    }

    #[test]
    fn test_preload_none_media_not_requested() {
        let html = r#"
            <video src="/intro.mp4" preload="none"></video>
            <audio preload="auto"><source src="/theme.ogg"></audio>
        "#;
        let planned = plan_requests(html, &base());

        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].url.as_str(), "https://example.com/theme.ogg");
        assert_eq!(planned[0].resource_type, ResourceType::Media);
    }

    #[test]
    fn test_same_url_requested_once() {
        let html = r#"<img src="/a.png"><img src="/a.png"><script src="/a.png"></script>"#;
        let planned = plan_requests(html, &base());
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].resource_type, ResourceType::Image);
    }

    #[test]
    fn test_preload_types() {
        let html = r#"
            <link rel="preload" href="/font.woff2" as="font">
            <link rel="preload" href="/data.json" as="fetch">
            <link rel="preload" href="/thing">
        "#;
        let planned = plan_requests(html, &base());
        let types: Vec<_> = planned.iter().map(|p| p.resource_type).collect();
        assert_eq!(
            types,
            vec![ResourceType::Font, ResourceType::Fetch, ResourceType::Other]
        );
    }

    #[test]
    fn test_non_http_sources_skipped() {
        let html = r#"<img src="data:image/png;base64,AAAA"><script src="javascript:void(0)"></script>"#;
        assert!(plan_requests(html, &base()).is_empty());
    }
}
