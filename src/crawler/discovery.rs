//! Structural discovery and the passive/structural merge
//!
//! This module handles scanning settled page markup for:
//! - Resource candidates (links, images, media, scripts, stylesheets, embeds)
//! - Same-page links to hand to the traversal frontier
//!
//! and the per-visit capture set that decides which structural candidates
//! still need a status probe.

use crate::state::ResourceType;
use crate::url::is_http_url;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::Mutex;
use url::Url;

/// Element selectors scanned on every page, with the attribute holding the
/// URL and the type recorded for it
const STRUCTURAL_SOURCES: &[(&str, &str, ResourceType)] = &[
    ("a[href]", "href", ResourceType::Link),
    ("img[src]", "src", ResourceType::Image),
    ("video[src], audio[src], source[src]", "src", ResourceType::Media),
    ("script[src]", "src", ResourceType::Script),
    ("link[rel=\"stylesheet\"]", "href", ResourceType::Stylesheet),
    ("object[data]", "data", ResourceType::Object),
    ("embed[src]", "src", ResourceType::Media),
];

/// A resource found in page markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Absolute URL (may be a non-HTTP scheme such as `mailto:`)
    pub url: String,
    pub resource_type: ResourceType,
}

/// Scans page markup for resource candidates
///
/// Relative references resolve against the document base (`<base href>` if
/// present, otherwise `page_url`). Candidates are deduplicated by URL; the
/// first occurrence, in selector order, keeps its type. Empty and
/// fragment-only references are not candidates.
///
/// # Arguments
///
/// * `html` - The page markup
/// * `page_url` - The URL the page was loaded from
///
/// # Example
///
/// ```
/// use resource_audit::crawler::scan_structure;
/// use resource_audit::ResourceType;
/// use url::Url;
///
/// let page = Url::parse("https://example.com/").unwrap();
/// let found = scan_structure(r#"<a href="/logo.png">x</a><img src="/logo.png">"#, &page);
/// assert_eq!(found.len(), 1);
/// assert_eq!(found[0].resource_type, ResourceType::Link);
/// ```
pub fn scan_structure(html: &str, page_url: &Url) -> Vec<Candidate> {
    let document = Html::parse_document(html);
    let base = document_base(&document, page_url);
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for (selector, attr, resource_type) in STRUCTURAL_SOURCES {
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };

        for element in document.select(&selector) {
            let Some(url) = element
                .value()
                .attr(attr)
                .and_then(|raw| resolve_reference(raw, &base))
            else {
                continue;
            };

            let url = url.to_string();
            if seen.insert(url.clone()) {
                candidates.push(Candidate {
                    url,
                    resource_type: *resource_type,
                });
            }
        }
    }

    candidates
}

/// Extracts the HTTP(S) hyperlinks on a page, fragments removed
///
/// Order of first appearance is preserved; duplicates are kept for the
/// frontier to discard.
pub fn extract_links(html: &str, page_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let base = document_base(&document, page_url);
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            let Some(mut url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_reference(href, &base))
            else {
                continue;
            };

            if url.scheme() == "http" || url.scheme() == "https" {
                url.set_fragment(None);
                links.push(url);
            }
        }
    }

    links
}

/// Returns the URL relative references on the page resolve against
pub(crate) fn document_base(document: &Html, page_url: &Url) -> Url {
    Selector::parse("base[href]")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .and_then(|element| element.value().attr("href"))
                .and_then(|href| page_url.join(href.trim()).ok())
        })
        .unwrap_or_else(|| page_url.clone())
}

/// Resolves a raw attribute value to an absolute URL
///
/// Returns None for empty values, fragment-only references and values that
/// cannot be resolved.
pub(crate) fn resolve_reference(raw: &str, base: &Url) -> Option<Url> {
    let raw = raw.trim();

    if raw.is_empty() || raw.starts_with('#') {
        return None;
    }

    base.join(raw).ok()
}

/// URLs the page's own requests produced during one visit
#[derive(Debug, Default)]
pub struct CaptureSet {
    urls: Mutex<HashSet<String>>,
}

impl CaptureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, url: &str) {
        if let Ok(mut urls) = self.urls.lock() {
            urls.insert(url.to_string());
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls
            .lock()
            .map(|urls| urls.contains(url))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.urls.lock().map(|urls| urls.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decides whether a structural candidate still needs a status probe
///
/// Non-HTTP(S) candidates are never probed. A candidate whose URL the page
/// already requested is covered by the passive record and is skipped.
pub fn needs_probe(candidate: &Candidate, captured: &CaptureSet) -> bool {
    is_http_url(&candidate.url) && !captured.contains(&candidate.url)
}
