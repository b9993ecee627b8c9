//! Sitemap loading
//!
//! Supports XML `<urlset>` sitemaps, `<sitemapindex>` files whose children
//! are loaded in turn, and plain-text sitemaps with one URL per line.

use crate::url::is_http_url;
use crate::{AuditError, Result};
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use std::collections::{HashSet, VecDeque};
use url::Url;

/// How deep nested sitemap indexes are followed
const MAX_INDEX_DEPTH: usize = 3;

/// Source of page URLs for sitemap-seeded crawls
#[async_trait]
pub trait SitemapSource: Send + Sync {
    /// Loads every page URL listed by the sitemap at `url`
    async fn load(&self, url: &Url) -> Result<Vec<String>>;
}

/// Sitemap loader over HTTP
pub struct HttpSitemapLoader {
    client: Client,
}

impl HttpSitemapLoader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn fetch(&self, url: &Url) -> Result<String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| AuditError::Sitemap {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuditError::Sitemap {
                url: url.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        response.text().await.map_err(|e| AuditError::Sitemap {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl SitemapSource for HttpSitemapLoader {
    async fn load(&self, url: &Url) -> Result<Vec<String>> {
        let mut pending = VecDeque::from([(url.clone(), 0usize)]);
        let mut visited = HashSet::new();
        let mut pages = Vec::new();

        while let Some((sitemap_url, depth)) = pending.pop_front() {
            if !visited.insert(sitemap_url.to_string()) {
                continue;
            }

            let body = match self.fetch(&sitemap_url).await {
                Ok(body) => body,
                // Only the root sitemap is required to load
                Err(e) if depth > 0 => {
                    tracing::warn!("Skipping child sitemap: {}", e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let document = match parse_sitemap(&body) {
                Ok(document) => document,
                Err(e) if depth > 0 => {
                    tracing::warn!("Skipping child sitemap {}: {}", sitemap_url, e);
                    continue;
                }
                Err(e) => {
                    return Err(AuditError::Sitemap {
                        url: sitemap_url.to_string(),
                        message: format!("invalid XML: {}", e),
                    })
                }
            };

            match document {
                SitemapDocument::Index(children) => {
                    if depth >= MAX_INDEX_DEPTH {
                        tracing::warn!(
                            "Sitemap index {} nested deeper than {}, not following",
                            sitemap_url,
                            MAX_INDEX_DEPTH
                        );
                        continue;
                    }
                    tracing::debug!("Sitemap index {} lists {} sitemaps", sitemap_url, children.len());
                    for child in children {
                        match sitemap_url.join(&child) {
                            Ok(child_url) => pending.push_back((child_url, depth + 1)),
                            Err(e) => tracing::debug!("Bad child sitemap {}: {}", child, e),
                        }
                    }
                }
                SitemapDocument::Pages(urls) => {
                    tracing::debug!("Sitemap {} lists {} pages", sitemap_url, urls.len());
                    pages.extend(urls);
                }
            }
        }

        Ok(pages)
    }
}

/// Parsed sitemap body
#[derive(Debug, PartialEq, Eq)]
enum SitemapDocument {
    /// Locations of child sitemaps
    Index(Vec<String>),
    /// Page URLs
    Pages(Vec<String>),
}

/// Parses a sitemap body
///
/// Bodies starting with markup are read as XML; anything else is a plain-text
/// sitemap with one URL per line.
fn parse_sitemap(body: &str) -> std::result::Result<SitemapDocument, quick_xml::Error> {
    let body = body.trim_start_matches('\u{feff}').trim_start();
    if body.starts_with('<') {
        return parse_xml(body);
    }

    Ok(SitemapDocument::Pages(
        body.lines()
            .map(str::trim)
            .filter(|line| is_http_url(line))
            .map(String::from)
            .collect(),
    ))
}

/// Collects every `<loc>` of a `<urlset>` or `<sitemapindex>`
///
/// Location text may be entity-escaped or wrapped in CDATA. Namespace
/// prefixes are ignored.
fn parse_xml(xml: &str) -> std::result::Result<SitemapDocument, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut is_index = false;
    let mut current: Option<String> = None;
    let mut locations = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(start) => match start.local_name().as_ref() {
                b"sitemapindex" => is_index = true,
                b"loc" => current = Some(String::new()),
                _ => {}
            },
            Event::Text(text) => {
                if let Some(loc) = current.as_mut() {
                    loc.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(loc) = current.as_mut() {
                    loc.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::End(end) if end.local_name().as_ref() == b"loc" => {
                if let Some(loc) = current.take() {
                    let loc = loc.trim();
                    if !loc.is_empty() {
                        locations.push(loc.to_string());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(if is_index {
        SitemapDocument::Index(locations)
    } else {
        SitemapDocument::Pages(locations)
    })
}
