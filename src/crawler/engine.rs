//! Page engine interface
//!
//! The crawler never talks to a rendering engine directly. It opens pages
//! through a [`Browser`], drives each open page through a [`PageSession`],
//! and hears about the page's own network traffic through a
//! [`NetworkListener`] attached to the session.

use crate::state::ResourceType;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// HTTP method used for an out-of-page status probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMethod {
    Head,
    Get,
}

/// A response the engine received while the page was open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEvent {
    /// URL the engine requested
    pub url: String,
    /// Requesting context (document, image, script, ...)
    pub resource_type: ResourceType,
    pub status: u16,
}

/// A request the engine issued that never produced a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRequestEvent {
    pub url: String,
    pub resource_type: ResourceType,
    /// Engine-provided failure text, if any
    pub reason: Option<String>,
}

/// Receives network events for one open page
///
/// Callbacks run synchronously on the engine's request tasks, so an event is
/// fully handled before the engine reports the request as settled.
pub trait NetworkListener: Send + Sync {
    fn on_response(&self, event: &ResponseEvent);

    fn on_request_failed(&self, event: &FailedRequestEvent);
}

/// Opens pages
#[async_trait]
pub trait Browser: Send + Sync {
    /// Navigates to `url` and returns the open page
    ///
    /// # Returns
    ///
    /// * `Ok(page)` - The document loaded; sub-resource requests may still be in flight
    /// * `Err(AuditError::Navigation)` - The document itself could not be loaded
    async fn open(&self, url: &Url) -> Result<Box<dyn PageSession>>;
}

/// One open page
#[async_trait]
pub trait PageSession: Send + Sync {
    /// The URL the page was opened with
    fn url(&self) -> &Url;

    /// The URL relative references on the page resolve against
    ///
    /// Differs from [`url`](Self::url) after a redirect.
    fn base_url(&self) -> &Url;

    /// Attaches the page's network listener
    ///
    /// Events the page produced before a listener was attached are delivered
    /// to it immediately, in order. The listener stays attached until the
    /// page is closed.
    fn observe(&self, listener: Arc<dyn NetworkListener>);

    /// Current height of the scrollable document, in pixels
    async fn scroll_height(&self) -> u64;

    /// Scrolls the viewport down by `pixels`
    async fn scroll_by(&self, pixels: u64);

    /// Waits until no requests are in flight
    ///
    /// Returns `false` if the page was still busy when `timeout` elapsed.
    async fn wait_for_network_idle(&self, timeout: Duration) -> bool;

    /// Serialized markup of the page as it stands now
    async fn content(&self) -> String;

    /// Issues a request outside the page, sharing the page's cookies
    ///
    /// # Returns
    ///
    /// * `Ok(status)` - The HTTP status of the final response
    /// * `Err(_)` - No response was received
    async fn fetch(&self, url: &str, method: ProbeMethod) -> Result<u16>;

    /// Closes the page, detaching its listener and cancelling pending requests
    async fn close(&self);
}
