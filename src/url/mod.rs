//! URL handling module for Resource-Audit
//!
//! This module provides host extraction, same-hostname checks, the unique-key
//! normalization the traversal frontier deduplicates on, and the keyword
//! filter applied to sitemap seeds and enqueued links.

mod domain;
mod keyword;
mod normalize;

// Re-export main functions
pub use domain::{extract_domain, same_hostname};
pub use keyword::KeywordFilter;
pub use normalize::normalize_url;

/// Returns true if the string is an absolute HTTP(S) URL
///
/// # Examples
///
/// ```
/// use resource_audit::url::is_http_url;
///
/// assert!(is_http_url("https://example.com/a.png"));
/// assert!(is_http_url("HTTP://example.com/"));
/// assert!(!is_http_url("mailto:someone@example.com"));
/// assert!(!is_http_url("javascript:void(0)"));
/// assert!(!is_http_url("/relative/path"));
/// ```
pub fn is_http_url(candidate: &str) -> bool {
    match ::url::Url::parse(candidate) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}
