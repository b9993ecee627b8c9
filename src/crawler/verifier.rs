//! Resource status probes
//!
//! A HEAD request is tried first since it skips the body. Servers that
//! reject or mishandle HEAD get a second chance with GET.

use crate::crawler::engine::{PageSession, ProbeMethod};

/// Determines the HTTP status of `url` through the page's request context
///
/// # Returns
///
/// * The HEAD status when it is below 400
/// * The GET status when HEAD returned 400 or above
/// * `0` when no response was received (DNS failure, refused connection,
///   TLS failure or probe timeout)
pub async fn verify(page: &dyn PageSession, url: &str) -> u16 {
    let head = match page.fetch(url, ProbeMethod::Head).await {
        Ok(status) => status,
        Err(e) => {
            tracing::debug!("HEAD {} failed: {}", url, e);
            return 0;
        }
    };

    if head < 400 {
        return head;
    }

    match page.fetch(url, ProbeMethod::Get).await {
        Ok(status) => {
            tracing::debug!("HEAD {} returned {}, GET returned {}", url, head, status);
            status
        }
        Err(e) => {
            tracing::debug!("GET {} failed after HEAD {}: {}", url, head, e);
            0
        }
    }
}
