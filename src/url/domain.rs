use url::Url;

/// Returns the lowercase hostname of a URL, without the port
///
/// # Examples
///
/// ```
/// use url::Url;
/// use resource_audit::url::extract_domain;
///
/// let url = Url::parse("https://Blog.Example.com:8443/post").unwrap();
/// assert_eq!(extract_domain(&url), Some("blog.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_ascii_lowercase())
}

/// Checks whether two URLs share the same hostname
///
/// This decides which links a page may add to the frontier. Ports and
/// schemes are ignored; `www.example.com` and `example.com` are different
/// hostnames, and URLs without a host never match.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use resource_audit::url::same_hostname;
///
/// let page = Url::parse("https://example.com/blog").unwrap();
/// assert!(same_hostname(&page, &Url::parse("http://EXAMPLE.com:8080/about").unwrap()));
/// assert!(!same_hostname(&page, &Url::parse("https://cdn.example.com/a.js").unwrap()));
/// ```
pub fn same_hostname(a: &Url, b: &Url) -> bool {
    match (a.host_str(), b.host_str()) {
        (Some(x), Some(y)) => x.eq_ignore_ascii_case(y),
        _ => false,
    }
}
