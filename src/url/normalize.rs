use crate::UrlError;
use url::Url;

/// Computes the unique key the traversal frontier deduplicates pages on
///
/// Two URLs with the same key are the same page for the purpose of deciding
/// whether it has already been enqueued. The key is never fetched; pages are
/// requested at the URL they were found with.
///
/// The parser already lowercases the scheme and host and resolves `.` and
/// `..` segments. On top of that the key:
/// - drops the fragment
/// - collapses repeated slashes and trims a trailing slash (the root stays `/`)
/// - drops `utm_*` campaign parameters
/// - sorts the remaining query pairs, and drops an empty query
///
/// # Examples
///
/// ```
/// use resource_audit::url::normalize_url;
///
/// let url = normalize_url("http://WWW.EXAMPLE.COM/page/?b=2&a=1#top").unwrap();
/// assert_eq!(url.as_str(), "http://www.example.com/page?a=1&b=2");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }
    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);

    let path = collapse_path(url.path());
    url.set_path(&path);

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !key.starts_with("utm_"))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if pairs.is_empty() {
        url.set_query(None);
    } else {
        pairs.sort();
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }

    Ok(url)
}

fn collapse_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}
