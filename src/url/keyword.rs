use crate::UrlError;
use regex::{Regex, RegexBuilder};
use std::fmt;

/// Case-insensitive URL filter built from a user-supplied keyword
///
/// The keyword is treated as a regular expression so callers can pass
/// patterns such as `blog|news`. A keyword that is not a valid pattern is
/// matched as a literal substring instead of being rejected, so a value like
/// `c++` still filters the way a user would expect.
///
/// # Examples
///
/// ```
/// use resource_audit::url::KeywordFilter;
///
/// let filter = KeywordFilter::new("Blog").unwrap();
/// assert!(filter.matches("https://example.com/blog/post-1"));
/// assert!(!filter.matches("https://example.com/about"));
/// ```
#[derive(Clone)]
pub struct KeywordFilter {
    keyword: String,
    pattern: Regex,
}

impl KeywordFilter {
    /// Builds a filter from a keyword
    ///
    /// # Returns
    ///
    /// * `Ok(KeywordFilter)` - Filter ready to use
    /// * `Err(UrlError::InvalidPattern)` - The keyword was empty or could not be compiled
    pub fn new(keyword: &str) -> Result<Self, UrlError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(UrlError::InvalidPattern(
                "keyword cannot be empty".to_string(),
            ));
        }

        let pattern = match build_case_insensitive(keyword) {
            Ok(pattern) => pattern,
            Err(_) => build_case_insensitive(&regex::escape(keyword))
                .map_err(|e| UrlError::InvalidPattern(e.to_string()))?,
        };

        Ok(Self {
            keyword: keyword.to_string(),
            pattern,
        })
    }

    /// Builds a filter from an optional keyword, treating blank input as "no filter"
    pub fn from_optional(keyword: Option<&str>) -> Result<Option<Self>, UrlError> {
        match keyword.map(str::trim) {
            Some(k) if !k.is_empty() => Self::new(k).map(Some),
            _ => Ok(None),
        }
    }

    /// Returns true if the URL matches the keyword
    pub fn matches(&self, url: &str) -> bool {
        self.pattern.is_match(url)
    }

    /// The keyword as supplied (trimmed)
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Keeps the URLs that match, preserving order
    pub fn filter_urls(&self, urls: Vec<String>) -> Vec<String> {
        urls.into_iter().filter(|u| self.matches(u)).collect()
    }
}

fn build_case_insensitive(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

impl fmt::Debug for KeywordFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("KeywordFilter").field(&self.keyword).finish()
    }
}

impl fmt::Display for KeywordFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.keyword)
    }
}
