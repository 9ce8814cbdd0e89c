//! URL helpers for link resolution
//!
//! Listing pages mostly carry relative hrefs. They are resolved against the
//! site's configured base URL, never against the page they were found on,
//! because several legislature sites serve listings from paths that do not
//! match the link layout.

use url::Url;

/// Resolves a link href to an absolute HTTP(S) URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
///
/// # Example
///
/// ```
/// use statute_crawler::url::resolve_href;
/// use url::Url;
///
/// let base = Url::parse("https://codes.ohio.gov/ohio-revised-code/").unwrap();
/// assert_eq!(
///     resolve_href("chapter-101", &base).as_deref(),
///     Some("https://codes.ohio.gov/ohio-revised-code/chapter-101")
/// );
/// ```
pub fn resolve_href(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}

/// Returns the `robots.txt` URL for the origin of `url`
pub fn robots_url(url: &Url) -> Option<Url> {
    if url.host_str().is_none() {
        return None;
    }
    url.join("/robots.txt").ok()
}
