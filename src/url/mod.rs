//! URL handling module for Status-Crawler
//!
//! This module builds status page URLs from input identifiers and classifies
//! redirect targets returned by the status site.

mod redirect;

use url::Url;

pub use redirect::{classify_redirect, resolve_location, RedirectTarget};

/// Builds the status page URL for an identifier
///
/// The URL has the shape `<base>/<handle>/status/<id>`. The handle is a path
/// segment and is percent-encoded as needed. An absent or empty handle is
/// replaced with `default_handle`, so this never fails.
///
/// # Examples
///
/// ```
/// use status_crawler::url::build_url;
/// use url::Url;
///
/// let base = Url::parse("https://twitter.com").unwrap();
/// let url = build_url(&base, 42, Some("abc"), "a");
/// assert_eq!(url.as_str(), "https://twitter.com/abc/status/42");
/// ```
pub fn build_url(base: &Url, id: u64, handle: Option<&str>, default_handle: &str) -> Url {
    let handle = match handle {
        Some(h) if !h.is_empty() => h,
        _ => default_handle,
    };

    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    if let Ok(mut segments) = url.path_segments_mut() {
        segments
            .pop_if_empty()
            .push(handle)
            .push("status")
            .push(&id.to_string());
    }
    url
}
