/// Crawl request definitions
///
/// A request is immutable for the lifetime of one attempt. Retries and
/// redirect hops produce new values that share the identifier and raw line.
use std::sync::Arc;
use url::Url;

/// One attempt to fetch the status page of an identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    /// Status identifier requested by the input line
    pub id: u64,

    /// Author handle used to build the first URL
    pub handle: String,

    /// URL fetched by this attempt
    pub url: Url,

    /// Number of retries that preceded this attempt
    pub attempt: u32,

    /// Number of redirect hops that preceded this attempt
    pub redirects: u32,

    /// Whether 301/302 responses are followed
    pub follow_redirects: bool,

    /// Original input line, written verbatim to the repair output
    pub line: Arc<str>,
}

impl CrawlRequest {
    /// Creates the first attempt for an input line
    pub fn new(id: u64, handle: String, url: Url, follow_redirects: bool, line: &str) -> Self {
        Self {
            id,
            handle,
            url,
            attempt: 0,
            redirects: 0,
            follow_redirects,
            line: Arc::from(line),
        }
    }

    /// Returns the request for the next retry: same URL, attempt count + 1
    pub fn next_attempt(&self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self.clone()
        }
    }

    /// Returns the request following a redirect hop
    ///
    /// The attempt count is carried over unchanged; a hop is not a retry.
    pub fn redirected(&self, url: Url) -> Self {
        Self {
            url,
            redirects: self.redirects + 1,
            ..self.clone()
        }
    }
}
