use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Status-Crawler
///
/// Every section and key is optional; an empty file yields [`Config::default`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub request: RequestConfig,
    pub extractor: ExtractorConfig,
}

/// Crawler behavior configuration
///
/// Durations are expressed in milliseconds in the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum number of requests active on the network at once
    pub max_connections: usize,

    /// TCP connect timeout (milliseconds)
    pub connect_timeout: u64,

    /// How long an idle pooled connection is kept (milliseconds)
    pub idle_timeout: u64,

    /// Overall per-request timeout (milliseconds)
    pub request_timeout: u64,

    /// Attempts allowed before an identifier goes to the repair output
    pub max_retry_attempts: u32,

    /// Fixed wait before a failed request is resubmitted (milliseconds)
    pub wait_before_retry: u64,

    /// Permits for executing delayed resubmissions
    pub retry_workers: usize,

    /// Upper bound on waiting for pending retry timers at shutdown (milliseconds)
    pub await_termination: u64,

    /// Number of quiescence checks before the driver proceeds anyway
    pub drain_polls: u32,

    /// Interval between quiescence checks (milliseconds)
    pub drain_interval: u64,

    /// Whether 301/302 responses are followed
    pub follow_redirects: bool,

    /// Redirect hops allowed for a single identifier
    pub max_redirects: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_connections: 100,
            connect_timeout: 10_000,
            idle_timeout: 10_000,
            request_timeout: 10_000,
            max_retry_attempts: 500,
            wait_before_retry: 10_000,
            retry_workers: 100,
            await_termination: 90_000,
            drain_polls: 10,
            drain_interval: 1_000,
            follow_redirects: true,
            max_redirects: 10,
        }
    }
}

impl CrawlerConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.wait_before_retry)
    }

    pub fn await_termination(&self) -> Duration {
        Duration::from_millis(self.await_termination)
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval)
    }
}

/// Outgoing request configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RequestConfig {
    /// Site root that status URLs are built against
    pub base_url: String,

    /// Handle used when an input line carries none
    pub default_handle: String,

    /// Value of the `Accept-Charset` header
    pub accept_charset: String,

    /// Value of the `Accept-Language` header
    pub accept_language: String,

    /// Optional `User-Agent` header
    pub user_agent: Option<String>,

    /// Optional proxy applied to every request
    pub proxy: Option<String>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            base_url: "https://twitter.com".to_string(),
            default_handle: "a".to_string(),
            accept_charset: "utf-8".to_string(),
            accept_language: "en-US".to_string(),
            user_agent: None,
            proxy: None,
        }
    }
}

/// Embedded record extraction configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExtractorConfig {
    /// CSS selector of the element carrying the embedded JSON
    pub selector: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            selector: r#"script[type="application/json"], input.json-data"#.to_string(),
        }
    }
}
