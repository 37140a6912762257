//! HTTP fetcher and per-attempt response state machine
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with timeouts, proxy and headers
//! - Interpreting status, redirect location and body of one attempt
//! - Classifying every failure as a drop, a retry or a repair
//!
//! # Transitions
//!
//! | Stage | Condition | Outcome |
//! |-------|-----------|---------|
//! | Sent | Transport error or timeout | Retry |
//! | Status | 404 | Drop |
//! | Status | 500 | Retry (body not read) |
//! | Status | 301/302 | Inspect `Location` |
//! | Headers | Protected/suspended/deleted marker | Drop |
//! | Headers | Following enabled | Redirect |
//! | Headers | Following disabled | Drop |
//! | Headers | No usable `Location` | Retry |
//! | Body | Record extracted | Accept |
//! | Body | Read or extraction failure | Retry |

use crate::config::{Config, RequestConfig};
use crate::crawler::extractor::Extractor;
use crate::state::{CrawlRequest, DropReason, FetchOutcome, RetryReason};
use crate::url::{classify_redirect, resolve_location, RedirectTarget};
use reqwest::header::{ACCEPT_CHARSET, ACCEPT_LANGUAGE, LOCATION};
use reqwest::{redirect::Policy, Client, Proxy, StatusCode};
use serde_json::{Map, Value};

/// Field added to every record, carrying the identifier that was requested
pub const REQUESTED_ID_FIELD: &str = "requested_id";

/// Stages of one attempt's response lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    Sent,
    StatusReceived,
    HeadersReceived,
    BodyReceived,
    Terminal,
}

/// Decision taken when the status line arrives
#[derive(Debug, Clone, PartialEq)]
pub enum StatusStep {
    /// The attempt is decided without looking further
    Done(FetchOutcome),
    /// A redirect; the `Location` header decides
    InspectRedirect,
    /// Read the body and extract the record
    ReadBody,
}

/// Builds the HTTP client used for every attempt
///
/// Automatic redirects are disabled: the state machine inspects each
/// `Location` itself.
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .connect_timeout(config.crawler.connect_timeout())
        .pool_idle_timeout(config.crawler.idle_timeout())
        .timeout(config.crawler.request_timeout())
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true);

    if let Some(user_agent) = &config.request.user_agent {
        builder = builder.user_agent(user_agent.as_str());
    }

    if let Some(proxy) = &config.request.proxy {
        builder = builder.proxy(Proxy::all(proxy.as_str())?);
    }

    builder.build()
}

/// Builds the GET request for an attempt
///
/// A failure here means the attempt cannot be dispatched at all.
pub fn prepare_request(
    client: &Client,
    request: &CrawlRequest,
    headers: &RequestConfig,
) -> Result<reqwest::Request, reqwest::Error> {
    client
        .get(request.url.clone())
        .header(ACCEPT_CHARSET, headers.accept_charset.as_str())
        .header(ACCEPT_LANGUAGE, headers.accept_language.as_str())
        .build()
}

/// Status-received transition
pub fn on_status(status: StatusCode) -> StatusStep {
    match status {
        StatusCode::NOT_FOUND => StatusStep::Done(FetchOutcome::Dropped(DropReason::NotFound)),
        StatusCode::INTERNAL_SERVER_ERROR => {
            StatusStep::Done(FetchOutcome::RetryNeeded(RetryReason::ServerError))
        }
        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND => StatusStep::InspectRedirect,
        _ => StatusStep::ReadBody,
    }
}

/// Headers-received transition for 301/302 responses
pub fn on_redirect(
    request: &CrawlRequest,
    location: Option<&str>,
    max_redirects: u32,
) -> FetchOutcome {
    let Some(location) = location else {
        return FetchOutcome::RetryNeeded(RetryReason::MissingLocation);
    };

    match classify_redirect(location) {
        RedirectTarget::Protected => FetchOutcome::Dropped(DropReason::Protected),
        RedirectTarget::Suspended => FetchOutcome::Dropped(DropReason::Suspended),
        RedirectTarget::Deleted => FetchOutcome::Dropped(DropReason::Deleted),
        RedirectTarget::Follow if !request.follow_redirects => {
            FetchOutcome::Dropped(DropReason::RedirectNotFollowed)
        }
        RedirectTarget::Follow if request.redirects >= max_redirects => {
            FetchOutcome::Dropped(DropReason::TooManyRedirects)
        }
        RedirectTarget::Follow => match resolve_location(&request.url, location) {
            Some(target) => FetchOutcome::Redirect(target),
            None => FetchOutcome::RetryNeeded(RetryReason::MissingLocation),
        },
    }
}

/// Body-received transition
pub fn on_body(
    request: &CrawlRequest,
    body: Result<String, String>,
    extractor: &dyn Extractor,
) -> FetchOutcome {
    let body = match body {
        Ok(body) => body,
        Err(e) => return FetchOutcome::RetryNeeded(RetryReason::Body(e)),
    };

    match extractor.extract(&body) {
        Ok(record) => FetchOutcome::Accepted(serialize_record(record, request.id)),
        Err(e) => FetchOutcome::RetryNeeded(RetryReason::Extraction(e.to_string())),
    }
}

/// Adds the requested identifier to a record and serializes it as one line
pub fn serialize_record(mut record: Map<String, Value>, id: u64) -> String {
    // Remove first so the field always ends up last
    record.shift_remove(REQUESTED_ID_FIELD);
    record.insert(REQUESTED_ID_FIELD.to_string(), Value::from(id));
    Value::Object(record).to_string()
}

/// Runs one attempt through the state machine
///
/// Never fails: every error is folded into the returned outcome.
pub async fn execute(
    client: &Client,
    http_request: reqwest::Request,
    request: &CrawlRequest,
    extractor: &dyn Extractor,
    max_redirects: u32,
) -> FetchOutcome {
    trace_stage(request, FetchStage::Sent);
    let response = match client.execute(http_request).await {
        Ok(response) => response,
        Err(e) => {
            let reason = if e.is_timeout() {
                "request timeout".to_string()
            } else {
                e.to_string()
            };
            return FetchOutcome::RetryNeeded(RetryReason::Transport(reason));
        }
    };

    trace_stage(request, FetchStage::StatusReceived);
    let outcome = match on_status(response.status()) {
        StatusStep::Done(outcome) => outcome,
        StatusStep::InspectRedirect => {
            trace_stage(request, FetchStage::HeadersReceived);
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok());
            on_redirect(request, location, max_redirects)
        }
        StatusStep::ReadBody => {
            let body = response
                .bytes()
                .await
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                .map_err(|e| e.to_string());
            trace_stage(request, FetchStage::BodyReceived);
            on_body(request, body, extractor)
        }
    };

    trace_stage(request, FetchStage::Terminal);
    outcome
}

fn trace_stage(request: &CrawlRequest, stage: FetchStage) {
    tracing::trace!(
        "{:?}: id={} attempt={} url={}",
        stage,
        request.id,
        request.attempt,
        request.url
    );
}
