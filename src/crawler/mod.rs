//! Crawler module for status page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - Input line parsing
//! - HTTP fetching and the per-attempt response state machine
//! - Embedded record extraction
//! - Admission control and delayed retries
//! - Overall crawl coordination

mod admission;
mod coordinator;
mod extractor;
mod fetcher;
mod input;
mod scheduler;

pub use admission::{AdmissionClosed, AdmissionControl};
pub use coordinator::{Coordinator, RunPaths};
pub use extractor::{EmbeddedJsonExtractor, ExtractError, Extractor};
pub use fetcher::{
    build_http_client, execute, on_body, on_redirect, on_status, prepare_request,
    serialize_record, FetchStage, StatusStep, REQUESTED_ID_FIELD,
};
pub use input::{parse_line, InputLine};
pub use scheduler::{RetryDecision, RetryPolicy, RetryScheduler, SchedulerError};

use crate::config::Config;
use crate::output::RunSummary;
use crate::CrawlError;

/// Runs a complete crawl
///
/// This is the main entry point for a batch run. It will:
/// 1. Validate the configuration and output locations
/// 2. Build the HTTP client
/// 3. Submit one request per input line
/// 4. Wait for outstanding identifiers, then shut down
/// 5. Write ordered output and the run summary
pub async fn crawl(config: Config, paths: RunPaths) -> Result<RunSummary, CrawlError> {
    Coordinator::new(config, paths)?.run().await
}
