//! Crawler coordinator - main crawl orchestration logic
//!
//! This module drives a run from input to output:
//! - Validating output locations before any request is made
//! - Turning input lines into requests and submitting them
//! - Settling every attempt outcome (store, drop, redirect, retry, repair)
//! - Draining outstanding identifiers and shutting down retries and transport
//! - Writing ordered results and the run summary

use crate::config::{compute_config_hash, Config};
use crate::crawler::admission::AdmissionControl;
use crate::crawler::extractor::{EmbeddedJsonExtractor, Extractor};
use crate::crawler::fetcher::{build_http_client, execute, prepare_request};
use crate::crawler::input::parse_line;
use crate::crawler::scheduler::{RetryDecision, RetryPolicy, RetryScheduler};
use crate::output::{
    generate_markdown_summary, write_fetched, write_repair, RunStats, RunSummary,
};
use crate::state::{CrawlRequest, FetchOutcome, OutstandingCounter, RetryReason};
use crate::storage::ResultStore;
use crate::url::build_url;
use crate::{ConfigError, CrawlError};
use chrono::Utc;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OwnedSemaphorePermit;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use url::Url;

/// Submitted requests between two progress log lines
const PROGRESS_INTERVAL: u64 = 500;

/// File locations used by a run
#[derive(Debug, Clone)]
pub struct RunPaths {
    /// Input file with one identifier per line
    pub input: PathBuf,

    /// Gzip output for fetched records
    pub output: PathBuf,

    /// Optional plain-text output for lines that need repair
    pub repair: Option<PathBuf>,

    /// Optional markdown run summary
    pub summary: Option<PathBuf>,
}

impl RunPaths {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            repair: None,
            summary: None,
        }
    }

    pub fn with_repair(mut self, repair: impl Into<PathBuf>) -> Self {
        self.repair = Some(repair.into());
        self
    }

    pub fn with_summary(mut self, summary: impl Into<PathBuf>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Checks that every output location has an existing parent directory
    pub fn validate(&self) -> Result<(), CrawlError> {
        check_parent(&self.output)?;
        if let Some(repair) = &self.repair {
            check_parent(repair)?;
        }
        if let Some(summary) = &self.summary {
            check_parent(summary)?;
        }
        Ok(())
    }
}

fn check_parent(path: &Path) -> Result<(), CrawlError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
            Err(CrawlError::MissingParent {
                path: path.to_path_buf(),
            })
        }
        _ => Ok(()),
    }
}

/// State shared by every in-flight attempt of a run
struct CrawlContext {
    config: Config,
    client: Client,
    extractor: Arc<dyn Extractor>,
    admission: AdmissionControl,
    policy: RetryPolicy,
    retries: RetryScheduler,
    outstanding: OutstandingCounter,
    /// Spawned attempt tasks that have not settled yet
    attempts: OutstandingCounter,
    store: ResultStore,
    stats: RunStats,
}

impl CrawlContext {
    /// Dispatches one attempt
    ///
    /// The attempt runs on its own task; its outcome is settled there. First
    /// attempts arrive with the admission permit the driver already holds;
    /// retries and redirect hops wait for one inside their task.
    fn submit(self: &Arc<Self>, request: CrawlRequest, permit: Option<OwnedSemaphorePermit>) {
        let http_request = match prepare_request(&self.client, &request, &self.config.request) {
            Ok(http_request) => http_request,
            Err(e) => {
                self.settle(request, FetchOutcome::RepairNeeded(e.to_string()));
                return;
            }
        };

        let ctx = Arc::clone(self);
        ctx.attempts.register();
        tokio::spawn(async move {
            let permit = match permit {
                Some(permit) => Ok(permit),
                None => ctx.admission.acquire().await,
            };
            let outcome = match permit {
                Ok(permit) => {
                    let outcome = execute(
                        &ctx.client,
                        http_request,
                        &request,
                        ctx.extractor.as_ref(),
                        ctx.config.crawler.max_redirects,
                    )
                    .await;
                    drop(permit);
                    outcome
                }
                Err(closed) => FetchOutcome::RepairNeeded(closed.to_string()),
            };
            ctx.settle(request, outcome);
            ctx.attempts.resolve();
        });
    }

    /// Applies the outcome of an attempt
    fn settle(self: &Arc<Self>, request: CrawlRequest, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Accepted(record) => {
                tracing::debug!("Fetched {}", request.url);
                if self.store.insert_fetched(request.id, record) {
                    self.stats.record_accepted();
                }
                self.outstanding.resolve();
            }
            FetchOutcome::Dropped(reason) => {
                tracing::warn!("Abandoning {}: {}", reason, request.url);
                self.stats.record_drop(reason);
                self.outstanding.resolve();
            }
            FetchOutcome::Redirect(target) => {
                tracing::debug!("Following redirect {} -> {}", request.url, target);
                self.stats.record_redirect();
                self.submit(request.redirected(target), None);
            }
            FetchOutcome::RetryNeeded(reason) => self.retry(request, reason),
            FetchOutcome::RepairNeeded(error) => {
                tracing::warn!("Abandoning due to error ({}): {}", error, request.url);
                self.stats.record_dispatch_failure();
                self.repair(&request);
            }
        }
    }

    fn retry(self: &Arc<Self>, request: CrawlRequest, reason: RetryReason) {
        tracing::warn!(
            "Attempt {} failed for {}: {}",
            request.attempt,
            request.url,
            reason
        );

        match self.policy.decide(&request) {
            RetryDecision::Exhausted => {
                tracing::warn!("Abandoning after max retry attempts: {}", request.url);
                self.repair(&request);
            }
            RetryDecision::Retry(next) => {
                let ctx = Arc::clone(self);
                match self.retries.schedule(next, move |next| ctx.submit(next, None)) {
                    Ok(()) => self.stats.record_retry(),
                    Err(e) => {
                        tracing::warn!("Abandoning due to error ({}): {}", e, request.url);
                        self.stats.record_retry_refused();
                        self.repair(&request);
                    }
                }
            }
        }
    }

    fn repair(&self, request: &CrawlRequest) {
        if self.store.insert_repair(request.id, &request.line) {
            self.stats.record_repaired();
        }
        self.outstanding.resolve();
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    ctx: Arc<CrawlContext>,
    paths: RunPaths,
    base_url: Url,
    config_hash: String,
}

impl Coordinator {
    /// Creates a coordinator using the embedded JSON extractor from `config`
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(CrawlError)` - Invalid configuration, a missing output directory,
    ///   or an HTTP client that could not be built
    pub fn new(config: Config, paths: RunPaths) -> Result<Self, CrawlError> {
        let extractor = EmbeddedJsonExtractor::new(&config.extractor.selector)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        Self::with_extractor(config, paths, Arc::new(extractor))
    }

    /// Creates a coordinator with a custom extractor
    pub fn with_extractor(
        config: Config,
        paths: RunPaths,
        extractor: Arc<dyn Extractor>,
    ) -> Result<Self, CrawlError> {
        crate::config::validate(&config)?;
        paths.validate()?;

        let base_url = Url::parse(&config.request.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;
        let client = build_http_client(&config)?;
        let config_hash = compute_config_hash(&config);

        let ctx = CrawlContext {
            client,
            extractor,
            admission: AdmissionControl::new(config.crawler.max_connections),
            policy: RetryPolicy::from_config(&config.crawler),
            retries: RetryScheduler::new(
                config.crawler.retry_delay(),
                config.crawler.retry_workers,
            ),
            outstanding: OutstandingCounter::new(),
            attempts: OutstandingCounter::new(),
            store: ResultStore::new(),
            stats: RunStats::new(),
            config,
        };

        Ok(Self {
            ctx: Arc::new(ctx),
            paths,
            base_url,
            config_hash,
        })
    }

    /// Runs the crawl over the configured input file
    pub async fn run(&self) -> Result<RunSummary, CrawlError> {
        let file = tokio::fs::File::open(&self.paths.input)
            .await
            .map_err(|source| CrawlError::Input {
                path: self.paths.input.clone(),
                source,
            })?;
        self.crawl(BufReader::new(file)).await
    }

    /// Runs the crawl over any line-oriented input
    ///
    /// This is the core crawling logic that:
    /// 1. Submits one request per valid input line, waiting for a free
    ///    connection slot before each
    /// 2. Waits for outstanding identifiers, bounded by the drain settings
    /// 3. Shuts down the retry scheduler and the transport, then lets attempts
    ///    turned away by the closed transport settle as repair
    /// 4. Writes fetched records, repair lines and the optional summary
    pub async fn crawl<R>(&self, reader: R) -> Result<RunSummary, CrawlError>
    where
        R: AsyncBufRead + Unpin,
    {
        let ctx = &self.ctx;
        let crawler = &ctx.config.crawler;
        let started_at = Utc::now();
        let start = Instant::now();

        tracing::info!("Processing... (config hash: {})", self.config_hash);

        let mut segments = reader.split(b'\n');
        let mut submitted = 0u64;
        loop {
            let segment = match segments.next_segment().await {
                Ok(Some(segment)) => segment,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("Failed to read input: {}", e);
                    break;
                }
            };

            let decoded = String::from_utf8_lossy(&segment);
            let line = decoded.strip_suffix('\r').unwrap_or(decoded.as_ref());
            if self.submit_line(line).await {
                submitted += 1;
                if submitted % PROGRESS_INTERVAL == 0 {
                    tracing::info!("{} requests submitted", submitted);
                }
            }
        }

        tracing::info!(
            "Waiting for remaining requests ({}, {} in flight) to finish",
            ctx.outstanding.get(),
            ctx.admission.in_flight()
        );
        let drained = ctx
            .outstanding
            .drain(crawler.drain_polls, crawler.drain_interval())
            .await;
        if !drained {
            tracing::warn!(
                "Proceeding with {} identifiers still outstanding",
                ctx.outstanding.get()
            );
        }

        tracing::info!(
            "Waiting for remaining retry timers ({}) to finish",
            ctx.retries.pending()
        );
        ctx.retries.shutdown(crawler.await_termination()).await;
        ctx.admission.close();

        if !ctx
            .attempts
            .drain(crawler.drain_polls, crawler.drain_interval())
            .await
        {
            tracing::warn!(
                "Writing output with {} attempts still running",
                ctx.attempts.get()
            );
        }

        let duration = start.elapsed();
        tracing::info!("Writing statuses...");
        let fetched_written = write_fetched(&self.paths.output, &ctx.store.fetched_records())?;

        let repair_written = match &self.paths.repair {
            Some(path) => {
                tracing::info!("Writing repair data file...");
                Some(write_repair(path, &ctx.store.repair_lines())?)
            }
            None => None,
        };

        let summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            duration,
            config_hash: self.config_hash.clone(),
            stats: ctx.stats.snapshot(),
            fetched_written,
            repair_written,
            unresolved: ctx.outstanding.get(),
            drained,
        };
        summary.log();

        if let Some(path) = &self.paths.summary {
            generate_markdown_summary(&summary, path)?;
        }

        tracing::info!("Done!");
        Ok(summary)
    }

    /// Parses one input line and submits its first attempt
    ///
    /// Lines without a valid identifier are skipped silently. Otherwise this
    /// waits for an admission slot, so reading never runs further ahead than
    /// `max-connections` requests. Returns whether a request was submitted.
    async fn submit_line(&self, line: &str) -> bool {
        let Some(parsed) = parse_line(line) else {
            tracing::trace!("Skipping line: {:?}", line);
            self.ctx.stats.record_skipped();
            return false;
        };

        let request_config = &self.ctx.config.request;
        let url = build_url(
            &self.base_url,
            parsed.id,
            parsed.handle,
            &request_config.default_handle,
        );
        let handle = parsed.handle.unwrap_or(&request_config.default_handle);
        let request = CrawlRequest::new(
            parsed.id,
            handle.to_string(),
            url,
            self.ctx.config.crawler.follow_redirects,
            line,
        );

        self.ctx.outstanding.register();
        self.ctx.stats.record_submitted();
        match self.ctx.admission.acquire().await {
            Ok(permit) => self.ctx.submit(request, Some(permit)),
            Err(closed) => self
                .ctx
                .settle(request, FetchOutcome::RepairNeeded(closed.to_string())),
        }
        true
    }

    /// Results collected so far
    pub fn store(&self) -> &ResultStore {
        &self.ctx.store
    }

    /// Identifiers not yet terminally resolved
    pub fn outstanding(&self) -> usize {
        self.ctx.outstanding.get()
    }

    /// Fingerprint of the effective configuration
    pub fn config_hash(&self) -> &str {
        &self.config_hash
    }
}
