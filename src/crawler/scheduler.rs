//! Retry policy and delayed resubmission
//!
//! This module handles:
//! - Deciding whether a failed attempt gets another try
//! - Resubmitting retries after a fixed delay on a bounded set of workers
//! - Orderly shutdown with a bounded wait for pending timers

use crate::config::CrawlerConfig;
use crate::state::CrawlRequest;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;

/// Errors raised when scheduling a retry
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("retry scheduler is shut down")]
    ShutDown,
}

/// What to do with a request whose attempt failed transiently
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again with this request after the retry delay
    Retry(CrawlRequest),
    /// Attempt budget used up; the identifier goes to repair
    Exhausted,
}

/// Bounded retry policy with a fixed delay
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Highest attempt number that may still be retried
    pub max_attempts: u32,

    /// Wait before each resubmission
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(config.max_retry_attempts, config.retry_delay())
    }

    /// Decides the fate of a request whose attempt needs a retry
    ///
    /// The retry keeps the URL and increments the attempt count.
    pub fn decide(&self, request: &CrawlRequest) -> RetryDecision {
        if request.attempt >= self.max_attempts {
            RetryDecision::Exhausted
        } else {
            RetryDecision::Retry(request.next_attempt())
        }
    }
}

/// Runs delayed resubmissions
///
/// Every scheduled retry gets its own timer task. When the delay expires, the
/// resubmission runs once a worker permit is available, so at most
/// `workers` resubmissions execute at the same time. After `shutdown`,
/// scheduling is refused.
#[derive(Debug)]
pub struct RetryScheduler {
    delay: Duration,
    workers: Arc<Semaphore>,
    timers: Mutex<Option<JoinSet<()>>>,
}

impl RetryScheduler {
    pub fn new(delay: Duration, workers: usize) -> Self {
        Self {
            delay,
            workers: Arc::new(Semaphore::new(workers)),
            timers: Mutex::new(Some(JoinSet::new())),
        }
    }

    /// Schedules `resubmit(request)` to run once, after the retry delay
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, request: CrawlRequest, resubmit: F) -> Result<(), SchedulerError>
    where
        F: FnOnce(CrawlRequest) + Send + 'static,
    {
        let mut guard = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
        let timers = guard.as_mut().ok_or(SchedulerError::ShutDown)?;

        // Reap finished timers so the set does not grow with the run
        while timers.try_join_next().is_some() {}

        let delay = self.delay;
        let workers = self.workers.clone();
        timers.spawn(async move {
            tokio::time::sleep(delay).await;
            let Ok(_worker) = workers.acquire_owned().await else {
                return;
            };
            tracing::trace!("Resubmitting {} (attempt {})", request.url, request.attempt);
            resubmit(request);
        });

        Ok(())
    }

    /// Number of timers not yet reaped
    pub fn pending(&self) -> usize {
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, JoinSet::len)
    }

    pub fn is_shut_down(&self) -> bool {
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Refuses further scheduling and waits up to `wait` for pending timers
    ///
    /// Timers still pending after `wait` are aborted. Returns whether every
    /// timer finished in time.
    pub async fn shutdown(&self, wait: Duration) -> bool {
        let taken = self
            .timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(mut timers) = taken else {
            return true;
        };

        let finished = timeout(wait, async {
            while let Some(joined) = timers.join_next().await {
                if let Err(e) = joined {
                    tracing::warn!("Retry timer failed: {}", e);
                }
            }
        })
        .await
        .is_ok();

        if !finished {
            tracing::warn!("Abandoning {} pending retry timers", timers.len());
            timers.abort_all();
        }

        finished
    }
}
