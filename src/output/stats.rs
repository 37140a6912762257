//! Run statistics
//!
//! Counters are updated concurrently by fetch tasks and read once when the
//! run summary is assembled.

use crate::state::DropReason;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters for one crawl run
#[derive(Debug, Default)]
pub struct RunStats {
    submitted: AtomicU64,
    skipped: AtomicU64,
    accepted: AtomicU64,
    retries: AtomicU64,
    redirects: AtomicU64,
    repaired: AtomicU64,
    dispatch_failures: AtomicU64,
    retries_refused: AtomicU64,
    not_found: AtomicU64,
    protected: AtomicU64,
    suspended: AtomicU64,
    deleted: AtomicU64,
    redirect_not_followed: AtomicU64,
    too_many_redirects: AtomicU64,
}

/// Point-in-time copy of [`RunStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub submitted: u64,
    pub skipped: u64,
    pub accepted: u64,
    pub retries: u64,
    pub redirects: u64,
    pub repaired: u64,
    pub dispatch_failures: u64,
    pub retries_refused: u64,
    pub dropped: BTreeMap<&'static str, u64>,
}

impl StatsSnapshot {
    /// Total identifiers dropped for any reason
    pub fn total_dropped(&self) -> u64 {
        self.dropped.values().sum()
    }
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submitted(&self) {
        bump(&self.submitted);
    }

    pub fn record_skipped(&self) {
        bump(&self.skipped);
    }

    pub fn record_accepted(&self) {
        bump(&self.accepted);
    }

    pub fn record_retry(&self) {
        bump(&self.retries);
    }

    pub fn record_redirect(&self) {
        bump(&self.redirects);
    }

    pub fn record_repaired(&self) {
        bump(&self.repaired);
    }

    pub fn record_dispatch_failure(&self) {
        bump(&self.dispatch_failures);
    }

    /// A retry was due but the scheduler had already shut down
    pub fn record_retry_refused(&self) {
        bump(&self.retries_refused);
    }

    pub fn record_drop(&self, reason: DropReason) {
        bump(self.drop_counter(reason));
    }

    fn drop_counter(&self, reason: DropReason) -> &AtomicU64 {
        match reason {
            DropReason::NotFound => &self.not_found,
            DropReason::Protected => &self.protected,
            DropReason::Suspended => &self.suspended,
            DropReason::Deleted => &self.deleted,
            DropReason::RedirectNotFollowed => &self.redirect_not_followed,
            DropReason::TooManyRedirects => &self.too_many_redirects,
        }
    }

    /// Takes a snapshot of every counter
    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);

        let dropped = DropReason::all()
            .into_iter()
            .map(|reason| (reason.as_str(), load(self.drop_counter(reason))))
            .filter(|(_, count)| *count > 0)
            .collect();

        StatsSnapshot {
            submitted: load(&self.submitted),
            skipped: load(&self.skipped),
            accepted: load(&self.accepted),
            retries: load(&self.retries),
            redirects: load(&self.redirects),
            repaired: load(&self.repaired),
            dispatch_failures: load(&self.dispatch_failures),
            retries_refused: load(&self.retries_refused),
            dropped,
        }
    }
}
