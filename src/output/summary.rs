//! Run summary types

use crate::output::stats::StatsSnapshot;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Summary of a finished crawl run
#[derive(Debug, Clone)]
pub struct RunSummary {
    // Run metadata
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration: Duration,
    pub config_hash: String,

    // Counters collected during the run
    pub stats: StatsSnapshot,

    // Output
    pub fetched_written: usize,
    pub repair_written: Option<usize>,

    /// Identifiers still unresolved when output was written
    pub unresolved: usize,

    /// Whether the drain protocol observed quiescence
    pub drained: bool,
}

impl RunSummary {
    /// Logs the summary at info level
    pub fn log(&self) {
        tracing::info!("Total requests submitted: {}", self.stats.submitted);
        tracing::info!(
            "{} statuses fetched in {}ms",
            self.stats.accepted,
            self.duration.as_millis()
        );
        tracing::info!(
            "{} lines skipped, {} retries, {} redirects followed",
            self.stats.skipped,
            self.stats.retries,
            self.stats.redirects
        );
        for (reason, count) in &self.stats.dropped {
            tracing::info!("{} dropped: {}", reason, count);
        }
        if self.stats.dispatch_failures > 0 || self.stats.retries_refused > 0 {
            tracing::info!(
                "{} attempts could not be dispatched, {} retries refused at shutdown",
                self.stats.dispatch_failures,
                self.stats.retries_refused
            );
        }
        tracing::info!("{} statuses written", self.fetched_written);
        if let Some(repair) = self.repair_written {
            tracing::info!("{} statuses need repair", repair);
        }
        if self.unresolved > 0 {
            tracing::warn!(
                "{} identifiers were still in flight when output was written",
                self.unresolved
            );
        }
    }
}
