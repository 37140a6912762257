use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::timeout;

/// Counts identifiers that have not reached a terminal outcome
///
/// `register` is called once per submitted input line and `resolve` once per
/// terminal outcome, never per attempt. Reaching zero wakes any drain waiter.
#[derive(Debug, Default)]
pub struct OutstandingCounter {
    count: AtomicUsize,
    idle: Notify,
}

impl OutstandingCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a newly submitted identifier
    pub fn register(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    /// Records a terminal outcome for one identifier
    pub fn resolve(&self) {
        let previous = self
            .count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));

        match previous {
            Ok(1) => self.idle.notify_waiters(),
            Ok(_) => {}
            Err(_) => tracing::error!("Outstanding counter resolved below zero"),
        }
    }

    /// Current number of unresolved identifiers
    pub fn get(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Returns true when every registered identifier has been resolved
    pub fn is_quiescent(&self) -> bool {
        self.get() == 0
    }

    /// Waits for quiescence, checking at most `polls` times
    ///
    /// Each check waits up to `interval` and returns early as soon as the
    /// counter reaches zero. Returns whether quiescence was reached; callers
    /// proceed either way.
    pub async fn drain(&self, polls: u32, interval: Duration) -> bool {
        for poll in 0..polls {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_quiescent() {
                return true;
            }

            tracing::debug!(
                "Waiting for {} outstanding identifiers (check {}/{})",
                self.get(),
                poll + 1,
                polls
            );
            let _ = timeout(interval, notified).await;
        }

        self.is_quiescent()
    }
}
