use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Global throttle on requests active on the network
///
/// Independent of the outstanding counter: identifiers waiting out a retry
/// delay hold no permit. Closing the throttle makes every later acquisition
/// fail, which is how the transport is shut down at the end of a run.
#[derive(Debug, Clone)]
pub struct AdmissionControl {
    permits: Arc<Semaphore>,
    capacity: usize,
}

/// Returned when admission control has been closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionClosed;

impl std::fmt::Display for AdmissionClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("transport closed")
    }
}

impl AdmissionControl {
    pub fn new(capacity: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Waits for a free slot
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, AdmissionClosed> {
        self.permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| AdmissionClosed)
    }

    /// Number of requests currently holding a slot
    pub fn in_flight(&self) -> usize {
        self.capacity
            .saturating_sub(self.permits.available_permits())
    }

    /// Stops admitting requests; waiters and later callers get `AdmissionClosed`
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }
}
