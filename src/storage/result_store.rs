use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Ordered, thread-safe store of crawl results
///
/// Holds two maps keyed by identifier: serialized records that were fetched,
/// and raw input lines for identifiers that need repair. Both iterate in
/// ascending identifier order regardless of insertion order. An identifier is
/// kept in at most one of the two maps.
#[derive(Debug, Default)]
pub struct ResultStore {
    fetched: Mutex<BTreeMap<u64, String>>,
    repair: Mutex<BTreeMap<u64, String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ResultStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a fetched record
    ///
    /// Returns false and leaves the store untouched if the identifier already
    /// has a repair entry.
    pub fn insert_fetched(&self, id: u64, record: String) -> bool {
        // Lock order is always fetched, then repair
        let mut fetched = lock(&self.fetched);
        let repair = lock(&self.repair);
        if repair.contains_key(&id) {
            tracing::warn!("Identifier {} already marked for repair, record ignored", id);
            return false;
        }
        fetched.insert(id, record);
        true
    }

    /// Stores the raw input line of an identifier that needs repair
    ///
    /// Returns false and leaves the store untouched if the identifier was
    /// already fetched.
    pub fn insert_repair(&self, id: u64, line: &str) -> bool {
        let fetched = lock(&self.fetched);
        let mut repair = lock(&self.repair);
        if fetched.contains_key(&id) {
            tracing::warn!("Identifier {} already fetched, repair entry ignored", id);
            return false;
        }
        repair.insert(id, line.to_string());
        true
    }

    /// Number of fetched records
    pub fn fetched_len(&self) -> usize {
        lock(&self.fetched).len()
    }

    /// Number of repair entries
    pub fn repair_len(&self) -> usize {
        lock(&self.repair).len()
    }

    /// Returns true if the identifier has a fetched record
    pub fn is_fetched(&self, id: u64) -> bool {
        lock(&self.fetched).contains_key(&id)
    }

    /// Returns true if the identifier has a repair entry
    pub fn needs_repair(&self, id: u64) -> bool {
        lock(&self.repair).contains_key(&id)
    }

    /// Snapshot of fetched records in ascending identifier order
    pub fn fetched_records(&self) -> Vec<(u64, String)> {
        lock(&self.fetched)
            .iter()
            .map(|(id, record)| (*id, record.clone()))
            .collect()
    }

    /// Snapshot of repair lines in ascending identifier order
    pub fn repair_lines(&self) -> Vec<(u64, String)> {
        lock(&self.repair)
            .iter()
            .map(|(id, line)| (*id, line.clone()))
            .collect()
    }
}
