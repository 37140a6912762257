//! Storage module for crawl results
//!
//! Results live in memory for the duration of a single run. The store is
//! created with the coordinator, filled concurrently by fetch tasks, and read
//! once after the run drains. Nothing is persisted between runs; the repair
//! output is the only way to resume.

mod result_store;

pub use result_store::ResultStore;
