//! State module for tracking crawl progress
//!
//! This module provides the per-attempt request value, the outcomes an attempt
//! can resolve to, and the process-wide count of unresolved identifiers.
//!
//! # Components
//!
//! - `CrawlRequest`: One immutable fetch attempt for an identifier
//! - `FetchOutcome`: What an attempt resolved to (accepted, dropped, redirect, retry, repair)
//! - `OutstandingCounter`: Identifiers not yet terminally resolved, with drain support

mod outcome;
mod outstanding;
mod request;

// Re-export main types
pub use outcome::{DropReason, FetchOutcome, RetryReason};
pub use outstanding::OutstandingCounter;
pub use request::CrawlRequest;
