//! Output module for crawl results and run summaries
//!
//! This module handles:
//! - Writing fetched records to a gzip-compressed file
//! - Writing the replayable repair file
//! - Recording run statistics
//! - Rendering a markdown summary of the run

mod markdown;
pub mod stats;
mod summary;
mod writer;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{RunStats, StatsSnapshot};
pub use summary::RunSummary;
pub use writer::{write_fetched, write_repair};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
