//! Status-Crawler: a one-shot batch crawler for public status pages
//!
//! This crate fetches the public page of every status identifier listed in an
//! input file, extracts the JSON record embedded in each page, and writes the
//! records ordered by identifier. Identifiers that cannot be resolved within
//! the retry budget are written to a repair file that can be fed back as input.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Status-Crawler operations
///
/// Only pre-flight and output failures surface here. Per-request failures are
/// contained inside the fetch state machine and never reach the caller.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Failed to open input {path}: {source}")]
    Input {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path}'s parent directory does not exist")]
    MissingParent { path: PathBuf },

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Status-Crawler operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, RunPaths};
pub use output::RunSummary;
pub use state::{CrawlRequest, FetchOutcome};
pub use storage::ResultStore;
pub use url::build_url;
