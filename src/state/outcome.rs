/// Fetch outcome definitions
///
/// This module defines what a single fetch attempt can resolve to and the
/// reasons attached to drops and retries.
use std::fmt;
use url::Url;

/// Result of one fetch attempt
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Record extracted; carries the serialized output line
    Accepted(String),

    /// Permanently abandoned without any output
    Dropped(DropReason),

    /// Ownership of the identifier moves to a new attempt at this URL
    Redirect(Url),

    /// Transient failure, handed to the retry policy
    RetryNeeded(RetryReason),

    /// The attempt could not be dispatched at all
    RepairNeeded(String),
}

impl FetchOutcome {
    /// Returns true if this outcome ends the identifier's attempt chain
    ///
    /// Redirects and retries hand the identifier to a new attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Accepted(_) | Self::Dropped(_) | Self::RepairNeeded(_)
        )
    }
}

/// Why an identifier was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// HTTP 404
    NotFound,
    /// Redirect to a protected account
    Protected,
    /// Redirect to a suspended account
    Suspended,
    /// Redirect indicating a deleted account
    Deleted,
    /// Redirect received while redirect following is disabled
    RedirectNotFollowed,
    /// Redirect hop limit reached
    TooManyRedirects,
}

impl DropReason {
    /// Returns all drop reasons
    pub fn all() -> [Self; 6] {
        [
            Self::NotFound,
            Self::Protected,
            Self::Suspended,
            Self::Deleted,
            Self::RedirectNotFollowed,
            Self::TooManyRedirects,
        ]
    }

    /// Short label used in logs and summaries
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "missing page",
            Self::Protected => "protected account",
            Self::Suspended => "suspended account",
            Self::Deleted => "deleted account",
            Self::RedirectNotFollowed => "redirect",
            Self::TooManyRedirects => "redirect loop",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an attempt needs to be retried
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    /// HTTP 500
    ServerError,
    /// Connect error, timeout, or any other transport failure
    Transport(String),
    /// The body could not be read
    Body(String),
    /// The body did not contain a usable embedded record
    Extraction(String),
    /// A 301/302 without a usable `Location` header
    MissingLocation,
}

impl fmt::Display for RetryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerError => write!(f, "server error"),
            Self::Transport(e) => write!(f, "transport error: {}", e),
            Self::Body(e) => write!(f, "body error: {}", e),
            Self::Extraction(e) => write!(f, "extraction error: {}", e),
            Self::MissingLocation => write!(f, "redirect without location"),
        }
    }
}
