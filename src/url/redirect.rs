//! Redirect target classification
//!
//! The status site answers 301/302 for accounts that cannot be viewed. The
//! kind of account is encoded in the `Location` value, so classification is a
//! plain substring match on the raw header.

use url::Url;

/// Marker present when the account is protected
const PROTECTED_MARKER: &str = "protected_redirect=true";

/// Marker present when the account is suspended
const SUSPENDED_MARKER: &str = "account/suspended";

/// Markers that indicate a deleted account (bounce to a bare status path or to login)
const DELETED_MARKERS: [&str; 2] = ["//status", "login?redirect_after_login"];

/// Where a redirect points to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectTarget {
    /// Protected account, never viewable
    Protected,
    /// Suspended account
    Suspended,
    /// Deleted account
    Deleted,
    /// Ordinary redirect that may be followed
    Follow,
}

/// Classifies a raw `Location` value
///
/// Markers are checked in priority order: protected, suspended, deleted.
pub fn classify_redirect(location: &str) -> RedirectTarget {
    if location.contains(PROTECTED_MARKER) {
        RedirectTarget::Protected
    } else if location.contains(SUSPENDED_MARKER) {
        RedirectTarget::Suspended
    } else if DELETED_MARKERS.iter().any(|m| location.contains(m)) {
        RedirectTarget::Deleted
    } else {
        RedirectTarget::Follow
    }
}

/// Resolves a `Location` value against the URL that produced it
///
/// Absolute locations are returned as-is, relative ones are joined.
pub fn resolve_location(current: &Url, location: &str) -> Option<Url> {
    current.join(location).ok()
}
