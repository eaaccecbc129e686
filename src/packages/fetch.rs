//! Package fetching contract
//!
//! A [`Fetcher`] materializes one package into a destination directory and
//! reports the concrete revision it fetched. The orchestrator only relies on
//! this trait; [`crate::packages::git::GitFetcher`] is the implementation the
//! CLI uses.

use crate::manifest::Source;
use crate::packages::cancel::Cancellation;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Broad failure classes a fetcher reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Repository, ref or subdirectory does not exist
    NotFound,
    /// Credentials missing or rejected
    Auth,
    /// Host unreachable, connection dropped, timeouts
    Network,
    /// The fetch observed a cancelled token and stopped
    Cancelled,
    Other,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FetchErrorKind::NotFound => "not found",
            FetchErrorKind::Auth => "authentication failed",
            FetchErrorKind::Network => "network error",
            FetchErrorKind::Cancelled => "cancelled",
            FetchErrorKind::Other => "fetch failed",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug, Clone)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(FetchErrorKind::Cancelled, "operation cancelled")
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == FetchErrorKind::Cancelled
    }
}

/// Materializes packages into the vendor directory.
///
/// Implementations must be safe to call repeatedly for the same source and
/// version, and must be shareable across the orchestrator's worker threads.
pub trait Fetcher: Sync {
    /// Fetch `source` at `version` into `dest`, replacing whatever is there.
    ///
    /// Returns the concrete revision that was materialized. Long-running work
    /// should poll `cancel` and return [`FetchError::cancelled`] once it fires.
    fn fetch(
        &self,
        source: &Source,
        version: &str,
        dest: &Path,
        cancel: &Cancellation,
    ) -> Result<String, FetchError>;
}
