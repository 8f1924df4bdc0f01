//! Error types for the spatial partitioning system
//!
//! Only configuration can fail in a recoverable way. Contract violations on
//! the per-frame path (stale or double-removed handles) are debug assertions.

use std::fmt;

/// Result type for spatial partitioning operations
pub type Result<T> = std::result::Result<T, Error>;

/// Spatial partitioning errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// World configuration rejected (bad center, extent or slack)
    InvalidConfig(String),

    /// Record handle does not belong to a live record
    StaleHandle,

    /// Tree consistency check failed
    InvariantViolation(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::StaleHandle => write!(f, "Stale record handle"),
            Error::InvariantViolation(msg) => write!(f, "Invariant violation: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
