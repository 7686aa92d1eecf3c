//! Reporting error types.

use thiserror::Error;

/// Errors that can occur while building a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The underlying store could not be read.
    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),
}

/// Result type for reporting operations.
pub type Result<T> = std::result::Result<T, ReportError>;
