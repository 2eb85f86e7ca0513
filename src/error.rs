//! Unified error types for the sync engine.

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::driver::DriverError;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors raised while syncing a database.
///
/// Two of these abort a run outright: a [`SyncError::ContractViolation`]
/// from one of the describe operations, and a [`SyncError::PatternTable`]
/// at engine construction. Everything else is recovered at the unit that
/// raised it (one table, one field, one classifier stage, one metadata
/// row) and the run continues.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The driver returned structurally invalid data from a describe call.
    #[error("driver contract violation in {operation}: {message}")]
    ContractViolation {
        /// The driver operation that produced the bad shape.
        operation: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// The special-type pattern table failed self-validation.
    #[error("special-type pattern table is misconfigured: {0}")]
    PatternTable(String),

    /// A driver call failed.
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),

    /// A catalog store call failed.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

impl SyncError {
    /// Create a contract-violation error for a driver operation.
    pub fn contract(operation: &'static str, message: impl Into<String>) -> Self {
        Self::ContractViolation {
            operation,
            message: message.into(),
        }
    }

    /// Whether this error must abort the whole sync run.
    ///
    /// Per-unit failures (driver/catalog I/O while processing one table,
    /// field, or metadata row) are logged and skipped; shape violations
    /// from the describe operations are not recoverable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ContractViolation { .. } | Self::PatternTable(_)
        )
    }
}
