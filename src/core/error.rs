//! Error types for extent dispatch.
//!
//! Uses thiserror for structured errors with context. Two layers:
//! - [`DispatchError`]: the call as a whole could not run (bad configuration,
//!   nothing to process, an unsound piece plan) or, after reduction, some
//!   pieces failed.
//! - [`OperationError`]: one piece's callback failed. These are collected per
//!   piece and never stop sibling workers.

use crate::core::extent::Extent;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort or summarise a whole dispatch.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("No output port and no connected input port provides an extent to process")]
    NoWorkExtent,

    #[error("Invalid configuration for '{field}': {reason}")]
    InvalidConfiguration { field: &'static str, reason: String },

    #[error(
        "Dynamic dispatch collapses axis 2 to a single slice, but extent {extent} spans {slices} slice(s)"
    )]
    SliceCollapse { extent: Extent, slices: usize },

    #[error("Pieces {first} and {second} overlap")]
    OverlappingPieces { first: usize, second: usize },

    #[error("Piece {piece} covers {sub}, which lies outside {extent}")]
    PieceOutsideExtent { piece: usize, sub: Extent, extent: Extent },

    #[error("Output port {port} holds {available}, which does not cover requested extent {requested}")]
    ExtentMismatch {
        port: usize,
        requested: Extent,
        available: Extent,
    },

    #[error("{failed} of {total} piece(s) failed; first failure: {first}")]
    PartialFailure {
        failed: usize,
        total: usize,
        first: PieceFailure,
    },

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by a single piece's callback.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationError {
    #[error("Operation '{operation}' does not override threaded_execute")]
    NotImplemented { operation: String },

    #[error("Index {index:?} lies outside the assigned region {region}")]
    OutOfRegion { index: [i32; 3], region: Extent },

    #[error("Input port {port} has no connection {connection}")]
    MissingInput { port: usize, connection: usize },

    #[error("Output port {port} does not exist")]
    MissingOutput { port: usize },

    #[error("Worker panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Failed(String),
}

/// A failed piece and why it failed.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("piece {piece} {extent}: {error}")]
pub struct PieceFailure {
    /// Worker id or block index.
    pub piece: usize,
    /// The sub-extent the piece was assigned.
    pub extent: Extent,
    /// What went wrong.
    pub error: OperationError,
}

// ============================================================================
// Error Utilities
// ============================================================================

impl DispatchError {
    /// Shorthand for an [`DispatchError::InvalidConfiguration`].
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        DispatchError::InvalidConfiguration {
            field,
            reason: reason.into(),
        }
    }

    /// Whether the call was rejected before any piece ran.
    pub fn is_rejected_before_dispatch(&self) -> bool {
        !matches!(self, DispatchError::PartialFailure { .. })
    }
}

impl OperationError {
    /// Errors that indicate a bug in the operation rather than bad data.
    pub fn is_programmer_error(&self) -> bool {
        matches!(
            self,
            OperationError::NotImplemented { .. }
                | OperationError::OutOfRegion { .. }
                | OperationError::MissingInput { .. }
                | OperationError::MissingOutput { .. }
        )
    }

    /// Turn a caught panic payload into an error.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        OperationError::Panicked(message)
    }
}

/// Result type alias for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Result type alias for per-piece callbacks.
pub type OperationResult<T> = Result<T, OperationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_implemented_is_programmer_error() {
        let error = OperationError::NotImplemented {
            operation: "blur".to_string(),
        };
        assert!(error.is_programmer_error());
        assert!(error.to_string().contains("blur"));
        assert!(!OperationError::Failed("disk".to_string()).is_programmer_error());
    }

    #[test]
    fn test_from_panic_payload() {
        let caught = std::panic::catch_unwind(|| panic!("boom {}", 7)).unwrap_err();
        assert_eq!(OperationError::from_panic(caught), OperationError::Panicked("boom 7".to_string()));

        let caught = std::panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(OperationError::from_panic(caught), OperationError::Panicked("static".to_string()));
    }

    #[test]
    fn test_partial_failure_display() {
        let error = DispatchError::PartialFailure {
            failed: 2,
            total: 8,
            first: PieceFailure {
                piece: 3,
                extent: Extent::plane(0, 9, 30, 39),
                error: OperationError::Failed("bad voxel".to_string()),
            },
        };
        let text = error.to_string();
        assert!(text.contains("2 of 8"));
        assert!(text.contains("piece 3"));
        assert!(text.contains("bad voxel"));
        assert!(!error.is_rejected_before_dispatch());
        assert!(DispatchError::NoWorkExtent.is_rejected_before_dispatch());
    }
}
