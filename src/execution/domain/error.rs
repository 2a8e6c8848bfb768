//! Error types for execution domain validation and parsing.

use super::ids::{RunId, SubtaskId};
use super::run::RunStatus;
use super::subtask::SubtaskStatus;
use thiserror::Error;

/// Errors returned while mutating execution domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutionDomainError {
    /// Transitioning a run between two statuses is invalid.
    #[error("invalid run transition for {run_id}: {from} -> {to}")]
    InvalidRunTransition {
        /// Run being transitioned.
        run_id: RunId,
        /// Current run status.
        from: RunStatus,
        /// Requested target status.
        to: RunStatus,
    },

    /// Transitioning a subtask between two statuses is invalid.
    #[error("invalid subtask transition for {subtask_id}: {from} -> {to}")]
    InvalidSubtaskTransition {
        /// Subtask being transitioned.
        subtask_id: SubtaskId,
        /// Current subtask status.
        from: SubtaskStatus,
        /// Requested target status.
        to: SubtaskStatus,
    },
}

/// Error returned while parsing a run status from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown run status: {0}")]
pub struct ParseRunStatusError(pub String);

/// Error returned while parsing a subtask status from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown subtask status: {0}")]
pub struct ParseSubtaskStatusError(pub String);
