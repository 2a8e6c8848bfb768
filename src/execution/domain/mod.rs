//! Domain types for execution runs.
//!
//! This module contains pure domain types with no infrastructure
//! dependencies: identifiers, the run aggregate with its cooperative-stop
//! lifecycle, the subtask record, and the task/project read models prompts
//! are built from.

mod context;
mod error;
mod ids;
mod run;
mod subtask;

pub use context::{ProjectRecord, TaskRecord};
pub use error::{ExecutionDomainError, ParseRunStatusError, ParseSubtaskStatusError};
pub use ids::{ProjectId, RunId, SubtaskId, TaskId};
pub use run::{ExecutionRun, RunStatus};
pub use subtask::{Subtask, SubtaskStatus};
