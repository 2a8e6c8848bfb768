//! Port definitions for the execution subsystem.

mod prompt;
mod store;

pub use prompt::{PromptBuilder, PromptError};
pub use store::{ExecutionStore, FieldPatch, RunPatch, StoreError, StoreResult, SubtaskPatch};
