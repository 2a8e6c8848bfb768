//! Application services orchestrating execution runs.

mod runner;

pub use runner::{
    EXECUTION_TOOL_GRANT, ExecutionService, ExecutionServiceError, RunOutcome, StartAck,
    StartRunRequest, StartSubtaskRequest, StopOutcome,
};
