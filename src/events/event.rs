//! Event variants published on the orchestrator bus.

use crate::execution::domain::{RunId, SubtaskId, TaskId};
use crate::session::domain::{SessionId, SessionStatus};
use serde::{Deserialize, Serialize};

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStopReason {
    /// An abort was requested for in-flight work.
    Requested,
    /// The session was closed and its resources released.
    Closed,
}

/// Why an execution run reached a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Every waiting subtask completed.
    Completed,
    /// A subtask failed or the run hit an unrecoverable error.
    Error,
    /// A user asked the run to stop.
    User,
}

/// Notification published on the orchestrator event bus.
///
/// Events are fire-and-forget: publishing never blocks and never fails, and
/// slow subscribers lose the oldest events rather than stalling producers.
/// Events carry identifiers, not full records; subscribers needing detail
/// re-read the relevant record. Serialised form is tagged for transport
/// fan-out:
///
/// ```json
/// { "type": "execution_stopped", "task_id": "...", "reason": "completed" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrchestratorEvent {
    /// A session's lifecycle status changed.
    SessionStatusChanged {
        /// Session whose status changed.
        session_id: SessionId,
        /// Status after the change.
        status: SessionStatus,
        /// Whether an abort has been requested.
        stop_requested: bool,
    },
    /// A message was appended to a session transcript.
    MessageArrived {
        /// Session that received the message.
        session_id: SessionId,
        /// Transcript length after the append.
        message_count: usize,
    },
    /// A session terminated.
    SessionStopped {
        /// Session that terminated.
        session_id: SessionId,
        /// Why it terminated.
        reason: SessionStopReason,
    },
    /// A subtask record changed. Published on every subtask write,
    /// alongside the more specific lifecycle events below.
    SubtaskUpdated {
        /// Subtask that changed.
        subtask_id: SubtaskId,
        /// Task the subtask belongs to.
        task_id: TaskId,
    },
    /// An execution run was created and started.
    ExecutionStarted {
        /// Task being executed.
        task_id: TaskId,
        /// The new run.
        run_id: RunId,
    },
    /// A subtask moved to `in_progress`.
    SubtaskStarted {
        /// Task being executed.
        task_id: TaskId,
        /// Subtask that started.
        subtask_id: SubtaskId,
    },
    /// A subtask completed successfully.
    SubtaskCompleted {
        /// Task being executed.
        task_id: TaskId,
        /// Subtask that completed.
        subtask_id: SubtaskId,
    },
    /// A subtask failed; the run ends after this event.
    SubtaskFailed {
        /// Task being executed.
        task_id: TaskId,
        /// Subtask that failed.
        subtask_id: SubtaskId,
        /// Human-readable failure text.
        error: String,
    },
    /// An execution run reached a terminal status.
    ExecutionStopped {
        /// Task that was being executed.
        task_id: TaskId,
        /// Why the run ended.
        reason: StopReason,
    },
}
