//! In-process event fan-out for session and execution lifecycles.
//!
//! Services publish [`OrchestratorEvent`]s on an [`EventBus`] as state
//! changes happen; transports and user interfaces subscribe and forward
//! them. Delivery is fire-and-forget with no replay, so the persisted
//! records remain the source of truth and events are decoration on top.

mod bus;
mod event;

pub use bus::EventBus;
pub use event::{OrchestratorEvent, SessionStopReason, StopReason};
