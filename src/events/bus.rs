//! In-process broadcast bus for orchestrator events.

use super::event::OrchestratorEvent;
use tokio::sync::broadcast;

/// Events buffered per subscriber before the oldest are overwritten.
const EVENT_BUS_CAPACITY: usize = 2048;

/// Fan-out broadcast channel for [`OrchestratorEvent`]s.
///
/// Cloning the bus is cheap and every clone publishes into the same
/// channel. Subscribers only receive events published after they subscribe;
/// there is no replay. A subscriber that falls more than the buffer
/// capacity behind observes a `Lagged` error and skips ahead instead of
/// stalling publishers.
///
/// # Examples
///
/// ```
/// use gropius::events::{EventBus, OrchestratorEvent, StopReason};
/// use gropius::execution::domain::TaskId;
///
/// let bus = EventBus::new();
/// let mut events = bus.subscribe();
/// let task_id = TaskId::new();
/// bus.publish(OrchestratorEvent::ExecutionStopped {
///     task_id,
///     reason: StopReason::Completed,
/// });
/// assert!(events.try_recv().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<OrchestratorEvent>,
}

impl EventBus {
    /// Creates a bus with the default buffer capacity.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self { tx }
    }

    /// Opens a subscription receiving events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.tx.subscribe()
    }

    /// Publishes an event to all current subscribers.
    ///
    /// Never blocks and never fails; an event published while nobody is
    /// subscribed is dropped.
    pub fn publish(&self, event: OrchestratorEvent) {
        drop(self.tx.send(event));
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
