//! Autosave event types and the per-editor event bus.
//!
//! Each open editor owns one [`EventBus`]. The scheduler emits an
//! [`AutosaveEvent`] at every observable step (flush started, completed,
//! failed, skipped, identity assigned) so the UI layer and tests can follow
//! the state machine without polling.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// What caused a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushTrigger {
    /// Debounce window closed.
    Timer,
    /// Explicit save request.
    Manual,
}

impl std::fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timer => write!(f, "timer"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// Observable step of the autosave state machine.
///
/// Serialized with a `type` tag, e.g.
/// `{"type":"FlushCompleted","note_id":"...","version":2,"created":false}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum AutosaveEvent {
    /// A persistence call started.
    FlushStarted {
        trigger: FlushTrigger,
        #[serde(skip_serializing_if = "Option::is_none")]
        note_id: Option<Uuid>,
    },
    /// A flush came due while another was in flight and was deferred.
    FlushDeferred { trigger: FlushTrigger },
    /// A flush was not attempted because title or content was blank.
    FlushSkipped { trigger: FlushTrigger },
    /// A persistence call succeeded.
    FlushCompleted {
        note_id: Uuid,
        version: i64,
        created: bool,
    },
    /// A persistence call failed.
    FlushFailed {
        #[serde(skip_serializing_if = "Option::is_none")]
        note_id: Option<Uuid>,
        error: String,
    },
    /// The draft received its permanent identity.
    IdentityAssigned { note_id: Uuid },
    /// The editor was closed; no further flushes will start.
    Closed,
}

impl AutosaveEvent {
    /// Dot-namespaced event name (e.g. `"flush.completed"`).
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::FlushStarted { .. } => "flush.started",
            Self::FlushDeferred { .. } => "flush.deferred",
            Self::FlushSkipped { .. } => "flush.skipped",
            Self::FlushCompleted { .. } => "flush.completed",
            Self::FlushFailed { .. } => "flush.failed",
            Self::IdentityAssigned { .. } => "draft.identity_assigned",
            Self::Closed => "editor.closed",
        }
    }

    /// True for events that end a flush attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::FlushCompleted { .. } | Self::FlushFailed { .. } | Self::FlushSkipped { .. }
        )
    }
}

/// Broadcast channel of autosave events.
///
/// Slow receivers that fall behind get a `Lagged` error and miss events;
/// UI feedback only cares about the latest state.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AutosaveEvent>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Emit an event to all subscribers. Dropped silently without subscribers.
    pub fn emit(&self, event: AutosaveEvent) {
        tracing::trace!(
            event_type = event.event_type(),
            subscriber_count = self.tx.receiver_count(),
            "Autosave event"
        );
        let _ = self.tx.send(event);
    }

    /// Subscribe to events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<AutosaveEvent> {
        self.tx.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus_emit_subscribe() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.emit(AutosaveEvent::FlushSkipped {
            trigger: FlushTrigger::Timer,
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "flush.skipped");
        assert!(event.is_terminal());
    }

    #[tokio::test]
    async fn test_event_bus_no_subscribers_ok() {
        let bus = EventBus::new(8);
        bus.emit(AutosaveEvent::Closed);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_event_serialization_tagged() {
        let event = AutosaveEvent::FlushCompleted {
            note_id: Uuid::nil(),
            version: 2,
            created: false,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "FlushCompleted");
        assert_eq!(json["version"], 2);
    }

    #[test]
    fn test_started_is_not_terminal() {
        let event = AutosaveEvent::FlushStarted {
            trigger: FlushTrigger::Manual,
            note_id: None,
        };
        assert!(!event.is_terminal());
        assert_eq!(FlushTrigger::Manual.to_string(), "manual");
    }
}
