//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`OperationEvent`]s. It is
//! designed to be shared via `Arc<EventBus>` across the application.

use chrono::{DateTime, Utc};
use payroll_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

/// An operation moved from `created` to `executing`.
pub const EVENT_OPERATION_STARTED: &str = "bulk_operation.started";

/// One item of an executing operation finished (either way).
pub const EVENT_OPERATION_PROGRESS: &str = "bulk_operation.progress";

/// An operation reached its final status.
pub const EVENT_OPERATION_COMPLETED: &str = "bulk_operation.completed";

/// A bulk operation was created from a confirmed preview.
pub const EVENT_OPERATION_CREATED: &str = "bulk_operation.created";

/// A rollback operation was created for a source operation.
pub const EVENT_ROLLBACK_CREATED: &str = "bulk_operation.rollback_created";

// ---------------------------------------------------------------------------
// OperationEvent
// ---------------------------------------------------------------------------

/// Something that happened to a bulk operation.
///
/// Constructed via [`OperationEvent::new`] and enriched with
/// [`with_actor`](OperationEvent::with_actor) and
/// [`with_payload`](OperationEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationEvent {
    /// Dot-separated event name, e.g. `"bulk_operation.completed"`.
    pub event_type: String,

    /// The operation this event is about.
    pub operation_id: DbId,

    /// Who triggered the event, if known.
    pub actor: Option<String>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl OperationEvent {
    pub fn new(event_type: impl Into<String>, operation_id: DbId) -> Self {
        Self {
            event_type: event_type.into(),
            operation_id,
            actor: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// # Usage
///
/// ```rust
/// use payroll_events::bus::{EventBus, OperationEvent, EVENT_OPERATION_STARTED};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(OperationEvent::new(EVENT_OPERATION_STARTED, 1));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<OperationEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: OperationEvent) {
        // Ignore the SendError; it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OperationEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
