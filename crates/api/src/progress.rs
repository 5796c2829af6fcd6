//! Live progress of executing operations.
//!
//! [`ProgressTracker`] listens to the engine's event bus and keeps the last
//! known progress of every operation that is still running. An entry is
//! released when its operation completes. The progress endpoint falls back
//! to the stored operation counts for everything the tracker does not hold.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use payroll_core::operation::{BulkOperation, ExecutionProgress, OperationStatus};
use payroll_core::types::DbId;
use payroll_events::bus::{
    EVENT_OPERATION_COMPLETED, EVENT_OPERATION_PROGRESS, EVENT_OPERATION_STARTED,
};
use payroll_events::OperationEvent;
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};

/// Snapshot returned by `GET /operations/{id}/progress`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationProgress {
    pub operation_id: DbId,
    pub status: OperationStatus,
    /// Display form of `status`.
    pub status_label: &'static str,
    pub total: usize,
    pub completed: usize,
    pub successful: usize,
    pub failed: usize,
    /// Employee of the most recently finished item.
    pub current_employee_id: Option<DbId>,
    pub percent: f64,
    pub updated_at: DateTime<Utc>,
}

impl OperationProgress {
    fn new(operation_id: DbId, status: OperationStatus, total: usize) -> Self {
        Self {
            operation_id,
            status,
            status_label: status.label(),
            total,
            completed: 0,
            successful: 0,
            failed: 0,
            current_employee_id: None,
            percent: 0.0,
            updated_at: Utc::now(),
        }
    }

    /// Progress derived from a stored operation's counters.
    pub fn from_operation(op: &BulkOperation) -> Self {
        let total = op.total_employees_affected.max(0) as usize;
        let mut progress = Self::new(op.id, op.status, total);
        progress.successful = op.successful_items.max(0) as usize;
        progress.failed = op.failed_items.max(0) as usize;
        progress.completed = progress.successful + progress.failed;
        progress.updated_at = op.completed_at.or(op.started_at).unwrap_or(op.created_at);
        progress.refresh();
        progress
    }

    fn refresh(&mut self) {
        self.status_label = self.status.label();
        self.percent = if self.total == 0 {
            if self.status.is_terminal() {
                100.0
            } else {
                0.0
            }
        } else {
            (self.completed as f64 / self.total as f64 * 100.0).min(100.0)
        };
    }
}

/// In-memory progress registry fed from the event bus.
#[derive(Default)]
pub struct ProgressTracker {
    entries: RwLock<HashMap<DbId, OperationProgress>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, operation_id: DbId) -> Option<OperationProgress> {
        self.entries.read().await.get(&operation_id).cloned()
    }

    /// Fold one event into the registry. Unrelated events are ignored.
    pub async fn apply(&self, event: &OperationEvent) {
        let id = event.operation_id;
        match event.event_type.as_str() {
            EVENT_OPERATION_STARTED => {
                let total = event.payload["total"].as_u64().unwrap_or(0) as usize;
                self.entries
                    .write()
                    .await
                    .insert(id, OperationProgress::new(id, OperationStatus::Executing, total));
            }
            EVENT_OPERATION_PROGRESS => {
                let Ok(update) = serde_json::from_value::<ExecutionProgress>(event.payload.clone())
                else {
                    tracing::warn!(operation_id = id, "Malformed progress event");
                    return;
                };
                let mut entries = self.entries.write().await;
                let entry = entries.entry(id).or_insert_with(|| {
                    OperationProgress::new(id, OperationStatus::Executing, update.total)
                });
                // Events can arrive after a newer snapshot; never move backwards.
                if update.completed >= entry.completed {
                    entry.total = update.total;
                    entry.completed = update.completed;
                    entry.successful = update.successful;
                    entry.failed = update.failed;
                    entry.current_employee_id = Some(update.current_employee_id);
                    entry.updated_at = event.timestamp;
                    entry.refresh();
                }
            }
            EVENT_OPERATION_COMPLETED => {
                // Finished operations are served from their stored counters.
                if self.entries.write().await.remove(&id).is_some() {
                    tracing::debug!(operation_id = id, "Progress entry released");
                }
            }
            _ => {}
        }
    }

    /// Consume events until the bus is closed.
    pub async fn run(self: Arc<Self>, mut rx: broadcast::Receiver<OperationEvent>) {
        loop {
            match rx.recv().await {
                Ok(event) => self.apply(&event).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Progress tracker lagged behind the event bus");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!("Event bus closed, progress tracker stopping");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress_event(id: DbId, completed: usize, total: usize, failed: usize) -> OperationEvent {
        let progress = ExecutionProgress {
            operation_id: id,
            completed,
            total,
            current_employee_id: completed as DbId,
            successful: completed - failed,
            failed,
        };
        OperationEvent::new(EVENT_OPERATION_PROGRESS, id)
            .with_payload(serde_json::to_value(progress).unwrap())
    }

    #[tokio::test]
    async fn tracks_an_operation_from_start_to_completion() {
        let tracker = ProgressTracker::new();
        tracker
            .apply(
                &OperationEvent::new(EVENT_OPERATION_STARTED, 7)
                    .with_payload(serde_json::json!({ "total": 4 })),
            )
            .await;

        let started = tracker.get(7).await.unwrap();
        assert_eq!(started.status, OperationStatus::Executing);
        assert_eq!(started.total, 4);
        assert_eq!(started.percent, 0.0);
        assert_eq!(started.status_label, "Executing");

        tracker.apply(&progress_event(7, 1, 4, 0)).await;
        tracker.apply(&progress_event(7, 2, 4, 1)).await;
        let midway = tracker.get(7).await.unwrap();
        assert_eq!(midway.completed, 2);
        assert_eq!(midway.failed, 1);
        assert_eq!(midway.current_employee_id, Some(2));
        assert_eq!(midway.percent, 50.0);

        tracker
            .apply(
                &OperationEvent::new(EVENT_OPERATION_COMPLETED, 7).with_payload(serde_json::json!({
                    "status": "partially_completed",
                    "successful": 3,
                    "failed": 1,
                })),
            )
            .await;
        assert!(tracker.get(7).await.is_none());
    }

    #[tokio::test]
    async fn stale_progress_never_moves_backwards() {
        let tracker = ProgressTracker::new();
        tracker.apply(&progress_event(3, 3, 5, 0)).await;
        tracker.apply(&progress_event(3, 2, 5, 0)).await;

        assert_eq!(tracker.get(3).await.unwrap().completed, 3);
    }

    #[tokio::test]
    async fn unrelated_and_unknown_operations_are_ignored() {
        let tracker = ProgressTracker::new();
        tracker
            .apply(&OperationEvent::new(
                payroll_events::bus::EVENT_OPERATION_CREATED,
                1,
            ))
            .await;

        assert!(tracker.get(1).await.is_none());
        assert!(tracker.get(99).await.is_none());
    }

    #[tokio::test]
    async fn run_follows_the_bus_until_it_closes() {
        let bus = payroll_events::EventBus::default();
        let tracker = Arc::new(ProgressTracker::new());
        let handle = tokio::spawn(tracker.clone().run(bus.subscribe()));

        bus.publish(
            OperationEvent::new(EVENT_OPERATION_STARTED, 11)
                .with_payload(serde_json::json!({ "total": 2 })),
        );
        drop(bus);
        handle.await.unwrap();

        assert_eq!(tracker.get(11).await.unwrap().total, 2);
    }
}
