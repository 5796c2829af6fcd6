use std::sync::Arc;

use payroll_engine::PayrollEngine;
use payroll_events::EventBus;
use tokio_util::task::TaskTracker;

use crate::config::ServerConfig;
use crate::progress::ProgressTracker;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Engine over the employee directory, history, and template stores.
    pub engine: PayrollEngine,
    pub config: Arc<ServerConfig>,
    /// Live progress of operations executing in the background.
    pub progress: Arc<ProgressTracker>,
    /// Bus the engine publishes operation lifecycle events on.
    pub event_bus: Arc<EventBus>,
    /// Background executions; drained on shutdown.
    pub executions: TaskTracker,
}

impl AppState {
    /// Attach a fresh event bus to `engine` and start the progress tracker
    /// on it. Must be called from within a Tokio runtime.
    pub fn new(engine: PayrollEngine, config: ServerConfig) -> Self {
        let event_bus = Arc::new(EventBus::default());
        let progress = Arc::new(ProgressTracker::new());
        tokio::spawn(Arc::clone(&progress).run(event_bus.subscribe()));

        Self {
            engine: engine.with_event_bus(Arc::clone(&event_bus)),
            config: Arc::new(config),
            progress,
            event_bus,
            executions: TaskTracker::new(),
        }
    }
}
