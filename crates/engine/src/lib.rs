//! Bulk salary adjustment engine.
//!
//! [`PayrollEngine`] wires the pure rules from `payroll-core` to the
//! directory, history, and template stores. It owns the per-employee lock
//! registry that keeps concurrent operations from interleaving writes to
//! the same employee, and publishes lifecycle events on an optional
//! [`EventBus`].
//!
//! The engine is cheap to clone; clones share stores, locks, and the bus.

use std::sync::Arc;

use payroll_core::store::{EmployeeDirectory, HistoryStore, TemplateStore};
use payroll_events::{EventBus, OperationEvent};

pub mod analytics;
pub mod config;
pub mod locks;
pub mod memory;
pub mod orchestrator;
pub mod preview;
pub mod rollback;
pub mod templates;

pub use analytics::AnalyticsQuery;
pub use config::EngineConfig;
pub use locks::EmployeeLocks;
pub use orchestrator::StartedOperation;
pub use rollback::RollbackRequest;

/// Facade over every engine operation.
#[derive(Clone)]
pub struct PayrollEngine {
    directory: Arc<dyn EmployeeDirectory>,
    history: Arc<dyn HistoryStore>,
    templates: Arc<dyn TemplateStore>,
    locks: Arc<EmployeeLocks>,
    events: Option<Arc<EventBus>>,
    config: EngineConfig,
}

impl PayrollEngine {
    pub fn new(
        directory: Arc<dyn EmployeeDirectory>,
        history: Arc<dyn HistoryStore>,
        templates: Arc<dyn TemplateStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            directory,
            history,
            templates,
            locks: Arc::new(EmployeeLocks::new()),
            events: None,
            config,
        }
    }

    /// Publish lifecycle events on `bus`.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn directory(&self) -> &Arc<dyn EmployeeDirectory> {
        &self.directory
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    fn publish(&self, event: OperationEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }
}
