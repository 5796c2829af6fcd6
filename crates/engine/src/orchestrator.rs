//! Operation lifecycle: create from a preview, then execute item by item.
//!
//! Execution moves the operation `created -> executing -> final`. Each item
//! is processed while holding its employee's lock: re-read the employee,
//! reject stale data, write the component edits, record the outcome. One
//! item failing never aborts the others; the failure is recorded on the
//! item and reported in the [`ExecutionResult`].
//!
//! Rollback operations run through the same executor. Their items carry a
//! `reverses_item_id`; the source item must still be `applied` when the
//! reversal is written and is marked `rolledback` before the reversal's own
//! outcome is recorded.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use payroll_core::employee::{gross_salary, ComponentType, SalaryComponent};
use payroll_core::error::CoreError;
use payroll_core::operation::{
    build_new_operation, final_status, BulkOperation, BulkOperationItem, ExecutionProgress,
    ExecutionResult, ItemError, ItemFailure, ItemStatus, OperationCounts, OperationDetail,
    OperationFilter, OperationMetadata, OperationStatus,
};
use payroll_core::preview::PreviewResult;
use payroll_core::store::{ConditionalWrite, ItemUpdate, OperationUpdate};
use payroll_core::types::{approx_eq, Amount, DbId};
use payroll_events::bus::{
    EVENT_OPERATION_COMPLETED, EVENT_OPERATION_CREATED, EVENT_OPERATION_PROGRESS,
    EVENT_OPERATION_STARTED,
};
use payroll_events::OperationEvent;

use crate::PayrollEngine;

/// An operation that has been moved to `executing` and is ready to run.
///
/// Only [`PayrollEngine::start_operation`] creates one, so running it never
/// skips the status transition.
#[derive(Debug)]
pub struct StartedOperation {
    detail: OperationDetail,
    actor: String,
}

impl StartedOperation {
    pub fn operation_id(&self) -> DbId {
        self.detail.operation.id
    }

    pub fn total_items(&self) -> usize {
        self.detail.items.len()
    }
}

impl PayrollEngine {
    /// Persist a confirmed preview as an operation in `created` status.
    ///
    /// Nothing is written to the employee directory.
    pub async fn create_operation(
        &self,
        metadata: &OperationMetadata,
        preview: &PreviewResult,
    ) -> Result<DbId, CoreError> {
        let (operation, items) = build_new_operation(metadata, preview)?;
        let id = self.history.create_operation(&operation, &items).await?;

        tracing::info!(
            operation_id = id,
            employees = items.len(),
            total_cost_impact = operation.total_cost_impact,
            created_by = %operation.created_by,
            "Bulk operation created",
        );
        self.publish(
            OperationEvent::new(EVENT_OPERATION_CREATED, id)
                .with_actor(&operation.created_by)
                .with_payload(serde_json::json!({
                    "name": operation.name,
                    "employees": items.len(),
                    "total_cost_impact": operation.total_cost_impact,
                })),
        );
        Ok(id)
    }

    pub async fn get_operation(&self, id: DbId) -> Result<OperationDetail, CoreError> {
        self.history
            .get_operation_by_id(id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "BulkOperation",
                id,
            })
    }

    pub async fn list_operations(
        &self,
        filter: &OperationFilter,
    ) -> Result<Vec<BulkOperation>, CoreError> {
        self.history.query_operations(filter).await
    }

    /// Execute a `created` operation: [`start_operation`] followed by
    /// [`run_operation`].
    ///
    /// `on_progress` is called once per finished item, in completion order.
    ///
    /// [`start_operation`]: Self::start_operation
    /// [`run_operation`]: Self::run_operation
    pub async fn execute_operation<F>(
        &self,
        operation_id: DbId,
        actor: &str,
        on_progress: F,
    ) -> Result<ExecutionResult, CoreError>
    where
        F: Fn(ExecutionProgress) + Send + Sync,
    {
        let started = self.start_operation(operation_id, actor).await?;
        Ok(self.run_operation(started, on_progress).await)
    }

    /// Move a `created` operation to `executing`.
    ///
    /// # Errors
    ///
    /// - `Validation` when `actor` is blank.
    /// - `NotFound` when the operation does not exist.
    /// - `Conflict` when it is not in `created` status.
    /// - `Persistence` when it cannot be moved to `executing`; the operation
    ///   then stays `created` and may be retried.
    pub async fn start_operation(
        &self,
        operation_id: DbId,
        actor: &str,
    ) -> Result<StartedOperation, CoreError> {
        if actor.trim().is_empty() {
            return Err(CoreError::Validation(
                "Executing user must be set".to_string(),
            ));
        }
        let detail = self.get_operation(operation_id).await?;
        if detail.operation.status != OperationStatus::Created {
            return Err(CoreError::Conflict(format!(
                "Operation {operation_id} is '{}'; only created operations can be executed",
                detail.operation.status.as_str()
            )));
        }

        self.history
            .update_operation_status(
                operation_id,
                OperationStatus::Executing,
                &OperationUpdate {
                    executed_by: Some(actor.to_string()),
                    started_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(
            operation_id,
            operation_type = detail.operation.operation_type.as_str(),
            items = detail.items.len(),
            actor,
            "Bulk operation executing",
        );
        self.publish(
            OperationEvent::new(EVENT_OPERATION_STARTED, operation_id)
                .with_actor(actor)
                .with_payload(serde_json::json!({ "total": detail.items.len() })),
        );

        Ok(StartedOperation {
            detail,
            actor: actor.to_string(),
        })
    }

    /// Process every item of a started operation and record its final
    /// status.
    ///
    /// Item failures are recorded on the item. A failure to record the final
    /// status is logged; the returned result still reflects what happened.
    pub async fn run_operation<F>(
        &self,
        started: StartedOperation,
        on_progress: F,
    ) -> ExecutionResult
    where
        F: Fn(ExecutionProgress) + Send + Sync,
    {
        let StartedOperation { detail, actor } = started;
        let operation_id = detail.operation.id;
        let total = detail.items.len();

        let item_futures: Vec<_> = detail
            .items
            .iter()
            .map(|item| async move { (item, self.process_item(item).await) }.boxed())
            .collect();
        let outcomes =
            stream::iter(item_futures).buffer_unordered(self.config.effective_concurrency());
        futures::pin_mut!(outcomes);

        let mut successful = 0usize;
        let mut failed = 0usize;
        let mut errors = Vec::new();
        while let Some((item, outcome)) = outcomes.next().await {
            match outcome {
                Ok(()) => successful += 1,
                Err(e) => {
                    failed += 1;
                    errors.push(ItemFailure {
                        item_id: item.id,
                        employee_id: item.employee_id,
                        error: e.to_string(),
                    });
                }
            }

            let progress = ExecutionProgress {
                operation_id,
                completed: successful + failed,
                total,
                current_employee_id: item.employee_id,
                successful,
                failed,
            };
            on_progress(progress);
            self.publish(
                OperationEvent::new(EVENT_OPERATION_PROGRESS, operation_id)
                    .with_payload(serde_json::to_value(progress).unwrap_or_default()),
            );
        }

        let status = final_status(successful, failed);
        let update = OperationUpdate {
            counts: OperationCounts {
                successful_items: successful as i32,
                failed_items: failed as i32,
            },
            completed_at: Some(Utc::now()),
            ..Default::default()
        };
        if let Err(e) = self
            .history
            .update_operation_status(operation_id, status, &update)
            .await
        {
            tracing::error!(
                operation_id,
                status = status.as_str(),
                error = %e,
                "Failed to record final operation status",
            );
        }

        let released = self.locks.prune().await;
        tracing::debug!(operation_id, released, "Pruned idle employee locks");

        tracing::info!(
            operation_id,
            status = status.as_str(),
            successful,
            failed,
            "Bulk operation finished",
        );
        self.publish(
            OperationEvent::new(EVENT_OPERATION_COMPLETED, operation_id)
                .with_actor(&actor)
                .with_payload(serde_json::json!({
                    "status": status.as_str(),
                    "successful": successful,
                    "failed": failed,
                })),
        );

        ExecutionResult {
            operation_id,
            status,
            successful,
            failed,
            errors,
        }
    }

    /// Apply and record one item under its employee's lock.
    ///
    /// The salary write lands first. For a reversal the source item is then
    /// marked `rolledback`, and only after that is the item's own outcome
    /// recorded. When a record fails before the source is marked, the salary
    /// write is undone so no change exists without a history entry that can
    /// reach it.
    async fn process_item(&self, item: &BulkOperationItem) -> Result<(), ItemError> {
        let _guard = self.locks.acquire(item.employee_id).await;

        let written = match self.apply_item(item).await {
            Ok(written) => written,
            Err(e) => return self.record_failure(item, e).await,
        };
        let update = ItemUpdate {
            error: None,
            processed_at: Some(Utc::now()),
        };

        if let Some(source_item_id) = item.reverses_item_id {
            if let Err(e) = self
                .history
                .update_item_status(source_item_id, ItemStatus::Rolledback, &update)
                .await
            {
                tracing::error!(
                    item_id = item.id,
                    source_item_id,
                    error = %e,
                    "Failed to mark source item rolled back",
                );
                self.undo_write(item, written).await;
                return self
                    .record_failure(item, ItemError::Persistence(e.to_string()))
                    .await;
            }
        }

        if let Err(e) = self
            .history
            .update_item_status(item.id, ItemStatus::Applied, &update)
            .await
        {
            tracing::error!(
                item_id = item.id,
                employee_id = item.employee_id,
                error = %e,
                "Failed to record applied item",
            );
            let error = ItemError::Persistence(e.to_string());
            // A reversal whose source is already `rolledback` stays in
            // effect; undoing it would leave a raise nothing can reach.
            if item.reverses_item_id.is_some() {
                return Err(error);
            }
            self.undo_write(item, written).await;
            return self.record_failure(item, error).await;
        }

        tracing::debug!(
            item_id = item.id,
            employee_id = item.employee_id,
            "Item applied",
        );
        Ok(())
    }

    /// Record `error` on the item and hand it back.
    async fn record_failure(
        &self,
        item: &BulkOperationItem,
        error: ItemError,
    ) -> Result<(), ItemError> {
        tracing::warn!(
            item_id = item.id,
            employee_id = item.employee_id,
            error = %error,
            "Item failed",
        );
        let update = ItemUpdate {
            error: Some(error.to_string()),
            processed_at: Some(Utc::now()),
        };
        if let Err(e) = self
            .history
            .update_item_status(item.id, ItemStatus::Failed, &update)
            .await
        {
            tracing::error!(
                item_id = item.id,
                error = %e,
                "Failed to record item failure",
            );
        }
        Err(error)
    }

    /// Put back the components an item replaced, unless someone has
    /// written the employee since.
    async fn undo_write(&self, item: &BulkOperationItem, written: WrittenItem) {
        let outcome = self
            .directory
            .update_salary_components_if(item.employee_id, written.new_gross, &written.previous)
            .await;
        match outcome {
            Ok(ConditionalWrite::Written) => tracing::warn!(
                item_id = item.id,
                employee_id = item.employee_id,
                "Salary write undone after the outcome could not be recorded",
            ),
            Ok(ConditionalWrite::Stale { actual }) => tracing::error!(
                item_id = item.id,
                employee_id = item.employee_id,
                actual,
                "Salary changed again before the write could be undone",
            ),
            Err(e) => tracing::error!(
                item_id = item.id,
                employee_id = item.employee_id,
                error = %e,
                "Failed to undo salary write",
            ),
        }
    }

    /// Re-read the employee and write the item's component edits.
    ///
    /// A component still at its planned `previous_amount` is set to exactly
    /// `new_amount`; otherwise the planned delta is added to whatever is
    /// there now. The write only lands while the gross salary still matches
    /// the item's `previous_gross_salary`.
    async fn apply_item(&self, item: &BulkOperationItem) -> Result<WrittenItem, ItemError> {
        if let Some(source_item_id) = item.reverses_item_id {
            let source = self
                .history
                .get_item(source_item_id)
                .await
                .map_err(|e| ItemError::Persistence(e.to_string()))?;
            if source.map(|s| s.item_status) != Some(ItemStatus::Applied) {
                return Err(ItemError::SourceNotApplied(source_item_id));
            }
        }

        let employee = self
            .directory
            .get_by_id(item.employee_id)
            .await
            .map_err(|e| ItemError::WriteConflict(e.to_string()))?
            .ok_or(ItemError::EmployeeNotFound(item.employee_id))?;

        let actual = employee.gross_salary();
        if !approx_eq(actual, item.previous_gross_salary) {
            return Err(ItemError::StaleData {
                expected: item.previous_gross_salary,
                actual,
            });
        }

        if item.component_changes.is_empty() {
            return Err(ItemError::MissingComponent(ComponentType::BasicSalary));
        }

        let previous = employee.components;
        let mut components = previous.clone();
        for change in &item.component_changes {
            let component = components
                .iter_mut()
                .find(|c| c.is_active && c.component_type == change.component_type)
                .ok_or(ItemError::MissingComponent(change.component_type))?;
            component.amount = if approx_eq(component.amount, change.previous_amount) {
                change.new_amount
            } else {
                component.amount + (change.new_amount - change.previous_amount)
            };
        }

        let outcome = self
            .directory
            .update_salary_components_if(item.employee_id, actual, &components)
            .await
            .map_err(|e| ItemError::WriteConflict(e.to_string()))?;
        match outcome {
            ConditionalWrite::Written => Ok(WrittenItem {
                previous,
                new_gross: gross_salary(&components),
            }),
            ConditionalWrite::Stale { actual } => Err(ItemError::StaleData {
                expected: item.previous_gross_salary,
                actual,
            }),
        }
    }
}

/// What an applied item replaced, kept until its outcome is recorded.
struct WrittenItem {
    previous: Vec<SalaryComponent>,
    new_gross: Amount,
}
