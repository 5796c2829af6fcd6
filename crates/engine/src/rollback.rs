//! Rollback planning and execution.
//!
//! A rollback never mutates the source operation's history. It creates a
//! new operation of type `rollback` whose items invert the source items'
//! component changes, executes it through the regular executor, and marks
//! each reversed source item `rolledback`.

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use payroll_core::error::CoreError;
use payroll_core::operation::{
    ExecutionProgress, ExecutionResult, OperationDetail, OperationFilter, OperationType,
};
use payroll_core::rollback::{
    build_plan, build_rollback_operation, check_eligibility, select_items, validate_reason,
    RollbackPlan,
};
use payroll_core::types::{approx_eq, Amount, DbId};
use payroll_events::bus::EVENT_ROLLBACK_CREATED;
use payroll_events::OperationEvent;
use serde::{Deserialize, Serialize};

use crate::PayrollEngine;

/// What to reverse and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackRequest {
    pub reason: String,
    /// Subset of the plan's `eligible_items` (by item id). `None` reverses
    /// all of them.
    #[serde(default)]
    pub item_ids: Option<Vec<DbId>>,
    /// Defaults to today (UTC).
    #[serde(default)]
    pub effective_date: Option<chrono::NaiveDate>,
}

impl PayrollEngine {
    /// Build the advisory rollback plan for an operation.
    ///
    /// Fails with `RollbackIneligible` when the operation can never be
    /// reversed. Conflicting edits only raise the risk level.
    pub async fn plan_rollback(&self, operation_id: DbId) -> Result<RollbackPlan, CoreError> {
        let detail = self.get_operation(operation_id).await?;
        let conflicting = self.detect_conflicts(&detail).await?;
        let plan = build_plan(&detail, Utc::now(), conflicting, &self.config.rollback)?;

        tracing::info!(
            operation_id,
            eligible_items = plan.eligible_items.len(),
            risk_level = plan.risk_level.as_str(),
            conflicts = plan.conflicting_employee_ids.len(),
            "Rollback plan built",
        );
        Ok(plan)
    }

    /// Create and execute the compensating operation for `plan`.
    pub async fn execute_rollback<F>(
        &self,
        plan: &RollbackPlan,
        request: &RollbackRequest,
        actor: &str,
        on_progress: F,
    ) -> Result<ExecutionResult, CoreError>
    where
        F: Fn(ExecutionProgress) + Send + Sync,
    {
        let rollback_id = self.create_rollback(plan, request, actor).await?;
        self.execute_operation(rollback_id, actor, on_progress).await
    }

    /// Persist the compensating operation for `plan` in `created` status and
    /// return its id.
    ///
    /// Eligibility is re-checked against the current history, so a plan
    /// whose items were reversed in the meantime is rejected instead of
    /// reversing anything twice.
    pub async fn create_rollback(
        &self,
        plan: &RollbackPlan,
        request: &RollbackRequest,
        actor: &str,
    ) -> Result<DbId, CoreError> {
        validate_reason(&request.reason)?;
        if actor.trim().is_empty() {
            return Err(CoreError::Validation(
                "Executing user must be set".to_string(),
            ));
        }

        let source = self.get_operation(plan.operation_id).await?;
        let applied: BTreeSet<DbId> = check_eligibility(&source)?.iter().map(|i| i.id).collect();
        let selected = select_items(plan, request.item_ids.as_deref())?;
        let stale: Vec<String> = selected
            .iter()
            .filter(|c| !applied.contains(&c.item_id))
            .map(|c| c.item_id.to_string())
            .collect();
        if !stale.is_empty() {
            return Err(CoreError::Conflict(format!(
                "Items are no longer applied: {}",
                stale.join(", ")
            )));
        }

        let mut current_gross: HashMap<DbId, Amount> = HashMap::new();
        for candidate in &selected {
            if let Some(employee) = self.directory.get_by_id(candidate.employee_id).await? {
                current_gross.insert(employee.id, employee.gross_salary());
            }
        }

        let effective_date = request
            .effective_date
            .unwrap_or_else(|| Utc::now().date_naive());
        let (operation, items) = build_rollback_operation(
            &source,
            &selected,
            &current_gross,
            &request.reason,
            actor,
            effective_date,
        )?;
        let rollback_id = self.history.create_operation(&operation, &items).await?;

        tracing::info!(
            rollback_operation_id = rollback_id,
            source_operation_id = plan.operation_id,
            items = items.len(),
            actor,
            "Rollback operation created",
        );
        self.publish(
            OperationEvent::new(EVENT_ROLLBACK_CREATED, rollback_id)
                .with_actor(actor)
                .with_payload(serde_json::json!({
                    "source_operation_id": plan.operation_id,
                    "items": items.len(),
                    "reason": operation.reason,
                })),
        );

        Ok(rollback_id)
    }

    /// Employees whose salary moved after the operation completed: either
    /// their live gross no longer matches the item's result, or a later
    /// operation (other than a rollback of this one) touched them.
    async fn detect_conflicts(&self, detail: &OperationDetail) -> Result<Vec<DbId>, CoreError> {
        let op = &detail.operation;
        let mut conflicting = BTreeSet::new();

        let applied = check_eligibility(detail)?;
        for item in &applied {
            match self.directory.get_by_id(item.employee_id).await? {
                Some(employee) if approx_eq(employee.gross_salary(), item.new_gross_salary) => {}
                _ => {
                    conflicting.insert(item.employee_id);
                }
            }
        }

        let later = self
            .history
            .query_operations(&OperationFilter {
                completed_after: op.completed_at,
                ..Default::default()
            })
            .await?;
        let touched: BTreeSet<DbId> = later
            .iter()
            .filter(|other| {
                other.id != op.id
                    && !(other.operation_type == OperationType::Rollback
                        && other.rollback_of_operation_id == Some(op.id))
            })
            .flat_map(|other| other.employee_ids.iter().copied())
            .collect();
        conflicting.extend(
            applied
                .iter()
                .map(|i| i.employee_id)
                .filter(|id| touched.contains(id)),
        );

        Ok(conflicting.into_iter().collect())
    }
}
