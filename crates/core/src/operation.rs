//! Bulk operation and item types, statuses, and the state machine rules.
//!
//! ```text
//! operation:  created -> executing -> completed | partially_completed | failed
//! item:       pending -> applied | failed
//!             applied -> rolledback
//! ```
//!
//! Terminal operation states never change again. Items of a finalized
//! operation only move from `applied` to `rolledback`, and only through a
//! rollback operation.

use serde::{Deserialize, Serialize};

use crate::calculator::{AdjustmentType, ComponentChange};
use crate::employee::ComponentType;
use crate::error::CoreError;
use crate::preview::PreviewResult;
use crate::types::{approx_eq, Amount, DbId, Timestamp};

/// Maximum length for an operation name.
pub const MAX_OPERATION_NAME_LEN: usize = 200;

/// Maximum length for an operation description or rollback reason.
pub const MAX_DESCRIPTION_LEN: usize = 5000;

// ---------------------------------------------------------------------------
// Operation type
// ---------------------------------------------------------------------------

/// Kind of bulk operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    SalaryAdjustment,
    Rollback,
}

impl OperationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SalaryAdjustment => "salary_adjustment",
            Self::Rollback => "rollback",
        }
    }
}

impl std::str::FromStr for OperationType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "salary_adjustment" => Ok(Self::SalaryAdjustment),
            "rollback" => Ok(Self::Rollback),
            other => Err(CoreError::Validation(format!(
                "Unknown operation type: '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Operation status
// ---------------------------------------------------------------------------

/// Lifecycle status of a bulk operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Created,
    Executing,
    Completed,
    PartiallyCompleted,
    Failed,
}

impl OperationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::PartiallyCompleted => "partially_completed",
            Self::Failed => "failed",
        }
    }

    /// Human-readable label for display.
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Executing => "Executing",
            Self::Completed => "Completed",
            Self::PartiallyCompleted => "Partially Completed",
            Self::Failed => "Failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::PartiallyCompleted | Self::Failed
        )
    }

    /// Whether a rollback may be planned against an operation in this status.
    pub fn is_rollback_eligible(self) -> bool {
        matches!(self, Self::Completed | Self::PartiallyCompleted)
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Executing)
                | (Self::Executing, Self::Completed)
                | (Self::Executing, Self::PartiallyCompleted)
                | (Self::Executing, Self::Failed)
        )
    }
}

impl std::str::FromStr for OperationStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "executing" => Ok(Self::Executing),
            "completed" => Ok(Self::Completed),
            "partially_completed" => Ok(Self::PartiallyCompleted),
            "failed" => Ok(Self::Failed),
            other => Err(CoreError::Validation(format!(
                "Unknown operation status: '{other}'"
            ))),
        }
    }
}

/// Validate a status change, returning `Conflict` when it is not allowed.
pub fn validate_operation_transition(
    from: OperationStatus,
    to: OperationStatus,
) -> Result<(), CoreError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(CoreError::Conflict(format!(
            "Operation cannot move from '{}' to '{}'",
            from.as_str(),
            to.as_str()
        )))
    }
}

/// Final status from per-item outcome counts.
///
/// An operation with zero items is reported as `Completed`.
pub fn final_status(successful: usize, failed: usize) -> OperationStatus {
    match (successful, failed) {
        (_, 0) => OperationStatus::Completed,
        (0, _) => OperationStatus::Failed,
        _ => OperationStatus::PartiallyCompleted,
    }
}

// ---------------------------------------------------------------------------
// Item status
// ---------------------------------------------------------------------------

/// Status of one employee's unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Applied,
    Failed,
    Rolledback,
}

impl ItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Applied => "applied",
            Self::Failed => "failed",
            Self::Rolledback => "rolledback",
        }
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Applied)
                | (Self::Pending, Self::Failed)
                | (Self::Applied, Self::Rolledback)
        )
    }
}

impl std::str::FromStr for ItemStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "applied" => Ok(Self::Applied),
            "failed" => Ok(Self::Failed),
            "rolledback" => Ok(Self::Rolledback),
            other => Err(CoreError::Validation(format!(
                "Unknown item status: '{other}'"
            ))),
        }
    }
}

pub fn validate_item_transition(from: ItemStatus, to: ItemStatus) -> Result<(), CoreError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(CoreError::Conflict(format!(
            "Item cannot move from '{}' to '{}'",
            from.as_str(),
            to.as_str()
        )))
    }
}

// ---------------------------------------------------------------------------
// Item errors
// ---------------------------------------------------------------------------

/// Why a single item could not be applied. Recorded on the item, never
/// raised out of `execute`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ItemError {
    #[error("Employee {0} not found in directory")]
    EmployeeNotFound(DbId),

    #[error("Stale data: expected gross salary {expected}, found {actual}")]
    StaleData { expected: Amount, actual: Amount },

    #[error("Missing active salary component: {}", .0.as_str())]
    MissingComponent(ComponentType),

    #[error("Write conflict: {0}")]
    WriteConflict(String),

    #[error("Source item {0} is no longer applied")]
    SourceNotApplied(DbId),

    #[error("Could not record item outcome: {0}")]
    Persistence(String),
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A persisted bulk operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkOperation {
    pub id: DbId,
    pub operation_type: OperationType,
    pub name: String,
    pub description: Option<String>,
    pub adjustment_type: AdjustmentType,
    pub adjustment_value: f64,
    pub effective_date: chrono::NaiveDate,
    pub status: OperationStatus,
    pub employee_ids: Vec<DbId>,
    pub total_employees_affected: i32,
    pub total_cost_impact: Amount,
    pub created_by: String,
    pub executed_by: Option<String>,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub successful_items: i32,
    pub failed_items: i32,
    /// Source operation when this is a rollback.
    pub rollback_of_operation_id: Option<DbId>,
    pub reason: Option<String>,
}

/// A persisted per-employee unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkOperationItem {
    pub id: DbId,
    pub operation_id: DbId,
    pub employee_id: DbId,
    pub employee_name: String,
    pub department: String,
    pub previous_gross_salary: Amount,
    pub new_gross_salary: Amount,
    pub salary_change_amount: Amount,
    pub item_status: ItemStatus,
    pub component_changes: Vec<ComponentChange>,
    pub error: Option<String>,
    /// Item of the source operation that this rollback item reverses.
    pub reverses_item_id: Option<DbId>,
    pub processed_at: Option<Timestamp>,
}

/// An operation together with all of its items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDetail {
    pub operation: BulkOperation,
    pub items: Vec<BulkOperationItem>,
}

impl OperationDetail {
    /// Check the cross-entity invariants of an operation.
    pub fn check_invariants(&self) -> Result<(), CoreError> {
        let op = &self.operation;
        if op.total_employees_affected as usize != op.employee_ids.len()
            || op.employee_ids.len() != self.items.len()
        {
            return Err(CoreError::Internal(format!(
                "Operation {} item count mismatch: total={}, employee_ids={}, items={}",
                op.id,
                op.total_employees_affected,
                op.employee_ids.len(),
                self.items.len()
            )));
        }
        if let Some(stray) = self.items.iter().find(|i| i.operation_id != op.id) {
            return Err(CoreError::Internal(format!(
                "Item {} belongs to operation {}, not {}",
                stray.id, stray.operation_id, op.id
            )));
        }
        let sum: Amount = self.items.iter().map(|i| i.salary_change_amount).sum();
        if !approx_eq(sum, op.total_cost_impact) {
            return Err(CoreError::Internal(format!(
                "Operation {} cost impact {} does not match item sum {sum}",
                op.id, op.total_cost_impact
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Create DTOs
// ---------------------------------------------------------------------------

/// Insert payload for an operation (always persisted in `created` status).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBulkOperation {
    pub operation_type: OperationType,
    pub name: String,
    pub description: Option<String>,
    pub adjustment_type: AdjustmentType,
    pub adjustment_value: f64,
    pub effective_date: chrono::NaiveDate,
    pub employee_ids: Vec<DbId>,
    pub total_cost_impact: Amount,
    pub created_by: String,
    pub rollback_of_operation_id: Option<DbId>,
    pub reason: Option<String>,
}

/// Insert payload for an item (always persisted in `pending` status).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOperationItem {
    pub employee_id: DbId,
    pub employee_name: String,
    pub department: String,
    pub previous_gross_salary: Amount,
    pub new_gross_salary: Amount,
    pub salary_change_amount: Amount,
    pub component_changes: Vec<ComponentChange>,
    pub reverses_item_id: Option<DbId>,
}

/// Caller-supplied metadata for confirming a preview into an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationMetadata {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub effective_date: chrono::NaiveDate,
    pub created_by: String,
}

/// Validate an operation name: non-empty after trimming and within limits.
pub fn validate_operation_name(name: &str) -> Result<(), CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "Operation name must not be empty".to_string(),
        ));
    }
    if trimmed.len() > MAX_OPERATION_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Operation name too long: {} chars (max {MAX_OPERATION_NAME_LEN})",
            trimmed.len()
        )));
    }
    Ok(())
}

/// Turn a confirmed preview into insert payloads.
pub fn build_new_operation(
    metadata: &OperationMetadata,
    preview: &PreviewResult,
) -> Result<(NewBulkOperation, Vec<NewOperationItem>), CoreError> {
    validate_operation_name(&metadata.name)?;
    if let Some(desc) = &metadata.description {
        if desc.len() > MAX_DESCRIPTION_LEN {
            return Err(CoreError::Validation(format!(
                "Description too long: {} chars (max {MAX_DESCRIPTION_LEN})",
                desc.len()
            )));
        }
    }
    if metadata.created_by.trim().is_empty() {
        return Err(CoreError::Validation(
            "Operation creator must be set".to_string(),
        ));
    }
    preview.config.validate()?;
    preview.ensure_executable()?;

    let items: Vec<NewOperationItem> = preview
        .rows
        .iter()
        .map(|row| NewOperationItem {
            employee_id: row.employee_id,
            employee_name: row.employee_name.clone(),
            department: row.department.clone(),
            previous_gross_salary: row.current_salary,
            new_gross_salary: row.new_salary,
            salary_change_amount: row.change_amount,
            component_changes: row.component_changes.clone(),
            reverses_item_id: None,
        })
        .collect();

    let operation = NewBulkOperation {
        operation_type: OperationType::SalaryAdjustment,
        name: metadata.name.trim().to_string(),
        description: metadata.description.clone(),
        adjustment_type: preview.config.adjustment_type,
        adjustment_value: preview.config.adjustment_value,
        effective_date: metadata.effective_date,
        employee_ids: items.iter().map(|i| i.employee_id).collect(),
        total_cost_impact: items.iter().map(|i| i.salary_change_amount).sum(),
        created_by: metadata.created_by.clone(),
        rollback_of_operation_id: None,
        reason: preview.config.reason.clone(),
    };

    Ok((operation, items))
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Filter for `HistoryStore::query_operations`. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationFilter {
    pub created_from: Option<Timestamp>,
    pub created_to: Option<Timestamp>,
    pub status: Option<OperationStatus>,
    pub operation_type: Option<OperationType>,
    /// Only operations that include this employee.
    pub employee_id: Option<DbId>,
    /// Only operations completed strictly after this instant.
    pub completed_after: Option<Timestamp>,
    pub limit: Option<i64>,
}

impl OperationFilter {
    pub fn matches(&self, op: &BulkOperation) -> bool {
        self.created_from.map_or(true, |t| op.created_at >= t)
            && self.created_to.map_or(true, |t| op.created_at <= t)
            && self.status.map_or(true, |s| op.status == s)
            && self.operation_type.map_or(true, |t| op.operation_type == t)
            && self
                .employee_id
                .map_or(true, |id| op.employee_ids.contains(&id))
            && self
                .completed_after
                .map_or(true, |t| op.completed_at.is_some_and(|c| c > t))
    }
}

/// Aggregate counts written with a status update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationCounts {
    pub successful_items: i32,
    pub failed_items: i32,
}

// ---------------------------------------------------------------------------
// Execution reporting
// ---------------------------------------------------------------------------

/// Snapshot passed to the progress callback after each item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExecutionProgress {
    pub operation_id: DbId,
    pub completed: usize,
    pub total: usize,
    pub current_employee_id: DbId,
    pub successful: usize,
    pub failed: usize,
}

/// One failed item in an execution result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub item_id: DbId,
    pub employee_id: DbId,
    pub error: String,
}

/// Outcome of executing an operation (forward or rollback).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub operation_id: DbId,
    pub status: OperationStatus,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<ItemFailure>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
