//! Bulk operation and item rows.
//!
//! Statuses and the operation type are stored as SMALLINT ids into lookup
//! tables (see [`super::status`]); component changes are stored as JSONB.

use payroll_core::calculator::{AdjustmentType, ComponentChange};
use payroll_core::error::CoreError;
use payroll_core::operation::{BulkOperation, BulkOperationItem};
use payroll_core::types::{DbId, Timestamp};
use sqlx::FromRow;

use super::status::{self, StatusId};

/// A row from the `bulk_operations` table.
#[derive(Debug, Clone, FromRow)]
pub struct BulkOperationRow {
    pub id: DbId,
    pub operation_type_id: StatusId,
    pub name: String,
    pub description: Option<String>,
    pub adjustment_type: String,
    pub adjustment_value: f64,
    pub effective_date: chrono::NaiveDate,
    pub status_id: StatusId,
    pub employee_ids: Vec<DbId>,
    pub total_employees_affected: i32,
    pub total_cost_impact: f64,
    pub created_by: String,
    pub executed_by: Option<String>,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub successful_items: i32,
    pub failed_items: i32,
    pub rollback_of_operation_id: Option<DbId>,
    pub reason: Option<String>,
}

impl BulkOperationRow {
    pub fn into_domain(self) -> Result<BulkOperation, CoreError> {
        let adjustment_type: AdjustmentType = self.adjustment_type.parse().map_err(|_| {
            CoreError::Internal(format!(
                "Operation {} has unknown adjustment type '{}'",
                self.id, self.adjustment_type
            ))
        })?;
        Ok(BulkOperation {
            id: self.id,
            operation_type: status::operation_type(self.operation_type_id)?,
            name: self.name,
            description: self.description,
            adjustment_type,
            adjustment_value: self.adjustment_value,
            effective_date: self.effective_date,
            status: status::operation_status(self.status_id)?,
            employee_ids: self.employee_ids,
            total_employees_affected: self.total_employees_affected,
            total_cost_impact: self.total_cost_impact,
            created_by: self.created_by,
            executed_by: self.executed_by,
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            successful_items: self.successful_items,
            failed_items: self.failed_items,
            rollback_of_operation_id: self.rollback_of_operation_id,
            reason: self.reason,
        })
    }
}

/// A row from the `bulk_operation_items` table.
#[derive(Debug, Clone, FromRow)]
pub struct BulkOperationItemRow {
    pub id: DbId,
    pub operation_id: DbId,
    pub employee_id: DbId,
    pub employee_name: String,
    pub department: String,
    pub previous_gross_salary: f64,
    pub new_gross_salary: f64,
    pub salary_change_amount: f64,
    pub item_status_id: StatusId,
    pub component_changes: serde_json::Value,
    pub error: Option<String>,
    pub reverses_item_id: Option<DbId>,
    pub processed_at: Option<Timestamp>,
}

impl BulkOperationItemRow {
    pub fn into_domain(self) -> Result<BulkOperationItem, CoreError> {
        let component_changes: Vec<ComponentChange> =
            serde_json::from_value(self.component_changes).map_err(|e| {
                CoreError::Internal(format!(
                    "Item {} has malformed component changes: {e}",
                    self.id
                ))
            })?;
        Ok(BulkOperationItem {
            id: self.id,
            operation_id: self.operation_id,
            employee_id: self.employee_id,
            employee_name: self.employee_name,
            department: self.department,
            previous_gross_salary: self.previous_gross_salary,
            new_gross_salary: self.new_gross_salary,
            salary_change_amount: self.salary_change_amount,
            item_status: status::item_status(self.item_status_id)?,
            component_changes,
            error: self.error,
            reverses_item_id: self.reverses_item_id,
            processed_at: self.processed_at,
        })
    }
}

/// Encode component changes for the JSONB column.
pub fn encode_component_changes(
    changes: &[ComponentChange],
) -> Result<serde_json::Value, CoreError> {
    serde_json::to_value(changes)
        .map_err(|e| CoreError::Internal(format!("Cannot encode component changes: {e}")))
}

#[cfg(test)]
mod tests {
    use payroll_core::employee::ComponentType;
    use payroll_core::operation::{ItemStatus, OperationStatus, OperationType};

    use super::*;

    fn item_row(component_changes: serde_json::Value) -> BulkOperationItemRow {
        BulkOperationItemRow {
            id: 3,
            operation_id: 1,
            employee_id: 7,
            employee_name: "Siti".to_string(),
            department: "Finance".to_string(),
            previous_gross_salary: 10_000_000.0,
            new_gross_salary: 11_000_000.0,
            salary_change_amount: 1_000_000.0,
            item_status_id: 2,
            component_changes,
            error: None,
            reverses_item_id: None,
            processed_at: None,
        }
    }

    #[test]
    fn item_row_decodes_component_changes() {
        let changes = vec![ComponentChange {
            component_type: ComponentType::BasicSalary,
            previous_amount: 10_000_000.0,
            new_amount: 11_000_000.0,
        }];
        let row = item_row(encode_component_changes(&changes).unwrap());

        let item = row.into_domain().unwrap();
        assert_eq!(item.item_status, ItemStatus::Applied);
        assert_eq!(item.component_changes, changes);
    }

    #[test]
    fn malformed_component_changes_are_internal_error() {
        let err = item_row(serde_json::json!({"not": "a list"}))
            .into_domain()
            .unwrap_err();
        assert!(matches!(err, CoreError::Internal(_)));
    }

    #[test]
    fn operation_row_decodes_lookup_ids() {
        let now = chrono::Utc::now();
        let row = BulkOperationRow {
            id: 1,
            operation_type_id: 2,
            name: "Rollback: Raise".to_string(),
            description: None,
            adjustment_type: "fixed_amount".to_string(),
            adjustment_value: -1.0,
            effective_date: now.date_naive(),
            status_id: 4,
            employee_ids: vec![7],
            total_employees_affected: 1,
            total_cost_impact: -1.0,
            created_by: "hr".to_string(),
            executed_by: Some("hr".to_string()),
            created_at: now,
            started_at: Some(now),
            completed_at: Some(now),
            successful_items: 1,
            failed_items: 0,
            rollback_of_operation_id: Some(9),
            reason: Some("Wrong amount".to_string()),
        };

        let op = row.into_domain().unwrap();
        assert_eq!(op.operation_type, OperationType::Rollback);
        assert_eq!(op.status, OperationStatus::PartiallyCompleted);
        assert_eq!(op.adjustment_type, AdjustmentType::FixedAmount);
    }
}
