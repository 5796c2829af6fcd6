//! Preview of a bulk salary adjustment.
//!
//! [`build_preview`] runs the calculator over an already-fetched list of
//! employees. It is recomputed on every request and never cached.

use serde::{Deserialize, Serialize};

use crate::calculator::{self, AdjustmentConfig, ComponentChange};
use crate::employee::Employee;
use crate::error::CoreError;
use crate::types::{Amount, DbId};

/// Number of payroll months used for the annualised impact.
pub const MONTHS_PER_YEAR: f64 = 12.0;

/// One employee's line in a preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewRow {
    pub employee_id: DbId,
    pub employee_name: String,
    pub department: String,
    pub position: String,
    pub current_salary: Amount,
    pub new_salary: Amount,
    pub change_amount: Amount,
    pub change_percentage: f64,
    /// Planned component edits; empty when the employee has no active basic
    /// salary component (see [`PreviewRow::issue`]).
    pub component_changes: Vec<ComponentChange>,
    /// Why this row cannot be executed as-is, if anything.
    pub issue: Option<String>,
}

/// Rows plus aggregates for a whole selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewResult {
    pub config: AdjustmentConfig,
    pub rows: Vec<PreviewRow>,
    pub employee_count: usize,
    pub total_cost_impact: Amount,
    pub average_change_percentage: f64,
    pub annual_impact: Amount,
    /// Selected ids that the employee directory did not return.
    pub skipped_employee_ids: Vec<DbId>,
}

impl PreviewResult {
    /// Reject previews that cannot be turned into an operation.
    pub fn ensure_executable(&self) -> Result<(), CoreError> {
        if self.rows.is_empty() {
            return Err(CoreError::Validation(
                "Preview contains no employees".to_string(),
            ));
        }
        let blocked: Vec<String> = self
            .rows
            .iter()
            .filter_map(|r| r.issue.as_ref().map(|i| format!("{} ({i})", r.employee_id)))
            .collect();
        if !blocked.is_empty() {
            return Err(CoreError::Validation(format!(
                "{} employee(s) cannot be adjusted: {}",
                blocked.len(),
                blocked.join(", ")
            )));
        }
        Ok(())
    }
}

/// Compute one preview row.
pub fn preview_row(employee: &Employee, config: &AdjustmentConfig) -> PreviewRow {
    let change = calculator::compute(
        employee.gross_salary(),
        config.adjustment_type,
        config.adjustment_value,
    );
    let planned = calculator::plan_component_changes(employee, change.change_amount);

    let issue = if planned.is_none() {
        Some("no active basic salary component".to_string())
    } else if change.new_salary < 0.0 {
        Some("resulting salary would be negative".to_string())
    } else {
        None
    };

    PreviewRow {
        employee_id: employee.id,
        employee_name: employee.name.clone(),
        department: employee.department.clone(),
        position: employee.position.clone(),
        current_salary: change.current_salary,
        new_salary: change.new_salary,
        change_amount: change.change_amount,
        change_percentage: change.change_percentage,
        component_changes: planned.unwrap_or_default(),
        issue,
    }
}

/// Build the preview for `employees`, in the given order.
pub fn build_preview(
    employees: &[Employee],
    config: &AdjustmentConfig,
    skipped_employee_ids: Vec<DbId>,
) -> PreviewResult {
    let rows: Vec<PreviewRow> = employees.iter().map(|e| preview_row(e, config)).collect();

    let employee_count = rows.len();
    let total_cost_impact: Amount = rows.iter().map(|r| r.change_amount).sum();
    let average_change_percentage = if employee_count > 0 {
        rows.iter().map(|r| r.change_percentage).sum::<f64>() / employee_count as f64
    } else {
        0.0
    };

    PreviewResult {
        config: config.clone(),
        rows,
        employee_count,
        total_cost_impact,
        average_change_percentage,
        annual_impact: total_cost_impact * MONTHS_PER_YEAR,
        skipped_employee_ids,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::AdjustmentType;
    use crate::employee::{ComponentType, SalaryComponent};

    fn employee(id: DbId, basic: Amount) -> Employee {
        Employee {
            id,
            name: format!("Employee {id}"),
            department: "Finance".to_string(),
            position: "Staff".to_string(),
            components: vec![SalaryComponent::new(ComponentType::BasicSalary, basic)],
        }
    }

    #[test]
    fn ten_percent_scenario() {
        let employees = vec![
            employee(1, 10_000_000.0),
            employee(2, 15_000_000.0),
            employee(3, 8_000_000.0),
        ];
        let config = AdjustmentConfig::new(AdjustmentType::Percentage, 10.0);
        let preview = build_preview(&employees, &config, vec![]);

        let new: Vec<Amount> = preview.rows.iter().map(|r| r.new_salary).collect();
        for (actual, expected) in new.iter().zip([11_000_000.0, 16_500_000.0, 8_800_000.0]) {
            assert!((actual - expected).abs() < 1e-6);
        }
        assert!((preview.total_cost_impact - 3_300_000.0).abs() < 1e-6);
        assert!((preview.average_change_percentage - 10.0).abs() < 1e-9);
        assert!((preview.annual_impact - 39_600_000.0).abs() < 1e-6);
        assert_eq!(preview.employee_count, 3);
    }

    #[test]
    fn total_matches_sum_of_rows() {
        let employees = vec![employee(1, 4_100_000.0), employee(2, 6_333_333.0)];
        let config = AdjustmentConfig::new(AdjustmentType::FixedAmount, 125_000.5);
        let preview = build_preview(&employees, &config, vec![]);
        let sum: Amount = preview.rows.iter().map(|r| r.change_amount).sum();
        assert_eq!(sum, preview.total_cost_impact);
    }

    #[test]
    fn empty_preview_has_zero_aggregates() {
        let config = AdjustmentConfig::new(AdjustmentType::Percentage, 5.0);
        let preview = build_preview(&[], &config, vec![9]);
        assert_eq!(preview.employee_count, 0);
        assert_eq!(preview.average_change_percentage, 0.0);
        assert_eq!(preview.skipped_employee_ids, vec![9]);
        assert!(preview.ensure_executable().is_err());
    }

    #[test]
    fn negative_result_blocks_execution() {
        let config = AdjustmentConfig::new(AdjustmentType::FixedAmount, -5_000_000.0);
        let preview = build_preview(&[employee(1, 3_000_000.0)], &config, vec![]);
        assert!(preview.rows[0].issue.is_some());
        let err = preview.ensure_executable().unwrap_err();
        assert!(err.to_string().contains("negative"));
    }

    #[test]
    fn missing_basic_salary_is_flagged() {
        let mut e = employee(5, 1_000_000.0);
        e.components[0].component_type = ComponentType::FixedAllowance;
        let config = AdjustmentConfig::new(AdjustmentType::Percentage, 5.0);
        let row = preview_row(&e, &config);
        assert!(row.component_changes.is_empty());
        assert_eq!(row.issue.as_deref(), Some("no active basic salary component"));
    }
}
