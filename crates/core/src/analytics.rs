//! Read-only aggregation over historical bulk operations.
//!
//! Department impact is computed from item snapshots. Items that were
//! applied count, including those later rolled back; the rollback
//! operation's own items carry the negative change, so a reversed item nets
//! to zero.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::operation::{ItemStatus, OperationDetail, OperationStatus};
use crate::types::{Amount, DbId, Timestamp};

/// Default number of operations returned in `top_operations`.
pub const DEFAULT_TOP_N: usize = 5;

/// Count and cost for one group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub operations: usize,
    pub total_cost_impact: Amount,
}

/// Net applied change for one department.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentImpact {
    pub department: String,
    pub employees_affected: usize,
    pub total_change: Amount,
}

/// Short operation descriptor used in rankings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationImpact {
    pub operation_id: DbId,
    pub name: String,
    pub operation_type: String,
    pub status: String,
    pub total_cost_impact: Amount,
    pub total_employees_affected: i32,
    pub created_at: Timestamp,
}

/// Cost aggregated per calendar month (`YYYY-MM`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTrend {
    pub month: String,
    pub operations: usize,
    pub total_cost_impact: Amount,
}

/// Everything the analytics view shows for one date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub total_operations: usize,
    pub total_employees_affected: i64,
    pub total_cost_impact: Amount,
    /// Completed operations over all operations, in `[0, 1]`.
    pub success_rate: f64,
    pub average_cost_per_employee: Amount,
    pub by_operation_type: BTreeMap<String, GroupSummary>,
    pub by_status: BTreeMap<String, usize>,
    pub department_impact: Vec<DepartmentImpact>,
    pub top_operations: Vec<OperationImpact>,
    pub high_risk_operations: usize,
    pub monthly_trend: Vec<MonthlyTrend>,
}

/// Safe ratio that yields 0 for an empty denominator.
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Aggregate the given operations.
///
/// `high_impact_threshold` marks an operation as high risk when its absolute
/// cost impact exceeds it.
pub fn summarize(
    operations: &[OperationDetail],
    high_impact_threshold: Amount,
    top_n: usize,
) -> AnalyticsSummary {
    let total_operations = operations.len();
    let total_employees_affected: i64 = operations
        .iter()
        .map(|d| i64::from(d.operation.total_employees_affected))
        .sum();
    let total_cost_impact: Amount = operations
        .iter()
        .map(|d| d.operation.total_cost_impact)
        .sum();
    let completed = operations
        .iter()
        .filter(|d| d.operation.status == OperationStatus::Completed)
        .count();

    let mut by_operation_type: BTreeMap<String, GroupSummary> = BTreeMap::new();
    let mut by_status: BTreeMap<String, usize> = BTreeMap::new();
    let mut months: BTreeMap<String, MonthlyTrend> = BTreeMap::new();
    let mut departments: BTreeMap<String, (std::collections::BTreeSet<DbId>, Amount)> =
        BTreeMap::new();

    for detail in operations {
        let op = &detail.operation;

        let group = by_operation_type
            .entry(op.operation_type.as_str().to_string())
            .or_default();
        group.operations += 1;
        group.total_cost_impact += op.total_cost_impact;

        *by_status.entry(op.status.as_str().to_string()).or_default() += 1;

        let month = op.created_at.format("%Y-%m").to_string();
        let trend = months.entry(month.clone()).or_insert_with(|| MonthlyTrend {
            month,
            operations: 0,
            total_cost_impact: 0.0,
        });
        trend.operations += 1;
        trend.total_cost_impact += op.total_cost_impact;

        for item in detail
            .items
            .iter()
            .filter(|i| matches!(i.item_status, ItemStatus::Applied | ItemStatus::Rolledback))
        {
            let entry = departments.entry(item.department.clone()).or_default();
            entry.0.insert(item.employee_id);
            entry.1 += item.salary_change_amount;
        }
    }

    let mut department_impact: Vec<DepartmentImpact> = departments
        .into_iter()
        .map(|(department, (employees, total_change))| DepartmentImpact {
            department,
            employees_affected: employees.len(),
            total_change,
        })
        .collect();
    department_impact.sort_by(|a, b| {
        b.total_change
            .abs()
            .total_cmp(&a.total_change.abs())
            .then_with(|| a.department.cmp(&b.department))
    });

    let mut ranked: Vec<&OperationDetail> = operations.iter().collect();
    ranked.sort_by(|a, b| {
        b.operation
            .total_cost_impact
            .abs()
            .total_cmp(&a.operation.total_cost_impact.abs())
            .then(a.operation.id.cmp(&b.operation.id))
    });
    let top_operations = ranked
        .into_iter()
        .take(top_n)
        .map(|d| OperationImpact {
            operation_id: d.operation.id,
            name: d.operation.name.clone(),
            operation_type: d.operation.operation_type.as_str().to_string(),
            status: d.operation.status.as_str().to_string(),
            total_cost_impact: d.operation.total_cost_impact,
            total_employees_affected: d.operation.total_employees_affected,
            created_at: d.operation.created_at,
        })
        .collect();

    let high_risk_operations = operations
        .iter()
        .filter(|d| d.operation.total_cost_impact.abs() > high_impact_threshold)
        .count();

    AnalyticsSummary {
        total_operations,
        total_employees_affected,
        total_cost_impact,
        success_rate: ratio(completed as f64, total_operations as f64),
        average_cost_per_employee: ratio(total_cost_impact, total_employees_affected as f64),
        by_operation_type,
        by_status,
        department_impact,
        top_operations,
        high_risk_operations,
        monthly_trend: months.into_values().collect(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::calculator::AdjustmentType;
    use crate::operation::{BulkOperation, BulkOperationItem, OperationType};

    fn op(
        id: DbId,
        status: OperationStatus,
        items: Vec<(DbId, &str, Amount, ItemStatus)>,
        month: u32,
    ) -> OperationDetail {
        let created_at = Utc.with_ymd_and_hms(2026, month, 10, 9, 0, 0).unwrap();
        let items: Vec<BulkOperationItem> = items
            .into_iter()
            .enumerate()
            .map(|(n, (employee_id, dept, change, status))| BulkOperationItem {
                id: id * 100 + n as DbId,
                operation_id: id,
                employee_id,
                employee_name: format!("E{employee_id}"),
                department: dept.to_string(),
                previous_gross_salary: 10_000_000.0,
                new_gross_salary: 10_000_000.0 + change,
                salary_change_amount: change,
                item_status: status,
                component_changes: vec![],
                error: None,
                reverses_item_id: None,
                processed_at: None,
            })
            .collect();
        OperationDetail {
            operation: BulkOperation {
                id,
                operation_type: OperationType::SalaryAdjustment,
                name: format!("Op {id}"),
                description: None,
                adjustment_type: AdjustmentType::FixedAmount,
                adjustment_value: 0.0,
                effective_date: created_at.date_naive(),
                status,
                employee_ids: items.iter().map(|i| i.employee_id).collect(),
                total_employees_affected: items.len() as i32,
                total_cost_impact: items.iter().map(|i| i.salary_change_amount).sum(),
                created_by: "hr".to_string(),
                executed_by: None,
                created_at,
                started_at: None,
                completed_at: None,
                successful_items: 0,
                failed_items: 0,
                rollback_of_operation_id: None,
                reason: None,
            },
            items,
        }
    }

    #[test]
    fn empty_range_never_divides_by_zero() {
        let s = summarize(&[], 1.0, DEFAULT_TOP_N);
        assert_eq!(s.total_operations, 0);
        assert_eq!(s.success_rate, 0.0);
        assert_eq!(s.average_cost_per_employee, 0.0);
        assert!(s.top_operations.is_empty());
        assert!(s.department_impact.is_empty());
    }

    #[test]
    fn totals_and_success_rate() {
        let ops = vec![
            op(1, OperationStatus::Completed, vec![(1, "Finance", 100.0, ItemStatus::Applied)], 9),
            op(
                2,
                OperationStatus::PartiallyCompleted,
                vec![
                    (2, "Ops", 200.0, ItemStatus::Applied),
                    (3, "Ops", 300.0, ItemStatus::Failed),
                ],
                10,
            ),
        ];
        let s = summarize(&ops, 1_000.0, DEFAULT_TOP_N);
        assert_eq!(s.total_operations, 2);
        assert_eq!(s.total_employees_affected, 3);
        assert_eq!(s.total_cost_impact, 600.0);
        assert_eq!(s.success_rate, 0.5);
        assert_eq!(s.by_status["completed"], 1);
        assert_eq!(s.by_status["partially_completed"], 1);
        assert_eq!(s.by_operation_type["salary_adjustment"].operations, 2);
        assert_eq!(s.monthly_trend.len(), 2);
        assert_eq!(s.monthly_trend[0].month, "2026-09");
    }

    #[test]
    fn department_impact_uses_applied_items_only() {
        let ops = vec![op(
            1,
            OperationStatus::PartiallyCompleted,
            vec![
                (1, "Finance", 100.0, ItemStatus::Applied),
                (2, "Finance", 50.0, ItemStatus::Failed),
                (3, "Ops", 400.0, ItemStatus::Rolledback),
            ],
            10,
        )];
        let s = summarize(&ops, 1_000.0, DEFAULT_TOP_N);
        assert_eq!(s.department_impact[0].department, "Ops");
        assert_eq!(s.department_impact[0].total_change, 400.0);
        assert_eq!(s.department_impact[1].department, "Finance");
        assert_eq!(s.department_impact[1].total_change, 100.0);
        assert_eq!(s.department_impact[1].employees_affected, 1);
    }

    #[test]
    fn top_n_ranks_by_magnitude_and_counts_high_risk() {
        let ops = vec![
            op(1, OperationStatus::Completed, vec![(1, "A", 100.0, ItemStatus::Applied)], 10),
            op(2, OperationStatus::Completed, vec![(2, "A", -5_000.0, ItemStatus::Applied)], 10),
            op(3, OperationStatus::Completed, vec![(3, "A", 2_000.0, ItemStatus::Applied)], 10),
        ];
        let s = summarize(&ops, 1_500.0, 2);
        let ids: Vec<DbId> = s.top_operations.iter().map(|o| o.operation_id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(s.high_risk_operations, 2);
    }
}
