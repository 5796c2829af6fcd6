//! Rollback eligibility, risk scoring, and compensating-operation planning.
//!
//! Risk is advisory. Only eligibility ([`check_eligibility`]) is a hard stop;
//! every other finding becomes a warning on the [`RollbackPlan`] and can be
//! overridden by an explicit reason.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::calculator::AdjustmentType;
use crate::error::CoreError;
use crate::operation::{
    BulkOperation, BulkOperationItem, ItemStatus, NewBulkOperation, NewOperationItem,
    OperationDetail, OperationType, MAX_DESCRIPTION_LEN,
};
use crate::types::{Amount, DbId, Timestamp};

/// Warning attached when the reversal amount crosses the impact threshold.
pub const WARNING_REQUIRES_APPROVAL: &str = "requires additional approval";

/// Warning attached when affected employees were edited after completion.
pub const WARNING_CONFLICTING_EDITS: &str = "conflicting edits";

// ---------------------------------------------------------------------------
// Risk level
// ---------------------------------------------------------------------------

/// Ordered risk level; scoring only ever escalates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// The higher of the two levels.
    pub fn escalate(self, other: Self) -> Self {
        self.max(other)
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Thresholds used by risk scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackPolicy {
    /// Reversal (or operation impact) above this amount is high risk.
    pub high_impact_threshold: Amount,
    /// More than this many days since completion is at least medium risk.
    pub medium_age_days: i64,
    /// More than this many days since completion is high risk.
    pub high_age_days: i64,
    /// Estimated wall-clock seconds to reverse one item.
    pub secs_per_item: u64,
}

impl Default for RollbackPolicy {
    fn default() -> Self {
        Self {
            high_impact_threshold: 100_000_000.0,
            medium_age_days: 7,
            high_age_days: 14,
            secs_per_item: 2,
        }
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// An item that may be reversed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackCandidate {
    pub item_id: DbId,
    pub employee_id: DbId,
    pub employee_name: String,
    pub department: String,
    pub previous_gross_salary: Amount,
    pub new_gross_salary: Amount,
    pub salary_change_amount: Amount,
}

/// Advisory plan for reversing an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackPlan {
    pub operation_id: DbId,
    pub operation_name: String,
    pub eligible_items: Vec<RollbackCandidate>,
    pub total_reversal_amount: Amount,
    pub risk_level: RiskLevel,
    pub warnings: Vec<String>,
    pub estimated_duration_secs: u64,
    pub days_since_completion: i64,
    pub conflicting_employee_ids: Vec<DbId>,
    pub requires_approval: bool,
}

/// Findings fed into [`assess_risk`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiskInputs {
    pub days_since_completion: i64,
    pub total_reversal_amount: Amount,
    pub conflicting_employee_ids: Vec<DbId>,
}

/// Score the risk of a rollback. Each rule can only raise the level.
pub fn assess_risk(inputs: &RiskInputs, policy: &RollbackPolicy) -> (RiskLevel, Vec<String>) {
    let mut level = RiskLevel::Low;
    let mut warnings = Vec::new();

    if inputs.days_since_completion > policy.high_age_days {
        level = level.escalate(RiskLevel::High);
        warnings.push(format!(
            "Operation completed {} days ago; later payroll runs may already include the change",
            inputs.days_since_completion
        ));
    } else if inputs.days_since_completion > policy.medium_age_days {
        level = level.escalate(RiskLevel::Medium);
        warnings.push(format!(
            "Operation completed {} days ago",
            inputs.days_since_completion
        ));
    }

    if inputs.total_reversal_amount > policy.high_impact_threshold {
        level = level.escalate(RiskLevel::High);
        warnings.push(format!(
            "Reversal amount {:.2} exceeds {:.2}: {WARNING_REQUIRES_APPROVAL}",
            inputs.total_reversal_amount, policy.high_impact_threshold
        ));
    }

    if !inputs.conflicting_employee_ids.is_empty() {
        level = level.escalate(RiskLevel::High);
        warnings.push(format!(
            "{} employee(s) changed after this operation completed: {WARNING_CONFLICTING_EDITS}",
            inputs.conflicting_employee_ids.len()
        ));
    }

    (level, warnings)
}

/// Hard eligibility rules. Returns the reversible items on success.
pub fn check_eligibility(detail: &OperationDetail) -> Result<Vec<&BulkOperationItem>, CoreError> {
    let op = &detail.operation;
    if op.operation_type == OperationType::Rollback {
        return Err(CoreError::RollbackIneligible(format!(
            "Operation {} is itself a rollback",
            op.id
        )));
    }
    if !op.status.is_rollback_eligible() {
        return Err(CoreError::RollbackIneligible(format!(
            "Operation {} is '{}'; only completed or partially completed operations can be rolled back",
            op.id,
            op.status.as_str()
        )));
    }
    let applied: Vec<&BulkOperationItem> = detail
        .items
        .iter()
        .filter(|i| i.item_status == ItemStatus::Applied)
        .collect();
    if applied.is_empty() {
        return Err(CoreError::RollbackIneligible(format!(
            "Operation {} has no applied items left to roll back",
            op.id
        )));
    }
    Ok(applied)
}

/// Whole days between completion and `now` (0 when never completed).
pub fn days_since_completion(op: &BulkOperation, now: Timestamp) -> i64 {
    op.completed_at
        .map(|c| (now - c).num_days().max(0))
        .unwrap_or(0)
}

/// Build the advisory plan for an eligible operation.
pub fn build_plan(
    detail: &OperationDetail,
    now: Timestamp,
    conflicting_employee_ids: Vec<DbId>,
    policy: &RollbackPolicy,
) -> Result<RollbackPlan, CoreError> {
    let applied = check_eligibility(detail)?;

    let eligible_items: Vec<RollbackCandidate> = applied
        .iter()
        .map(|i| RollbackCandidate {
            item_id: i.id,
            employee_id: i.employee_id,
            employee_name: i.employee_name.clone(),
            department: i.department.clone(),
            previous_gross_salary: i.previous_gross_salary,
            new_gross_salary: i.new_gross_salary,
            salary_change_amount: i.salary_change_amount,
        })
        .collect();

    let inputs = RiskInputs {
        days_since_completion: days_since_completion(&detail.operation, now),
        total_reversal_amount: eligible_items
            .iter()
            .map(|i| i.salary_change_amount.abs())
            .sum(),
        conflicting_employee_ids,
    };
    let (risk_level, warnings) = assess_risk(&inputs, policy);

    Ok(RollbackPlan {
        operation_id: detail.operation.id,
        operation_name: detail.operation.name.clone(),
        estimated_duration_secs: eligible_items.len() as u64 * policy.secs_per_item,
        eligible_items,
        total_reversal_amount: inputs.total_reversal_amount,
        risk_level,
        warnings,
        days_since_completion: inputs.days_since_completion,
        requires_approval: inputs.total_reversal_amount > policy.high_impact_threshold,
        conflicting_employee_ids: inputs.conflicting_employee_ids,
    })
}

// ---------------------------------------------------------------------------
// Compensating operation
// ---------------------------------------------------------------------------

/// Validate the human-supplied rollback reason.
pub fn validate_reason(reason: &str) -> Result<(), CoreError> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "A rollback reason is required".to_string(),
        ));
    }
    if trimmed.len() > MAX_DESCRIPTION_LEN {
        return Err(CoreError::Validation(format!(
            "Rollback reason too long: {} chars (max {MAX_DESCRIPTION_LEN})",
            trimmed.len()
        )));
    }
    Ok(())
}

/// Pick the plan items to reverse. `None` selects every eligible item;
/// unknown or duplicate ids are rejected.
pub fn select_items<'a>(
    plan: &'a RollbackPlan,
    item_subset: Option<&[DbId]>,
) -> Result<Vec<&'a RollbackCandidate>, CoreError> {
    let Some(subset) = item_subset else {
        return Ok(plan.eligible_items.iter().collect());
    };
    if subset.is_empty() {
        return Err(CoreError::Validation(
            "Item subset must not be empty".to_string(),
        ));
    }
    let wanted: BTreeSet<DbId> = subset.iter().copied().collect();
    if wanted.len() != subset.len() {
        return Err(CoreError::Validation(
            "Item subset contains duplicate ids".to_string(),
        ));
    }
    let known: BTreeSet<DbId> = plan.eligible_items.iter().map(|i| i.item_id).collect();
    let unknown: Vec<String> = wanted
        .difference(&known)
        .map(|id| id.to_string())
        .collect();
    if !unknown.is_empty() {
        return Err(CoreError::Validation(format!(
            "Items not eligible for rollback: {}",
            unknown.join(", ")
        )));
    }
    Ok(plan
        .eligible_items
        .iter()
        .filter(|i| wanted.contains(&i.item_id))
        .collect())
}

/// Build the compensating operation that reverses `selected` items of the
/// source operation.
///
/// `current_gross` holds each affected employee's gross salary right now; it
/// becomes the rollback item's `previous_gross_salary` so the stale-data
/// check at execution time guards against edits made after planning.
pub fn build_rollback_operation(
    source: &OperationDetail,
    selected: &[&RollbackCandidate],
    current_gross: &HashMap<DbId, Amount>,
    reason: &str,
    actor: &str,
    effective_date: chrono::NaiveDate,
) -> Result<(NewBulkOperation, Vec<NewOperationItem>), CoreError> {
    validate_reason(reason)?;

    let mut items = Vec::with_capacity(selected.len());
    for candidate in selected {
        let source_item = source
            .items
            .iter()
            .find(|i| i.id == candidate.item_id)
            .ok_or(CoreError::NotFound {
                entity: "BulkOperationItem",
                id: candidate.item_id,
            })?;
        let previous = current_gross
            .get(&source_item.employee_id)
            .copied()
            .unwrap_or(source_item.new_gross_salary);
        let change = -source_item.salary_change_amount;
        items.push(NewOperationItem {
            employee_id: source_item.employee_id,
            employee_name: source_item.employee_name.clone(),
            department: source_item.department.clone(),
            previous_gross_salary: previous,
            new_gross_salary: previous + change,
            salary_change_amount: change,
            component_changes: source_item
                .component_changes
                .iter()
                .map(|c| c.inverse())
                .collect(),
            reverses_item_id: Some(source_item.id),
        });
    }

    let op = &source.operation;
    let operation = NewBulkOperation {
        operation_type: OperationType::Rollback,
        name: format!("Rollback: {}", op.name),
        description: Some(format!("Reverses {} item(s) of operation {}", items.len(), op.id)),
        adjustment_type: AdjustmentType::FixedAmount,
        adjustment_value: items.iter().map(|i| i.salary_change_amount).sum(),
        effective_date,
        employee_ids: items.iter().map(|i| i.employee_id).collect(),
        total_cost_impact: items.iter().map(|i| i.salary_change_amount).sum(),
        created_by: actor.to_string(),
        rollback_of_operation_id: Some(op.id),
        reason: Some(reason.trim().to_string()),
    };
    Ok((operation, items))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
