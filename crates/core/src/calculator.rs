//! Adjustment calculator.
//!
//! [`compute`] is a pure function from a current gross salary and an
//! adjustment to the new salary and the change it implies. The whole change
//! is carried by the employee's active basic salary component
//! ([`plan_component_changes`]); allowances and variable pay are untouched.

use serde::{Deserialize, Serialize};

use crate::employee::{ComponentType, Employee};
use crate::error::CoreError;
use crate::types::Amount;

// ---------------------------------------------------------------------------
// Adjustment type
// ---------------------------------------------------------------------------

/// How the adjustment value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentType {
    /// Raise (or cut) by a percentage of the current gross salary.
    Percentage,
    /// Add a fixed amount to the current gross salary.
    FixedAmount,
    /// Replace the gross salary with an absolute target.
    NewStructure,
}

impl AdjustmentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::FixedAmount => "fixed_amount",
            Self::NewStructure => "new_structure",
        }
    }
}

impl std::str::FromStr for AdjustmentType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(Self::Percentage),
            "fixed_amount" => Ok(Self::FixedAmount),
            "new_structure" => Ok(Self::NewStructure),
            other => Err(CoreError::Validation(format!(
                "Unknown adjustment type: '{other}'. Valid types: percentage, fixed_amount, new_structure"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation limits
// ---------------------------------------------------------------------------

/// Percentage adjustments must be strictly greater than this (a -100% cut
/// would zero the salary).
pub const MIN_PERCENTAGE: f64 = -100.0;

/// Largest percentage accepted in a single bulk operation.
pub const MAX_PERCENTAGE: f64 = 100.0;

/// The pending adjustment configuration of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentConfig {
    pub adjustment_type: AdjustmentType,
    pub adjustment_value: f64,
    /// Free-form reason recorded with the operation.
    #[serde(default)]
    pub reason: Option<String>,
}

impl AdjustmentConfig {
    pub fn new(adjustment_type: AdjustmentType, adjustment_value: f64) -> Self {
        Self {
            adjustment_type,
            adjustment_value,
            reason: None,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        validate_adjustment_value(self.adjustment_type, self.adjustment_value)
    }
}

/// Reject non-finite and out-of-range adjustment values.
pub fn validate_adjustment_value(
    adjustment_type: AdjustmentType,
    value: f64,
) -> Result<(), CoreError> {
    if !value.is_finite() {
        return Err(CoreError::Validation(
            "Adjustment value must be a finite number".to_string(),
        ));
    }
    match adjustment_type {
        AdjustmentType::Percentage => {
            if value <= MIN_PERCENTAGE || value > MAX_PERCENTAGE {
                return Err(CoreError::Validation(format!(
                    "Percentage must be greater than {MIN_PERCENTAGE} and at most {MAX_PERCENTAGE}, got {value}"
                )));
            }
        }
        AdjustmentType::FixedAmount => {
            if value == 0.0 {
                return Err(CoreError::Validation(
                    "Fixed amount adjustment must not be zero".to_string(),
                ));
            }
        }
        AdjustmentType::NewStructure => {
            if value <= 0.0 {
                return Err(CoreError::Validation(format!(
                    "New salary structure target must be positive, got {value}"
                )));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

/// Result of applying an adjustment to one salary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SalaryChange {
    pub current_salary: Amount,
    pub new_salary: Amount,
    pub change_amount: Amount,
    pub change_percentage: f64,
}

/// Compute the new salary for one employee.
pub fn compute(
    current_salary: Amount,
    adjustment_type: AdjustmentType,
    adjustment_value: f64,
) -> SalaryChange {
    let new_salary = match adjustment_type {
        AdjustmentType::Percentage => current_salary * (1.0 + adjustment_value / 100.0),
        AdjustmentType::FixedAmount => current_salary + adjustment_value,
        AdjustmentType::NewStructure => adjustment_value,
    };
    let change_amount = new_salary - current_salary;
    let change_percentage = if current_salary > 0.0 {
        change_amount / current_salary * 100.0
    } else {
        0.0
    };
    SalaryChange {
        current_salary,
        new_salary,
        change_amount,
        change_percentage,
    }
}

// ---------------------------------------------------------------------------
// Component plan
// ---------------------------------------------------------------------------

/// A planned (or recorded) change to one salary component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentChange {
    pub component_type: ComponentType,
    pub previous_amount: Amount,
    pub new_amount: Amount,
}

impl ComponentChange {
    /// The same change in the opposite direction.
    pub fn inverse(&self) -> Self {
        Self {
            component_type: self.component_type,
            previous_amount: self.new_amount,
            new_amount: self.previous_amount,
        }
    }
}

/// Distribute `change_amount` onto the employee's components.
///
/// Returns `None` when the employee has no active basic salary component.
pub fn plan_component_changes(
    employee: &Employee,
    change_amount: Amount,
) -> Option<Vec<ComponentChange>> {
    let basic = employee.active_component(ComponentType::BasicSalary)?;
    Some(vec![ComponentChange {
        component_type: ComponentType::BasicSalary,
        previous_amount: basic.amount,
        new_amount: basic.amount + change_amount,
    }])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
