//! Employee and salary component types supplied by the employee directory.
//!
//! Gross salary for adjustment purposes is the sum of the active
//! `basic_salary` and `fixed_allowance` components; `variable` components
//! never participate.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{Amount, DbId};

// ---------------------------------------------------------------------------
// Component types
// ---------------------------------------------------------------------------

/// Kind of salary component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    BasicSalary,
    FixedAllowance,
    Variable,
}

impl ComponentType {
    /// Stable string form, used for database storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BasicSalary => "basic_salary",
            Self::FixedAllowance => "fixed_allowance",
            Self::Variable => "variable",
        }
    }

    /// Whether this component counts toward gross salary.
    pub fn counts_toward_gross(self) -> bool {
        matches!(self, Self::BasicSalary | Self::FixedAllowance)
    }
}

impl std::str::FromStr for ComponentType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic_salary" => Ok(Self::BasicSalary),
            "fixed_allowance" => Ok(Self::FixedAllowance),
            "variable" => Ok(Self::Variable),
            other => Err(CoreError::Validation(format!(
                "Unknown salary component type: '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// One line of an employee's salary structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryComponent {
    pub component_type: ComponentType,
    pub amount: Amount,
    pub is_active: bool,
}

impl SalaryComponent {
    pub fn new(component_type: ComponentType, amount: Amount) -> Self {
        Self {
            component_type,
            amount,
            is_active: true,
        }
    }
}

/// An employee as seen by the adjustment workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: DbId,
    pub name: String,
    pub department: String,
    pub position: String,
    /// Ordered salary components.
    pub components: Vec<SalaryComponent>,
}

impl Employee {
    /// Sum of active basic salary and fixed allowance components.
    pub fn gross_salary(&self) -> Amount {
        gross_salary(&self.components)
    }

    /// The active component of the given type, if any.
    pub fn active_component(&self, component_type: ComponentType) -> Option<&SalaryComponent> {
        self.components
            .iter()
            .find(|c| c.is_active && c.component_type == component_type)
    }
}

/// Sum of active components that count toward gross salary.
pub fn gross_salary(components: &[SalaryComponent]) -> Amount {
    components
        .iter()
        .filter(|c| c.is_active && c.component_type.counts_toward_gross())
        .map(|c| c.amount)
        .sum()
}

// ---------------------------------------------------------------------------
// Directory filter
// ---------------------------------------------------------------------------

/// Filter passed to `EmployeeDirectory::list`. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeFilter {
    pub department: Option<String>,
    pub position: Option<String>,
}

impl EmployeeFilter {
    pub fn matches(&self, employee: &Employee) -> bool {
        let department_ok = self
            .department
            .as_deref()
            .map_or(true, |d| d == employee.department);
        let position_ok = self
            .position
            .as_deref()
            .map_or(true, |p| p == employee.position);
        department_ok && position_ok
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn employee(components: Vec<SalaryComponent>) -> Employee {
        Employee {
            id: 1,
            name: "Siti".to_string(),
            department: "Finance".to_string(),
            position: "Analyst".to_string(),
            components,
        }
    }

    #[test]
    fn gross_includes_basic_and_fixed_allowance() {
        let e = employee(vec![
            SalaryComponent::new(ComponentType::BasicSalary, 8_000_000.0),
            SalaryComponent::new(ComponentType::FixedAllowance, 2_000_000.0),
        ]);
        assert_eq!(e.gross_salary(), 10_000_000.0);
    }

    #[test]
    fn gross_excludes_variable_and_inactive() {
        let mut inactive = SalaryComponent::new(ComponentType::FixedAllowance, 500_000.0);
        inactive.is_active = false;
        let e = employee(vec![
            SalaryComponent::new(ComponentType::BasicSalary, 8_000_000.0),
            SalaryComponent::new(ComponentType::Variable, 3_000_000.0),
            inactive,
        ]);
        assert_eq!(e.gross_salary(), 8_000_000.0);
    }

    #[test]
    fn component_type_round_trips_through_str() {
        for t in [
            ComponentType::BasicSalary,
            ComponentType::FixedAllowance,
            ComponentType::Variable,
        ] {
            assert_eq!(t.as_str().parse::<ComponentType>().unwrap(), t);
        }
        assert!("bonus".parse::<ComponentType>().is_err());
    }

    #[test]
    fn filter_matches_on_both_fields() {
        let e = employee(vec![]);
        assert!(EmployeeFilter::default().matches(&e));
        let by_dept = EmployeeFilter {
            department: Some("Finance".to_string()),
            position: None,
        };
        assert!(by_dept.matches(&e));
        let mismatch = EmployeeFilter {
            department: Some("Finance".to_string()),
            position: Some("Manager".to_string()),
        };
        assert!(!mismatch.matches(&e));
    }
}
