//! Employee and salary component rows.

use payroll_core::employee::{ComponentType, Employee, SalaryComponent};
use payroll_core::error::CoreError;
use payroll_core::types::DbId;
use sqlx::FromRow;

/// A row from the `employees` table.
#[derive(Debug, Clone, FromRow)]
pub struct EmployeeRow {
    pub id: DbId,
    pub name: String,
    pub department: String,
    pub position: String,
}

/// A row from the `salary_components` table.
#[derive(Debug, Clone, FromRow)]
pub struct SalaryComponentRow {
    pub id: DbId,
    pub employee_id: DbId,
    pub component_type: String,
    pub amount: f64,
    pub is_active: bool,
    pub sort_order: i32,
}

impl SalaryComponentRow {
    pub fn into_domain(self) -> Result<SalaryComponent, CoreError> {
        let component_type: ComponentType = self.component_type.parse().map_err(|_| {
            CoreError::Internal(format!(
                "Salary component {} has unknown type '{}'",
                self.id, self.component_type
            ))
        })?;
        Ok(SalaryComponent {
            component_type,
            amount: self.amount,
            is_active: self.is_active,
        })
    }
}

impl EmployeeRow {
    /// Attach this employee's components (already in `sort_order`).
    pub fn into_domain(self, components: Vec<SalaryComponentRow>) -> Result<Employee, CoreError> {
        let components = components
            .into_iter()
            .map(SalaryComponentRow::into_domain)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Employee {
            id: self.id,
            name: self.name,
            department: self.department,
            position: self.position,
            components,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(component_type: &str, amount: f64) -> SalaryComponentRow {
        SalaryComponentRow {
            id: 1,
            employee_id: 7,
            component_type: component_type.to_string(),
            amount,
            is_active: true,
            sort_order: 0,
        }
    }

    #[test]
    fn converts_rows_into_employee() {
        let row = EmployeeRow {
            id: 7,
            name: "Siti".to_string(),
            department: "Finance".to_string(),
            position: "Analyst".to_string(),
        };
        let employee = row
            .into_domain(vec![
                component("basic_salary", 9_000_000.0),
                component("fixed_allowance", 1_000_000.0),
                component("variable", 500_000.0),
            ])
            .unwrap();

        assert_eq!(employee.components.len(), 3);
        assert_eq!(employee.gross_salary(), 10_000_000.0);
    }

    #[test]
    fn unknown_component_type_is_internal_error() {
        let err = component("bonus", 1.0).into_domain().unwrap_err();
        assert!(matches!(err, CoreError::Internal(_)));
    }
}
