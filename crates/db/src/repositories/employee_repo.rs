//! Repository for the `employees` and `salary_components` tables.

use payroll_core::employee::{EmployeeFilter, SalaryComponent};
use payroll_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::employee::{EmployeeRow, SalaryComponentRow};

const COLUMNS: &str = "id, name, department, position";

const COMPONENT_COLUMNS: &str =
    "id, employee_id, component_type, amount, is_active, sort_order";

pub struct EmployeeRepo;

impl EmployeeRepo {
    /// Employees matching the optional department/position filter, by id.
    pub async fn list(
        pool: &PgPool,
        filter: &EmployeeFilter,
    ) -> Result<Vec<EmployeeRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM employees \
             WHERE ($1::TEXT IS NULL OR department = $1) \
               AND ($2::TEXT IS NULL OR position = $2) \
             ORDER BY id"
        );
        sqlx::query_as::<_, EmployeeRow>(&query)
            .bind(&filter.department)
            .bind(&filter.position)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<EmployeeRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM employees WHERE id = $1");
        sqlx::query_as::<_, EmployeeRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Components of the given employees, ordered by employee then `sort_order`.
    pub async fn components_for(
        pool: &PgPool,
        employee_ids: &[DbId],
    ) -> Result<Vec<SalaryComponentRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COMPONENT_COLUMNS} FROM salary_components \
             WHERE employee_id = ANY($1) \
             ORDER BY employee_id, sort_order, id"
        );
        sqlx::query_as::<_, SalaryComponentRow>(&query)
            .bind(employee_ids)
            .fetch_all(pool)
            .await
    }

    /// Components of one employee, read on the caller's connection so a
    /// transaction holding the employee lock sees a consistent set.
    pub async fn components_of(
        conn: &mut PgConnection,
        employee_id: DbId,
    ) -> Result<Vec<SalaryComponentRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COMPONENT_COLUMNS} FROM salary_components \
             WHERE employee_id = $1 \
             ORDER BY sort_order, id"
        );
        sqlx::query_as::<_, SalaryComponentRow>(&query)
            .bind(employee_id)
            .fetch_all(&mut *conn)
            .await
    }

    /// Lock the employee row for the rest of the transaction. Returns
    /// `false` when the employee does not exist.
    pub async fn lock(conn: &mut PgConnection, id: DbId) -> Result<bool, sqlx::Error> {
        let found =
            sqlx::query_scalar::<_, DbId>("SELECT id FROM employees WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;
        Ok(found.is_some())
    }

    /// Replace all salary components of one employee.
    pub async fn replace_components(
        conn: &mut PgConnection,
        employee_id: DbId,
        components: &[SalaryComponent],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM salary_components WHERE employee_id = $1")
            .bind(employee_id)
            .execute(&mut *conn)
            .await?;

        for (position, component) in components.iter().enumerate() {
            sqlx::query(
                "INSERT INTO salary_components \
                    (employee_id, component_type, amount, is_active, sort_order) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(employee_id)
            .bind(component.component_type.as_str())
            .bind(component.amount)
            .bind(component.is_active)
            .bind(position as i32)
            .execute(&mut *conn)
            .await?;
        }

        sqlx::query("UPDATE employees SET updated_at = now() WHERE id = $1")
            .bind(employee_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
