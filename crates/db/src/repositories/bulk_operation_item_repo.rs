//! Repository for the `bulk_operation_items` table.

use payroll_core::operation::NewOperationItem;
use payroll_core::store::ItemUpdate;
use payroll_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::bulk_operation::BulkOperationItemRow;
use crate::models::status::{ItemStatusId, StatusId};

const COLUMNS: &str = "id, operation_id, employee_id, employee_name, department, \
    previous_gross_salary, new_gross_salary, salary_change_amount, item_status_id, \
    component_changes, error, reverses_item_id, processed_at";

pub struct BulkOperationItemRepo;

impl BulkOperationItemRepo {
    /// Insert one `pending` item.
    pub async fn create(
        conn: &mut PgConnection,
        operation_id: DbId,
        item: &NewOperationItem,
        component_changes: &serde_json::Value,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO bulk_operation_items \
                (operation_id, employee_id, employee_name, department, previous_gross_salary, \
                 new_gross_salary, salary_change_amount, item_status_id, component_changes, \
                 reverses_item_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING id",
        )
        .bind(operation_id)
        .bind(item.employee_id)
        .bind(&item.employee_name)
        .bind(&item.department)
        .bind(item.previous_gross_salary)
        .bind(item.new_gross_salary)
        .bind(item.salary_change_amount)
        .bind(ItemStatusId::Pending.id())
        .bind(component_changes)
        .bind(item.reverses_item_id)
        .fetch_one(&mut *conn)
        .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<BulkOperationItemRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM bulk_operation_items WHERE id = $1");
        sqlx::query_as::<_, BulkOperationItemRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All items of an operation, in insertion order.
    pub async fn list_by_operation(
        pool: &PgPool,
        operation_id: DbId,
    ) -> Result<Vec<BulkOperationItemRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM bulk_operation_items \
             WHERE operation_id = $1 \
             ORDER BY id"
        );
        sqlx::query_as::<_, BulkOperationItemRow>(&query)
            .bind(operation_id)
            .fetch_all(pool)
            .await
    }

    /// Current status, locking the row for the rest of the transaction.
    pub async fn lock_status(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<StatusId>, sqlx::Error> {
        sqlx::query_scalar::<_, StatusId>(
            "SELECT item_status_id FROM bulk_operation_items WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
    }

    /// Write the outcome of processing an item.
    pub async fn update_outcome(
        conn: &mut PgConnection,
        id: DbId,
        status_id: StatusId,
        update: &ItemUpdate,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE bulk_operation_items \
             SET item_status_id = $2, error = $3, processed_at = $4 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(status_id)
        .bind(&update.error)
        .bind(update.processed_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Change only the status (used when a rollback reverses the item).
    pub async fn set_status(
        conn: &mut PgConnection,
        id: DbId,
        status_id: StatusId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE bulk_operation_items SET item_status_id = $2 WHERE id = $1")
            .bind(id)
            .bind(status_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
