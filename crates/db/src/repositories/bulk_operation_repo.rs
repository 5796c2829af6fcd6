//! Repository for the `bulk_operations` table.

use payroll_core::operation::{NewBulkOperation, OperationFilter};
use payroll_core::store::OperationUpdate;
use payroll_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::bulk_operation::BulkOperationRow;
use crate::models::status::{OperationStatusId, OperationTypeId, StatusId};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, operation_type_id, name, description, adjustment_type, \
    adjustment_value, effective_date, status_id, employee_ids, total_employees_affected, \
    total_cost_impact, created_by, executed_by, created_at, started_at, completed_at, \
    successful_items, failed_items, rollback_of_operation_id, reason";

pub struct BulkOperationRepo;

impl BulkOperationRepo {
    /// Insert an operation in `created` status, returning its id.
    pub async fn create(
        conn: &mut PgConnection,
        body: &NewBulkOperation,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO bulk_operations \
                (operation_type_id, name, description, adjustment_type, adjustment_value, \
                 effective_date, status_id, employee_ids, total_employees_affected, \
                 total_cost_impact, created_by, rollback_of_operation_id, reason) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, cardinality($8::BIGINT[]), $9, $10, $11, $12) \
             RETURNING id",
        )
        .bind(OperationTypeId::from(body.operation_type).id())
        .bind(&body.name)
        .bind(&body.description)
        .bind(body.adjustment_type.as_str())
        .bind(body.adjustment_value)
        .bind(body.effective_date)
        .bind(OperationStatusId::Created.id())
        .bind(&body.employee_ids)
        .bind(body.total_cost_impact)
        .bind(&body.created_by)
        .bind(body.rollback_of_operation_id)
        .bind(&body.reason)
        .fetch_one(&mut *conn)
        .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<BulkOperationRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM bulk_operations WHERE id = $1");
        sqlx::query_as::<_, BulkOperationRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Current status, locking the row for the rest of the transaction.
    pub async fn lock_status(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<StatusId>, sqlx::Error> {
        sqlx::query_scalar::<_, StatusId>(
            "SELECT status_id FROM bulk_operations WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
    }

    /// Write a new status with its counts and timestamps. `None` timestamps
    /// and actor leave the stored value untouched.
    pub async fn update_status(
        conn: &mut PgConnection,
        id: DbId,
        status_id: StatusId,
        update: &OperationUpdate,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE bulk_operations SET \
                status_id = $2, \
                successful_items = $3, \
                failed_items = $4, \
                executed_by = COALESCE($5, executed_by), \
                started_at = COALESCE($6, started_at), \
                completed_at = COALESCE($7, completed_at) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(status_id)
        .bind(update.counts.successful_items)
        .bind(update.counts.failed_items)
        .bind(&update.executed_by)
        .bind(update.started_at)
        .bind(update.completed_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Operations matching `filter`, newest first.
    pub async fn query(
        pool: &PgPool,
        filter: &OperationFilter,
    ) -> Result<Vec<BulkOperationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM bulk_operations \
             WHERE ($1::TIMESTAMPTZ IS NULL OR created_at >= $1) \
               AND ($2::TIMESTAMPTZ IS NULL OR created_at <= $2) \
               AND ($3::SMALLINT IS NULL OR status_id = $3) \
               AND ($4::SMALLINT IS NULL OR operation_type_id = $4) \
               AND ($5::BIGINT IS NULL OR $5 = ANY(employee_ids)) \
               AND ($6::TIMESTAMPTZ IS NULL OR completed_at > $6) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $7"
        );
        sqlx::query_as::<_, BulkOperationRow>(&query)
            .bind(filter.created_from)
            .bind(filter.created_to)
            .bind(filter.status.map(|s| OperationStatusId::from(s).id()))
            .bind(filter.operation_type.map(|t| OperationTypeId::from(t).id()))
            .bind(filter.employee_id)
            .bind(filter.completed_after)
            .bind(filter.limit)
            .fetch_all(pool)
            .await
    }
}
