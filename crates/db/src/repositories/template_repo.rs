//! Repository for the `operation_templates` table.

use payroll_core::template::{CreateTemplate, UpdateTemplate};
use payroll_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::status::OperationTypeId;
use crate::models::template::OperationTemplateRow;

const COLUMNS: &str = "id, name, description, operation_type_id, adjustment_type, \
    adjustment_value, department_filter, position_filter, default_reason, is_favorite, \
    usage_count, created_by, created_at, updated_at, last_used_at";

pub struct TemplateRepo;

impl TemplateRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateTemplate,
    ) -> Result<OperationTemplateRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO operation_templates \
                (name, description, operation_type_id, adjustment_type, adjustment_value, \
                 department_filter, position_filter, default_reason, is_favorite, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OperationTemplateRow>(&query)
            .bind(input.name.trim())
            .bind(&input.description)
            .bind(OperationTypeId::from(input.operation_type).id())
            .bind(input.adjustment_type.as_str())
            .bind(input.adjustment_value)
            .bind(&input.department_filter)
            .bind(&input.position_filter)
            .bind(&input.default_reason)
            .bind(input.is_favorite)
            .bind(&input.created_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<OperationTemplateRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM operation_templates WHERE id = $1");
        sqlx::query_as::<_, OperationTemplateRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All templates: favorites first, then most used, then by name.
    pub async fn list(pool: &PgPool) -> Result<Vec<OperationTemplateRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM operation_templates \
             ORDER BY is_favorite DESC, usage_count DESC, name"
        );
        sqlx::query_as::<_, OperationTemplateRow>(&query)
            .fetch_all(pool)
            .await
    }

    /// Update a template. Only non-`None` fields are applied.
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateTemplate,
    ) -> Result<Option<OperationTemplateRow>, sqlx::Error> {
        let query = format!(
            "UPDATE operation_templates SET \
                name = COALESCE($2, name), \
                description = COALESCE($3, description), \
                adjustment_type = COALESCE($4, adjustment_type), \
                adjustment_value = COALESCE($5, adjustment_value), \
                department_filter = COALESCE($6, department_filter), \
                position_filter = COALESCE($7, position_filter), \
                default_reason = COALESCE($8, default_reason), \
                updated_at = now() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OperationTemplateRow>(&query)
            .bind(id)
            .bind(input.name.as_deref().map(str::trim))
            .bind(&input.description)
            .bind(input.adjustment_type.map(|t| t.as_str()))
            .bind(input.adjustment_value)
            .bind(&input.department_filter)
            .bind(&input.position_filter)
            .bind(&input.default_reason)
            .fetch_optional(pool)
            .await
    }

    /// Delete a template. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM operation_templates WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Increment the usage counter. Returns `false` if the template is missing.
    pub async fn record_usage(
        pool: &PgPool,
        id: DbId,
        used_at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE operation_templates \
             SET usage_count = usage_count + 1, last_used_at = $2 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(used_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set the favorite flag. Returns `false` if the template is missing.
    pub async fn set_favorite(
        pool: &PgPool,
        id: DbId,
        is_favorite: bool,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE operation_templates SET is_favorite = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(is_favorite)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
