//! Operation template rows.

use payroll_core::calculator::AdjustmentType;
use payroll_core::error::CoreError;
use payroll_core::template::OperationTemplate;
use payroll_core::types::{DbId, Timestamp};
use sqlx::FromRow;

use super::status::{self, StatusId};

/// A row from the `operation_templates` table.
#[derive(Debug, Clone, FromRow)]
pub struct OperationTemplateRow {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub operation_type_id: StatusId,
    pub adjustment_type: String,
    pub adjustment_value: f64,
    pub department_filter: Option<String>,
    pub position_filter: Option<String>,
    pub default_reason: Option<String>,
    pub is_favorite: bool,
    pub usage_count: i32,
    pub created_by: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub last_used_at: Option<Timestamp>,
}

impl OperationTemplateRow {
    pub fn into_domain(self) -> Result<OperationTemplate, CoreError> {
        let adjustment_type: AdjustmentType = self.adjustment_type.parse().map_err(|_| {
            CoreError::Internal(format!(
                "Template {} has unknown adjustment type '{}'",
                self.id, self.adjustment_type
            ))
        })?;
        Ok(OperationTemplate {
            id: self.id,
            name: self.name,
            description: self.description,
            operation_type: status::operation_type(self.operation_type_id)?,
            adjustment_type,
            adjustment_value: self.adjustment_value,
            department_filter: self.department_filter,
            position_filter: self.position_filter,
            default_reason: self.default_reason,
            is_favorite: self.is_favorite,
            usage_count: self.usage_count,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_used_at: self.last_used_at,
        })
    }
}
