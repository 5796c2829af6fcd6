//! Reusable adjustment templates.
//!
//! A template stores an adjustment configuration plus optional selection
//! filters. Applying it hydrates a session's pending configuration and, when
//! a filter is present, re-runs the selection engine with it.

use serde::{Deserialize, Serialize};

use crate::calculator::{validate_adjustment_value, AdjustmentConfig, AdjustmentType};
use crate::error::CoreError;
use crate::operation::{OperationType, MAX_DESCRIPTION_LEN};
use crate::types::{DbId, Timestamp};

/// Maximum length for a template name.
pub const MAX_TEMPLATE_NAME_LEN: usize = 200;

/// A persisted template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationTemplate {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub operation_type: OperationType,
    pub adjustment_type: AdjustmentType,
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

impl OperationTemplate {
    /// The adjustment configuration this template hydrates.
    pub fn to_config(&self) -> AdjustmentConfig {
        AdjustmentConfig {
            adjustment_type: self.adjustment_type,
            adjustment_value: self.adjustment_value,
            reason: self.default_reason.clone(),
        }
    }
}

/// DTO for creating a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTemplate {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_operation_type")]
    pub operation_type: OperationType,
    pub adjustment_type: AdjustmentType,
    pub adjustment_value: f64,
    pub department_filter: Option<String>,
    pub position_filter: Option<String>,
    pub default_reason: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
    pub created_by: String,
}

fn default_operation_type() -> OperationType {
    OperationType::SalaryAdjustment
}

/// DTO for updating a template (all fields optional).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateTemplate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub adjustment_type: Option<AdjustmentType>,
    pub adjustment_value: Option<f64>,
    pub department_filter: Option<String>,
    pub position_filter: Option<String>,
    pub default_reason: Option<String>,
}

/// Validate a template name: non-empty and within length limit.
pub fn validate_template_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation(
            "Template name must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_TEMPLATE_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Template name too long: {} chars (max {MAX_TEMPLATE_NAME_LEN})",
            name.len()
        )));
    }
    Ok(())
}

fn validate_description(description: Option<&str>) -> Result<(), CoreError> {
    if let Some(d) = description {
        if d.len() > MAX_DESCRIPTION_LEN {
            return Err(CoreError::Validation(format!(
                "Description too long: {} chars (max {MAX_DESCRIPTION_LEN})",
                d.len()
            )));
        }
    }
    Ok(())
}

pub fn validate_create(input: &CreateTemplate) -> Result<(), CoreError> {
    validate_template_name(&input.name)?;
    validate_description(input.description.as_deref())?;
    if input.operation_type == OperationType::Rollback {
        return Err(CoreError::Validation(
            "Templates cannot describe rollback operations".to_string(),
        ));
    }
    validate_adjustment_value(input.adjustment_type, input.adjustment_value)
}

/// Validate an update against the template it modifies.
pub fn validate_update(current: &OperationTemplate, input: &UpdateTemplate) -> Result<(), CoreError> {
    if let Some(name) = &input.name {
        validate_template_name(name)?;
    }
    validate_description(input.description.as_deref())?;
    let adjustment_type = input.adjustment_type.unwrap_or(current.adjustment_type);
    let adjustment_value = input.adjustment_value.unwrap_or(current.adjustment_value);
    validate_adjustment_value(adjustment_type, adjustment_value)
}

/// Favorites first, then most used, then by name.
pub fn sort_for_listing(templates: &mut [OperationTemplate]) {
    templates.sort_by(|a, b| {
        b.is_favorite
            .cmp(&a.is_favorite)
            .then(b.usage_count.cmp(&a.usage_count))
            .then_with(|| a.name.cmp(&b.name))
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn create(name: &str, value: f64) -> CreateTemplate {
        CreateTemplate {
            name: name.to_string(),
            description: None,
            operation_type: OperationType::SalaryAdjustment,
            adjustment_type: AdjustmentType::Percentage,
            adjustment_value: value,
            department_filter: Some("Engineering".to_string()),
            position_filter: None,
            default_reason: Some("Annual review".to_string()),
            is_favorite: false,
            created_by: "hr".to_string(),
        }
    }

    fn template(id: DbId, name: &str, favorite: bool, usage: i32) -> OperationTemplate {
        let now = chrono::Utc::now();
        OperationTemplate {
            id,
            name: name.to_string(),
            description: None,
            operation_type: OperationType::SalaryAdjustment,
            adjustment_type: AdjustmentType::Percentage,
            adjustment_value: 5.0,
            department_filter: None,
            position_filter: None,
            default_reason: Some("Merit".to_string()),
            is_favorite: favorite,
            usage_count: usage,
            created_by: "hr".to_string(),
            created_at: now,
            updated_at: now,
            last_used_at: None,
        }
    }

    #[test]
    fn valid_template_passes() {
        assert!(validate_create(&create("Annual 5%", 5.0)).is_ok());
    }

    #[test]
    fn empty_name_rejected() {
        let err = validate_create(&create("", 5.0)).unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn overlong_name_rejected() {
        let name = "x".repeat(MAX_TEMPLATE_NAME_LEN + 1);
        assert!(validate_template_name(&name).is_err());
    }

    #[test]
    fn out_of_range_value_rejected() {
        assert!(validate_create(&create("Too much", 250.0)).is_err());
    }

    #[test]
    fn rollback_templates_rejected() {
        let mut input = create("Undo", 5.0);
        input.operation_type = OperationType::Rollback;
        assert!(validate_create(&input).is_err());
    }

    #[test]
    fn update_checks_merged_value() {
        let current = template(1, "Merit", false, 0);
        let update = UpdateTemplate {
            adjustment_type: Some(AdjustmentType::NewStructure),
            ..Default::default()
        };
        // 5.0 as an absolute salary is positive, so it passes.
        assert!(validate_update(&current, &update).is_ok());
        let bad = UpdateTemplate {
            adjustment_value: Some(-150.0),
            ..Default::default()
        };
        assert!(validate_update(&current, &bad).is_err());
    }

    #[test]
    fn config_carries_default_reason() {
        let config = template(1, "Merit", false, 0).to_config();
        assert_eq!(config.reason.as_deref(), Some("Merit"));
        assert_eq!(config.adjustment_type, AdjustmentType::Percentage);
    }

    #[test]
    fn favorites_sort_first() {
        let mut list = vec![
            template(1, "B", false, 10),
            template(2, "C", true, 0),
            template(3, "A", false, 10),
        ];
        sort_for_listing(&mut list);
        let ids: Vec<DbId> = list.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }
}
