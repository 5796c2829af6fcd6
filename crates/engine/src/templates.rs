//! Template CRUD and application.

use chrono::Utc;
use payroll_core::calculator::AdjustmentConfig;
use payroll_core::error::CoreError;
use payroll_core::selection::AdjustmentSession;
use payroll_core::template::{
    sort_for_listing, validate_create, validate_update, CreateTemplate, OperationTemplate,
    UpdateTemplate,
};
use payroll_core::types::DbId;

use crate::PayrollEngine;

fn template_not_found(id: DbId) -> CoreError {
    CoreError::NotFound {
        entity: "OperationTemplate",
        id,
    }
}

impl PayrollEngine {
    pub async fn create_template(
        &self,
        input: &CreateTemplate,
    ) -> Result<OperationTemplate, CoreError> {
        validate_create(input)?;
        let template = self.templates.create(input).await?;
        tracing::info!(template_id = template.id, name = %template.name, "Template created");
        Ok(template)
    }

    pub async fn get_template(&self, id: DbId) -> Result<OperationTemplate, CoreError> {
        self.templates
            .get(id)
            .await?
            .ok_or_else(|| template_not_found(id))
    }

    /// All templates, favorites first, then most used.
    pub async fn list_templates(&self) -> Result<Vec<OperationTemplate>, CoreError> {
        let mut templates = self.templates.list().await?;
        sort_for_listing(&mut templates);
        Ok(templates)
    }

    pub async fn update_template(
        &self,
        id: DbId,
        input: &UpdateTemplate,
    ) -> Result<OperationTemplate, CoreError> {
        let current = self.get_template(id).await?;
        validate_update(&current, input)?;
        self.templates
            .update(id, input)
            .await?
            .ok_or_else(|| template_not_found(id))
    }

    pub async fn delete_template(&self, id: DbId) -> Result<(), CoreError> {
        if self.templates.delete(id).await? {
            tracing::info!(template_id = id, "Template deleted");
            Ok(())
        } else {
            Err(template_not_found(id))
        }
    }

    /// Flip the favorite flag and return the updated template.
    pub async fn toggle_favorite(&self, id: DbId) -> Result<OperationTemplate, CoreError> {
        let current = self.get_template(id).await?;
        self.templates.set_favorite(id, !current.is_favorite).await?;
        self.get_template(id).await
    }

    /// Hydrate `session` from a template.
    ///
    /// The template's configuration becomes the pending configuration. A
    /// department filter re-runs department selection; otherwise a position
    /// filter re-runs position selection; with neither the selection is
    /// left untouched. Usage is recorded on every apply.
    pub async fn apply_template(
        &self,
        template_id: DbId,
        session: &mut AdjustmentSession,
    ) -> Result<AdjustmentConfig, CoreError> {
        let template = self.get_template(template_id).await?;
        let config = template.to_config();
        config.validate()?;

        match (&template.department_filter, &template.position_filter) {
            (Some(department), _) => {
                let roster = self.roster().await?;
                session.selection.select_by_department(&roster, department);
            }
            (None, Some(position)) => {
                let roster = self.roster().await?;
                session.selection.select_by_position(&roster, position);
            }
            (None, None) => {}
        }
        session.config = Some(config.clone());

        self.templates.record_usage(template_id, Utc::now()).await?;
        tracing::debug!(
            template_id,
            selected = session.selection.len(),
            "Template applied",
        );
        Ok(config)
    }
}
