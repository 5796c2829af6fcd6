//! Selection resolution and previews against the employee directory.

use payroll_core::calculator::AdjustmentConfig;
use payroll_core::employee::{Employee, EmployeeFilter};
use payroll_core::error::CoreError;
use payroll_core::preview::{build_preview, PreviewResult};
use payroll_core::selection::{AdjustmentSession, Selection, SelectionRequest};

use crate::PayrollEngine;

impl PayrollEngine {
    /// Every employee in the directory.
    pub async fn roster(&self) -> Result<Vec<Employee>, CoreError> {
        self.directory.list(&EmployeeFilter::default()).await
    }

    /// Resolve a declarative selection into concrete employee ids.
    pub async fn resolve_selection(
        &self,
        request: &SelectionRequest,
    ) -> Result<Selection, CoreError> {
        let roster = if request.needs_roster() {
            self.roster().await?
        } else {
            Vec::new()
        };
        Ok(request.resolve(&roster))
    }

    /// Compute the per-employee impact of `config` over `selection`.
    ///
    /// Read-only: nothing is written and no event is published, so the same
    /// inputs over the same directory state always give the same result.
    /// Selected ids missing from the directory are reported in
    /// `skipped_employee_ids` rather than failing the preview.
    pub async fn preview_adjustment(
        &self,
        selection: &Selection,
        config: &AdjustmentConfig,
    ) -> Result<PreviewResult, CoreError> {
        selection.ensure_not_empty()?;
        config.validate()?;

        let mut employees = Vec::with_capacity(selection.len());
        let mut skipped = Vec::new();
        for id in selection.ids() {
            match self.directory.get_by_id(id).await? {
                Some(employee) => employees.push(employee),
                None => {
                    tracing::warn!(employee_id = id, "Selected employee not in directory");
                    skipped.push(id);
                }
            }
        }

        let preview = build_preview(&employees, config, skipped);
        tracing::debug!(
            employees = preview.employee_count,
            total_cost_impact = preview.total_cost_impact,
            "Adjustment preview computed",
        );
        Ok(preview)
    }

    /// Preview the session's current selection and configuration.
    pub async fn preview_session(
        &self,
        session: &AdjustmentSession,
    ) -> Result<PreviewResult, CoreError> {
        let config = session.require_config()?;
        self.preview_adjustment(&session.selection, config).await
    }
}
