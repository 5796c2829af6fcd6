//! Analytics over the operation history.

use chrono::{DateTime, Utc};
use payroll_core::analytics::{summarize, AnalyticsSummary, DEFAULT_TOP_N};
use payroll_core::error::CoreError;
use payroll_core::operation::OperationFilter;
use serde::{Deserialize, Serialize};

use crate::PayrollEngine;

/// Date range (on `created_at`, inclusive) and ranking size.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub top: Option<usize>,
}

impl PayrollEngine {
    pub async fn analytics(&self, query: &AnalyticsQuery) -> Result<AnalyticsSummary, CoreError> {
        if let (Some(from), Some(to)) = (query.from, query.to) {
            if from > to {
                return Err(CoreError::Validation(format!(
                    "Range start {from} is after range end {to}"
                )));
            }
        }

        let operations = self
            .history
            .query_operations(&OperationFilter {
                created_from: query.from,
                created_to: query.to,
                ..Default::default()
            })
            .await?;

        let mut details = Vec::with_capacity(operations.len());
        for op in &operations {
            match self.history.get_operation_by_id(op.id).await? {
                Some(detail) => details.push(detail),
                None => tracing::warn!(operation_id = op.id, "Operation vanished during analytics"),
            }
        }

        Ok(summarize(
            &details,
            self.config.rollback.high_impact_threshold,
            query.top.unwrap_or(DEFAULT_TOP_N),
        ))
    }
}
