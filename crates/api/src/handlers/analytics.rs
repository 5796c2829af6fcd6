use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use payroll_engine::AnalyticsQuery;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/analytics?from=&to=&top=
///
/// Totals, success rate, department impact, monthly trend, and the most
/// costly operations over the optional `created_at` range.
pub async fn get_analytics(
    State(state): State<AppState>,
    query: Result<Query<AnalyticsQuery>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(params) = query?;
    let summary = state.engine.analytics(&params).await?;
    Ok(Json(DataResponse { data: summary }))
}
