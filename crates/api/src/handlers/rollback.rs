//! Handlers for rolling back an operation.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use payroll_core::rollback::RiskLevel;
use payroll_core::types::DbId;
use payroll_engine::RollbackRequest;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::handlers::operations::{spawn_execution, ExecutionAccepted};
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /operations/{id}/rollback`.
#[derive(Debug, Deserialize)]
pub struct ExecuteRollbackRequest {
    #[serde(flatten)]
    pub request: RollbackRequest,
    pub executed_by: String,
}

/// Returned with `202 Accepted` once the rollback operation is executing.
#[derive(Debug, Serialize)]
pub struct RollbackAccepted {
    pub source_operation_id: DbId,
    pub risk_level: RiskLevel,
    pub warnings: Vec<String>,
    #[serde(flatten)]
    pub execution: ExecutionAccepted,
}

/// GET /api/v1/operations/{id}/rollback-plan
///
/// Advisory plan: eligible items, reversal amount, risk, and warnings.
/// 422 when the operation can never be rolled back.
pub async fn get_rollback_plan(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let plan = state.engine.plan_rollback(id).await?;
    Ok(Json(DataResponse { data: plan }))
}

/// POST /api/v1/operations/{id}/rollback
///
/// Build a fresh plan, persist the compensating operation, and execute it
/// in the background. Risk warnings never block; the reason is mandatory.
pub async fn execute_rollback(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    payload: Result<Json<ExecuteRollbackRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    let actor = input.executed_by.trim();

    let plan = state.engine.plan_rollback(id).await?;
    let rollback_id = state
        .engine
        .create_rollback(&plan, &input.request, actor)
        .await?;
    let started = state.engine.start_operation(rollback_id, actor).await?;
    let execution = spawn_execution(&state, started);

    tracing::info!(
        source_operation_id = id,
        rollback_operation_id = rollback_id,
        risk_level = plan.risk_level.as_str(),
        "Rollback accepted",
    );
    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: RollbackAccepted {
                source_operation_id: id,
                risk_level: plan.risk_level,
                warnings: plan.warnings,
                execution,
            },
        }),
    ))
}
