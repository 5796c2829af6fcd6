//! Handlers for the `/operations` resource.
//!
//! Execution is accepted synchronously (the operation is moved to
//! `executing` before the response) and the items are processed on a
//! spawned task. Clients follow along via the progress endpoint.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use payroll_core::calculator::AdjustmentConfig;
use payroll_core::operation::{OperationFilter, OperationMetadata, OperationStatus, OperationType};
use payroll_core::selection::SelectionRequest;
use payroll_core::types::DbId;
use payroll_engine::StartedOperation;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::progress::OperationProgress;
use crate::response::DataResponse;
use crate::state::AppState;

/// Default page size for operation listings.
const DEFAULT_LIST_LIMIT: i64 = 100;

/// Upper bound on a single listing.
const MAX_LIST_LIMIT: i64 = 500;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of `POST /operations`: what to adjust plus who and when.
#[derive(Debug, Deserialize)]
pub struct CreateOperationRequest {
    pub selection: SelectionRequest,
    pub adjustment: AdjustmentConfig,
    #[serde(flatten)]
    pub metadata: OperationMetadata,
}

/// Query parameters for `GET /operations`.
#[derive(Debug, Default, Deserialize)]
pub struct OperationListQuery {
    pub status: Option<OperationStatus>,
    pub operation_type: Option<OperationType>,
    pub employee_id: Option<DbId>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

impl OperationListQuery {
    fn into_filter(self) -> OperationFilter {
        OperationFilter {
            created_from: self.from,
            created_to: self.to,
            status: self.status,
            operation_type: self.operation_type,
            employee_id: self.employee_id,
            completed_after: None,
            limit: Some(
                self.limit
                    .unwrap_or(DEFAULT_LIST_LIMIT)
                    .clamp(1, MAX_LIST_LIMIT),
            ),
        }
    }
}

/// Body of `POST /operations/{id}/execute`.
#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub executed_by: String,
}

/// Returned with `202 Accepted` when execution has started.
#[derive(Debug, Serialize)]
pub struct ExecutionAccepted {
    pub operation_id: DbId,
    pub status: OperationStatus,
    pub total_items: usize,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Run a started operation on a background task.
pub(crate) fn spawn_execution(state: &AppState, started: StartedOperation) -> ExecutionAccepted {
    let accepted = ExecutionAccepted {
        operation_id: started.operation_id(),
        status: OperationStatus::Executing,
        total_items: started.total_items(),
    };

    let engine = state.engine.clone();
    state.executions.spawn(async move {
        let result = engine.run_operation(started, |_| {}).await;
        tracing::debug!(
            operation_id = result.operation_id,
            status = result.status.as_str(),
            "Background execution finished",
        );
    });

    accepted
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/operations
///
/// Operation history, newest first. Supports `status`, `operation_type`,
/// `employee_id`, `from`, `to`, and `limit` query parameters.
pub async fn list_operations(
    State(state): State<AppState>,
    query: Result<Query<OperationListQuery>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(params) = query?;
    let operations = state.engine.list_operations(&params.into_filter()).await?;
    Ok(Json(DataResponse { data: operations }))
}

/// POST /api/v1/operations
///
/// Re-compute the preview server-side and persist it as a `created`
/// operation. Returns 201 with the operation and its pending items.
pub async fn create_operation(
    State(state): State<AppState>,
    payload: Result<Json<CreateOperationRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    let selection = state.engine.resolve_selection(&input.selection).await?;
    let preview = state
        .engine
        .preview_adjustment(&selection, &input.adjustment)
        .await?;
    let id = state
        .engine
        .create_operation(&input.metadata, &preview)
        .await?;
    let detail = state.engine.get_operation(id).await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: detail })))
}

/// GET /api/v1/operations/{id}
pub async fn get_operation(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let detail = state.engine.get_operation(id).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// POST /api/v1/operations/{id}/execute
///
/// Returns 202 once the operation is `executing`; 404 for unknown ids and
/// 409 when the operation is not `created`.
pub async fn execute_operation(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    let started = state
        .engine
        .start_operation(id, input.executed_by.trim())
        .await?;
    let accepted = spawn_execution(&state, started);

    tracing::info!(
        operation_id = id,
        executed_by = %input.executed_by,
        "Bulk operation execution accepted",
    );
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: accepted })))
}

/// GET /api/v1/operations/{id}/progress
pub async fn get_progress(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let detail = state.engine.get_operation(id).await?;
    // Stored counters win once the run has finished; the tracker may still
    // be draining the final events.
    let progress = match state.progress.get(id).await {
        Some(live) if !detail.operation.status.is_terminal() => live,
        _ => OperationProgress::from_operation(&detail.operation),
    };
    Ok(Json(DataResponse { data: progress }))
}
