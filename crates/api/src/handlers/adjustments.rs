//! Handlers for `/adjustments`: read-only previews.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use payroll_core::calculator::AdjustmentConfig;
use payroll_core::selection::SelectionRequest;
use serde::Deserialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /adjustments/preview`.
#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub selection: SelectionRequest,
    pub adjustment: AdjustmentConfig,
}

/// POST /api/v1/adjustments/preview
///
/// Resolve the selection and compute every employee's new salary. Nothing
/// is persisted.
pub async fn preview(
    State(state): State<AppState>,
    payload: Result<Json<PreviewRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    let selection = state.engine.resolve_selection(&input.selection).await?;
    let preview = state
        .engine
        .preview_adjustment(&selection, &input.adjustment)
        .await?;
    Ok(Json(DataResponse { data: preview }))
}
