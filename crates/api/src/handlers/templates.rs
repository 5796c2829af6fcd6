//! Handlers for the `/templates` resource.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use payroll_core::preview::PreviewResult;
use payroll_core::selection::AdjustmentSession;
use payroll_core::template::{CreateTemplate, UpdateTemplate};
use payroll_core::types::DbId;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /templates/{id}/apply`.
#[derive(Debug, Default, Deserialize)]
pub struct ApplyTemplateRequest {
    /// The caller's current session; empty when omitted.
    #[serde(default)]
    pub session: AdjustmentSession,
}

/// The hydrated session, previewed when it selects anyone.
#[derive(Debug, Serialize)]
pub struct AppliedTemplate {
    pub session: AdjustmentSession,
    pub preview: Option<PreviewResult>,
}

/// GET /api/v1/templates
///
/// Favorites first, then by usage.
pub async fn list_templates(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let templates = state.engine.list_templates().await?;
    Ok(Json(DataResponse { data: templates }))
}

/// POST /api/v1/templates
pub async fn create_template(
    State(state): State<AppState>,
    payload: Result<Json<CreateTemplate>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    let template = state.engine.create_template(&input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: template })))
}

/// GET /api/v1/templates/{id}
pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let template = state.engine.get_template(id).await?;
    Ok(Json(DataResponse { data: template }))
}

/// PUT /api/v1/templates/{id}
pub async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    payload: Result<Json<UpdateTemplate>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    let template = state.engine.update_template(id, &input).await?;
    Ok(Json(DataResponse { data: template }))
}

/// DELETE /api/v1/templates/{id}
pub async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    state.engine.delete_template(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/templates/{id}/apply
///
/// Hydrate the caller's session from the template and record the usage.
pub async fn apply_template(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    payload: Result<Json<ApplyTemplateRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    let mut session = input.session;
    state.engine.apply_template(id, &mut session).await?;

    let preview = if session.selection.is_empty() {
        None
    } else {
        Some(state.engine.preview_session(&session).await?)
    };
    Ok(Json(DataResponse {
        data: AppliedTemplate { session, preview },
    }))
}

/// POST /api/v1/templates/{id}/favorite
///
/// Toggle the favorite flag.
pub async fn toggle_favorite(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let template = state.engine.toggle_favorite(id).await?;
    Ok(Json(DataResponse { data: template }))
}
