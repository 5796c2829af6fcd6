//! Route definitions for the `/operations` resource, including rollback.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{operations, rollback};
use crate::state::AppState;

/// Routes mounted at `/operations`.
///
/// ```text
/// GET    /                     -> list_operations
/// POST   /                     -> create_operation
/// GET    /{id}                 -> get_operation
/// POST   /{id}/execute         -> execute_operation (202)
/// GET    /{id}/progress        -> get_progress
/// GET    /{id}/rollback-plan   -> get_rollback_plan
/// POST   /{id}/rollback        -> execute_rollback (202)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(operations::list_operations).post(operations::create_operation),
        )
        .route("/{id}", get(operations::get_operation))
        .route("/{id}/execute", post(operations::execute_operation))
        .route("/{id}/progress", get(operations::get_progress))
        .route("/{id}/rollback-plan", get(rollback::get_rollback_plan))
        .route("/{id}/rollback", post(rollback::execute_rollback))
}
