pub mod adjustments;
pub mod analytics;
pub mod health;
pub mod operations;
pub mod templates;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /adjustments/preview                  preview (POST)
///
/// /operations                           list, create
/// /operations/{id}                      get
/// /operations/{id}/execute              execute in background (POST)
/// /operations/{id}/progress             live progress
/// /operations/{id}/rollback-plan        rollback plan
/// /operations/{id}/rollback             roll back in background (POST)
///
/// /templates                            list, create
/// /templates/{id}                       get, update, delete
/// /templates/{id}/apply                 hydrate a session (POST)
/// /templates/{id}/favorite              toggle favorite (POST)
///
/// /analytics                            summary (?from=&to=&top=)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/adjustments", adjustments::router())
        .nest("/operations", operations::router())
        .nest("/templates", templates::router())
        .nest("/analytics", analytics::router())
}
