use axum::routing::post;
use axum::Router;

use crate::handlers::adjustments;
use crate::state::AppState;

/// Routes mounted at `/adjustments`.
///
/// ```text
/// POST   /preview         -> preview
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/preview", post(adjustments::preview))
}
