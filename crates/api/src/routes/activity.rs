use axum::routing::get;
use axum::Router;

use crate::handlers::activity;
use crate::state::AppState;

/// Routes mounted at `/users`.
///
/// ```text
/// GET    /activity    -> get_activity
/// DELETE /activity    -> clear_activity
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/activity",
        get(activity::get_activity).delete(activity::clear_activity),
    )
}
