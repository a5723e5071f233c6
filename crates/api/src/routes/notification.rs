//! Route definitions for the `/notifications` resource.
//!
//! All endpoints require authentication.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::notification;
use crate::state::AppState;

/// Routes mounted at `/notifications`.
///
/// ```text
/// GET    /                  -> list_notifications
/// POST   /read              -> mark_all_read
/// POST   /handle-reassign   -> handle_reassign
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(notification::list_notifications))
        .route("/read", post(notification::mark_all_read))
        .route("/handle-reassign", post(notification::handle_reassign))
}
