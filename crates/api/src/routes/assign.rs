//! Route definitions for the `/assigns` resource.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::assign;
use crate::state::AppState;

/// Routes mounted at `/assigns`.
///
/// ```text
/// GET    /                                  -> list_all_assignments
/// POST   /bulk-assign                       -> bulk_assign
/// POST   /{lead_id}/assign                  -> assign_lead
/// GET    /{lead_id}/assignments             -> list_assignments
/// POST   /{lead_id}/reassign-request        -> request_reassignment
/// DELETE /{lead_id}/assignees/{user_id}     -> unassign_user
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(assign::list_all_assignments))
        .route("/bulk-assign", post(assign::bulk_assign))
        .route("/{lead_id}/assign", post(assign::assign_lead))
        .route("/{lead_id}/assignments", get(assign::list_assignments))
        .route(
            "/{lead_id}/reassign-request",
            post(assign::request_reassignment),
        )
        .route(
            "/{lead_id}/assignees/{user_id}",
            delete(assign::unassign_user),
        )
}
