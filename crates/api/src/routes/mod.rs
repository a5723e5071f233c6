pub mod activity;
pub mod assign;
pub mod health;
pub mod lead;
pub mod notification;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /assigns                                      all active assignments (admin+)
/// /assigns/bulk-assign                          bulk assign (super admin)
/// /assigns/{lead_id}/assign                     replace assignees (admin+)
/// /assigns/{lead_id}/assignments                active assignments (admin+)
/// /assigns/{lead_id}/reassign-request           request override (admin)
/// /assigns/{lead_id}/assignees/{user_id}        unassign one user (admin+)
///
/// /notifications                                caller's notifications
/// /notifications/read                           mark all read
/// /notifications/handle-reassign                decide a request (super admin)
///
/// /users/activity                               caller's activity, clear history
///
/// /leads                                        list, create
/// /leads/{id}                                   get, update, delete (admin+)
/// /leads/{id}/status                            status-only update
/// /leads/{id}/live                              WebSocket event stream
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/assigns", assign::router())
        .nest("/notifications", notification::router())
        .nest("/users", activity::router())
        .nest("/leads", lead::router())
}
