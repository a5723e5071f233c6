//! Handlers for the `/notifications` resource.

use axum::extract::State;
use axum::Json;
use leadflow_core::reassignment::ReassignAction;
use leadflow_core::types::DbId;
use leadflow_db::models::notification::Notification;
use serde::Deserialize;

use crate::engine::DecisionResult;
use crate::error::AppResult;
use crate::extract::AppJson;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireSuperAdmin;
use crate::response::{DataResponse, SuccessResponse};
use crate::state::AppState;

/// Body of `POST /notifications/handle-reassign`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleReassignRequest {
    pub notification_id: DbId,
    pub action: ReassignAction,
}

/// GET /api/v1/notifications
///
/// The authenticated user's notifications, newest first.
pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<Notification>>>> {
    let data = state.notifications.list_for(auth.user_id).await?;
    Ok(Json(DataResponse { data }))
}

/// POST /api/v1/notifications/read
///
/// Mark everything read except reassignment requests still awaiting a
/// decision. Returns the number of rows updated.
pub async fn mark_all_read(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<serde_json::Value>> {
    let updated = state.notifications.mark_all_read(auth.user_id).await?;
    Ok(Json(serde_json::json!({ "updated": updated })))
}

/// POST /api/v1/notifications/handle-reassign
pub async fn handle_reassign(
    RequireSuperAdmin(user): RequireSuperAdmin,
    State(state): State<AppState>,
    AppJson(body): AppJson<HandleReassignRequest>,
) -> AppResult<Json<SuccessResponse<DecisionResult>>> {
    let result = state
        .reassignments
        .handle_reassign_request(body.notification_id, body.action, user.actor())
        .await?;
    Ok(Json(SuccessResponse::new(result)))
}
