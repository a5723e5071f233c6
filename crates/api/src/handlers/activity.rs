//! Handlers for the caller's own activity log.

use axum::extract::State;
use axum::Json;

use crate::engine::ActivitySummary;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/users/activity
pub async fn get_activity(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<ActivitySummary>>> {
    let data = state.activity.get_activity(auth.user_id).await?;
    Ok(Json(DataResponse { data }))
}

/// DELETE /api/v1/users/activity
///
/// Clears only the caller's entries. The clear itself is not logged.
pub async fn clear_activity(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<serde_json::Value>> {
    let deleted = state.activity.clear_history(auth.user_id).await?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}
