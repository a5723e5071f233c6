//! Handlers for the `/assigns` resource.
//!
//! Role gates are applied twice: the extractor rejects callers below the
//! route's minimum role, and the engine re-checks the finer rules
//! (super-admin override, admin-only requests).

use axum::extract::{Path, State};
use axum::Json;
use leadflow_core::types::DbId;
use leadflow_db::models::assignment::LeadAssignment;
use serde::Deserialize;

use crate::engine::{BulkAssignResult, UnassignResult};
use crate::error::AppResult;
use crate::extract::AppJson;
use crate::middleware::rbac::{RequireAdmin, RequireSuperAdmin};
use crate::response::{DataResponse, MessageResponse, SuccessResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub assignee_ids: Vec<DbId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAssignRequest {
    pub lead_ids: Vec<DbId>,
    pub assignee_ids: Vec<DbId>,
}

// ---------------------------------------------------------------------------
// Assignment writes
// ---------------------------------------------------------------------------

/// POST /api/v1/assigns/{lead_id}/assign
///
/// Replace the lead's active assignees with `assigneeIds`.
pub async fn assign_lead(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    Path(lead_id): Path<DbId>,
    AppJson(body): AppJson<AssignRequest>,
) -> AppResult<Json<SuccessResponse<Vec<LeadAssignment>>>> {
    let rows = state
        .assignments
        .assign_lead(lead_id, &body.assignee_ids, user.actor())
        .await?;
    Ok(Json(SuccessResponse::new(rows)))
}

/// POST /api/v1/assigns/bulk-assign
///
/// Assign the same users to many leads. Per-lead outcomes are reported in
/// the result according to the configured failure policy.
pub async fn bulk_assign(
    RequireSuperAdmin(user): RequireSuperAdmin,
    State(state): State<AppState>,
    AppJson(body): AppJson<BulkAssignRequest>,
) -> AppResult<Json<SuccessResponse<BulkAssignResult>>> {
    let result = state
        .assignments
        .bulk_assign_leads(&body.lead_ids, &body.assignee_ids, user.actor())
        .await?;
    Ok(Json(SuccessResponse::new(result)))
}

/// DELETE /api/v1/assigns/{lead_id}/assignees/{user_id}
///
/// Removing a user who is not assigned succeeds with `removed: false`.
pub async fn unassign_user(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    Path((lead_id, user_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<SuccessResponse<UnassignResult>>> {
    let result = state
        .assignments
        .unassign_user(lead_id, user_id, user.actor())
        .await?;
    Ok(Json(SuccessResponse::new(result)))
}

/// POST /api/v1/assigns/{lead_id}/reassign-request
pub async fn request_reassignment(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    Path(lead_id): Path<DbId>,
) -> AppResult<Json<MessageResponse>> {
    let outcome = state
        .reassignments
        .request_reassignment(lead_id, user.actor())
        .await?;
    Ok(Json(MessageResponse {
        success: true,
        message: outcome.message,
    }))
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// GET /api/v1/assigns/{lead_id}/assignments
pub async fn list_assignments(
    RequireAdmin(_user): RequireAdmin,
    State(state): State<AppState>,
    Path(lead_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<LeadAssignment>>>> {
    let data = state.assignments.list_assignments(lead_id).await?;
    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/assigns
pub async fn list_all_assignments(
    RequireAdmin(_user): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<LeadAssignment>>>> {
    let data = state.assignments.list_all_assignments().await?;
    Ok(Json(DataResponse { data }))
}
