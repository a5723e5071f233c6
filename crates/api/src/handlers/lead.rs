//! Handlers for the `/leads` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use leadflow_core::types::DbId;
use leadflow_db::models::lead::{CreateLead, Lead, UpdateLead};
use serde::Deserialize;

use crate::error::AppResult;
use crate::extract::AppJson;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `PATCH /leads/{id}/status`. A missing status is rejected by the
/// service rather than by deserialization, so the client gets a 400 with a
/// readable message.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: Option<String>,
}

/// POST /api/v1/leads
pub async fn create_lead(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(input): AppJson<CreateLead>,
) -> AppResult<impl IntoResponse> {
    let lead = state.leads.create(input, auth.actor()).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: lead })))
}

/// GET /api/v1/leads
pub async fn list_leads(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<Lead>>>> {
    let data = state.leads.list().await?;
    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/leads/{id}
pub async fn get_lead(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Lead>>> {
    let data = state.leads.get(id).await?;
    Ok(Json(DataResponse { data }))
}

/// PUT /api/v1/leads/{id}
pub async fn update_lead(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    AppJson(changes): AppJson<UpdateLead>,
) -> AppResult<Json<DataResponse<Lead>>> {
    let data = state.leads.update(id, changes, auth.actor()).await?;
    Ok(Json(DataResponse { data }))
}

/// PATCH /api/v1/leads/{id}/status
pub async fn update_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    AppJson(body): AppJson<StatusUpdate>,
) -> AppResult<Json<DataResponse<Lead>>> {
    let data = state
        .leads
        .update_status(id, body.status, auth.actor())
        .await?;
    Ok(Json(DataResponse { data }))
}

/// DELETE /api/v1/leads/{id}
pub async fn delete_lead(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    state.leads.delete(id, user.actor()).await?;
    Ok(StatusCode::NO_CONTENT)
}
