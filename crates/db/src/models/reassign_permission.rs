use leadflow_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A single-use grant letting `admin_id` override a super-admin-owned
/// assignment set on `lead_id`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReassignPermission {
    pub id: DbId,
    pub lead_id: DbId,
    pub admin_id: DbId,
    pub granted_by: DbId,
    pub used: bool,
    pub used_at: Option<Timestamp>,
    pub created_at: Timestamp,
}
