//! Activity log model.

use leadflow_core::activity::ActivityAction;
use leadflow_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `user_activity` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserActivity {
    pub id: DbId,
    pub user_id: DbId,
    pub lead_id: Option<DbId>,
    pub lead_title: Option<String>,
    pub action: String,
    pub details: Option<String>,
    pub created_at: Timestamp,
}

/// An activity row joined with the acting user's display name.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ActivityEntry {
    pub id: DbId,
    pub user_id: DbId,
    pub actor_name: Option<String>,
    pub lead_id: Option<DbId>,
    pub lead_title: Option<String>,
    pub action: String,
    pub details: Option<String>,
    pub created_at: Timestamp,
}

/// Insert DTO for an activity entry.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub user_id: DbId,
    pub lead_id: Option<DbId>,
    pub lead_title: Option<String>,
    pub action: ActivityAction,
    pub details: Option<String>,
}
