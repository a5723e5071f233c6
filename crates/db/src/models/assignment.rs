//! Lead assignment rows.

use leadflow_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `lead_assignments` table. Only `active` rows count as the
/// lead's current assignee set.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LeadAssignment {
    pub id: DbId,
    pub lead_id: DbId,
    pub user_id: DbId,
    pub assigned_by: DbId,
    pub active: bool,
    pub created_at: Timestamp,
}
