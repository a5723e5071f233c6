//! Repository for the `reassign_permissions` table.

use leadflow_core::types::DbId;
use sqlx::PgConnection;

use crate::models::reassign_permission::ReassignPermission;

const COLUMNS: &str = "id, lead_id, admin_id, granted_by, used, used_at, created_at";

pub struct ReassignPermissionRepo;

impl ReassignPermissionRepo {
    pub async fn create(
        conn: &mut PgConnection,
        lead_id: DbId,
        admin_id: DbId,
        granted_by: DbId,
    ) -> Result<ReassignPermission, sqlx::Error> {
        let query = format!(
            "INSERT INTO reassign_permissions (lead_id, admin_id, granted_by)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ReassignPermission>(&query)
            .bind(lead_id)
            .bind(admin_id)
            .bind(granted_by)
            .fetch_one(conn)
            .await
    }

    /// Oldest unused permission for (lead, admin), locked for the caller's
    /// transaction so two assigns cannot both consume it.
    pub async fn find_unused_for_update(
        conn: &mut PgConnection,
        lead_id: DbId,
        admin_id: DbId,
    ) -> Result<Option<ReassignPermission>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM reassign_permissions
             WHERE lead_id = $1 AND admin_id = $2 AND NOT used
             ORDER BY created_at, id
             LIMIT 1
             FOR UPDATE"
        );
        sqlx::query_as::<_, ReassignPermission>(&query)
            .bind(lead_id)
            .bind(admin_id)
            .fetch_optional(conn)
            .await
    }

    /// Mark a permission consumed. Returns `false` if it was already used.
    pub async fn mark_used(conn: &mut PgConnection, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE reassign_permissions SET used = true, used_at = NOW()
             WHERE id = $1 AND NOT used",
        )
        .bind(id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_for_lead(
        conn: &mut PgConnection,
        lead_id: DbId,
    ) -> Result<Vec<ReassignPermission>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM reassign_permissions WHERE lead_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, ReassignPermission>(&query)
            .bind(lead_id)
            .fetch_all(conn)
            .await
    }
}
