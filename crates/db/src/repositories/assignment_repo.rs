//! Repository for the `lead_assignments` table.

use leadflow_core::types::DbId;
use sqlx::PgConnection;

use crate::models::assignment::LeadAssignment;

const COLUMNS: &str = "id, lead_id, user_id, assigned_by, active, created_at";

pub struct AssignmentRepo;

impl AssignmentRepo {
    pub async fn list_active_for_lead(
        conn: &mut PgConnection,
        lead_id: DbId,
    ) -> Result<Vec<LeadAssignment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM lead_assignments
             WHERE lead_id = $1 AND active
             ORDER BY id"
        );
        sqlx::query_as::<_, LeadAssignment>(&query)
            .bind(lead_id)
            .fetch_all(conn)
            .await
    }

    pub async fn list_active(conn: &mut PgConnection) -> Result<Vec<LeadAssignment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM lead_assignments WHERE active ORDER BY lead_id, id"
        );
        sqlx::query_as::<_, LeadAssignment>(&query)
            .fetch_all(conn)
            .await
    }

    /// Deactivate every active row for a lead. Returns the number of rows changed.
    pub async fn deactivate_for_lead(conn: &mut PgConnection, lead_id: DbId) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("UPDATE lead_assignments SET active = false WHERE lead_id = $1 AND active")
                .bind(lead_id)
                .execute(conn)
                .await?;
        Ok(result.rows_affected())
    }

    /// Insert one active row per user, all stamped with `assigned_by`.
    pub async fn insert_many(
        conn: &mut PgConnection,
        lead_id: DbId,
        user_ids: &[DbId],
        assigned_by: DbId,
    ) -> Result<Vec<LeadAssignment>, sqlx::Error> {
        let query = format!(
            "INSERT INTO lead_assignments (lead_id, user_id, assigned_by)
             SELECT $1, u, $3 FROM UNNEST($2::BIGINT[]) AS u
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, LeadAssignment>(&query)
            .bind(lead_id)
            .bind(user_ids)
            .bind(assigned_by)
            .fetch_all(conn)
            .await
    }

    /// Deactivate a single (lead, user) row. Returns the number of rows changed.
    pub async fn deactivate_one(
        conn: &mut PgConnection,
        lead_id: DbId,
        user_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE lead_assignments SET active = false
             WHERE lead_id = $1 AND user_id = $2 AND active",
        )
        .bind(lead_id)
        .bind(user_id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }
}
