//! Repository for the `user_activity` table.

use leadflow_core::types::DbId;
use sqlx::PgConnection;

use crate::models::activity::{ActivityEntry, NewActivity, UserActivity};

const COLUMNS: &str = "id, user_id, lead_id, lead_title, action, details, created_at";

pub struct ActivityRepo;

impl ActivityRepo {
    /// Append one entry. Rows are never updated afterwards.
    pub async fn insert(
        conn: &mut PgConnection,
        input: &NewActivity,
    ) -> Result<UserActivity, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_activity (user_id, lead_id, lead_title, action, details)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserActivity>(&query)
            .bind(input.user_id)
            .bind(input.lead_id)
            .bind(&input.lead_title)
            .bind(input.action.as_str())
            .bind(&input.details)
            .fetch_one(conn)
            .await
    }

    /// A user's history with their display name, newest first.
    pub async fn list_for_user(
        conn: &mut PgConnection,
        user_id: DbId,
    ) -> Result<Vec<ActivityEntry>, sqlx::Error> {
        sqlx::query_as::<_, ActivityEntry>(
            "SELECT a.id, a.user_id, u.name AS actor_name, a.lead_id, a.lead_title,
                    a.action, a.details, a.created_at
             FROM user_activity a
             LEFT JOIN users u ON u.id = a.user_id
             WHERE a.user_id = $1
             ORDER BY a.created_at DESC, a.id DESC",
        )
        .bind(user_id)
        .fetch_all(conn)
        .await
    }

    /// Delete a user's entire history. Returns the number of rows removed.
    pub async fn delete_for_user(conn: &mut PgConnection, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_activity WHERE user_id = $1")
            .bind(user_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }
}
