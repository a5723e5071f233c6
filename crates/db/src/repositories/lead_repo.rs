//! Repository for the `leads` table.

use leadflow_core::types::DbId;
use sqlx::PgConnection;

use crate::models::lead::{Lead, NewLead};

const COLUMNS: &str = "id, title, customer_name, phone, email, source, due_date, priority, \
                       status, notes, created_by, closed_by, closed_at, created_at, updated_at";

pub struct LeadRepo;

impl LeadRepo {
    /// Insert a new lead in status `New`, returning the created row.
    pub async fn create(conn: &mut PgConnection, input: &NewLead) -> Result<Lead, sqlx::Error> {
        let query = format!(
            "INSERT INTO leads (title, customer_name, phone, email, source, due_date, \
                                priority, notes, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Lead>(&query)
            .bind(&input.title)
            .bind(&input.customer_name)
            .bind(&input.phone)
            .bind(&input.email)
            .bind(&input.source)
            .bind(input.due_date)
            .bind(input.priority.as_str())
            .bind(&input.notes)
            .bind(input.created_by)
            .fetch_one(conn)
            .await
    }

    pub async fn find_by_id(conn: &mut PgConnection, id: DbId) -> Result<Option<Lead>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM leads WHERE id = $1");
        sqlx::query_as::<_, Lead>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Fetch a lead and hold a row lock until the transaction ends.
    ///
    /// Assignment writes take this lock first so concurrent replacements of
    /// the same lead's assignee set serialize.
    pub async fn find_by_id_for_update(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Lead>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM leads WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Lead>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// List all leads, most recently created first.
    pub async fn list(conn: &mut PgConnection) -> Result<Vec<Lead>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM leads ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, Lead>(&query).fetch_all(conn).await
    }

    /// Write every mutable column of `lead` back to its row.
    ///
    /// Returns `None` if the row no longer exists.
    pub async fn save(conn: &mut PgConnection, lead: &Lead) -> Result<Option<Lead>, sqlx::Error> {
        let query = format!(
            "UPDATE leads SET
                title = $2,
                customer_name = $3,
                phone = $4,
                email = $5,
                source = $6,
                due_date = $7,
                priority = $8,
                status = $9,
                notes = $10,
                closed_by = $11,
                closed_at = $12,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Lead>(&query)
            .bind(lead.id)
            .bind(&lead.title)
            .bind(&lead.customer_name)
            .bind(&lead.phone)
            .bind(&lead.email)
            .bind(&lead.source)
            .bind(lead.due_date)
            .bind(&lead.priority)
            .bind(&lead.status)
            .bind(&lead.notes)
            .bind(lead.closed_by)
            .bind(lead.closed_at)
            .fetch_optional(conn)
            .await
    }

    /// Delete a lead. Assignments and permissions cascade.
    ///
    /// Returns `true` if a row was removed.
    pub async fn delete(conn: &mut PgConnection, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM leads WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_created_by(conn: &mut PgConnection, user_id: DbId) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM leads WHERE created_by = $1")
            .bind(user_id)
            .fetch_one(conn)
            .await?;
        Ok(row.0)
    }

    pub async fn count_closed_by(conn: &mut PgConnection, user_id: DbId) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM leads WHERE closed_by = $1 AND status = 'Closed'",
        )
        .bind(user_id)
        .fetch_one(conn)
        .await?;
        Ok(row.0)
    }
}
