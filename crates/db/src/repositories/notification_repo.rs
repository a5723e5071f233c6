//! Repository for the `notifications` table.

use leadflow_core::reassignment::{RequestStatus, KIND_REASSIGN_REQUEST, STATUS_PENDING};
use leadflow_core::types::DbId;
use sqlx::PgConnection;

use crate::models::notification::{NewNotification, Notification};

const COLUMNS: &str = "id, recipient_id, lead_id, notification_type, status, requested_by_id, \
                       acted_by_id, is_read, message, created_at";

pub struct NotificationRepo;

impl NotificationRepo {
    pub async fn create(
        conn: &mut PgConnection,
        input: &NewNotification,
    ) -> Result<Notification, sqlx::Error> {
        let query = format!(
            "INSERT INTO notifications (recipient_id, lead_id, notification_type, status, \
                                        requested_by_id, message)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(input.recipient_id)
            .bind(input.lead_id)
            .bind(input.kind.as_str())
            .bind(input.status.map(RequestStatus::as_str))
            .bind(input.requested_by_id)
            .bind(&input.message)
            .fetch_one(conn)
            .await
    }

    /// Fetch a notification with row locks held until the transaction ends
    /// on it and on every sibling copy of the same request.
    ///
    /// The group is locked in id order, so two deciders holding different
    /// copies queue on the lowest id instead of deadlocking in
    /// [`resolve_pending_requests`](Self::resolve_pending_requests). The
    /// returned row is read after the lock is granted.
    pub async fn find_by_id_for_update(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Notification>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notifications WHERE id = $1");
        let Some(target) = sqlx::query_as::<_, Notification>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
        else {
            return Ok(None);
        };

        let query = format!(
            "SELECT {COLUMNS} FROM notifications
             WHERE id = $1
                OR (notification_type = $2 AND lead_id = $3 AND requested_by_id = $4)
             ORDER BY id
             FOR UPDATE"
        );
        let group = sqlx::query_as::<_, Notification>(&query)
            .bind(id)
            .bind(KIND_REASSIGN_REQUEST)
            .bind(target.lead_id)
            .bind(target.requested_by_id)
            .fetch_all(conn)
            .await?;
        Ok(group.into_iter().find(|n| n.id == id))
    }

    /// Resolve a pending request together with its sibling copies.
    ///
    /// A request is fanned out to every super admin, so the copies share
    /// `(lead_id, requested_by_id)`. Only rows still `PENDING` are touched;
    /// the return value is the number resolved.
    pub async fn resolve_pending_requests(
        conn: &mut PgConnection,
        notification_id: DbId,
        lead_id: Option<DbId>,
        requested_by_id: Option<DbId>,
        status: RequestStatus,
        acted_by_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET status = $2, acted_by_id = $3, is_read = true
             WHERE notification_type = $6 AND status = $7
               AND (id = $1 OR (lead_id = $4 AND requested_by_id = $5))",
        )
        .bind(notification_id)
        .bind(status.as_str())
        .bind(acted_by_id)
        .bind(lead_id)
        .bind(requested_by_id)
        .bind(KIND_REASSIGN_REQUEST)
        .bind(STATUS_PENDING)
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// List a recipient's notifications, newest first.
    pub async fn list_for_recipient(
        conn: &mut PgConnection,
        recipient_id: DbId,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications
             WHERE recipient_id = $1
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(recipient_id)
            .fetch_all(conn)
            .await
    }

    /// Mark a recipient's notifications read, leaving pending reassignment
    /// requests untouched. Returns the number of rows changed.
    pub async fn mark_read_for_recipient(
        conn: &mut PgConnection,
        recipient_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = true
             WHERE recipient_id = $1 AND NOT is_read
               AND NOT (notification_type = $2 AND COALESCE(status, '') = $3)",
        )
        .bind(recipient_id)
        .bind(KIND_REASSIGN_REQUEST)
        .bind(STATUS_PENDING)
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }
}
