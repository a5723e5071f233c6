//! Notification model, including reassignment requests and decisions.

use leadflow_core::error::CoreError;
use leadflow_core::reassignment::{NotificationKind, RequestStatus};
use leadflow_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub recipient_id: DbId,
    pub lead_id: Option<DbId>,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub status: Option<String>,
    pub requested_by_id: Option<DbId>,
    pub acted_by_id: Option<DbId>,
    #[serde(rename = "read")]
    pub is_read: bool,
    pub message: String,
    pub created_at: Timestamp,
}

impl Notification {
    pub fn kind(&self) -> Result<NotificationKind, CoreError> {
        self.notification_type.parse()
    }

    pub fn request_status(&self) -> Result<Option<RequestStatus>, CoreError> {
        self.status.as_deref().map(str::parse).transpose()
    }
}

/// Insert DTO for a notification.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: DbId,
    pub lead_id: Option<DbId>,
    pub kind: NotificationKind,
    pub status: Option<RequestStatus>,
    pub requested_by_id: Option<DbId>,
    pub message: String,
}
