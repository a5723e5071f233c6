//! Notification dispatch: reassignment request fan-out, decision replies
//! and the recipient's inbox.

use std::sync::Arc;
use std::time::Duration;

use leadflow_core::error::CoreError;
use leadflow_core::reassignment::{
    request_message, NotificationKind, ReassignAction, RequestStatus,
};
use leadflow_core::types::DbId;
use leadflow_db::models::lead::Lead;
use leadflow_db::models::notification::{NewNotification, Notification};
use leadflow_db::models::user::User;
use leadflow_db::store::{LeadStore, UnitOfWork};

use super::bounded;

pub struct NotificationDispatcher {
    store: Arc<dyn LeadStore>,
    timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<dyn LeadStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// The recipient's notifications, newest first.
    pub async fn list_for(&self, recipient_id: DbId) -> Result<Vec<Notification>, CoreError> {
        bounded(self.timeout, async {
            let mut uow = self.store.begin().await?;
            Ok::<_, CoreError>(uow.list_notifications(recipient_id).await?)
        })
        .await
    }

    /// Mark the recipient's notifications read. Pending reassignment
    /// requests stay unread until a super admin decides them.
    pub async fn mark_all_read(&self, recipient_id: DbId) -> Result<u64, CoreError> {
        let updated = bounded(self.timeout, async {
            let mut uow = self.store.begin().await?;
            let updated = uow.mark_notifications_read(recipient_id).await?;
            uow.commit().await?;
            Ok::<_, CoreError>(updated)
        })
        .await?;
        tracing::debug!(recipient_id, updated, "Notifications marked read");
        Ok(updated)
    }
}

/// Create one pending request per super admin, all naming the same lead and
/// requester.
pub(crate) async fn send_requests(
    uow: &mut dyn UnitOfWork,
    lead: &Lead,
    requester_id: DbId,
    requester_name: &str,
    super_admins: &[User],
) -> Result<Vec<Notification>, CoreError> {
    let message = request_message(requester_name, &lead.title);
    let mut sent = Vec::with_capacity(super_admins.len());
    for admin in super_admins {
        let notification = uow
            .insert_notification(&NewNotification {
                recipient_id: admin.id,
                lead_id: Some(lead.id),
                kind: NotificationKind::ReassignRequest,
                status: Some(RequestStatus::Pending),
                requested_by_id: Some(requester_id),
                message: message.clone(),
            })
            .await?;
        sent.push(notification);
    }
    Ok(sent)
}

/// Tell the requester how their request was decided.
pub(crate) async fn send_decision(
    uow: &mut dyn UnitOfWork,
    request: &Notification,
    requester_id: DbId,
    action: ReassignAction,
) -> Result<Notification, CoreError> {
    Ok(uow
        .insert_notification(&NewNotification {
            recipient_id: requester_id,
            lead_id: request.lead_id,
            kind: NotificationKind::ReassignDecision,
            status: Some(action.target_status()),
            requested_by_id: Some(requester_id),
            message: action.decision_message().to_string(),
        })
        .await?)
}
