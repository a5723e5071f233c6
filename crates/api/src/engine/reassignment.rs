//! Reassignment requests and super-admin decisions.
//!
//! See `leadflow_core::reassignment` for the state machine. This module
//! applies it to stored notifications: a decision resolves the request and
//! its sibling copies, replies to the requester and, on acceptance, grants a
//! single-use [`ReassignPermission`].

use std::sync::Arc;
use std::time::Duration;

use leadflow_core::activity::unknown_user_label;
use leadflow_core::error::CoreError;
use leadflow_core::reassignment::{
    request_outcome_message, transition, ReassignAction, RequestStatus,
};
use leadflow_core::roles::Role;
use leadflow_core::types::DbId;
use leadflow_db::models::notification::Notification;
use leadflow_db::models::reassign_permission::ReassignPermission;
use leadflow_db::store::LeadStore;
use leadflow_events::{event_types, LeadEvent, LeadEventBus};
use serde::Serialize;

use super::notification::{send_decision, send_requests};
use super::{bounded, Actor};

#[derive(Debug, Clone, Serialize)]
pub struct ReassignRequestResult {
    pub message: String,
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecisionResult {
    pub status: String,
    /// Number of pending copies resolved (one per super admin).
    pub resolved: u64,
    pub decision: Notification,
    pub permission: Option<ReassignPermission>,
}

pub struct ReassignmentWorkflow {
    store: Arc<dyn LeadStore>,
    events: Arc<LeadEventBus>,
    timeout: Duration,
}

impl ReassignmentWorkflow {
    pub fn new(store: Arc<dyn LeadStore>, events: Arc<LeadEventBus>, timeout: Duration) -> Self {
        Self {
            store,
            events,
            timeout,
        }
    }

    /// File a request to override a lead's assignment with every super
    /// admin. With no super admins this is an informational no-op.
    ///
    /// Only plain admins may ask; super admins assign directly.
    pub async fn request_reassignment(
        &self,
        lead_id: DbId,
        actor: Actor,
    ) -> Result<ReassignRequestResult, CoreError> {
        if actor.role != Role::Admin {
            return Err(CoreError::Forbidden(
                "Only admins can request reassignment".to_string(),
            ));
        }

        let (title, notifications) = bounded(self.timeout, async {
            let mut uow = self.store.begin().await?;
            let lead = uow.find_lead(lead_id).await?.ok_or(CoreError::NotFound {
                entity: "Lead",
                id: lead_id,
            })?;
            let super_admins = uow.list_users_by_role(Role::SuperAdmin).await?;
            if super_admins.is_empty() {
                return Ok((lead.title, Vec::new()));
            }
            let requester_name = uow
                .find_user(actor.user_id)
                .await?
                .map(|u| u.name)
                .unwrap_or_else(|| unknown_user_label(actor.user_id));
            let sent = send_requests(
                uow.as_mut(),
                &lead,
                actor.user_id,
                &requester_name,
                &super_admins,
            )
            .await?;
            uow.commit().await?;
            Ok::<_, CoreError>((lead.title, sent))
        })
        .await?;

        if notifications.is_empty() {
            tracing::warn!(lead_id, requester_id = actor.user_id, "No super admin to review reassignment");
        } else {
            tracing::info!(
                lead_id,
                requester_id = actor.user_id,
                recipients = notifications.len(),
                "Reassignment requested",
            );
            self.events.publish(
                LeadEvent::new(lead_id, event_types::REASSIGN_REQUESTED).with_actor(actor.user_id),
            );
        }

        Ok(ReassignRequestResult {
            message: request_outcome_message(&title, notifications.len()),
            notifications,
        })
    }

    /// Resolve a pending request. A second decision on the same request
    /// (or any of its sibling copies) is a conflict.
    pub async fn handle_reassign_request(
        &self,
        notification_id: DbId,
        action: ReassignAction,
        actor: Actor,
    ) -> Result<DecisionResult, CoreError> {
        actor.require(Role::SuperAdmin, "Super admin role required to decide reassignment")?;

        let result = bounded(self.timeout, async {
            let mut uow = self.store.begin().await?;
            let request = uow
                .lock_notification(notification_id)
                .await?
                .ok_or(CoreError::NotFound {
                    entity: "Notification",
                    id: notification_id,
                })?;
            let next: RequestStatus = transition(
                notification_id,
                request.kind()?,
                request.request_status()?,
                action,
            )?;
            let requester_id = request.requested_by_id.ok_or_else(|| {
                CoreError::Conflict("The requesting admin no longer exists".to_string())
            })?;

            let resolved = uow
                .resolve_requests(
                    notification_id,
                    request.lead_id,
                    Some(requester_id),
                    next,
                    actor.user_id,
                )
                .await?;
            if resolved == 0 {
                return Err(CoreError::Conflict(format!(
                    "Reassignment request {notification_id} was already resolved"
                )));
            }

            let decision = send_decision(uow.as_mut(), &request, requester_id, action).await?;

            let permission = if action.grants_permission() {
                let lead_id = request.lead_id.ok_or_else(|| {
                    CoreError::Conflict("The lead for this request no longer exists".to_string())
                })?;
                Some(uow.grant_permission(lead_id, requester_id, actor.user_id).await?)
            } else {
                None
            };

            uow.commit().await?;
            Ok::<_, CoreError>(DecisionResult {
                status: next.as_str().to_string(),
                resolved,
                decision,
                permission,
            })
        })
        .await?;

        tracing::info!(
            notification_id,
            decided_by = actor.user_id,
            status = %result.status,
            resolved = result.resolved,
            "Reassignment request decided",
        );
        if let Some(lead_id) = result.decision.lead_id {
            self.events.publish(
                LeadEvent::new(lead_id, event_types::REASSIGN_DECIDED)
                    .with_actor(actor.user_id)
                    .with_payload(serde_json::json!({ "status": result.status })),
            );
        }
        Ok(result)
    }
}
