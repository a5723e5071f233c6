//! Assignment engine: replaces a lead's active assignee set atomically and
//! enforces the super-admin override gate.

use std::sync::Arc;
use std::time::Duration;

use leadflow_core::activity::{
    assigned_details, bulk_assigned_details, unassigned_details, unknown_user_label,
    ActivityAction,
};
use leadflow_core::assignment::{
    check_override, dedupe_ids, normalize_assignees, BulkFailurePolicy, OverrideCheck,
    OVERRIDE_DENIED_MESSAGE,
};
use leadflow_core::error::CoreError;
use leadflow_core::roles::Role;
use leadflow_core::types::DbId;
use leadflow_db::models::assignment::LeadAssignment;
use leadflow_db::models::lead::Lead;
use leadflow_db::store::{LeadStore, UnitOfWork};
use leadflow_events::{event_types, LeadEvent, LeadEventBus};
use serde::Serialize;

use super::activity::{ActivityLogger, ActivityRecord};
use super::{bounded, display_names, public_message, Actor};

/// What one committed replacement produced, kept for logging and events
/// after the unit of work is gone.
struct Replaced {
    lead: Lead,
    rows: Vec<LeadAssignment>,
    names: Vec<String>,
}

/// Per-lead result of a bulk assignment.
#[derive(Debug, Clone, Serialize)]
pub struct BulkOutcome {
    pub lead_id: DbId,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkAssignResult {
    pub policy: BulkFailurePolicy,
    pub assignments: Vec<LeadAssignment>,
    pub outcomes: Vec<BulkOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnassignResult {
    pub removed: bool,
}

pub struct AssignmentEngine {
    store: Arc<dyn LeadStore>,
    activity: ActivityLogger,
    events: Arc<LeadEventBus>,
    timeout: Duration,
    bulk_policy: BulkFailurePolicy,
}

impl AssignmentEngine {
    pub fn new(
        store: Arc<dyn LeadStore>,
        activity: ActivityLogger,
        events: Arc<LeadEventBus>,
        timeout: Duration,
        bulk_policy: BulkFailurePolicy,
    ) -> Self {
        Self {
            store,
            activity,
            events,
            timeout,
            bulk_policy,
        }
    }

    /// Replace the lead's assignee set with `assignee_ids`.
    ///
    /// An admin cannot replace a set established by a super admin unless it
    /// holds an unused reassign permission for the lead; the permission is
    /// consumed in the same unit of work as the replacement.
    pub async fn assign_lead(
        &self,
        lead_id: DbId,
        assignee_ids: &[DbId],
        actor: Actor,
    ) -> Result<Vec<LeadAssignment>, CoreError> {
        actor.require(Role::Admin, "Admin role required to assign leads")?;
        let assignees = normalize_assignees(assignee_ids)?;

        let replaced = bounded(self.timeout, self.assign_once(lead_id, &assignees, actor)).await?;

        tracing::info!(
            lead_id,
            actor_id = actor.user_id,
            assignees = replaced.rows.len(),
            "Lead assigned",
        );
        self.after_replace(&replaced, actor, assigned_details(&replaced.names))
            .await;
        Ok(replaced.rows)
    }

    async fn assign_once(
        &self,
        lead_id: DbId,
        assignees: &[DbId],
        actor: Actor,
    ) -> Result<Replaced, CoreError> {
        let mut uow = self.store.begin().await?;
        let lead = uow
            .lock_lead(lead_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Lead",
                id: lead_id,
            })?;

        self.enforce_override(uow.as_mut(), lead_id, actor).await?;

        let (rows, names) =
            replace_assignees(uow.as_mut(), lead_id, assignees, actor.user_id).await?;
        uow.commit().await?;
        Ok(Replaced { lead, rows, names })
    }

    /// Run the override gate inside `uow`, consuming the actor's permission
    /// when the gate asks for it.
    async fn enforce_override(
        &self,
        uow: &mut dyn UnitOfWork,
        lead_id: DbId,
        actor: Actor,
    ) -> Result<(), CoreError> {
        match self.override_check(uow, lead_id, actor).await? {
            OverrideCheck::Allowed => Ok(()),
            OverrideCheck::Denied => Err(CoreError::Forbidden(OVERRIDE_DENIED_MESSAGE.to_string())),
            OverrideCheck::ConsumePermission(permission_id) => {
                if !uow.consume_permission(permission_id).await? {
                    return Err(CoreError::Conflict(
                        "Reassign permission was already used".to_string(),
                    ));
                }
                tracing::info!(
                    lead_id,
                    permission_id,
                    admin_id = actor.user_id,
                    "Reassign permission consumed",
                );
                Ok(())
            }
        }
    }

    async fn override_check(
        &self,
        uow: &mut dyn UnitOfWork,
        lead_id: DbId,
        actor: Actor,
    ) -> Result<OverrideCheck, CoreError> {
        if actor.role == Role::SuperAdmin {
            return Ok(OverrideCheck::Allowed);
        }
        let current = uow.active_assignments(lead_id).await?;
        let assigner_ids: Vec<DbId> =
            dedupe_ids(&current.iter().map(|a| a.assigned_by).collect::<Vec<_>>());
        let mut assigner_roles = uow
            .find_users(&assigner_ids)
            .await?
            .iter()
            .map(|u| u.role())
            .collect::<Result<Vec<Role>, CoreError>>()?;

        // A set installed with a reassign permission stays under super-admin
        // control, so the grantee cannot keep replacing it.
        let delegated = uow
            .list_permissions(lead_id)
            .await?
            .iter()
            .any(|p| p.used && assigner_ids.contains(&p.admin_id));
        if delegated {
            assigner_roles.push(Role::SuperAdmin);
        }

        let permission = if assigner_roles.contains(&Role::SuperAdmin) {
            uow.find_unused_permission(lead_id, actor.user_id)
                .await?
                .map(|p| p.id)
        } else {
            None
        };
        Ok(check_override(actor.role, &assigner_roles, permission))
    }

    /// Assign the same users to every lead in `lead_ids`. Super admin only.
    ///
    /// Under [`BulkFailurePolicy::ContinueOnError`] each lead commits on its
    /// own and failures are collected into the outcomes. Under
    /// [`BulkFailurePolicy::AbortAll`] every lead shares one unit of work and
    /// the first failure is returned with nothing applied.
    pub async fn bulk_assign_leads(
        &self,
        lead_ids: &[DbId],
        assignee_ids: &[DbId],
        actor: Actor,
    ) -> Result<BulkAssignResult, CoreError> {
        actor.require(Role::SuperAdmin, "Super admin role required for bulk assignment")?;
        let lead_ids = dedupe_ids(lead_ids);
        if lead_ids.is_empty() {
            return Err(CoreError::Validation(
                "leadIds must contain at least one lead".to_string(),
            ));
        }
        let assignees = normalize_assignees(assignee_ids)?;

        let result = match self.bulk_policy {
            BulkFailurePolicy::ContinueOnError => {
                self.bulk_continue(&lead_ids, &assignees, actor).await
            }
            BulkFailurePolicy::AbortAll => self.bulk_abort_all(&lead_ids, &assignees, actor).await?,
        };

        tracing::info!(
            actor_id = actor.user_id,
            leads = lead_ids.len(),
            failed = result.outcomes.iter().filter(|o| !o.ok).count(),
            policy = ?self.bulk_policy,
            "Bulk assignment finished",
        );
        Ok(result)
    }

    async fn bulk_continue(
        &self,
        lead_ids: &[DbId],
        assignees: &[DbId],
        actor: Actor,
    ) -> BulkAssignResult {
        let mut assignments = Vec::new();
        let mut outcomes = Vec::with_capacity(lead_ids.len());

        for &lead_id in lead_ids {
            let attempt = bounded(self.timeout, self.bulk_once(lead_id, assignees, actor)).await;
            match attempt {
                Ok(replaced) => {
                    self.after_replace(&replaced, actor, bulk_assigned_details(&replaced.names))
                        .await;
                    assignments.extend(replaced.rows);
                    outcomes.push(BulkOutcome {
                        lead_id,
                        ok: true,
                        error: None,
                    });
                }
                Err(e) => {
                    tracing::warn!(lead_id, error = %e, "Bulk assignment failed for lead, continuing");
                    outcomes.push(BulkOutcome {
                        lead_id,
                        ok: false,
                        error: Some(public_message(&e)),
                    });
                }
            }
        }

        BulkAssignResult {
            policy: BulkFailurePolicy::ContinueOnError,
            assignments,
            outcomes,
        }
    }

    async fn bulk_once(
        &self,
        lead_id: DbId,
        assignees: &[DbId],
        actor: Actor,
    ) -> Result<Replaced, CoreError> {
        let mut uow = self.store.begin().await?;
        let replaced = replace_locked(uow.as_mut(), lead_id, assignees, actor.user_id).await?;
        uow.commit().await?;
        Ok(replaced)
    }

    async fn bulk_abort_all(
        &self,
        lead_ids: &[DbId],
        assignees: &[DbId],
        actor: Actor,
    ) -> Result<BulkAssignResult, CoreError> {
        let replaced = bounded(self.timeout, async {
            let mut uow = self.store.begin().await?;
            let mut replaced = Vec::with_capacity(lead_ids.len());
            for &lead_id in lead_ids {
                replaced.push(replace_locked(uow.as_mut(), lead_id, assignees, actor.user_id).await?);
            }
            uow.commit().await?;
            Ok::<_, CoreError>(replaced)
        })
        .await?;

        let mut assignments = Vec::new();
        let mut outcomes = Vec::with_capacity(replaced.len());
        for item in replaced {
            self.after_replace(&item, actor, bulk_assigned_details(&item.names))
                .await;
            outcomes.push(BulkOutcome {
                lead_id: item.lead.id,
                ok: true,
                error: None,
            });
            assignments.extend(item.rows);
        }

        Ok(BulkAssignResult {
            policy: BulkFailurePolicy::AbortAll,
            assignments,
            outcomes,
        })
    }

    /// Remove one user from a lead. Removing someone who is not assigned is
    /// a no-op that reports `removed: false` and logs nothing.
    ///
    /// Removal goes through the same override gate as
    /// [`assign_lead`](Self::assign_lead): an admin cannot shrink a
    /// super-admin-owned set without spending a reassign permission.
    pub async fn unassign_user(
        &self,
        lead_id: DbId,
        user_id: DbId,
        actor: Actor,
    ) -> Result<UnassignResult, CoreError> {
        actor.require(Role::Admin, "Admin role required to unassign users")?;

        let (lead, removed, user_name) = bounded(self.timeout, async {
            let mut uow = self.store.begin().await?;
            let lead = uow.lock_lead(lead_id).await?.ok_or(CoreError::NotFound {
                entity: "Lead",
                id: lead_id,
            })?;
            let assigned = uow
                .active_assignments(lead_id)
                .await?
                .iter()
                .any(|a| a.user_id == user_id);
            let removed = if assigned {
                self.enforce_override(uow.as_mut(), lead_id, actor).await?;
                uow.deactivate_assignment(lead_id, user_id).await? > 0
            } else {
                false
            };
            let user_name = uow
                .find_user(user_id)
                .await?
                .map(|u| u.name)
                .unwrap_or_else(|| unknown_user_label(user_id));
            uow.commit().await?;
            Ok::<_, CoreError>((lead, removed, user_name))
        })
        .await?;

        if !removed {
            tracing::debug!(lead_id, user_id, "Unassign matched no active assignment");
            return Ok(UnassignResult { removed });
        }

        tracing::info!(lead_id, user_id, actor_id = actor.user_id, "User unassigned from lead");
        self.activity
            .log(
                ActivityRecord::new(actor.user_id, ActivityAction::Updated)
                    .lead(lead.id, lead.title.clone())
                    .details(unassigned_details(&user_name)),
            )
            .await;
        self.events.publish(
            LeadEvent::new(lead_id, event_types::LEAD_UNASSIGNED)
                .with_actor(actor.user_id)
                .with_payload(serde_json::json!({ "user_id": user_id })),
        );
        Ok(UnassignResult { removed })
    }

    /// Active assignments for one lead.
    pub async fn list_assignments(&self, lead_id: DbId) -> Result<Vec<LeadAssignment>, CoreError> {
        bounded(self.timeout, async {
            let mut uow = self.store.begin().await?;
            if uow.find_lead(lead_id).await?.is_none() {
                return Err(CoreError::NotFound {
                    entity: "Lead",
                    id: lead_id,
                });
            }
            Ok::<_, CoreError>(uow.active_assignments(lead_id).await?)
        })
        .await
    }

    /// Every active assignment across all leads.
    pub async fn list_all_assignments(&self) -> Result<Vec<LeadAssignment>, CoreError> {
        bounded(self.timeout, async {
            let mut uow = self.store.begin().await?;
            Ok::<_, CoreError>(uow.all_active_assignments().await?)
        })
        .await
    }

    async fn after_replace(&self, replaced: &Replaced, actor: Actor, details: String) {
        self.activity
            .log(
                ActivityRecord::new(actor.user_id, ActivityAction::Updated)
                    .lead(replaced.lead.id, replaced.lead.title.clone())
                    .details(details),
            )
            .await;
        let assignee_ids: Vec<DbId> = replaced.rows.iter().map(|r| r.user_id).collect();
        self.events.publish(
            LeadEvent::new(replaced.lead.id, event_types::LEAD_ASSIGNED)
                .with_actor(actor.user_id)
                .with_payload(serde_json::json!({ "assignee_ids": assignee_ids })),
        );
    }
}

/// Lock the lead, then replace its assignee set. Used by bulk assignment,
/// where the override gate never applies.
async fn replace_locked(
    uow: &mut dyn UnitOfWork,
    lead_id: DbId,
    assignees: &[DbId],
    assigned_by: DbId,
) -> Result<Replaced, CoreError> {
    let lead = uow.lock_lead(lead_id).await?.ok_or(CoreError::NotFound {
        entity: "Lead",
        id: lead_id,
    })?;
    let (rows, names) = replace_assignees(uow, lead_id, assignees, assigned_by).await?;
    Ok(Replaced { lead, rows, names })
}

/// Deactivate the lead's current set and insert one active row per
/// assignee. Every assignee must exist.
async fn replace_assignees(
    uow: &mut dyn UnitOfWork,
    lead_id: DbId,
    assignees: &[DbId],
    assigned_by: DbId,
) -> Result<(Vec<LeadAssignment>, Vec<String>), CoreError> {
    let users = uow.find_users(assignees).await?;
    if let Some(missing) = assignees.iter().find(|id| !users.iter().any(|u| u.id == **id)) {
        return Err(CoreError::NotFound {
            entity: "User",
            id: *missing,
        });
    }

    uow.deactivate_assignments(lead_id).await?;
    let rows = uow
        .insert_assignments(lead_id, assignees, assigned_by)
        .await?;
    let names = display_names(uow, assignees).await?;
    Ok((rows, names))
}
