//! Lead lifecycle: create, edit, status changes and deletion.
//!
//! Every status change goes through [`ClosureStamp::after_transition`], so
//! `closed_by`/`closed_at` are set exactly when a lead is `Closed`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use leadflow_core::activity::{status_changed_details, ActivityAction};
use leadflow_core::error::CoreError;
use leadflow_core::lead::{ClosureStamp, LeadPriority, LeadStatus};
use leadflow_core::roles::Role;
use leadflow_core::types::DbId;
use leadflow_db::models::lead::{CreateLead, Lead, NewLead, UpdateLead};
use leadflow_db::store::LeadStore;

use super::activity::{ActivityLogger, ActivityRecord};
use super::{bounded, Actor};

pub struct LeadService {
    store: Arc<dyn LeadStore>,
    activity: ActivityLogger,
    timeout: Duration,
}

impl LeadService {
    pub fn new(store: Arc<dyn LeadStore>, activity: ActivityLogger, timeout: Duration) -> Self {
        Self {
            store,
            activity,
            timeout,
        }
    }

    pub async fn create(&self, input: CreateLead, actor: Actor) -> Result<Lead, CoreError> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(CoreError::Validation("title must not be empty".to_string()));
        }
        let priority = match input.priority.as_deref() {
            Some(p) => p.parse::<LeadPriority>()?,
            None => LeadPriority::default(),
        };
        let new_lead = NewLead {
            title,
            customer_name: input.customer_name,
            phone: input.phone,
            email: input.email,
            source: input.source,
            due_date: input.due_date,
            priority,
            notes: input.notes,
            created_by: actor.user_id,
        };

        let lead = bounded(self.timeout, async {
            let mut uow = self.store.begin().await?;
            let lead = uow.insert_lead(&new_lead).await?;
            uow.commit().await?;
            Ok::<_, CoreError>(lead)
        })
        .await?;

        tracing::info!(lead_id = lead.id, created_by = actor.user_id, "Lead created");
        self.activity
            .log(
                ActivityRecord::new(actor.user_id, ActivityAction::Created)
                    .lead(lead.id, lead.title.clone())
                    .details("Lead created"),
            )
            .await;
        Ok(lead)
    }

    pub async fn get(&self, lead_id: DbId) -> Result<Lead, CoreError> {
        bounded(self.timeout, async {
            let mut uow = self.store.begin().await?;
            let lead = uow.find_lead(lead_id).await?;
            lead.ok_or(CoreError::NotFound {
                entity: "Lead",
                id: lead_id,
            })
        })
        .await
    }

    /// All leads, newest first.
    pub async fn list(&self) -> Result<Vec<Lead>, CoreError> {
        bounded(self.timeout, async {
            let mut uow = self.store.begin().await?;
            Ok::<_, CoreError>(uow.list_leads().await?)
        })
        .await
    }

    /// Apply a partial update. Logs `CLOSED` when the lead enters `Closed`,
    /// `UPDATED` otherwise.
    pub async fn update(
        &self,
        lead_id: DbId,
        changes: UpdateLead,
        actor: Actor,
    ) -> Result<Lead, CoreError> {
        let next_priority = changes
            .priority
            .as_deref()
            .map(str::parse::<LeadPriority>)
            .transpose()?;
        let next_status = changes
            .status
            .as_deref()
            .map(str::parse::<LeadStatus>)
            .transpose()?;
        if changes.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(CoreError::Validation("title must not be empty".to_string()));
        }

        let (lead, previous_status) = bounded(self.timeout, async {
            let mut uow = self.store.begin().await?;
            let mut lead = uow.lock_lead(lead_id).await?.ok_or(CoreError::NotFound {
                entity: "Lead",
                id: lead_id,
            })?;
            let previous_status = lead.status()?;
            let status = next_status.unwrap_or(previous_status);

            if let Some(title) = changes.title {
                lead.title = title.trim().to_string();
            }
            if changes.customer_name.is_some() {
                lead.customer_name = changes.customer_name;
            }
            if changes.phone.is_some() {
                lead.phone = changes.phone;
            }
            if changes.email.is_some() {
                lead.email = changes.email;
            }
            if changes.source.is_some() {
                lead.source = changes.source;
            }
            if changes.due_date.is_some() {
                lead.due_date = changes.due_date;
            }
            if changes.notes.is_some() {
                lead.notes = changes.notes;
            }
            if let Some(priority) = next_priority {
                lead.priority = priority.as_str().to_string();
            }
            apply_status(&mut lead, previous_status, status, actor.user_id);

            let saved = uow.save_lead(&lead).await?.ok_or(CoreError::NotFound {
                entity: "Lead",
                id: lead_id,
            })?;
            uow.commit().await?;
            Ok::<_, CoreError>((saved, previous_status))
        })
        .await?;

        self.log_update(&lead, previous_status, actor).await;
        Ok(lead)
    }

    /// Status-only update. A missing status is a validation error.
    pub async fn update_status(
        &self,
        lead_id: DbId,
        status: Option<String>,
        actor: Actor,
    ) -> Result<Lead, CoreError> {
        let status = status
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| CoreError::Validation("status is required".to_string()))?;
        self.update(
            lead_id,
            UpdateLead {
                status: Some(status),
                ..UpdateLead::default()
            },
            actor,
        )
        .await
    }

    /// Delete a lead. Its activity history keeps the id and title.
    pub async fn delete(&self, lead_id: DbId, actor: Actor) -> Result<(), CoreError> {
        actor.require(Role::Admin, "Admin role required to delete leads")?;

        let title = bounded(self.timeout, async {
            let mut uow = self.store.begin().await?;
            let lead = uow.lock_lead(lead_id).await?.ok_or(CoreError::NotFound {
                entity: "Lead",
                id: lead_id,
            })?;
            if !uow.delete_lead(lead_id).await? {
                return Err(CoreError::NotFound {
                    entity: "Lead",
                    id: lead_id,
                });
            }
            uow.commit().await?;
            Ok::<_, CoreError>(lead.title)
        })
        .await?;

        tracing::info!(lead_id, deleted_by = actor.user_id, "Lead deleted");
        self.activity
            .log(
                ActivityRecord::new(actor.user_id, ActivityAction::Deleted)
                    .lead(lead_id, title)
                    .details("Lead deleted"),
            )
            .await;
        Ok(())
    }

    async fn log_update(&self, lead: &Lead, previous: LeadStatus, actor: Actor) {
        let current = match lead.status() {
            Ok(status) => status,
            Err(e) => {
                tracing::error!(lead_id = lead.id, error = %e, "Stored lead has an unknown status");
                return;
            }
        };
        let (action, details) = if current.is_closed() && !previous.is_closed() {
            (ActivityAction::Closed, "Lead closed".to_string())
        } else if current != previous {
            (
                ActivityAction::Updated,
                status_changed_details(previous.as_str(), current.as_str()),
            )
        } else {
            (ActivityAction::Updated, "Lead details updated".to_string())
        };
        self.activity
            .log(
                ActivityRecord::new(actor.user_id, action)
                    .lead(lead.id, lead.title.clone())
                    .details(details),
            )
            .await;
    }
}

/// Set the status column and recompute the closure stamp.
fn apply_status(lead: &mut Lead, previous: LeadStatus, next: LeadStatus, actor: DbId) {
    let stamp = ClosureStamp::after_transition(previous, next, lead.closure(), actor, Utc::now());
    lead.status = next.as_str().to_string();
    lead.closed_by = stamp.closed_by;
    lead.closed_at = stamp.closed_at;
}

#[cfg(test)]
mod tests {
    use leadflow_core::lead::closure_is_consistent;

    use super::*;

    fn open_lead() -> Lead {
        let now = Utc::now();
        Lead {
            id: 1,
            title: "Acme".to_string(),
            customer_name: None,
            phone: None,
            email: None,
            source: None,
            due_date: None,
            priority: "Medium".to_string(),
            status: "New".to_string(),
            notes: None,
            created_by: 1,
            closed_by: None,
            closed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn closing_stamps_and_reopening_clears() {
        let mut lead = open_lead();
        apply_status(&mut lead, LeadStatus::New, LeadStatus::Closed, 4);
        assert_eq!(lead.status, "Closed");
        assert_eq!(lead.closed_by, Some(4));
        assert!(closure_is_consistent(LeadStatus::Closed, &lead.closure()));

        apply_status(&mut lead, LeadStatus::Closed, LeadStatus::InProgress, 4);
        assert_eq!(lead.status, "In Progress");
        assert_eq!(lead.closure(), ClosureStamp::OPEN);
    }
}
