//! Best-effort audit trail.
//!
//! [`ActivityLogger::log`] appends in its own unit of work, after the
//! business write has committed. Failures are reported on the operator log
//! stream and swallowed, so an audit problem never fails or rolls back the
//! action being described.

use std::sync::Arc;
use std::time::Duration;

use leadflow_core::activity::ActivityAction;
use leadflow_core::error::CoreError;
use leadflow_core::types::DbId;
use leadflow_db::models::activity::{ActivityEntry, NewActivity, UserActivity};
use leadflow_db::store::LeadStore;
use serde::Serialize;

use super::bounded;

/// One audit entry to append.
#[derive(Debug, Clone)]
pub struct ActivityRecord {
    pub actor_id: DbId,
    pub lead_id: Option<DbId>,
    /// Lead title at the time of the action.
    pub lead_title: Option<String>,
    pub action: ActivityAction,
    pub details: Option<String>,
    /// Set by administrative operations that must not log themselves.
    pub skip_logging: bool,
}

impl ActivityRecord {
    pub fn new(actor_id: DbId, action: ActivityAction) -> Self {
        Self {
            actor_id,
            lead_id: None,
            lead_title: None,
            action,
            details: None,
            skip_logging: false,
        }
    }

    pub fn lead(mut self, lead_id: DbId, title: impl Into<String>) -> Self {
        self.lead_id = Some(lead_id);
        self.lead_title = Some(title.into());
        self
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn skip_logging(mut self, skip: bool) -> Self {
        self.skip_logging = skip;
        self
    }
}

/// `GET /users/activity` payload.
#[derive(Debug, Clone, Serialize)]
pub struct ActivitySummary {
    pub created_count: i64,
    pub closed_count: i64,
    pub entries: Vec<ActivityEntry>,
}

#[derive(Clone)]
pub struct ActivityLogger {
    store: Arc<dyn LeadStore>,
    timeout: Duration,
}

impl ActivityLogger {
    pub fn new(store: Arc<dyn LeadStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Append `record` unless it asks to be skipped. Never fails.
    pub async fn log(&self, record: ActivityRecord) {
        if record.skip_logging {
            return;
        }
        match bounded(self.timeout, self.append(&record)).await {
            Ok(entry) => {
                tracing::debug!(
                    activity_id = entry.id,
                    actor_id = record.actor_id,
                    action = %record.action,
                    "Activity logged",
                );
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    actor_id = record.actor_id,
                    lead_id = ?record.lead_id,
                    action = %record.action,
                    "Failed to write activity log entry",
                );
            }
        }
    }

    async fn append(&self, record: &ActivityRecord) -> Result<UserActivity, CoreError> {
        let input = NewActivity {
            user_id: record.actor_id,
            lead_id: record.lead_id,
            lead_title: record.lead_title.clone(),
            action: record.action,
            details: record.details.clone(),
        };
        let mut uow = self.store.begin().await?;
        let entry = uow.insert_activity(&input).await?;
        uow.commit().await?;
        Ok(entry)
    }

    /// Lead counts plus the user's full history, newest first.
    pub async fn get_activity(&self, user_id: DbId) -> Result<ActivitySummary, CoreError> {
        bounded(self.timeout, async {
            let mut uow = self.store.begin().await?;
            let created_count = uow.count_leads_created_by(user_id).await?;
            let closed_count = uow.count_leads_closed_by(user_id).await?;
            let entries = uow.list_activity(user_id).await?;
            Ok::<_, CoreError>(ActivitySummary {
                created_count,
                closed_count,
                entries,
            })
        })
        .await
    }

    /// Delete every entry authored by `user_id`. Returns the number removed.
    pub async fn clear_history(&self, user_id: DbId) -> Result<u64, CoreError> {
        let deleted = bounded(self.timeout, async {
            let mut uow = self.store.begin().await?;
            let deleted = uow.delete_activity(user_id).await?;
            uow.commit().await?;
            Ok::<_, CoreError>(deleted)
        })
        .await?;

        tracing::info!(user_id, deleted, "Activity history cleared");
        self.log(
            ActivityRecord::new(user_id, ActivityAction::Deleted)
                .details(format!("Cleared {deleted} activity entries"))
                .skip_logging(true),
        )
        .await;
        Ok(deleted)
    }
}
