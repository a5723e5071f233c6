//! The record-store capability.
//!
//! A [`LeadStore`] hands out [`UnitOfWork`]s. Every read and write made
//! through a unit of work becomes visible atomically on
//! [`UnitOfWork::commit`]; dropping one without committing discards all of
//! its writes.

mod memory;
mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use leadflow_core::error::CoreError;
use leadflow_core::reassignment::RequestStatus;
use leadflow_core::roles::Role;
use leadflow_core::types::DbId;

use crate::models::activity::{ActivityEntry, NewActivity, UserActivity};
use crate::models::assignment::LeadAssignment;
use crate::models::lead::{Lead, NewLead};
use crate::models::notification::{NewNotification, Notification};
use crate::models::reassign_permission::ReassignPermission;
use crate::models::user::{CreateUser, User};

pub use memory::{FaultPoint, InMemoryStore, MemoryState};
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store call exceeded {0:?}")]
    Timeout(Duration),

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("injected fault at {0:?}")]
    Injected(FaultPoint),
}

/// Unique violations (Postgres `23505`) become `Conflict`; everything else
/// is a storage failure.
impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match &err {
            StoreError::Database(sqlx::Error::Database(db_err))
                if db_err.code().as_deref() == Some("23505") =>
            {
                let constraint = db_err.constraint().unwrap_or("unknown");
                CoreError::Conflict(format!(
                    "Duplicate value violates unique constraint: {constraint}"
                ))
            }
            StoreError::Constraint(msg) => CoreError::Conflict(msg.clone()),
            _ => CoreError::Storage(err.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Source of units of work.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Open a new unit of work.
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>>;

    /// Cheap liveness check used by `/health`.
    async fn ping(&self) -> StoreResult<()>;
}

/// One atomic batch of reads and writes.
#[async_trait]
pub trait UnitOfWork: Send {
    // -- users --

    async fn create_user(&mut self, input: &CreateUser) -> StoreResult<User>;
    async fn find_user(&mut self, id: DbId) -> StoreResult<Option<User>>;
    /// Unknown ids are skipped.
    async fn find_users(&mut self, ids: &[DbId]) -> StoreResult<Vec<User>>;
    async fn list_users_by_role(&mut self, role: Role) -> StoreResult<Vec<User>>;

    // -- leads --

    async fn insert_lead(&mut self, input: &NewLead) -> StoreResult<Lead>;
    async fn find_lead(&mut self, id: DbId) -> StoreResult<Option<Lead>>;
    /// Like [`find_lead`](Self::find_lead) but serializes against other
    /// units of work locking the same lead.
    async fn lock_lead(&mut self, id: DbId) -> StoreResult<Option<Lead>>;
    async fn list_leads(&mut self) -> StoreResult<Vec<Lead>>;
    async fn save_lead(&mut self, lead: &Lead) -> StoreResult<Option<Lead>>;
    /// Deletes the lead with its assignments and permissions.
    async fn delete_lead(&mut self, id: DbId) -> StoreResult<bool>;
    async fn count_leads_created_by(&mut self, user_id: DbId) -> StoreResult<i64>;
    async fn count_leads_closed_by(&mut self, user_id: DbId) -> StoreResult<i64>;

    // -- assignments --

    async fn active_assignments(&mut self, lead_id: DbId) -> StoreResult<Vec<LeadAssignment>>;
    async fn all_active_assignments(&mut self) -> StoreResult<Vec<LeadAssignment>>;
    async fn deactivate_assignments(&mut self, lead_id: DbId) -> StoreResult<u64>;
    async fn insert_assignments(
        &mut self,
        lead_id: DbId,
        user_ids: &[DbId],
        assigned_by: DbId,
    ) -> StoreResult<Vec<LeadAssignment>>;
    async fn deactivate_assignment(&mut self, lead_id: DbId, user_id: DbId) -> StoreResult<u64>;

    // -- reassign permissions --

    async fn find_unused_permission(
        &mut self,
        lead_id: DbId,
        admin_id: DbId,
    ) -> StoreResult<Option<ReassignPermission>>;
    /// Returns `false` if the permission was already used.
    async fn consume_permission(&mut self, id: DbId) -> StoreResult<bool>;
    async fn grant_permission(
        &mut self,
        lead_id: DbId,
        admin_id: DbId,
        granted_by: DbId,
    ) -> StoreResult<ReassignPermission>;
    async fn list_permissions(&mut self, lead_id: DbId) -> StoreResult<Vec<ReassignPermission>>;

    // -- notifications --

    async fn insert_notification(&mut self, input: &NewNotification) -> StoreResult<Notification>;
    /// Lock a notification, together with the sibling copies of the same
    /// reassignment request, until the unit of work ends.
    async fn lock_notification(&mut self, id: DbId) -> StoreResult<Option<Notification>>;
    /// Resolve a pending request and its sibling copies (same lead and
    /// requester). Returns the number of rows resolved.
    async fn resolve_requests(
        &mut self,
        notification_id: DbId,
        lead_id: Option<DbId>,
        requested_by_id: Option<DbId>,
        status: RequestStatus,
        acted_by_id: DbId,
    ) -> StoreResult<u64>;
    async fn list_notifications(&mut self, recipient_id: DbId) -> StoreResult<Vec<Notification>>;
    /// Excludes pending reassignment requests.
    async fn mark_notifications_read(&mut self, recipient_id: DbId) -> StoreResult<u64>;

    // -- activity --

    async fn insert_activity(&mut self, input: &NewActivity) -> StoreResult<UserActivity>;
    async fn list_activity(&mut self, user_id: DbId) -> StoreResult<Vec<ActivityEntry>>;
    async fn delete_activity(&mut self, user_id: DbId) -> StoreResult<u64>;

    /// Make every write in this unit of work visible at once.
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
