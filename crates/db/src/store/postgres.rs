//! [`LeadStore`] backed by a Postgres pool. Each unit of work is one
//! transaction; dropping it uncommitted rolls back.

use async_trait::async_trait;
use leadflow_core::reassignment::RequestStatus;
use leadflow_core::roles::Role;
use leadflow_core::types::DbId;
use sqlx::{Postgres, Transaction};

use super::{LeadStore, StoreResult, UnitOfWork};
use crate::models::activity::{ActivityEntry, NewActivity, UserActivity};
use crate::models::assignment::LeadAssignment;
use crate::models::lead::{Lead, NewLead};
use crate::models::notification::{NewNotification, Notification};
use crate::models::reassign_permission::ReassignPermission;
use crate::models::user::{CreateUser, User};
use crate::repositories::{
    ActivityRepo, AssignmentRepo, LeadRepo, NotificationRepo, ReassignPermissionRepo, UserRepo,
};
use crate::DbPool;

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl LeadStore for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn ping(&self) -> StoreResult<()> {
        crate::health_check(&self.pool).await?;
        Ok(())
    }
}

struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn create_user(&mut self, input: &CreateUser) -> StoreResult<User> {
        Ok(UserRepo::create(&mut *self.tx, input).await?)
    }

    async fn find_user(&mut self, id: DbId) -> StoreResult<Option<User>> {
        Ok(UserRepo::find_by_id(&mut *self.tx, id).await?)
    }

    async fn find_users(&mut self, ids: &[DbId]) -> StoreResult<Vec<User>> {
        Ok(UserRepo::find_many(&mut *self.tx, ids).await?)
    }

    async fn list_users_by_role(&mut self, role: Role) -> StoreResult<Vec<User>> {
        Ok(UserRepo::list_by_role(&mut *self.tx, role).await?)
    }

    async fn insert_lead(&mut self, input: &NewLead) -> StoreResult<Lead> {
        Ok(LeadRepo::create(&mut *self.tx, input).await?)
    }

    async fn find_lead(&mut self, id: DbId) -> StoreResult<Option<Lead>> {
        Ok(LeadRepo::find_by_id(&mut *self.tx, id).await?)
    }

    async fn lock_lead(&mut self, id: DbId) -> StoreResult<Option<Lead>> {
        Ok(LeadRepo::find_by_id_for_update(&mut *self.tx, id).await?)
    }

    async fn list_leads(&mut self) -> StoreResult<Vec<Lead>> {
        Ok(LeadRepo::list(&mut *self.tx).await?)
    }

    async fn save_lead(&mut self, lead: &Lead) -> StoreResult<Option<Lead>> {
        Ok(LeadRepo::save(&mut *self.tx, lead).await?)
    }

    async fn delete_lead(&mut self, id: DbId) -> StoreResult<bool> {
        Ok(LeadRepo::delete(&mut *self.tx, id).await?)
    }

    async fn count_leads_created_by(&mut self, user_id: DbId) -> StoreResult<i64> {
        Ok(LeadRepo::count_created_by(&mut *self.tx, user_id).await?)
    }

    async fn count_leads_closed_by(&mut self, user_id: DbId) -> StoreResult<i64> {
        Ok(LeadRepo::count_closed_by(&mut *self.tx, user_id).await?)
    }

    async fn active_assignments(&mut self, lead_id: DbId) -> StoreResult<Vec<LeadAssignment>> {
        Ok(AssignmentRepo::list_active_for_lead(&mut *self.tx, lead_id).await?)
    }

    async fn all_active_assignments(&mut self) -> StoreResult<Vec<LeadAssignment>> {
        Ok(AssignmentRepo::list_active(&mut *self.tx).await?)
    }

    async fn deactivate_assignments(&mut self, lead_id: DbId) -> StoreResult<u64> {
        Ok(AssignmentRepo::deactivate_for_lead(&mut *self.tx, lead_id).await?)
    }

    async fn insert_assignments(
        &mut self,
        lead_id: DbId,
        user_ids: &[DbId],
        assigned_by: DbId,
    ) -> StoreResult<Vec<LeadAssignment>> {
        Ok(AssignmentRepo::insert_many(&mut *self.tx, lead_id, user_ids, assigned_by).await?)
    }

    async fn deactivate_assignment(&mut self, lead_id: DbId, user_id: DbId) -> StoreResult<u64> {
        Ok(AssignmentRepo::deactivate_one(&mut *self.tx, lead_id, user_id).await?)
    }

    async fn find_unused_permission(
        &mut self,
        lead_id: DbId,
        admin_id: DbId,
    ) -> StoreResult<Option<ReassignPermission>> {
        Ok(ReassignPermissionRepo::find_unused_for_update(&mut *self.tx, lead_id, admin_id).await?)
    }

    async fn consume_permission(&mut self, id: DbId) -> StoreResult<bool> {
        Ok(ReassignPermissionRepo::mark_used(&mut *self.tx, id).await?)
    }

    async fn grant_permission(
        &mut self,
        lead_id: DbId,
        admin_id: DbId,
        granted_by: DbId,
    ) -> StoreResult<ReassignPermission> {
        Ok(ReassignPermissionRepo::create(&mut *self.tx, lead_id, admin_id, granted_by).await?)
    }

    async fn list_permissions(&mut self, lead_id: DbId) -> StoreResult<Vec<ReassignPermission>> {
        Ok(ReassignPermissionRepo::list_for_lead(&mut *self.tx, lead_id).await?)
    }

    async fn insert_notification(&mut self, input: &NewNotification) -> StoreResult<Notification> {
        Ok(NotificationRepo::create(&mut *self.tx, input).await?)
    }

    async fn lock_notification(&mut self, id: DbId) -> StoreResult<Option<Notification>> {
        Ok(NotificationRepo::find_by_id_for_update(&mut *self.tx, id).await?)
    }

    async fn resolve_requests(
        &mut self,
        notification_id: DbId,
        lead_id: Option<DbId>,
        requested_by_id: Option<DbId>,
        status: RequestStatus,
        acted_by_id: DbId,
    ) -> StoreResult<u64> {
        Ok(NotificationRepo::resolve_pending_requests(
            &mut *self.tx,
            notification_id,
            lead_id,
            requested_by_id,
            status,
            acted_by_id,
        )
        .await?)
    }

    async fn list_notifications(&mut self, recipient_id: DbId) -> StoreResult<Vec<Notification>> {
        Ok(NotificationRepo::list_for_recipient(&mut *self.tx, recipient_id).await?)
    }

    async fn mark_notifications_read(&mut self, recipient_id: DbId) -> StoreResult<u64> {
        Ok(NotificationRepo::mark_read_for_recipient(&mut *self.tx, recipient_id).await?)
    }

    async fn insert_activity(&mut self, input: &NewActivity) -> StoreResult<UserActivity> {
        Ok(ActivityRepo::insert(&mut *self.tx, input).await?)
    }

    async fn list_activity(&mut self, user_id: DbId) -> StoreResult<Vec<ActivityEntry>> {
        Ok(ActivityRepo::list_for_user(&mut *self.tx, user_id).await?)
    }

    async fn delete_activity(&mut self, user_id: DbId) -> StoreResult<u64> {
        Ok(ActivityRepo::delete_for_user(&mut *self.tx, user_id).await?)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
