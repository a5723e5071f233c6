//! In-process [`LeadStore`] used by the engine and HTTP tests.
//!
//! A unit of work holds the state lock for its whole lifetime and mutates a
//! private copy; `commit` swaps the copy in. Units of work therefore run one
//! at a time, which gives the same isolation the Postgres row locks give for
//! a single lead.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use leadflow_core::lead::{LeadPriority, STATUS_CLOSED, STATUS_NEW};
use leadflow_core::reassignment::{NotificationKind, RequestStatus};
use leadflow_core::roles::Role;
use leadflow_core::types::DbId;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{LeadStore, StoreError, StoreResult, UnitOfWork};
use crate::models::activity::{ActivityEntry, NewActivity, UserActivity};
use crate::models::assignment::LeadAssignment;
use crate::models::lead::{Lead, NewLead};
use crate::models::notification::{NewNotification, Notification};
use crate::models::reassign_permission::ReassignPermission;
use crate::models::user::{CreateUser, User};

/// Points where a test can make the store fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    /// Fail inserting assignments, for one lead or (`None`) for any lead.
    InsertAssignments { lead_id: Option<DbId> },
    GrantPermission,
    InsertNotification,
    InsertActivity,
    Commit,
}

/// Everything the in-memory store holds. Tests read it through
/// [`InMemoryStore::snapshot`].
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    next_id: DbId,
    pub users: BTreeMap<DbId, User>,
    pub leads: BTreeMap<DbId, Lead>,
    pub assignments: Vec<LeadAssignment>,
    pub permissions: Vec<ReassignPermission>,
    pub notifications: Vec<Notification>,
    pub activity: Vec<UserActivity>,
    faults: Vec<FaultPoint>,
    commit_delay: Option<Duration>,
}

impl MemoryState {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn check(&self, point: FaultPoint) -> StoreResult<()> {
        let hit = self.faults.iter().any(|f| match (*f, point) {
            (
                FaultPoint::InsertAssignments { lead_id: None },
                FaultPoint::InsertAssignments { .. },
            ) => true,
            (armed, actual) => armed == actual,
        });
        if hit {
            Err(StoreError::Injected(point))
        } else {
            Ok(())
        }
    }

    /// Active assignments for one lead, in insertion order.
    pub fn active_for(&self, lead_id: DbId) -> Vec<&LeadAssignment> {
        self.assignments
            .iter()
            .filter(|a| a.active && a.lead_id == lead_id)
            .collect()
    }

    fn insert_user(&mut self, name: &str, email: &str, role: Role) -> User {
        let now = Utc::now();
        let user = User {
            id: self.next_id(),
            name: name.to_string(),
            email: email.to_string(),
            role: role.as_str().to_string(),
            created_at: now,
            updated_at: now,
        };
        self.users.insert(user.id, user.clone());
        user
    }

    fn insert_lead(&mut self, input: &NewLead) -> Lead {
        let now = Utc::now();
        let lead = Lead {
            id: self.next_id(),
            title: input.title.clone(),
            customer_name: input.customer_name.clone(),
            phone: input.phone.clone(),
            email: input.email.clone(),
            source: input.source.clone(),
            due_date: input.due_date,
            priority: input.priority.as_str().to_string(),
            status: STATUS_NEW.to_string(),
            notes: input.notes.clone(),
            created_by: input.created_by,
            closed_by: None,
            closed_at: None,
            created_at: now,
            updated_at: now,
        };
        self.leads.insert(lead.id, lead.clone());
        lead
    }
}

/// Shared handle to an in-memory store. Clones see the same data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user outside of any unit of work.
    pub async fn seed_user(&self, name: &str, role: Role) -> User {
        let email = format!("{}@example.com", name.to_lowercase().replace(' ', "."));
        self.state.lock().await.insert_user(name, &email, role)
    }

    /// Insert a lead with default fields outside of any unit of work.
    pub async fn seed_lead(&self, title: &str, created_by: DbId) -> Lead {
        let input = NewLead {
            title: title.to_string(),
            customer_name: None,
            phone: None,
            email: None,
            source: None,
            due_date: None,
            priority: LeadPriority::default(),
            notes: None,
            created_by,
        };
        self.state.lock().await.insert_lead(&input)
    }

    /// Arm a fault. It stays armed until [`clear_faults`](Self::clear_faults).
    pub async fn fail_at(&self, point: FaultPoint) {
        self.state.lock().await.faults.push(point);
    }

    pub async fn clear_faults(&self) {
        let mut state = self.state.lock().await;
        state.faults.clear();
        state.commit_delay = None;
    }

    /// Make every commit sleep before publishing its writes.
    pub async fn delay_commits(&self, delay: Duration) {
        self.state.lock().await.commit_delay = Some(delay);
    }

    /// A copy of the committed state.
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl LeadStore for InMemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork { guard, working }))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn create_user(&mut self, input: &CreateUser) -> StoreResult<User> {
        if self.working.users.values().any(|u| u.email == input.email) {
            return Err(StoreError::Constraint(format!(
                "email '{}' already registered",
                input.email
            )));
        }
        Ok(self.working.insert_user(&input.name, &input.email, input.role))
    }

    async fn find_user(&mut self, id: DbId) -> StoreResult<Option<User>> {
        Ok(self.working.users.get(&id).cloned())
    }

    async fn find_users(&mut self, ids: &[DbId]) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self
            .working
            .users
            .values()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn list_users_by_role(&mut self, role: Role) -> StoreResult<Vec<User>> {
        Ok(self
            .working
            .users
            .values()
            .filter(|u| u.role == role.as_str())
            .cloned()
            .collect())
    }

    async fn insert_lead(&mut self, input: &NewLead) -> StoreResult<Lead> {
        Ok(self.working.insert_lead(input))
    }

    async fn find_lead(&mut self, id: DbId) -> StoreResult<Option<Lead>> {
        Ok(self.working.leads.get(&id).cloned())
    }

    async fn lock_lead(&mut self, id: DbId) -> StoreResult<Option<Lead>> {
        // The unit of work already holds the whole-store lock.
        Ok(self.working.leads.get(&id).cloned())
    }

    async fn list_leads(&mut self) -> StoreResult<Vec<Lead>> {
        let mut leads: Vec<Lead> = self.working.leads.values().cloned().collect();
        leads.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(leads)
    }

    async fn save_lead(&mut self, lead: &Lead) -> StoreResult<Option<Lead>> {
        let Some(stored) = self.working.leads.get_mut(&lead.id) else {
            return Ok(None);
        };
        let mut updated = lead.clone();
        updated.created_at = stored.created_at;
        updated.created_by = stored.created_by;
        updated.updated_at = Utc::now();
        *stored = updated.clone();
        Ok(Some(updated))
    }

    async fn delete_lead(&mut self, id: DbId) -> StoreResult<bool> {
        if self.working.leads.remove(&id).is_none() {
            return Ok(false);
        }
        self.working.assignments.retain(|a| a.lead_id != id);
        self.working.permissions.retain(|p| p.lead_id != id);
        for n in self.working.notifications.iter_mut() {
            if n.lead_id == Some(id) {
                n.lead_id = None;
            }
        }
        Ok(true)
    }

    async fn count_leads_created_by(&mut self, user_id: DbId) -> StoreResult<i64> {
        let count = self
            .working
            .leads
            .values()
            .filter(|l| l.created_by == user_id)
            .count();
        Ok(count as i64)
    }

    async fn count_leads_closed_by(&mut self, user_id: DbId) -> StoreResult<i64> {
        let count = self
            .working
            .leads
            .values()
            .filter(|l| l.status == STATUS_CLOSED && l.closed_by == Some(user_id))
            .count();
        Ok(count as i64)
    }

    async fn active_assignments(&mut self, lead_id: DbId) -> StoreResult<Vec<LeadAssignment>> {
        Ok(self
            .working
            .active_for(lead_id)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn all_active_assignments(&mut self) -> StoreResult<Vec<LeadAssignment>> {
        let mut rows: Vec<LeadAssignment> = self
            .working
            .assignments
            .iter()
            .filter(|a| a.active)
            .cloned()
            .collect();
        rows.sort_by_key(|a| (a.lead_id, a.id));
        Ok(rows)
    }

    async fn deactivate_assignments(&mut self, lead_id: DbId) -> StoreResult<u64> {
        let mut changed = 0;
        for row in self.working.assignments.iter_mut() {
            if row.active && row.lead_id == lead_id {
                row.active = false;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn insert_assignments(
        &mut self,
        lead_id: DbId,
        user_ids: &[DbId],
        assigned_by: DbId,
    ) -> StoreResult<Vec<LeadAssignment>> {
        self.working.check(FaultPoint::InsertAssignments {
            lead_id: Some(lead_id),
        })?;
        if !self.working.leads.contains_key(&lead_id) {
            return Err(StoreError::Constraint(format!("lead {lead_id} does not exist")));
        }
        let mut inserted = Vec::with_capacity(user_ids.len());
        for &user_id in user_ids {
            if !self.working.users.contains_key(&user_id) {
                return Err(StoreError::Constraint(format!("user {user_id} does not exist")));
            }
            let duplicate = self
                .working
                .assignments
                .iter()
                .any(|a| a.active && a.lead_id == lead_id && a.user_id == user_id);
            if duplicate {
                return Err(StoreError::Constraint(format!(
                    "user {user_id} already actively assigned to lead {lead_id}"
                )));
            }
            let row = LeadAssignment {
                id: self.working.next_id(),
                lead_id,
                user_id,
                assigned_by,
                active: true,
                created_at: Utc::now(),
            };
            self.working.assignments.push(row.clone());
            inserted.push(row);
        }
        Ok(inserted)
    }

    async fn deactivate_assignment(&mut self, lead_id: DbId, user_id: DbId) -> StoreResult<u64> {
        let mut changed = 0;
        for row in self.working.assignments.iter_mut() {
            if row.active && row.lead_id == lead_id && row.user_id == user_id {
                row.active = false;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn find_unused_permission(
        &mut self,
        lead_id: DbId,
        admin_id: DbId,
    ) -> StoreResult<Option<ReassignPermission>> {
        Ok(self
            .working
            .permissions
            .iter()
            .find(|p| !p.used && p.lead_id == lead_id && p.admin_id == admin_id)
            .cloned())
    }

    async fn consume_permission(&mut self, id: DbId) -> StoreResult<bool> {
        match self
            .working
            .permissions
            .iter_mut()
            .find(|p| p.id == id && !p.used)
        {
            Some(permission) => {
                permission.used = true;
                permission.used_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn grant_permission(
        &mut self,
        lead_id: DbId,
        admin_id: DbId,
        granted_by: DbId,
    ) -> StoreResult<ReassignPermission> {
        self.working.check(FaultPoint::GrantPermission)?;
        let permission = ReassignPermission {
            id: self.working.next_id(),
            lead_id,
            admin_id,
            granted_by,
            used: false,
            used_at: None,
            created_at: Utc::now(),
        };
        self.working.permissions.push(permission.clone());
        Ok(permission)
    }

    async fn list_permissions(&mut self, lead_id: DbId) -> StoreResult<Vec<ReassignPermission>> {
        Ok(self
            .working
            .permissions
            .iter()
            .filter(|p| p.lead_id == lead_id)
            .cloned()
            .collect())
    }

    async fn insert_notification(&mut self, input: &NewNotification) -> StoreResult<Notification> {
        self.working.check(FaultPoint::InsertNotification)?;
        let notification = Notification {
            id: self.working.next_id(),
            recipient_id: input.recipient_id,
            lead_id: input.lead_id,
            notification_type: input.kind.as_str().to_string(),
            status: input.status.map(|s| s.as_str().to_string()),
            requested_by_id: input.requested_by_id,
            acted_by_id: None,
            is_read: false,
            message: input.message.clone(),
            created_at: Utc::now(),
        };
        self.working.notifications.push(notification.clone());
        Ok(notification)
    }

    async fn lock_notification(&mut self, id: DbId) -> StoreResult<Option<Notification>> {
        Ok(self
            .working
            .notifications
            .iter()
            .find(|n| n.id == id)
            .cloned())
    }

    async fn resolve_requests(
        &mut self,
        notification_id: DbId,
        lead_id: Option<DbId>,
        requested_by_id: Option<DbId>,
        status: RequestStatus,
        acted_by_id: DbId,
    ) -> StoreResult<u64> {
        let mut resolved = 0;
        for n in self.working.notifications.iter_mut() {
            let pending_request = n.kind().ok() == Some(NotificationKind::ReassignRequest)
                && n.request_status().ok().flatten() == Some(RequestStatus::Pending);
            let sibling = lead_id.is_some()
                && requested_by_id.is_some()
                && n.lead_id == lead_id
                && n.requested_by_id == requested_by_id;
            if pending_request && (n.id == notification_id || sibling) {
                n.status = Some(status.as_str().to_string());
                n.acted_by_id = Some(acted_by_id);
                n.is_read = true;
                resolved += 1;
            }
        }
        Ok(resolved)
    }

    async fn list_notifications(&mut self, recipient_id: DbId) -> StoreResult<Vec<Notification>> {
        let mut rows: Vec<Notification> = self
            .working
            .notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn mark_notifications_read(&mut self, recipient_id: DbId) -> StoreResult<u64> {
        let mut changed = 0;
        for n in self.working.notifications.iter_mut() {
            let pending_request = n.kind().ok() == Some(NotificationKind::ReassignRequest)
                && n.request_status().ok().flatten() == Some(RequestStatus::Pending);
            if n.recipient_id == recipient_id && !n.is_read && !pending_request {
                n.is_read = true;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn insert_activity(&mut self, input: &NewActivity) -> StoreResult<UserActivity> {
        self.working.check(FaultPoint::InsertActivity)?;
        let entry = UserActivity {
            id: self.working.next_id(),
            user_id: input.user_id,
            lead_id: input.lead_id,
            lead_title: input.lead_title.clone(),
            action: input.action.as_str().to_string(),
            details: input.details.clone(),
            created_at: Utc::now(),
        };
        self.working.activity.push(entry.clone());
        Ok(entry)
    }

    async fn list_activity(&mut self, user_id: DbId) -> StoreResult<Vec<ActivityEntry>> {
        let actor_name = self.working.users.get(&user_id).map(|u| u.name.clone());
        let mut rows: Vec<ActivityEntry> = self
            .working
            .activity
            .iter()
            .filter(|a| a.user_id == user_id)
            .map(|a| ActivityEntry {
                id: a.id,
                user_id: a.user_id,
                actor_name: actor_name.clone(),
                lead_id: a.lead_id,
                lead_title: a.lead_title.clone(),
                action: a.action.clone(),
                details: a.details.clone(),
                created_at: a.created_at,
            })
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn delete_activity(&mut self, user_id: DbId) -> StoreResult<u64> {
        let before = self.working.activity.len();
        self.working.activity.retain(|a| a.user_id != user_id);
        Ok((before - self.working.activity.len()) as u64)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryUnitOfWork { mut guard, working } = *self;
        working.check(FaultPoint::Commit)?;
        if let Some(delay) = working.commit_delay {
            tokio::time::sleep(delay).await;
        }
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use leadflow_core::activity::ActivityAction;

    use super::*;

    #[tokio::test]
    async fn dropped_unit_of_work_discards_writes() {
        let store = InMemoryStore::new();
        let admin = store.seed_user("Ada", Role::Admin).await;
        let lead = store.seed_lead("Acme", admin.id).await;

        let mut uow = store.begin().await.unwrap();
        uow.insert_assignments(lead.id, &[admin.id], admin.id)
            .await
            .unwrap();
        drop(uow);

        assert!(store.snapshot().await.assignments.is_empty());
    }

    #[tokio::test]
    async fn commit_publishes_writes() {
        let store = InMemoryStore::new();
        let admin = store.seed_user("Ada", Role::Admin).await;
        let lead = store.seed_lead("Acme", admin.id).await;

        let mut uow = store.begin().await.unwrap();
        uow.insert_assignments(lead.id, &[admin.id], admin.id)
            .await
            .unwrap();
        uow.commit().await.unwrap();

        assert_eq!(store.snapshot().await.active_for(lead.id).len(), 1);
    }

    #[tokio::test]
    async fn duplicate_active_assignment_is_rejected() {
        let store = InMemoryStore::new();
        let admin = store.seed_user("Ada", Role::Admin).await;
        let lead = store.seed_lead("Acme", admin.id).await;

        let mut uow = store.begin().await.unwrap();
        let err = uow
            .insert_assignments(lead.id, &[admin.id, admin.id], admin.id)
            .await
            .unwrap_err();
        assert_matches!(err, StoreError::Constraint(_));
    }

    #[tokio::test]
    async fn faults_target_a_single_lead() {
        let store = InMemoryStore::new();
        let admin = store.seed_user("Ada", Role::Admin).await;
        let first = store.seed_lead("First", admin.id).await;
        let second = store.seed_lead("Second", admin.id).await;
        store
            .fail_at(FaultPoint::InsertAssignments {
                lead_id: Some(second.id),
            })
            .await;

        let mut uow = store.begin().await.unwrap();
        assert!(uow
            .insert_assignments(first.id, &[admin.id], admin.id)
            .await
            .is_ok());
        let err = uow
            .insert_assignments(second.id, &[admin.id], admin.id)
            .await
            .unwrap_err();
        assert_matches!(err, StoreError::Injected(FaultPoint::InsertAssignments { .. }));
    }

    #[tokio::test]
    async fn deleting_a_lead_cascades_but_keeps_activity() {
        let store = InMemoryStore::new();
        let admin = store.seed_user("Ada", Role::Admin).await;
        let lead = store.seed_lead("Acme", admin.id).await;

        let mut uow = store.begin().await.unwrap();
        uow.insert_assignments(lead.id, &[admin.id], admin.id)
            .await
            .unwrap();
        uow.grant_permission(lead.id, admin.id, admin.id)
            .await
            .unwrap();
        uow.insert_activity(&NewActivity {
            user_id: admin.id,
            lead_id: Some(lead.id),
            lead_title: Some(lead.title.clone()),
            action: ActivityAction::Created,
            details: None,
        })
        .await
        .unwrap();
        assert!(uow.delete_lead(lead.id).await.unwrap());
        uow.commit().await.unwrap();

        let state = store.snapshot().await;
        assert!(state.assignments.is_empty());
        assert!(state.permissions.is_empty());
        assert_eq!(state.activity.len(), 1);
        assert_eq!(state.activity[0].lead_title.as_deref(), Some("Acme"));
    }

    #[tokio::test]
    async fn mark_read_skips_pending_requests() {
        let store = InMemoryStore::new();
        let boss = store.seed_user("Boss", Role::SuperAdmin).await;

        let mut uow = store.begin().await.unwrap();
        uow.insert_notification(&NewNotification {
            recipient_id: boss.id,
            lead_id: None,
            kind: NotificationKind::ReassignRequest,
            status: Some(RequestStatus::Pending),
            requested_by_id: None,
            message: "please".into(),
        })
        .await
        .unwrap();
        uow.insert_notification(&NewNotification {
            recipient_id: boss.id,
            lead_id: None,
            kind: NotificationKind::General,
            status: None,
            requested_by_id: None,
            message: "fyi".into(),
        })
        .await
        .unwrap();
        assert_eq!(uow.mark_notifications_read(boss.id).await.unwrap(), 1);
        uow.commit().await.unwrap();

        let state = store.snapshot().await;
        let pending = state
            .notifications
            .iter()
            .find(|n| n.message == "please")
            .unwrap();
        assert!(!pending.is_read);
    }
}
