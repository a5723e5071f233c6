//! Exercises the Postgres unit of work against a real database.
//!
//! Run with `DATABASE_URL` set and `--ignored`.

use leadflow_core::lead::LeadPriority;
use leadflow_core::reassignment::{NotificationKind, RequestStatus};
use leadflow_core::roles::Role;
use leadflow_db::models::lead::NewLead;
use leadflow_db::models::notification::NewNotification;
use leadflow_db::models::user::CreateUser;
use std::time::Duration;

use leadflow_db::store::{LeadStore, PgStore, StoreResult};
use sqlx::PgPool;

fn new_lead(title: &str, created_by: i64) -> NewLead {
    NewLead {
        title: title.to_string(),
        customer_name: Some("Acme Corp".to_string()),
        phone: None,
        email: None,
        source: Some("web".to_string()),
        due_date: None,
        priority: LeadPriority::High,
        notes: None,
        created_by,
    }
}

fn user(name: &str, role: Role) -> CreateUser {
    CreateUser {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        role,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_uncommitted_assignments_roll_back(pool: PgPool) {
    leadflow_db::health_check(&pool).await.unwrap();
    let store = PgStore::new(pool);

    let mut uow = store.begin().await.unwrap();
    let admin = uow.create_user(&user("Ada", Role::Admin)).await.unwrap();
    let lead = uow.insert_lead(&new_lead("Acme", admin.id)).await.unwrap();
    uow.commit().await.unwrap();

    let mut uow = store.begin().await.unwrap();
    uow.insert_assignments(lead.id, &[admin.id], admin.id)
        .await
        .unwrap();
    drop(uow);

    let mut uow = store.begin().await.unwrap();
    assert!(uow.active_assignments(lead.id).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_active_assignment_is_unique(pool: PgPool) {
    let store = PgStore::new(pool);

    let mut uow = store.begin().await.unwrap();
    let admin = uow.create_user(&user("Ada", Role::Admin)).await.unwrap();
    let lead = uow.insert_lead(&new_lead("Acme", admin.id)).await.unwrap();
    let result = uow
        .insert_assignments(lead.id, &[admin.id, admin.id], admin.id)
        .await;
    assert!(result.is_err(), "duplicate active row must violate the unique index");
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_closure_check_constraint(pool: PgPool) {
    let store = PgStore::new(pool);

    let mut uow = store.begin().await.unwrap();
    let admin = uow.create_user(&user("Ada", Role::Admin)).await.unwrap();
    let mut lead = uow.insert_lead(&new_lead("Acme", admin.id)).await.unwrap();
    assert_eq!(lead.status, "New");
    assert_eq!(lead.priority, "High");

    lead.status = "Closed".to_string();
    let result = uow.save_lead(&lead).await;
    assert!(result.is_err(), "Closed without a closure stamp must be rejected");
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_resolving_a_request_resolves_its_siblings(pool: PgPool) {
    let store = PgStore::new(pool);

    let mut uow = store.begin().await.unwrap();
    let admin = uow.create_user(&user("Ada", Role::Admin)).await.unwrap();
    let boss_a = uow.create_user(&user("Bea", Role::SuperAdmin)).await.unwrap();
    let boss_b = uow.create_user(&user("Cy", Role::SuperAdmin)).await.unwrap();
    let lead = uow.insert_lead(&new_lead("Acme", admin.id)).await.unwrap();

    let mut first = None;
    for boss in [&boss_a, &boss_b] {
        let n = uow
            .insert_notification(&NewNotification {
                recipient_id: boss.id,
                lead_id: Some(lead.id),
                kind: NotificationKind::ReassignRequest,
                status: Some(RequestStatus::Pending),
                requested_by_id: Some(admin.id),
                message: "reassign please".to_string(),
            })
            .await
            .unwrap();
        first.get_or_insert(n.id);
    }

    let resolved = uow
        .resolve_requests(
            first.unwrap(),
            Some(lead.id),
            Some(admin.id),
            RequestStatus::Accepted,
            boss_a.id,
        )
        .await
        .unwrap();
    assert_eq!(resolved, 2);

    let again = uow
        .resolve_requests(
            first.unwrap(),
            Some(lead.id),
            Some(admin.id),
            RequestStatus::Rejected,
            boss_b.id,
        )
        .await
        .unwrap();
    assert_eq!(again, 0);
}

/// Lock one copy of a request, hold the lock for `hold`, then accept it.
/// Returns how many copies this decider resolved.
async fn decide(
    store: PgStore,
    notification_id: i64,
    boss_id: i64,
    hold: Duration,
) -> StoreResult<u64> {
    let mut uow = store.begin().await?;
    let request = uow
        .lock_notification(notification_id)
        .await?
        .expect("notification exists");
    if request.request_status().unwrap() != Some(RequestStatus::Pending) {
        return Ok(0);
    }
    tokio::time::sleep(hold).await;
    let resolved = uow
        .resolve_requests(
            notification_id,
            request.lead_id,
            request.requested_by_id,
            RequestStatus::Accepted,
            boss_id,
        )
        .await?;
    uow.commit().await?;
    Ok(resolved)
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_sibling_decisions_do_not_deadlock(pool: PgPool) {
    let store = PgStore::new(pool);

    let mut uow = store.begin().await.unwrap();
    let admin = uow.create_user(&user("Ada", Role::Admin)).await.unwrap();
    let boss_a = uow.create_user(&user("Bea", Role::SuperAdmin)).await.unwrap();
    let boss_b = uow.create_user(&user("Cy", Role::SuperAdmin)).await.unwrap();
    let lead = uow.insert_lead(&new_lead("Acme", admin.id)).await.unwrap();
    let mut copies = Vec::new();
    for boss in [&boss_a, &boss_b] {
        let n = uow
            .insert_notification(&NewNotification {
                recipient_id: boss.id,
                lead_id: Some(lead.id),
                kind: NotificationKind::ReassignRequest,
                status: Some(RequestStatus::Pending),
                requested_by_id: Some(admin.id),
                message: "reassign please".to_string(),
            })
            .await
            .unwrap();
        copies.push(n.id);
    }
    uow.commit().await.unwrap();

    // Each super admin decides their own copy; the second starts while the
    // first still holds its locks.
    let first = tokio::spawn(decide(
        store.clone(),
        copies[0],
        boss_a.id,
        Duration::from_millis(300),
    ));
    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = tokio::spawn(decide(
        store.clone(),
        copies[1],
        boss_b.id,
        Duration::from_millis(300),
    ));

    let mut resolved = vec![
        first.await.unwrap().expect("first decider must not fail"),
        second.await.unwrap().expect("second decider must not fail"),
    ];
    resolved.sort_unstable();
    assert_eq!(resolved, vec![0, 2]);
}
