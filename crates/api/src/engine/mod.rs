//! Business operations over the record store.
//!
//! Every public operation that writes opens exactly one
//! [`UnitOfWork`](leadflow_db::store::UnitOfWork), bounds it with the
//! configured store timeout and commits once. Audit entries are appended
//! afterwards through the [`ActivityLogger`], which never fails its caller.

pub mod activity;
pub mod assignment;
pub mod leads;
pub mod notification;
pub mod reassignment;

use std::future::Future;
use std::time::Duration;

use leadflow_core::activity::unknown_user_label;
use leadflow_core::error::CoreError;
use leadflow_core::roles::Role;
use leadflow_core::types::DbId;
use leadflow_db::store::{StoreError, UnitOfWork};

pub use activity::{ActivityLogger, ActivityRecord, ActivitySummary};
pub use assignment::{AssignmentEngine, BulkAssignResult, BulkOutcome, UnassignResult};
pub use leads::LeadService;
pub use notification::NotificationDispatcher;
pub use reassignment::{DecisionResult, ReassignRequestResult, ReassignmentWorkflow};

/// The authenticated caller of an engine operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: DbId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: DbId, role: Role) -> Self {
        Self { user_id, role }
    }

    fn require(&self, minimum: Role, message: &str) -> Result<(), CoreError> {
        if self.role.at_least(minimum) {
            Ok(())
        } else {
            Err(CoreError::Forbidden(message.to_string()))
        }
    }
}

/// Run one store operation under `limit`.
///
/// On expiry the future is dropped, which drops its unit of work and rolls
/// it back, and the caller sees a storage failure.
async fn bounded<T, F>(limit: Duration, operation: F) -> Result<T, CoreError>
where
    F: Future<Output = Result<T, CoreError>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!(timeout = ?limit, "Store operation timed out");
            Err(StoreError::Timeout(limit).into())
        }
    }
}

/// Display names for `ids`, in the given order. Unknown ids get a
/// placeholder label instead of failing.
async fn display_names(uow: &mut dyn UnitOfWork, ids: &[DbId]) -> Result<Vec<String>, CoreError> {
    let users = uow.find_users(ids).await?;
    Ok(ids
        .iter()
        .map(|id| {
            users
                .iter()
                .find(|u| u.id == *id)
                .map(|u| u.name.clone())
                .unwrap_or_else(|| unknown_user_label(*id))
        })
        .collect())
}

/// Client-safe text for a failure reported inside a successful response.
fn public_message(err: &CoreError) -> String {
    match err {
        CoreError::Storage(_) | CoreError::Internal(_) => "An internal error occurred".to_string(),
        other => other.to_string(),
    }
}
