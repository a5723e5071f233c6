//! Assignment rules: assignee normalisation, the super-admin override gate
//! and the bulk failure policy.

use std::collections::HashSet;
use std::str::FromStr;

use serde::Serialize;

use crate::error::CoreError;
use crate::roles::Role;
use crate::types::DbId;

/// Remove duplicate ids, keeping first-seen order.
pub fn dedupe_ids(ids: &[DbId]) -> Vec<DbId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Normalise an assignee list, rejecting an empty one.
pub fn normalize_assignees(ids: &[DbId]) -> Result<Vec<DbId>, CoreError> {
    let unique = dedupe_ids(ids);
    if unique.is_empty() {
        return Err(CoreError::Validation(
            "assigneeIds must contain at least one user".to_string(),
        ));
    }
    Ok(unique)
}

/// Outcome of the override gate for one assign call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideCheck {
    /// No restriction applies.
    Allowed,
    /// The lead is super-admin owned; the given permission must be consumed
    /// in the same unit of work.
    ConsumePermission(DbId),
    /// The lead is super-admin owned and no permission is available.
    Denied,
}

/// Decide whether `actor_role` may replace the current assignment set.
///
/// `current_assigner_roles` are the roles of the users who established the
/// lead's active assignments. `unused_permission` is the id of an unconsumed
/// reassign permission for (lead, actor), if one exists.
pub fn check_override(
    actor_role: Role,
    current_assigner_roles: &[Role],
    unused_permission: Option<DbId>,
) -> OverrideCheck {
    if actor_role == Role::SuperAdmin {
        return OverrideCheck::Allowed;
    }
    let owned_by_super_admin = current_assigner_roles.contains(&Role::SuperAdmin);
    if !owned_by_super_admin {
        return OverrideCheck::Allowed;
    }
    match unused_permission {
        Some(permission_id) => OverrideCheck::ConsumePermission(permission_id),
        None => OverrideCheck::Denied,
    }
}

pub const OVERRIDE_DENIED_MESSAGE: &str =
    "Lead already assigned by super admin, must request reassignment";

/// How a bulk assignment handles a failure on one lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkFailurePolicy {
    /// Each lead commits independently; failures are collected.
    #[default]
    ContinueOnError,
    /// All leads share one unit of work; the first failure rolls back all.
    AbortAll,
}

impl FromStr for BulkFailurePolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "continue" | "continue_on_error" => Ok(BulkFailurePolicy::ContinueOnError),
            "abort" | "abort_all" => Ok(BulkFailurePolicy::AbortAll),
            other => Err(CoreError::Validation(format!(
                "Unknown bulk failure policy '{other}'. Must be 'continue' or 'abort'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupe_keeps_first_seen_order() {
        assert_eq!(dedupe_ids(&[3, 1, 3, 2, 1]), vec![3, 1, 2]);
        assert!(dedupe_ids(&[]).is_empty());
    }

    #[test]
    fn normalize_rejects_empty_list() {
        assert!(normalize_assignees(&[]).is_err());
        assert_eq!(normalize_assignees(&[5, 5]).unwrap(), vec![5]);
    }

    #[test]
    fn super_admin_always_bypasses() {
        assert_eq!(
            check_override(Role::SuperAdmin, &[Role::SuperAdmin], None),
            OverrideCheck::Allowed
        );
    }

    #[test]
    fn admin_may_replace_admin_owned_set() {
        assert_eq!(check_override(Role::Admin, &[Role::Admin], None), OverrideCheck::Allowed);
        assert_eq!(check_override(Role::Admin, &[], None), OverrideCheck::Allowed);
    }

    #[test]
    fn admin_blocked_on_super_admin_owned_set() {
        assert_eq!(
            check_override(Role::Admin, &[Role::SuperAdmin], None),
            OverrideCheck::Denied
        );
    }

    #[test]
    fn admin_with_permission_consumes_it() {
        assert_eq!(
            check_override(Role::Admin, &[Role::SuperAdmin], Some(11)),
            OverrideCheck::ConsumePermission(11)
        );
    }

    #[test]
    fn unneeded_permission_is_not_consumed() {
        assert_eq!(
            check_override(Role::Admin, &[Role::Admin], Some(11)),
            OverrideCheck::Allowed
        );
    }

    #[test]
    fn bulk_policy_parses_config_values() {
        assert_eq!(
            "continue".parse::<BulkFailurePolicy>().unwrap(),
            BulkFailurePolicy::ContinueOnError
        );
        assert_eq!("ABORT".parse::<BulkFailurePolicy>().unwrap(), BulkFailurePolicy::AbortAll);
        assert!("sometimes".parse::<BulkFailurePolicy>().is_err());
        assert_eq!(BulkFailurePolicy::default(), BulkFailurePolicy::ContinueOnError);
    }
}
