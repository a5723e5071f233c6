//! Reassignment request lifecycle.
//!
//! An admin who is blocked from reassigning a super-admin-owned lead files a
//! `REASSIGN_REQUEST` notification to every super admin. A super admin then
//! resolves it exactly once:
//!
//! ```text
//! PENDING --ACCEPT--> ACCEPTED   (grants a single-use ReassignPermission)
//! PENDING --REJECT--> REJECTED
//! ```
//!
//! Both targets are terminal. Each decision also produces a
//! `REASSIGN_DECISION` notification addressed to the requester.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

pub const KIND_REASSIGN_REQUEST: &str = "REASSIGN_REQUEST";
pub const KIND_REASSIGN_DECISION: &str = "REASSIGN_DECISION";
pub const KIND_GENERAL: &str = "GENERAL";

pub const STATUS_PENDING: &str = "PENDING";
pub const STATUS_ACCEPTED: &str = "ACCEPTED";
pub const STATUS_REJECTED: &str = "REJECTED";

pub const ACCEPTED_MESSAGE: &str = "Your reassignment request was accepted";
pub const REJECTED_MESSAGE: &str = "Your reassignment request was rejected";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    ReassignRequest,
    ReassignDecision,
    General,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::ReassignRequest => KIND_REASSIGN_REQUEST,
            NotificationKind::ReassignDecision => KIND_REASSIGN_DECISION,
            NotificationKind::General => KIND_GENERAL,
        }
    }
}

impl FromStr for NotificationKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            KIND_REASSIGN_REQUEST => Ok(NotificationKind::ReassignRequest),
            KIND_REASSIGN_DECISION => Ok(NotificationKind::ReassignDecision),
            KIND_GENERAL => Ok(NotificationKind::General),
            other => Err(CoreError::Validation(format!("Unknown notification type '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => STATUS_PENDING,
            RequestStatus::Accepted => STATUS_ACCEPTED,
            RequestStatus::Rejected => STATUS_REJECTED,
        }
    }

    pub fn is_terminal(self) -> bool {
        self != RequestStatus::Pending
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            STATUS_PENDING => Ok(RequestStatus::Pending),
            STATUS_ACCEPTED => Ok(RequestStatus::Accepted),
            STATUS_REJECTED => Ok(RequestStatus::Rejected),
            other => Err(CoreError::Validation(format!("Unknown request status '{other}'"))),
        }
    }
}

/// A super admin's answer to a reassignment request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReassignAction {
    Accept,
    Reject,
}

impl ReassignAction {
    pub fn target_status(self) -> RequestStatus {
        match self {
            ReassignAction::Accept => RequestStatus::Accepted,
            ReassignAction::Reject => RequestStatus::Rejected,
        }
    }

    pub fn decision_message(self) -> &'static str {
        match self {
            ReassignAction::Accept => ACCEPTED_MESSAGE,
            ReassignAction::Reject => REJECTED_MESSAGE,
        }
    }

    pub fn grants_permission(self) -> bool {
        self == ReassignAction::Accept
    }
}

/// Validate a decision against the stored notification and return the
/// status it moves to.
///
/// Anything that is not a reassignment request is reported as not found;
/// a request that is already resolved is a conflict.
pub fn transition(
    notification_id: DbId,
    kind: NotificationKind,
    current: Option<RequestStatus>,
    action: ReassignAction,
) -> Result<RequestStatus, CoreError> {
    if kind != NotificationKind::ReassignRequest {
        return Err(CoreError::NotFound {
            entity: "ReassignRequest",
            id: notification_id,
        });
    }
    match current {
        Some(RequestStatus::Pending) => Ok(action.target_status()),
        Some(resolved) => Err(CoreError::Conflict(format!(
            "Reassignment request {notification_id} was already {resolved}"
        ))),
        None => Err(CoreError::Conflict(format!(
            "Reassignment request {notification_id} has no pending status"
        ))),
    }
}

/// Message shown to each super admin when a request is filed.
pub fn request_message(requester_name: &str, lead_title: &str) -> String {
    format!("{requester_name} requested reassignment of lead \"{lead_title}\"")
}

/// Informational result returned to the requesting admin.
pub fn request_outcome_message(lead_title: &str, recipients: usize) -> String {
    if recipients == 0 {
        format!("No super admin is available to review the reassignment of lead \"{lead_title}\"")
    } else {
        format!("Reassignment request for lead \"{lead_title}\" sent to Super Admin")
    }
}
